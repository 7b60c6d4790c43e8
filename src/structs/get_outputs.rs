use serde::{Deserialize, Serialize};

use crate::storage::{examiners::Examiner, protocols::ProtocolListing, reminders::Reminder, users::User};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExaminerOption {
    pub id: i64,
    pub name: String,
}

impl From<Examiner> for ExaminerOption {
    fn from(examiner: Examiner) -> ExaminerOption {
        ExaminerOption { id: examiner.id, name: examiner.name }
    }
}

/// Personal data export. The keys are part of the download format and stay German.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProfileExport {
    pub export_info: ExportInfo,
    pub benutzer_daten: ExportedUser,
    pub protokolle: Vec<ExportedProtocol>,
    pub erinnerungen: Vec<ExportedReminder>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExportInfo {
    pub datum: String,
    pub typ: String,
    pub benutzer_id: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExportedUser {
    pub name: String,
    pub email: String,
    pub ausbildungsjahr: i64,
    pub registriert_am: String,
    pub email_verifiziert: bool,
    pub account_freigeschaltet: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExportedProtocol {
    pub datum: String,
    pub bundesland: String,
    pub pruefer1: String,
    pub pruefer2: String,
    pub pruefer3: String,
    pub inhalt: String,
    pub hashtags: String,
    pub kommentar: Option<String>,
    pub erstellt_am: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExportedReminder {
    pub pruefungsdatum: String,
    pub naechste_erinnerung: String,
    pub anzahl_erinnerungen: i64,
    pub protokoll_erstellt: bool,
    pub erstellt_am: String,
}

impl From<&User> for ExportedUser {
    fn from(user: &User) -> ExportedUser {
        ExportedUser {
            name: user.name.clone(),
            email: user.email.clone(),
            ausbildungsjahr: user.training_year,
            registriert_am: user.created_at.clone(),
            email_verifiziert: user.is_verified,
            account_freigeschaltet: user.is_approved,
        }
    }
}

impl From<ProtocolListing> for ExportedProtocol {
    fn from(protocol: ProtocolListing) -> ExportedProtocol {
        let [pruefer1, pruefer2, pruefer3] = protocol.examiners;
        ExportedProtocol {
            datum: protocol.exam_date,
            bundesland: protocol.region,
            pruefer1,
            pruefer2,
            pruefer3,
            inhalt: protocol.content,
            hashtags: protocol.hashtags,
            kommentar: protocol.comment,
            erstellt_am: protocol.created_at,
        }
    }
}

impl From<Reminder> for ExportedReminder {
    fn from(reminder: Reminder) -> ExportedReminder {
        ExportedReminder {
            pruefungsdatum: reminder.exam_date,
            naechste_erinnerung: reminder.next_reminder,
            anzahl_erinnerungen: reminder.reminder_count,
            protokoll_erstellt: reminder.protocol_created,
            erstellt_am: reminder.created_at,
        }
    }
}
