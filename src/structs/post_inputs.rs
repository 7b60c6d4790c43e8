use serde::{Deserialize, Serialize};

// Every field is optional so a half-filled form still deserializes and can
// be answered with a validation message instead of a 400.

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct RegisterForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub training_year: Option<String>,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct ProtocolForm {
    pub exam_date: Option<String>,
    pub region: Option<String>,
    pub examiner1: Option<String>,
    pub examiner2: Option<String>,
    pub examiner3: Option<String>,
    pub content: Option<String>,
    pub hashtags: Option<String>,
    pub comment: Option<String>,
    pub admin_note: Option<String>,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct ReminderForm {
    pub exam_date: Option<String>,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct ProfileForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub training_year: Option<String>,
    pub new_password: Option<String>,
    pub password_confirmation: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct DeleteProfileForm {
    pub password: Option<String>,
    pub confirmation: Option<String>,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct ExaminerForm {
    pub name: Option<String>,
    pub region: Option<String>,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct ActionForm {
    pub action: Option<String>,
    pub reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Approve,
    Suspend,
    PromoteAdmin,
    DemoteAdmin,
}

impl BulkAction {
    pub fn parse(raw: &str) -> Option<BulkAction> {
        match raw {
            "approve" => Some(BulkAction::Approve),
            "suspend" => Some(BulkAction::Suspend),
            "promote_admin" => Some(BulkAction::PromoteAdmin),
            "demote_admin" => Some(BulkAction::DemoteAdmin),
            _ => None,
        }
    }
}

/// The bulk form repeats `user_ids`, which serde_urlencoded cannot collect
/// into a `Vec`, so it is parsed by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkForm {
    pub action: Option<String>,
    pub user_ids: Vec<i64>,
}

impl BulkForm {
    pub fn parse(body: &[u8]) -> BulkForm {
        let mut form = BulkForm::default();

        for (key, value) in url::form_urlencoded::parse(body) {
            match key.as_ref() {
                "action" => form.action = Some(value.into_owned()),
                "user_ids" => {
                    if let Ok(id) = value.trim().parse::<i64>() {
                        form.user_ids.push(id);
                    }
                }
                _ => {}
            }
        }

        form
    }
}
