use crate::views::escape;

pub struct Notification {
    pub subject: String,
    pub body: String,
}

const SUFFIX: &str = "Urologie Facharztprüfung";

fn button(link: &str, label: &str, color: &str) -> String {
    format!(
        r#"<p><a href="{}" style="background-color: {}; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px;">{}</a></p>"#,
        escape(link),
        color,
        label
    )
}

fn wrap(subject: String, content: String) -> Notification {
    let body = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="font-family: Helvetica, Arial, sans-serif; line-height: 1.6; color: #333333;">
{}
</body>
</html>"#,
        content
    );

    Notification { subject, body }
}

pub fn verification(name: &str, link: &str) -> Notification {
    wrap(
        format!("E-Mail-Verifizierung - {}", SUFFIX),
        format!(
            "<h2>Willkommen bei der Protokollsammlung!</h2>
<p>Hallo {},</p>
<p>bitte klicken Sie auf den folgenden Link, um Ihre E-Mail-Adresse zu verifizieren:</p>
{}
<p>Nach der Verifizierung wird Ihr Account von einem Administrator geprüft und freigeschaltet.</p>",
            escape(name),
            button(link, "E-Mail verifizieren", "#007AFF")
        ),
    )
}

pub fn account_approved(name: &str, login_link: &str) -> Notification {
    wrap(
        format!("Account freigeschaltet - {}", SUFFIX),
        format!(
            "<h2>Account freigeschaltet!</h2>
<p>Hallo {},</p>
<p>Ihr Account wurde freigeschaltet. Sie können sich jetzt anmelden und die Plattform nutzen.</p>
{}
<p>Viel Erfolg bei der Prüfungsvorbereitung!</p>",
            escape(name),
            button(login_link, "Jetzt anmelden", "#007AFF")
        ),
    )
}

pub fn promoted(name: &str, admin_link: &str) -> Notification {
    wrap(
        format!("Sie wurden zum Administrator ernannt - {}", SUFFIX),
        format!(
            "<h2>Herzlichen Glückwunsch!</h2>
<p>Hallo {},</p>
<p>Sie wurden zum Administrator der Plattform ernannt. Sie können jetzt Benutzer freischalten,
Prüfer verwalten und Protokolle moderieren.</p>
{}",
            escape(name),
            button(admin_link, "Zum Admin-Dashboard", "#3FA357")
        ),
    )
}

pub fn demoted(name: &str, dashboard_link: &str) -> Notification {
    wrap(
        format!("Administrator-Status entfernt - {}", SUFFIX),
        format!(
            "<h2>Administrator-Status geändert</h2>
<p>Hallo {},</p>
<p>Ihr Administrator-Status wurde entfernt. Alle normalen Funktionen der Plattform stehen Ihnen weiterhin zur Verfügung.</p>
{}",
            escape(name),
            button(dashboard_link, "Zum Dashboard", "#606AAC")
        ),
    )
}

pub fn suspended(name: &str, reason: Option<&str>) -> Notification {
    let reason = reason
        .map(|reason| format!("<p><strong>Grund:</strong> {}</p>", escape(reason)))
        .unwrap_or_default();

    wrap(
        format!("Account gesperrt - {}", SUFFIX),
        format!(
            "<h2>Account vorübergehend gesperrt</h2>
<p>Hallo {},</p>
<p>Ihr Account wurde vorübergehend gesperrt.</p>
{}
<p>Bei Fragen wenden Sie sich an einen Administrator.</p>",
            escape(name),
            reason
        ),
    )
}

pub fn reinstated(name: &str, login_link: &str) -> Notification {
    wrap(
        format!("Account wieder freigeschaltet - {}", SUFFIX),
        format!(
            "<h2>Account wieder freigeschaltet</h2>
<p>Hallo {},</p>
<p>Ihr Account wurde wieder freigeschaltet. Sie können sich jetzt wieder anmelden.</p>
{}",
            escape(name),
            button(login_link, "Jetzt anmelden", "#3FA357")
        ),
    )
}

pub fn protocol_edited(name: &str, exam_date: &str, note: &str, listing_link: &str) -> Notification {
    Notification {
        subject: "Ihr Protokoll wurde von einem Administrator bearbeitet".to_string(),
        ..wrap(
            String::new(),
            format!(
                "<h2>Protokoll bearbeitet</h2>
<p>Hallo {},</p>
<p>Ihr Protokoll vom {} wurde von einem Administrator bearbeitet.</p>
<p><strong>Administratoren-Notiz:</strong><br>{}</p>
{}",
                escape(name),
                escape(exam_date),
                escape(note),
                button(listing_link, "Protokoll ansehen", "#3FA357")
            ),
        )
    }
}

pub fn protocol_deleted(name: &str, exam_date: &str, reason: &str) -> Notification {
    Notification {
        subject: "Ihr Protokoll wurde von einem Administrator entfernt".to_string(),
        ..wrap(
            String::new(),
            format!(
                "<h2>Protokoll entfernt</h2>
<p>Hallo {},</p>
<p>Ihr Protokoll vom {} wurde von einem Administrator entfernt.</p>
<p><strong>Grund:</strong><br>{}</p>
<p>Bei Fragen wenden Sie sich an einen Administrator.</p>",
                escape(name),
                escape(exam_date),
                escape(reason)
            ),
        )
    }
}

pub fn reminder(name: &str, new_protocol_link: &str) -> Notification {
    wrap(
        "Erinnerung: Prüfungsprotokoll erstellen".to_string(),
        format!(
            "<h2>Erinnerung: Prüfungsprotokoll</h2>
<p>Hallo {},</p>
<p>Dies ist eine Erinnerung daran, Ihr Prüfungsprotokoll zu erstellen.
Ihre Erfahrungen helfen anderen bei der Vorbereitung!</p>
{}",
            escape(name),
            button(new_protocol_link, "Protokoll erstellen", "#007AFF")
        ),
    )
}
