use crate::{
    storage::{examiners::Examiner, protocols::ProtocolListing, reminders::Reminder, users::User},
    structs::{
        get_inputs::Search,
        post_inputs::{ProtocolForm, RegisterForm},
    },
};

use super::{escape, examiner_options, hashtag_suggestions, protocol_card, region_options};

fn value(field: &Option<String>) -> String {
    escape(field.as_deref().unwrap_or_default())
}

pub fn index(logged_in: bool) -> String {
    let actions = if logged_in {
        r#"<p><a href="/dashboard">Zum Dashboard</a></p>"#
    } else {
        r#"<p><a href="/login">Anmelden</a> oder <a href="/register">Registrieren</a></p>"#
    };

    format!(
        "<h1>Protokollsammlung Urologie</h1>
<p>Gedächtnisprotokolle der mündlichen Facharztprüfung, geteilt von Weiterbildungsassistentinnen und -assistenten.
Nach der Registrierung und Freischaltung durch einen Administrator können Sie Protokolle lesen und eigene beitragen.</p>
{}",
        actions
    )
}

pub fn privacy() -> String {
    "<h1>Datenschutzerklärung</h1>
<p>Gespeichert werden Name, E-Mail-Adresse, Ausbildungsjahr sowie die von Ihnen verfassten Protokolle und Erinnerungen.
Die Daten dienen ausschließlich dem Betrieb der Protokollsammlung und werden nicht an Dritte weitergegeben.</p>
<p>Über Ihr Profil können Sie Ihre Daten jederzeit als JSON exportieren oder Ihr Profil vollständig löschen.</p>"
        .to_string()
}

pub fn imprint() -> String {
    "<h1>Impressum</h1>
<p>Die Protokollsammlung ist ein nicht-kommerzielles Angebot von Weiterbildungsassistenten für Weiterbildungsassistenten.
Verantwortlich für den Inhalt sind die jeweiligen Administratoren.</p>"
        .to_string()
}

pub fn register(form: &RegisterForm) -> String {
    let year_options: String = (1..=6)
        .map(|year| {
            let current = form.training_year.as_deref() == Some(year.to_string().as_str());
            format!(r#"<option value="{0}"{1}>{0}. Jahr</option>"#, year, if current { " selected" } else { "" })
        })
        .collect();

    format!(
        r#"<h1>Registrierung</h1>
<form method="post" action="/register">
<label>Name <input name="name" value="{}" required></label>
<label>E-Mail <input type="email" name="email" value="{}" required></label>
<label>Passwort <input type="password" name="password" required></label>
<label>Ausbildungsjahr <select name="training_year">{}</select></label>
<p><button type="submit">Registrieren</button></p>
</form>"#,
        value(&form.name),
        value(&form.email),
        year_options
    )
}

pub fn login(email: &str) -> String {
    format!(
        r#"<h1>Anmelden</h1>
<form method="post" action="/login">
<label>E-Mail <input type="email" name="email" value="{}" required></label>
<label>Passwort <input type="password" name="password" required></label>
<p><button type="submit">Anmelden</button></p>
</form>
<p>Noch kein Account? <a href="/register">Jetzt registrieren</a></p>"#,
        escape(email)
    )
}

pub struct DashboardView<'a> {
    pub name: &'a str,
    pub own_protocols: i64,
    pub total_protocols: i64,
    pub total_examiners: i64,
    pub latest: &'a [ProtocolListing],
}

pub fn dashboard(view: &DashboardView<'_>) -> String {
    let latest: String = view.latest.iter().map(|protocol| protocol_card(protocol, false)).collect();

    format!(
        r#"<h1>Willkommen, {}!</h1>
<p>Ihre Protokolle: <strong>{}</strong> | Protokolle gesamt: <strong>{}</strong> | Prüfer: <strong>{}</strong></p>
<h2>Erinnerung einrichten</h2>
<form method="post" action="/reminders">
<label>Prüfungsdatum <input type="date" name="exam_date" required></label>
<p><button type="submit">Erinnerung einrichten</button></p>
</form>
<h2>Neueste Protokolle</h2>
{}"#,
        escape(view.name),
        view.own_protocols,
        view.total_protocols,
        view.total_examiners,
        if latest.is_empty() { "<p>Noch keine Protokolle vorhanden.</p>".to_string() } else { latest }
    )
}

pub fn protocols(search: &Search, protocols: &[ProtocolListing]) -> String {
    let listing: String = protocols.iter().map(|protocol| protocol_card(protocol, false)).collect();

    format!(
        r#"<h1>Protokolle</h1>
<form method="get" action="/protocols">
<label>Bundesland <select name="region">{}</select></label>
<label>Prüfer <input name="examiner" value="{}"></label>
<label>Hashtag <input name="hashtag" value="{}"></label>
<p><button type="submit">Filtern</button> <a href="/protocols">Zurücksetzen</a></p>
</form>
<p class="muted">{} Protokolle gefunden</p>
{}"#,
        region_options(search.region.as_deref(), true),
        value(&search.examiner),
        value(&search.hashtag),
        protocols.len(),
        listing
    )
}

/// Protocol fields shared by the author form and the admin edit form.
pub(crate) fn protocol_fields(form: &ProtocolForm, examiners: &[Examiner]) -> String {
    format!(
        r#"<label>Prüfungsdatum <input type="date" name="exam_date" value="{}" required></label>
<label>Bundesland <select name="region" required><option value="">Bitte wählen</option>{}</select></label>
<label>Prüfer 1 <select name="examiner1" required>{}</select></label>
<label>Prüfer 2 <select name="examiner2" required>{}</select></label>
<label>Prüfer 3 <select name="examiner3" required>{}</select></label>
<label>Prüfungsinhalt <textarea name="content" rows="10" cols="80" required>{}</textarea></label>
<label>Hashtags <input name="hashtags" value="{}" size="80"></label>
{}
<label>Kommentar <textarea name="comment" rows="3" cols="80">{}</textarea></label>"#,
        value(&form.exam_date),
        region_options(form.region.as_deref(), false),
        examiner_options(examiners, form.examiner1.as_deref()),
        examiner_options(examiners, form.examiner2.as_deref()),
        examiner_options(examiners, form.examiner3.as_deref()),
        value(&form.content),
        value(&form.hashtags),
        hashtag_suggestions(),
        value(&form.comment)
    )
}

pub fn new_protocol(form: &ProtocolForm, examiners: &[Examiner]) -> String {
    format!(
        r#"<h1>Neues Protokoll</h1>
<form method="post" action="/protocols/new">
{}
<p><button type="submit">Protokoll speichern</button></p>
</form>"#,
        protocol_fields(form, examiners)
    )
}

pub struct ProfileView<'a> {
    pub user: &'a User,
    pub protocol_count: i64,
    pub protocols: &'a [ProtocolListing],
    pub reminders: &'a [Reminder],
}

pub fn profile(view: &ProfileView<'_>) -> String {
    let protocols: String = view.protocols.iter().map(|protocol| protocol_card(protocol, false)).collect();
    let reminders: String = view
        .reminders
        .iter()
        .map(|reminder| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&reminder.exam_date),
                escape(&reminder.next_reminder),
                reminder.reminder_count,
                if reminder.protocol_created { "erledigt" } else { "aktiv" }
            )
        })
        .collect();

    format!(
        r#"<h1>Mein Profil</h1>
<table>
<tr><th>Name</th><td>{}</td></tr>
<tr><th>E-Mail</th><td>{}</td></tr>
<tr><th>Ausbildungsjahr</th><td>{}</td></tr>
<tr><th>Registriert am</th><td>{}</td></tr>
<tr><th>Protokolle</th><td>{}</td></tr>
</table>
<p><a href="/profile/edit">Profil bearbeiten</a> | <a href="/profile/export">Daten exportieren</a> | <a href="/profile/delete">Profil löschen</a></p>
<h2>Erinnerungen</h2>
<table><tr><th>Prüfungsdatum</th><th>Nächste Erinnerung</th><th>Gesendet</th><th>Status</th></tr>{}</table>
<h2>Meine letzten Protokolle</h2>
{}"#,
        escape(&view.user.name),
        escape(&view.user.email),
        view.user.training_year,
        escape(&view.user.created_at),
        view.protocol_count,
        reminders,
        protocols
    )
}

pub fn edit_profile(name: &str, email: &str, training_year: &str) -> String {
    format!(
        r#"<h1>Profil bearbeiten</h1>
<form method="post" action="/profile/edit">
<label>Name <input name="name" value="{}" required></label>
<label>E-Mail <input type="email" name="email" value="{}" required></label>
<label>Ausbildungsjahr <input type="number" min="1" max="6" name="training_year" value="{}" required></label>
<h3>Passwort ändern (optional)</h3>
<label>Neues Passwort <input type="password" name="new_password"></label>
<label>Passwort bestätigen <input type="password" name="password_confirmation"></label>
<label>Aktuelles Passwort <input type="password" name="current_password"></label>
<p><button type="submit">Speichern</button> <a href="/profile">Abbrechen</a></p>
</form>"#,
        escape(name),
        escape(email),
        escape(training_year)
    )
}

pub fn delete_profile() -> String {
    r#"<h1>Profil löschen</h1>
<p>Ihr Profil wird zusammen mit allen Ihren Protokollen und Erinnerungen endgültig gelöscht.</p>
<form method="post" action="/profile/delete">
<label>Passwort <input type="password" name="password" required></label>
<label>Geben Sie <strong>LÖSCHEN</strong> zur Bestätigung ein <input name="confirmation" required></label>
<p><button type="submit">Profil endgültig löschen</button> <a href="/profile">Abbrechen</a></p>
</form>"#
        .to_string()
}
