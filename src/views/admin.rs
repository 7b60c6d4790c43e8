use crate::{
    storage::{
        admin_log::AdminLogEntry,
        examiners::Examiner,
        protocols::{ProtocolDetails, ProtocolListing},
        reminders::Reminder,
        users::{User, UserCounts, UserOverview, UserStatusFilter},
    },
    structs::{get_inputs::Search, post_inputs::ProtocolForm},
};

use super::{escape, pages::protocol_fields, protocol_card, region_options};

fn counts_line(counts: &UserCounts) -> String {
    format!(
        "<p>Wartend: <strong>{}</strong> | Aktiv: <strong>{}</strong> | Administratoren: <strong>{}</strong> | Gesamt: <strong>{}</strong></p>",
        counts.pending, counts.active, counts.admins, counts.total
    )
}

fn approve_button(user: &User) -> String {
    format!(
        r#"<form method="post" action="/admin/users/{}/approve" style="display: inline;"><button type="submit">Freischalten</button></form>"#,
        user.id
    )
}

fn status_label(user: &User) -> &'static str {
    if user.is_admin {
        "Administrator"
    } else if user.is_approved {
        "Freigeschaltet"
    } else if user.is_verified {
        "Wartet auf Freischaltung"
    } else {
        "Nicht verifiziert"
    }
}

pub struct AdminDashboardView<'a> {
    pub pending: &'a [User],
    pub counts: &'a UserCounts,
    pub total_protocols: i64,
    pub total_examiners: i64,
    pub latest: &'a [ProtocolListing],
}

pub fn dashboard(view: &AdminDashboardView<'_>) -> String {
    let pending: String = view
        .pending
        .iter()
        .map(|user| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&user.name),
                escape(&user.email),
                user.training_year,
                escape(&user.created_at),
                approve_button(user)
            )
        })
        .collect();
    let latest: String = view.latest.iter().map(|protocol| protocol_card(protocol, true)).collect();

    format!(
        r#"<h1>Administration</h1>
<p><a href="/admin/users">Benutzer</a> | <a href="/admin/examiners">Prüfer</a> | <a href="/admin/protocols">Protokolle</a> | <a href="/admin/logs">Admin-Logs</a></p>
{}
<p>Protokolle: <strong>{}</strong> | Prüfer: <strong>{}</strong></p>
<h2>Wartende Freischaltungen</h2>
<table><tr><th>Name</th><th>E-Mail</th><th>Jahr</th><th>Registriert</th><th></th></tr>{}</table>
<h2>Letzte Aktivität</h2>
{}"#,
        counts_line(view.counts),
        view.total_protocols,
        view.total_examiners,
        pending,
        latest
    )
}

pub struct UserListView<'a> {
    pub users: &'a [UserOverview],
    pub counts: &'a UserCounts,
    pub status: UserStatusFilter,
    pub search: &'a str,
    pub own_id: i64,
}

pub fn users(view: &UserListView<'_>) -> String {
    let status_options: String = [
        (UserStatusFilter::All, "Alle"),
        (UserStatusFilter::Pending, "Wartend"),
        (UserStatusFilter::Approved, "Freigeschaltet"),
        (UserStatusFilter::Admin, "Administratoren"),
    ]
    .iter()
    .map(|(filter, label)| {
        format!(
            r#"<option value="{}"{}>{}</option>"#,
            filter.as_str(),
            if *filter == view.status { " selected" } else { "" },
            label
        )
    })
    .collect();

    let rows: String = view
        .users
        .iter()
        .map(|overview| {
            let user = &overview.user;
            let checkbox = if user.id == view.own_id {
                String::new()
            } else {
                format!(r#"<input type="checkbox" name="user_ids" value="{}">"#, user.id)
            };
            format!(
                r#"<tr><td>{}</td><td><a href="/admin/users/{}">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                checkbox,
                user.id,
                escape(&user.name),
                escape(&user.email),
                status_label(user),
                overview.protocol_count,
                escape(overview.last_protocol.as_deref().unwrap_or("-")),
                escape(&user.created_at)
            )
        })
        .collect();

    format!(
        r#"<h1>Benutzerverwaltung</h1>
{}
<form method="get" action="/admin/users">
<label>Status <select name="status">{}</select></label>
<label>Suche <input name="search" value="{}"></label>
<label>Sortierung <select name="sort"><option value="created_at">Registrierung</option><option value="name">Name</option><option value="email">E-Mail</option><option value="protocol_count">Protokolle</option></select></label>
<label>Reihenfolge <select name="order"><option value="desc">absteigend</option><option value="asc">aufsteigend</option></select></label>
<p><button type="submit">Filtern</button></p>
</form>
<form method="post" action="/admin/users/bulk">
<table><tr><th></th><th>Name</th><th>E-Mail</th><th>Status</th><th>Protokolle</th><th>Letztes Protokoll</th><th>Registriert</th></tr>{}</table>
<label>Aktion <select name="action">
<option value="approve">Freischalten</option>
<option value="suspend">Sperren</option>
<option value="promote_admin">Zu Administratoren ernennen</option>
<option value="demote_admin">Administrator-Status entfernen</option>
</select></label>
<p><button type="submit">Auf Auswahl anwenden</button></p>
</form>"#,
        counts_line(view.counts),
        status_options,
        escape(view.search),
        rows
    )
}

pub struct UserDetailsView<'a> {
    pub user: &'a User,
    pub is_self: bool,
    pub protocol_count: i64,
    pub first_protocol: Option<&'a str>,
    pub last_protocol: Option<&'a str>,
    pub protocols: &'a [ProtocolListing],
    pub reminders: &'a [Reminder],
    pub hashtags: &'a [(String, usize)],
}

pub fn user_details(view: &UserDetailsView<'_>) -> String {
    let user = view.user;

    let actions = if view.is_self {
        "<p class=\"muted\">Eigener Account: Status kann nicht geändert werden.</p>".to_string()
    } else {
        let approve = if user.is_verified && !user.is_approved { approve_button(user) } else { String::new() };
        let admin_action = if user.is_admin { ("demote", "Administrator-Status entfernen") } else { ("promote", "Zum Administrator ernennen") };
        let suspend_action = if user.is_approved { ("suspend", "Sperren") } else { ("unsuspend", "Entsperren") };

        format!(
            r#"<p>{}</p>
<form method="post" action="/admin/users/{id}/admin-status"><input type="hidden" name="action" value="{}"><button type="submit">{}</button></form>
<form method="post" action="/admin/users/{id}/suspend"><input type="hidden" name="action" value="{}">
<label>Grund (optional) <input name="reason"></label><button type="submit">{}</button></form>"#,
            approve,
            admin_action.0,
            admin_action.1,
            suspend_action.0,
            suspend_action.1,
            id = user.id
        )
    };

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
    let hashtags: Vec<String> = view.hashtags.iter().map(|(tag, count)| format!("{} ({})", escape(tag), count)).collect();
    let protocols: String = view.protocols.iter().map(|protocol| protocol_card(protocol, true)).collect();

    format!(
        r#"<h1>{}</h1>
<table>
<tr><th>E-Mail</th><td>{}</td></tr>
<tr><th>Ausbildungsjahr</th><td>{}</td></tr>
<tr><th>Status</th><td>{}</td></tr>
<tr><th>Registriert</th><td>{}</td></tr>
<tr><th>Protokolle</th><td>{} (erstes: {}, letztes: {})</td></tr>
<tr><th>Häufigste Hashtags</th><td>{}</td></tr>
</table>
{}
<h2>Erinnerungen</h2>
<table><tr><th>Prüfungsdatum</th><th>Nächste Erinnerung</th><th>Gesendet</th><th>Status</th></tr>{}</table>
<h2>Letzte Protokolle</h2>
{}
<p><a href="/admin/users">Zurück zur Übersicht</a></p>"#,
        escape(&user.name),
        escape(&user.email),
        user.training_year,
        status_label(user),
        escape(&user.created_at),
        view.protocol_count,
        escape(view.first_protocol.unwrap_or("-")),
        escape(view.last_protocol.unwrap_or("-")),
        hashtags.join(", "),
        actions,
        reminders,
        protocols
    )
}

pub fn examiners(examiners: &[Examiner]) -> String {
    let rows: String = examiners
        .iter()
        .map(|examiner| {
            format!(
                r#"<tr><td>{}</td><td>{}</td><td><form method="post" action="/admin/examiners/{}/delete"><button type="submit">Löschen</button></form></td></tr>"#,
                escape(&examiner.name),
                escape(&examiner.region),
                examiner.id
            )
        })
        .collect();

    format!(
        r#"<h1>Prüfer</h1>
<form method="post" action="/admin/examiners/new">
<label>Name <input name="name" required></label>
<label>Bundesland <select name="region" required><option value="">Bitte wählen</option>{}</select></label>
<p><button type="submit">Prüfer hinzufügen</button></p>
</form>
<table><tr><th>Name</th><th>Bundesland</th><th></th></tr>{}</table>"#,
        region_options(None, false),
        rows
    )
}

pub struct ProtocolListView<'a> {
    pub search: &'a Search,
    pub protocols: &'a [ProtocolListing],
    pub total_protocols: i64,
    pub total_authors: i64,
    pub total_regions: i64,
    pub user_names: &'a [String],
    pub examiner_names: &'a [String],
}

fn datalist(id: &str, entries: &[String]) -> String {
    let options: String = entries.iter().map(|entry| format!(r#"<option value="{}">"#, escape(entry))).collect();
    format!(r#"<datalist id="{}">{}</datalist>"#, id, options)
}

pub fn protocols(view: &ProtocolListView<'_>) -> String {
    let search = view.search;
    let field = |value: &Option<String>| escape(value.as_deref().unwrap_or_default());
    let listing: String = view.protocols.iter().map(|protocol| protocol_card(protocol, true)).collect();

    format!(
        r#"<h1>Protokollverwaltung</h1>
<p>Protokolle: <strong>{}</strong> | Autoren: <strong>{}</strong> | Bundesländer: <strong>{}</strong></p>
<form method="get" action="/admin/protocols">
<label>Bundesland <select name="region">{}</select></label>
<label>Prüfer <input name="examiner" list="examiner-names" value="{}"></label>
<label>Hashtag <input name="hashtag" value="{}"></label>
<label>Benutzer <input name="user" list="user-names" value="{}"></label>
<label>Von <input type="date" name="date_from" value="{}"></label>
<label>Bis <input type="date" name="date_to" value="{}"></label>
<label>Sortierung <select name="sort"><option value="created_at">Erstellt</option><option value="date">Prüfungsdatum</option><option value="region">Bundesland</option><option value="user_name">Benutzer</option></select></label>
<label>Reihenfolge <select name="order"><option value="desc">absteigend</option><option value="asc">aufsteigend</option></select></label>
<p><button type="submit">Filtern</button> <a href="/admin/protocols">Zurücksetzen</a></p>
</form>
{}{}
<p class="muted">{} Protokolle gefunden</p>
{}"#,
        view.total_protocols,
        view.total_authors,
        view.total_regions,
        region_options(search.region.as_deref(), true),
        field(&search.examiner),
        field(&search.hashtag),
        field(&search.user),
        field(&search.date_from),
        field(&search.date_to),
        datalist("examiner-names", view.examiner_names),
        datalist("user-names", view.user_names),
        view.protocols.len(),
        listing
    )
}

pub fn protocol_details(details: &ProtocolDetails, form: &ProtocolForm, examiners: &[Examiner]) -> String {
    let named: Vec<String> = details
        .examiners
        .iter()
        .map(|examiner| format!("{} ({})", escape(&examiner.name), escape(&examiner.region)))
        .collect();

    format!(
        r#"<h1>Protokoll #{id}</h1>
<table>
<tr><th>Autor</th><td><a href="/admin/users/{}">{}</a> ({})</td></tr>
<tr><th>Prüfungsdatum</th><td>{}</td></tr>
<tr><th>Bundesland</th><td>{}</td></tr>
<tr><th>Prüfer</th><td>{}</td></tr>
<tr><th>Erstellt</th><td>{}</td></tr>
</table>
<h2>Bearbeiten</h2>
<form method="post" action="/admin/protocols/{id}/edit">
{}
<label>Notiz an den Autor (optional, wird per E-Mail versendet) <textarea name="admin_note" rows="3" cols="80"></textarea></label>
<p><button type="submit">Änderungen speichern</button></p>
</form>
<h2>Löschen</h2>
<form method="post" action="/admin/protocols/{id}/delete">
<label>Grund (optional, wird per E-Mail versendet) <textarea name="reason" rows="3" cols="80"></textarea></label>
<p><button type="submit">Protokoll löschen</button></p>
</form>
<p><a href="/admin/protocols">Zurück zur Übersicht</a></p>"#,
        details.author_id,
        escape(&details.author_name),
        escape(&details.author_email),
        escape(&details.exam_date),
        escape(&details.region),
        named.join(", "),
        escape(&details.created_at),
        protocol_fields(form, examiners),
        id = details.id
    )
}

pub fn logs(entries: &[AdminLogEntry], page: i64, pages: i64) -> String {
    let rows: String = entries
        .iter()
        .map(|entry| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{} #{}</td><td>{}</td><td>{}</td></tr>",
                escape(&entry.created_at),
                escape(&entry.admin_name),
                escape(&entry.action_type),
                escape(&entry.target_type),
                entry.target_id,
                escape(&entry.description),
                escape(entry.admin_note.as_deref().unwrap_or_default())
            )
        })
        .collect();

    let previous = if page > 1 { format!(r#"<a href="/admin/logs?page={}">Zurück</a> "#, page - 1) } else { String::new() };
    let next = if page < pages { format!(r#"<a href="/admin/logs?page={}">Weiter</a>"#, page + 1) } else { String::new() };

    format!(
        r#"<h1>Admin-Logs</h1>
<table><tr><th>Zeit</th><th>Administrator</th><th>Aktion</th><th>Ziel</th><th>Beschreibung</th><th>Notiz</th></tr>{}</table>
<p>Seite {} von {} {}{}</p>"#,
        rows,
        page,
        pages.max(1),
        previous,
        next
    )
}
