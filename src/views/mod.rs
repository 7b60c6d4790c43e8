pub mod admin;
pub mod pages;

use crate::{
    storage::{examiners::Examiner, protocols::ProtocolListing},
    structs::{
        region::{Region, PREDEFINED_HASHTAGS},
        session::{Flash, Session},
    },
};

/// HTML-escapes user supplied text.
pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const STYLE: &str = "
    body { font-family: -apple-system, Helvetica, Arial, sans-serif; margin: 0; color: #333; background: #f5f5f7; }
    nav { background: #3FA357; padding: 10px 20px; }
    nav a { color: white; margin-right: 15px; text-decoration: none; }
    main { max-width: 1000px; margin: 20px auto; background: white; padding: 20px 30px; border-radius: 8px; }
    .flash { padding: 10px 15px; border-radius: 5px; margin-bottom: 10px; }
    .flash-success { background: #d4edda; } .flash-info { background: #d1ecf1; }
    .flash-warning { background: #fff3cd; } .flash-error { background: #f8d7da; }
    .protocol { border: 1px solid #ddd; border-radius: 6px; padding: 10px 15px; margin-bottom: 12px; }
    .muted { color: #777; font-size: 0.9em; }
    table { border-collapse: collapse; width: 100%; } td, th { border-bottom: 1px solid #eee; padding: 6px; text-align: left; }
    label { display: block; margin-top: 8px; }
";

fn navigation(session: Option<&Session>) -> String {
    match session {
        Some(session) => {
            let admin = if session.is_admin { r#"<a href="/admin">Admin</a>"# } else { "" };
            format!(
                r#"<a href="/dashboard">Dashboard</a><a href="/protocols">Protokolle</a><a href="/protocols/new">Neues Protokoll</a><a href="/profile">Profil ({})</a>{}<a href="/logout">Abmelden</a>"#,
                escape(&session.name),
                admin
            )
        }
        None => r#"<a href="/">Start</a><a href="/login">Anmelden</a><a href="/register">Registrieren</a>"#.to_string(),
    }
}

fn flashes(flashes: &[Flash]) -> String {
    flashes
        .iter()
        .map(|flash| format!(r#"<div class="flash flash-{}">{}</div>"#, flash.level.as_str(), escape(&flash.message)))
        .collect()
}

pub fn layout(title: &str, session: Option<&Session>, pending: &[Flash], content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="de">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{} - Protokollsammlung Urologie</title>
<style>{}</style>
</head>
<body>
<nav>{}</nav>
<main>
{}
{}
</main>
<footer class="muted" style="text-align: center;"><a href="/privacy">Datenschutz</a> | <a href="/imprint">Impressum</a></footer>
</body>
</html>"#,
        escape(title),
        STYLE,
        navigation(session),
        flashes(pending),
        content
    )
}

pub fn error_page(status: u16, message: &str) -> String {
    layout(
        "Fehler",
        None,
        &[],
        &format!("<h1>Fehler {}</h1><p>{}</p><p><a href=\"/\">Zur Startseite</a></p>", status, escape(message)),
    )
}

fn selected(condition: bool) -> &'static str {
    if condition {
        " selected"
    } else {
        ""
    }
}

pub(crate) fn region_options(current: Option<&str>, with_empty: bool) -> String {
    let mut options = String::new();
    if with_empty {
        options.push_str(r#"<option value="">Alle Bundesländer</option>"#);
    }
    for region in Region::ALL {
        options.push_str(&format!(
            r#"<option value="{0}"{1}>{0}</option>"#,
            region.name(),
            selected(current == Some(region.name()))
        ));
    }
    options
}

/// Examiner options grouped by region.
pub(crate) fn examiner_options(examiners: &[Examiner], current: Option<&str>) -> String {
    let mut options = r#"<option value="">Bitte wählen</option>"#.to_string();
    for region in Region::ALL {
        let in_region: Vec<&Examiner> = examiners.iter().filter(|examiner| examiner.region == region.name()).collect();
        if in_region.is_empty() {
            continue;
        }

        options.push_str(&format!(r#"<optgroup label="{}">"#, region.name()));
        for examiner in in_region {
            let id = examiner.id.to_string();
            options.push_str(&format!(
                r#"<option value="{}"{}>{}</option>"#,
                id,
                selected(current == Some(id.as_str())),
                escape(&examiner.name)
            ));
        }
        options.push_str("</optgroup>");
    }
    options
}

pub(crate) fn hashtag_suggestions() -> String {
    let tags: Vec<String> = PREDEFINED_HASHTAGS.iter().map(|tag| format!("<code>{}</code>", tag)).collect();
    format!(r#"<p class="muted">Vorschläge: {}</p>"#, tags.join(" "))
}

pub(crate) fn protocol_card(protocol: &ProtocolListing, admin_link: bool) -> String {
    let comment = protocol
        .comment
        .as_deref()
        .map(|comment| format!("<p><em>Kommentar:</em> {}</p>", escape(comment)))
        .unwrap_or_default();
    let details = if admin_link {
        format!(r#" | <a href="/admin/protocols/{}">Details</a>"#, protocol.id)
    } else {
        String::new()
    };

    format!(
        r#"<div class="protocol">
<strong>{}</strong> | {} | Prüfer: {}, {}, {}
<p style="white-space: pre-wrap;">{}</p>
{}
<p class="muted">{} | von {} am {}{}</p>
</div>"#,
        escape(&protocol.exam_date),
        escape(&protocol.region),
        escape(&protocol.examiners[0]),
        escape(&protocol.examiners[1]),
        escape(&protocol.examiners[2]),
        escape(&protocol.content),
        comment,
        escape(&protocol.hashtags),
        escape(&protocol.author_name),
        escape(&protocol.created_at),
        details
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;");
        assert_eq!(escape("Müller"), "Müller");
    }

    #[test]
    fn layout_shows_admin_link_only_to_admins() {
        let admin = Session { user_id: 1, name: "Admin".to_string(), is_admin: true };
        let user = Session { user_id: 2, name: "Nutzer".to_string(), is_admin: false };

        assert!(layout("Test", Some(&admin), &[], "").contains(r#"href="/admin""#));
        assert!(!layout("Test", Some(&user), &[], "").contains(r#"href="/admin""#));
    }

    #[test]
    fn region_options_mark_the_current_region() {
        let options = region_options(Some("Bremen"), true);

        assert!(options.contains(r#"<option value="Bremen" selected>Bremen</option>"#));
        assert!(options.starts_with(r#"<option value="">"#));
    }
}
