#[macro_use]
mod common;

use actix_web::{http::StatusCode, test};
use chrono::Duration;
use regex::Regex;

use protokolldb::{
    services::common::SESSION_COOKIE,
    storage::{self, parse_date},
};

use common::{cookie, flashes, get, location, post_form, Context, ADMIN_EMAIL, ADMIN_PASSWORD};

fn protocol<'a>(examiners: &'a [String; 3], region: &'a str, content: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("exam_date", "2026-03-12"),
        ("region", region),
        ("examiner1", examiners[0].as_str()),
        ("examiner2", examiners[1].as_str()),
        ("examiner3", examiners[2].as_str()),
        ("content", content),
        ("hashtags", "#Nierensteine #Sono"),
        ("comment", ""),
    ]
}

async fn examiners_in(context: &Context, region: &str) -> [String; 3] {
    [
        context.examiner(&format!("Dr. Eins {}", region), region).await.to_string(),
        context.examiner(&format!("Dr. Zwei {}", region), region).await.to_string(),
        context.examiner(&format!("Dr. Drei {}", region), region).await.to_string(),
    ]
}

#[actix_web::test]
async fn registration_verification_approval_and_submission() {
    let context = Context::new().await;
    let app = test_app!(context);

    let registered = test::call_service(
        &app,
        post_form(
            "/register",
            None,
            &[("name", "Lena Berg"), ("email", "Lena@Example.org"), ("password", "sicher123"), ("training_year", "5")],
        )
        .to_request(),
    )
    .await;
    assert_eq!(registered.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&registered), "/login");

    let mails = context.mailer.sent_to("lena@example.org");
    assert_eq!(mails.len(), 1);
    let pattern = Regex::new(r"/verify/([A-Za-z0-9]{32})").expect("pattern");
    let token = pattern.captures(&mails[0].body).expect("verification link")[1].to_string();

    let login_form = [("email", "lena@example.org"), ("password", "sicher123")];
    let unverified = test::call_service(&app, post_form("/login", None, &login_form).to_request()).await;
    assert_eq!(unverified.status(), StatusCode::OK);
    assert!(cookie(&unverified, SESSION_COOKIE).is_none());

    let verified = test::call_service(&app, get(&format!("/verify/{}", token), None).to_request()).await;
    assert_eq!(location(&verified), "/login");
    assert!(flashes(&verified)[0].starts_with("E-Mail erfolgreich verifiziert"));

    let reused = test::call_service(&app, get(&format!("/verify/{}", token), None).to_request()).await;
    assert!(flashes(&reused)[0].starts_with("Ungültiger"));

    let unapproved = test::call_service(&app, post_form("/login", None, &login_form).to_request()).await;
    let body = test::read_body(unapproved).await;
    assert!(String::from_utf8_lossy(&body).contains("noch nicht von einem Administrator freigeschaltet"));

    let user_id = context.data.lock().await.find_user_by_email("lena@example.org").expect("lookup").expect("user").id;
    let admin = context.session_for(context.admin_id).await;
    let approved = test::call_service(
        &app,
        post_form(&format!("/admin/users/{}/approve", user_id), Some(&admin), &[]).to_request(),
    )
    .await;
    assert_eq!(location(&approved), "/admin");
    assert_eq!(context.mailer.sent_to("lena@example.org").len(), 2);

    let logged_in = test::call_service(&app, post_form("/login", None, &login_form).to_request()).await;
    assert_eq!(location(&logged_in), "/dashboard");
    let session = cookie(&logged_in, SESSION_COOKIE).expect("session cookie");

    let bayern = examiners_in(&context, "Bayern").await;
    let berlin = examiners_in(&context, "Berlin").await;
    for (examiners, region, content) in [(&bayern, "Bayern", "Fragen zur Urolithiasis"), (&berlin, "Berlin", "Fragen zum Prostatakarzinom")] {
        let submitted = test::call_service(
            &app,
            post_form("/protocols/new", Some(&session), &protocol(examiners, region, content)).to_request(),
        )
        .await;
        assert_eq!(location(&submitted), "/protocols");
        assert_eq!(flashes(&submitted), vec!["Protokoll erfolgreich erstellt!".to_string()]);
    }

    let listing = test::call_service(&app, get("/protocols?region=Bayern", Some(&session)).to_request()).await;
    assert_eq!(listing.status(), StatusCode::OK);
    let body = String::from_utf8_lossy(&test::read_body(listing).await).to_string();
    assert!(body.contains("Fragen zur Urolithiasis"));
    assert!(!body.contains("Fragen zum Prostatakarzinom"));
}

#[actix_web::test]
async fn duplicate_email_registration_is_rejected() {
    let context = Context::new().await;
    let app = test_app!(context);
    let existing = context.approved_user("Original", "doppelt@example.org", "passwort1").await;

    let response = test::call_service(
        &app,
        post_form(
            "/register",
            None,
            &[("name", "Kopie"), ("email", "doppelt@example.org"), ("password", "anders"), ("training_year", "2")],
        )
        .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8_lossy(&test::read_body(response).await).to_string();
    assert!(body.contains("E-Mail-Adresse bereits registriert."));

    let stored = context.data.lock().await.get_user(existing).expect("get").expect("user");
    assert_eq!(stored.name, "Original");
    assert_eq!(stored.training_year, 4);
    assert!(context.mailer.sent().is_empty());
}

#[actix_web::test]
async fn protected_pages_require_login_and_admin_rights() {
    let context = Context::new().await;
    let app = test_app!(context);
    let user = context.approved_user("Nutzer", "nutzer@example.org", "passwort1").await;
    let session = context.session_for(user).await;

    let anonymous = test::call_service(&app, get("/dashboard", None).to_request()).await;
    assert_eq!(anonymous.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&anonymous), "/login");

    let forged = actix_web::cookie::Cookie::new(SESSION_COOKIE, "not.a.token");
    let forged = test::call_service(&app, get("/protocols", Some(&forged)).to_request()).await;
    assert_eq!(location(&forged), "/login");

    let not_admin = test::call_service(&app, get("/admin/users", Some(&session)).to_request()).await;
    assert_eq!(location(&not_admin), "/dashboard");
    assert_eq!(flashes(&not_admin), vec!["Keine Berechtigung für diese Seite.".to_string()]);

    let dashboard = test::call_service(&app, get("/dashboard", Some(&session)).to_request()).await;
    assert_eq!(dashboard.status(), StatusCode::OK);
}

#[actix_web::test]
async fn admin_login_uses_the_bootstrap_account() {
    let context = Context::new().await;
    let app = test_app!(context);

    let wrong = test::call_service(
        &app,
        post_form("/login", None, &[("email", ADMIN_EMAIL), ("password", "falsch")]).to_request(),
    )
    .await;
    assert!(cookie(&wrong, SESSION_COOKIE).is_none());

    let right = test::call_service(
        &app,
        post_form("/login", None, &[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)]).to_request(),
    )
    .await;
    let session = cookie(&right, SESSION_COOKIE).expect("session");

    let admin = test::call_service(&app, get("/admin", Some(&session)).to_request()).await;
    assert_eq!(admin.status(), StatusCode::OK);
}

#[actix_web::test]
async fn admins_can_demote_others_but_not_themselves() {
    let context = Context::new().await;
    let app = test_app!(context);
    let second = context.approved_user("Zweite", "zweite@example.org", "passwort1").await;
    context.data.lock().await.set_admin(second, true).expect("promote");
    let admin = context.session_for(context.admin_id).await;

    let demoted = test::call_service(
        &app,
        post_form(&format!("/admin/users/{}/admin-status", second), Some(&admin), &[("action", "demote")]).to_request(),
    )
    .await;
    assert_eq!(location(&demoted), "/admin/users");
    assert!(!context.data.lock().await.is_admin(second).expect("flag"));

    let own = test::call_service(
        &app,
        post_form(&format!("/admin/users/{}/admin-status", context.admin_id), Some(&admin), &[("action", "demote")])
            .to_request(),
    )
    .await;
    assert_eq!(flashes(&own), vec!["Sie können Ihren eigenen Admin-Status nicht ändern.".to_string()]);
    assert_eq!(context.data.lock().await.count_admins().expect("admins"), 1);
}

#[actix_web::test]
async fn bulk_demotion_skips_the_acting_admin() {
    let context = Context::new().await;
    let app = test_app!(context);
    let second = context.approved_user("Zweite", "zweite@example.org", "passwort1").await;
    context.data.lock().await.set_admin(second, true).expect("promote");
    let plain = context.approved_user("Nutzer", "nutzer@example.org", "passwort1").await;
    let session = context.session_for(second).await;

    let body = format!("action=demote_admin&user_ids={}&user_ids={}&user_ids={}", context.admin_id, second, plain);
    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/admin/users/bulk")
            .cookie(session)
            .insert_header(("content-type", "application/x-www-form-urlencoded"))
            .set_payload(body)
            .to_request(),
    )
    .await;

    assert_eq!(location(&response), "/admin/users");
    assert_eq!(flashes(&response), vec!["1 Administratoren wurden degradiert.".to_string()]);
    let database = context.data.lock().await;
    assert!(!database.is_admin(context.admin_id).expect("flag"));
    assert!(database.is_admin(second).expect("flag"));
    assert_eq!(database.count_admins().expect("admins"), 1);
}

#[actix_web::test]
async fn examiners_in_use_cannot_be_deleted_and_repeats_are_rejected() {
    let context = Context::new().await;
    let app = test_app!(context);
    let author = context.approved_user("Autor", "autor@example.org", "passwort1").await;
    let session = context.session_for(author).await;
    let admin = context.session_for(context.admin_id).await;
    let examiners = examiners_in(&context, "Hessen").await;

    let repeated = [examiners[0].clone(), examiners[0].clone(), examiners[1].clone()];
    let rejected = test::call_service(
        &app,
        post_form("/protocols/new", Some(&session), &protocol(&repeated, "Hessen", "Inhalt")).to_request(),
    )
    .await;
    assert_eq!(rejected.status(), StatusCode::OK);
    let body = String::from_utf8_lossy(&test::read_body(rejected).await).to_string();
    assert!(body.contains("Alle drei Prüfer müssen unterschiedlich sein."));
    assert_eq!(context.data.lock().await.count_protocols().expect("count"), 0);

    test::call_service(&app, post_form("/protocols/new", Some(&session), &protocol(&examiners, "Hessen", "Inhalt")).to_request())
        .await;

    let in_use = test::call_service(
        &app,
        post_form(&format!("/admin/examiners/{}/delete", examiners[0]), Some(&admin), &[]).to_request(),
    )
    .await;
    assert_eq!(
        flashes(&in_use),
        vec!["Prüfer kann nicht gelöscht werden, da er in Protokollen verwendet wird.".to_string()]
    );

    let unused = context.examiner("Dr. Frei", "Hessen").await;
    let deleted = test::call_service(
        &app,
        post_form(&format!("/admin/examiners/{}/delete", unused), Some(&admin), &[]).to_request(),
    )
    .await;
    assert_eq!(flashes(&deleted), vec!["Prüfer wurde gelöscht.".to_string()]);
    assert!(!context.data.lock().await.examiner_exists(unused).expect("exists"));
}

#[actix_web::test]
async fn a_new_protocol_completes_open_reminders() {
    let context = Context::new().await;
    let app = test_app!(context);
    let author = context.approved_user("Autor", "autor@example.org", "passwort1").await;
    let session = context.session_for(author).await;

    let created = test::call_service(
        &app,
        post_form("/reminders", Some(&session), &[("exam_date", "2026-03-12")]).to_request(),
    )
    .await;
    assert_eq!(location(&created), "/dashboard");
    let reminder = context.data.lock().await.reminders_of_user(author).expect("reminders").remove(0);
    assert!(!reminder.protocol_created);

    let examiners = examiners_in(&context, "Sachsen").await;
    test::call_service(&app, post_form("/protocols/new", Some(&session), &protocol(&examiners, "Sachsen", "Inhalt")).to_request())
        .await;

    let database = context.data.lock().await;
    assert!(database.reminders_of_user(author).expect("reminders")[0].protocol_created);
    let later = storage::now() + Duration::days(30);
    assert!(database.due_reminders(later).expect("due").is_empty());
}

#[actix_web::test]
async fn admin_edit_with_note_is_logged_and_mailed() {
    let context = Context::new().await;
    let app = test_app!(context);
    let author = context.approved_user("Autor", "autor@example.org", "passwort1").await;
    let session = context.session_for(author).await;
    let admin = context.session_for(context.admin_id).await;
    let examiners = examiners_in(&context, "Bremen").await;

    test::call_service(
        &app,
        post_form("/protocols/new", Some(&session), &protocol(&examiners, "Bremen", "Kurz")).to_request(),
    )
    .await;
    let id = context.data.lock().await.latest_protocols(1).expect("latest")[0].id;

    let mut edit = protocol(&examiners, "Bremen", "Ausführlicher Inhalt nach Korrektur");
    edit.push(("admin_note", "Rechtschreibung korrigiert"));
    let edited = test::call_service(
        &app,
        post_form(&format!("/admin/protocols/{}/edit", id), Some(&admin), &edit).to_request(),
    )
    .await;
    assert_eq!(location(&edited), format!("/admin/protocols/{}", id));
    assert_eq!(flashes(&edited), vec!["Protokoll wurde erfolgreich aktualisiert.".to_string()]);

    let database = context.data.lock().await;
    let logs = database.admin_logs(50, 0).expect("logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].admin_note.as_deref(), Some("Rechtschreibung korrigiert"));
    assert_eq!(logs[0].target_id, id);
    let stored = database.get_protocol(id).expect("get").expect("protocol");
    assert_eq!(stored.content, "Ausführlicher Inhalt nach Korrektur");
    drop(database);

    let mails = context.mailer.sent_to("autor@example.org");
    assert_eq!(mails.len(), 1);
    assert!(mails[0].body.contains("Rechtschreibung korrigiert"));
}

#[actix_web::test]
async fn export_contains_own_protocols_and_reminders() {
    let context = Context::new().await;
    let app = test_app!(context);
    let author = context.approved_user("Autor", "autor@example.org", "passwort1").await;
    let session = context.session_for(author).await;
    let examiners = examiners_in(&context, "Saarland").await;

    for content in ["Erstes Protokoll", "Zweites Protokoll"] {
        test::call_service(
            &app,
            post_form("/protocols/new", Some(&session), &protocol(&examiners, "Saarland", content)).to_request(),
        )
        .await;
    }
    context
        .data
        .lock()
        .await
        .create_reminder(author, parse_date("2026-09-01").expect("date"), storage::now() + Duration::hours(48))
        .expect("reminder");

    let response = test::call_service(&app, get("/profile/export", Some(&session)).to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=protokolldb_export_"));

    let export: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(export["protokolle"].as_array().map(Vec::len), Some(2));
    assert_eq!(export["erinnerungen"].as_array().map(Vec::len), Some(1));
    assert_eq!(export["benutzer_daten"]["email"], "autor@example.org");
}

#[actix_web::test]
async fn approval_without_verification_keeps_login_rejected() {
    let context = Context::new().await;
    let app = test_app!(context);

    test::call_service(
        &app,
        post_form(
            "/register",
            None,
            &[("name", "Jonas"), ("email", "jonas@example.org"), ("password", "sicher123"), ("training_year", "2")],
        )
        .to_request(),
    )
    .await;
    let user_id = context.data.lock().await.find_user_by_email("jonas@example.org").expect("lookup").expect("user").id;
    let admin = context.session_for(context.admin_id).await;
    test::call_service(
        &app,
        post_form(&format!("/admin/users/{}/approve", user_id), Some(&admin), &[]).to_request(),
    )
    .await;
    assert!(context.data.lock().await.get_user(user_id).expect("get").expect("user").is_approved);

    let response = test::call_service(
        &app,
        post_form("/login", None, &[("email", "jonas@example.org"), ("password", "sicher123")]).to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookie(&response, SESSION_COOKIE).is_none());
    let body = String::from_utf8_lossy(&test::read_body(response).await).to_string();
    assert!(body.contains("Bitte verifizieren Sie zuerst Ihre E-Mail-Adresse."));
}

#[actix_web::test]
async fn log_pages_past_the_end_show_the_last_page() {
    let context = Context::new().await;
    let app = test_app!(context);
    let admin = context.session_for(context.admin_id).await;

    let response = test::call_service(&app, get("/admin/logs?page=9223372036854775807", Some(&admin)).to_request()).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_web::test]
async fn the_only_active_admin_cannot_delete_their_profile() {
    let context = Context::new().await;
    let app = test_app!(context);
    let suspended = context.approved_user("Gesperrt", "gesperrt@example.org", "passwort1").await;
    {
        let mut database = context.data.lock().await;
        database.set_admin(suspended, true).expect("promote");
        database.set_approved(suspended, false).expect("suspend");
    }
    let admin = context.session_for(context.admin_id).await;

    let response = test::call_service(
        &app,
        post_form("/profile/delete", Some(&admin), &[("password", ADMIN_PASSWORD), ("confirmation", "LÖSCHEN")])
            .to_request(),
    )
    .await;

    assert!(cookie(&response, SESSION_COOKIE).is_none());
    let body = String::from_utf8_lossy(&test::read_body(response).await).to_string();
    assert!(body.contains("Sie sind der einzige Administrator."));
    assert!(context.data.lock().await.get_user(context.admin_id).expect("get").is_some());
}

#[actix_web::test]
async fn admin_pages_render_for_admins() {
    let context = Context::new().await;
    let app = test_app!(context);
    let author = context.approved_user("Autor", "autor@example.org", "passwort1").await;
    let session = context.session_for(author).await;
    let admin = context.session_for(context.admin_id).await;
    let examiners = examiners_in(&context, "Hamburg").await;
    test::call_service(
        &app,
        post_form("/protocols/new", Some(&session), &protocol(&examiners, "Hamburg", "Inhalt")).to_request(),
    )
    .await;
    let id = context.data.lock().await.latest_protocols(1).expect("latest")[0].id;

    for uri in [
        "/admin".to_string(),
        "/admin/users".to_string(),
        format!("/admin/users/{}", author),
        "/admin/examiners".to_string(),
        "/admin/protocols".to_string(),
        format!("/admin/protocols/{}", id),
        "/admin/logs".to_string(),
    ] {
        let response = test::call_service(&app, get(&uri, Some(&admin)).to_request()).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }
}
