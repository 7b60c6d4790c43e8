use std::sync::Arc;

use actix_web::{
    get,
    http::header::{self, ContentType},
    post, web, HttpRequest, HttpResponse,
};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    error::AppError,
    mail::{templates, Mailer},
    require_login,
    storage::database::Database,
    structs::{
        configuration::Configuration,
        get_outputs::{ExportInfo, ExportedProtocol, ExportedReminder, ExportedUser, ProfileExport},
        post_inputs::{DeleteProfileForm, LoginForm, ProfileForm, RegisterForm},
        session::{Flash, Session},
    },
    views::{self, pages::ProfileView},
};

use super::common::{
    clear_session_cookie, create_session_token, generate_verification_token, hash_password, is_valid_email,
    notify, parse_training_year, read_session, redirect, render, session_cookie, verify_password,
};

pub const DELETE_CONFIRMATION: &str = "LÖSCHEN";

fn trimmed(field: &Option<String>) -> &str {
    field.as_deref().map(str::trim).unwrap_or_default()
}

/// Sends the visitor back to the start page without a session, for sessions
/// whose account no longer exists.
fn account_gone(request: &HttpRequest) -> Result<HttpResponse, AppError> {
    let mut response = redirect(request, "/", vec![Flash::error("Benutzer nicht gefunden.")]);
    response
        .add_cookie(&clear_session_cookie())
        .map_err(|err| AppError::Session(err.to_string()))?;
    Ok(response)
}

fn with_session_cookie(mut response: HttpResponse, token: String) -> Result<HttpResponse, AppError> {
    response
        .add_cookie(&session_cookie(token))
        .map_err(|err| AppError::Session(err.to_string()))?;
    Ok(response)
}

#[get("/register")]
pub async fn register_page(request: HttpRequest) -> HttpResponse {
    render(&request, None, "Registrierung", vec![], views::pages::register(&RegisterForm::default()))
}

#[post("/register")]
pub async fn register(
    request: HttpRequest,
    form: web::Form<RegisterForm>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let name = trimmed(&form.name).to_string();
    let email = trimmed(&form.email).to_lowercase();
    let password = form.password.clone().unwrap_or_default();

    let rejected = |message: &str| render(&request, None, "Registrierung", vec![Flash::error(message)], views::pages::register(&form));

    if name.is_empty() || email.is_empty() || password.is_empty() || trimmed(&form.training_year).is_empty() {
        return Ok(rejected("Alle Felder sind erforderlich."));
    }
    if !is_valid_email(&email) {
        return Ok(rejected("Ungültige E-Mail-Adresse."));
    }
    let training_year = match parse_training_year(trimmed(&form.training_year)) {
        Some(year) => year,
        None => return Ok(rejected("Ausbildungsjahr muss zwischen 1 und 6 liegen.")),
    };

    let password_hash = hash_password(&password, &configuration.encryption)?;
    let token = generate_verification_token();

    let mut database = data.lock().await;
    if database.email_taken(&email, None)? {
        drop(database);
        return Ok(rejected("E-Mail-Adresse bereits registriert."));
    }
    let user_id = database.create_user(&name, &email, &password_hash, training_year, &token)?;
    drop(database);
    info!("Registered user {} ({})", user_id, email);

    let notification = templates::verification(&name, &configuration.link(&format!("/verify/{}", token)));
    let flash = if notify(mailer.get_ref(), &email, &notification).await {
        Flash::success("Registrierung erfolgreich! Bitte prüfen Sie Ihre E-Mails zur Verifizierung.")
    } else {
        Flash::warning("Registrierung erfolgreich, aber E-Mail konnte nicht gesendet werden.")
    };

    Ok(redirect(&request, "/login", vec![flash]))
}

#[get("/verify/{token}")]
pub async fn verify(
    request: HttpRequest,
    token: web::Path<String>,
    data: web::Data<Arc<Mutex<Database>>>,
) -> Result<HttpResponse, AppError> {
    let verified = data.lock().await.consume_verification_token(&token)?;

    let flash = match verified {
        Some(name) => {
            info!("{} verified their email address", name);
            Flash::success("E-Mail erfolgreich verifiziert! Ihr Account wird nun von einem Administrator geprüft.")
        }
        None => Flash::error("Ungültiger oder bereits verwendeter Verifizierungslink."),
    };

    Ok(redirect(&request, "/login", vec![flash]))
}

#[get("/login")]
pub async fn login_page(request: HttpRequest, configuration: web::Data<Configuration>) -> HttpResponse {
    if read_session(&request, &configuration.encryption.token_encryption_secret).is_some() {
        return redirect(&request, "/dashboard", vec![]);
    }
    render(&request, None, "Anmelden", vec![], views::pages::login(""))
}

#[post("/login")]
pub async fn login(
    request: HttpRequest,
    form: web::Form<LoginForm>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let email = trimmed(&form.email).to_lowercase();
    let password = form.password.as_deref().unwrap_or_default();

    let rejected = |message: &str| render(&request, None, "Anmelden", vec![Flash::error(message)], views::pages::login(&email));

    if email.is_empty() || password.is_empty() {
        return Ok(rejected("E-Mail und Passwort sind erforderlich."));
    }

    let user = match data.lock().await.find_user_by_email(&email)? {
        Some(user) if verify_password(password, &user.password_hash) => user,
        _ => {
            info!("Failed login for {}", email);
            return Ok(rejected("Ungültige Anmeldedaten."));
        }
    };

    if !user.is_verified {
        return Ok(rejected("Bitte verifizieren Sie zuerst Ihre E-Mail-Adresse."));
    }
    if !user.is_approved {
        return Ok(rejected("Ihr Account wurde noch nicht von einem Administrator freigeschaltet."));
    }

    let token = create_session_token(
        &user,
        &configuration.encryption.token_encryption_secret,
        configuration.api.session_lifetime_hours,
    )?;
    let welcome = Flash::success(format!("Willkommen zurück, {}!", user.name));

    with_session_cookie(redirect(&request, "/dashboard", vec![welcome]), token)
}

#[get("/logout")]
pub async fn logout(request: HttpRequest) -> Result<HttpResponse, AppError> {
    let mut response = redirect(&request, "/", vec![Flash::info("Sie wurden erfolgreich abgemeldet.")]);
    response
        .add_cookie(&clear_session_cookie())
        .map_err(|err| AppError::Session(err.to_string()))?;
    Ok(response)
}

#[get("/profile")]
pub async fn profile(
    request: HttpRequest,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_login!(request, configuration);

    let database = data.lock().await;
    let user = match database.get_user(session.user_id)? {
        Some(user) => user,
        None => return account_gone(&request),
    };
    let protocol_count = database.count_user_protocols(user.id)?;
    let protocols = database.protocols_of_user(user.id, 5)?;
    let reminders = database.reminders_of_user(user.id)?;
    drop(database);

    let content = views::pages::profile(&ProfileView {
        user: &user,
        protocol_count,
        protocols: &protocols,
        reminders: &reminders,
    });
    Ok(render(&request, Some(&session), "Mein Profil", vec![], content))
}

#[get("/profile/edit")]
pub async fn edit_profile_page(
    request: HttpRequest,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_login!(request, configuration);

    let user = match data.lock().await.get_user(session.user_id)? {
        Some(user) => user,
        None => return account_gone(&request),
    };

    let content = views::pages::edit_profile(&user.name, &user.email, &user.training_year.to_string());
    Ok(render(&request, Some(&session), "Profil bearbeiten", vec![], content))
}

#[post("/profile/edit")]
pub async fn edit_profile(
    request: HttpRequest,
    form: web::Form<ProfileForm>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_login!(request, configuration);

    let name = trimmed(&form.name);
    let email = trimmed(&form.email).to_lowercase();
    let raw_year = trimmed(&form.training_year);
    let new_password = trimmed(&form.new_password);
    let confirmation = trimmed(&form.password_confirmation);
    let current_password = trimmed(&form.current_password);

    let mut database = data.lock().await;
    let user = match database.get_user(session.user_id)? {
        Some(user) => user,
        None => return account_gone(&request),
    };

    let mut errors = vec![];
    if name.is_empty() {
        errors.push("Name ist erforderlich.".to_string());
    } else if name.chars().count() < 2 {
        errors.push("Name muss mindestens 2 Zeichen lang sein.".to_string());
    }

    if email.is_empty() {
        errors.push("E-Mail ist erforderlich.".to_string());
    } else if !is_valid_email(&email) {
        errors.push("Ungültige E-Mail-Adresse.".to_string());
    } else if database.email_taken(&email, Some(user.id))? {
        errors.push("Diese E-Mail-Adresse wird bereits verwendet.".to_string());
    }

    let training_year = parse_training_year(raw_year);
    if raw_year.is_empty() {
        errors.push("Ausbildungsjahr ist erforderlich.".to_string());
    } else if training_year.is_none() {
        errors.push("Ausbildungsjahr muss zwischen 1 und 6 liegen.".to_string());
    }

    if !new_password.is_empty() {
        if new_password.chars().count() < 6 {
            errors.push("Neues Passwort muss mindestens 6 Zeichen lang sein.".to_string());
        } else if new_password != confirmation {
            errors.push("Passwort-Bestätigung stimmt nicht überein.".to_string());
        }

        if current_password.is_empty() {
            errors.push("Aktuelles Passwort ist erforderlich um das Passwort zu ändern.".to_string());
        } else if !verify_password(current_password, &user.password_hash) {
            errors.push("Aktuelles Passwort ist falsch.".to_string());
        }
    }

    let training_year = match training_year {
        Some(year) if errors.is_empty() => year,
        _ => {
            drop(database);
            let content = views::pages::edit_profile(name, &email, raw_year);
            return Ok(render(&request, Some(&session), "Profil bearbeiten", Flash::errors(errors), content));
        }
    };

    let password_hash = if new_password.is_empty() {
        None
    } else {
        Some(hash_password(new_password, &configuration.encryption)?)
    };
    database.update_profile(user.id, name, &email, training_year, password_hash.as_deref())?;
    let updated = database.get_user(user.id)?;
    drop(database);

    let flash = if password_hash.is_some() {
        Flash::success("Profil und Passwort erfolgreich aktualisiert!")
    } else {
        Flash::success("Profil erfolgreich aktualisiert!")
    };
    let response = redirect(&request, "/profile", vec![flash]);

    match updated {
        Some(updated) => {
            let token = create_session_token(
                &updated,
                &configuration.encryption.token_encryption_secret,
                configuration.api.session_lifetime_hours,
            )?;
            with_session_cookie(response, token)
        }
        None => account_gone(&request),
    }
}

#[get("/profile/delete")]
pub async fn delete_profile_page(request: HttpRequest, configuration: web::Data<Configuration>) -> Result<HttpResponse, AppError> {
    let session = require_login!(request, configuration);
    Ok(render(&request, Some(&session), "Profil löschen", vec![], views::pages::delete_profile()))
}

#[post("/profile/delete")]
pub async fn delete_profile(
    request: HttpRequest,
    form: web::Form<DeleteProfileForm>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_login!(request, configuration);
    let rejected = |session: &Session, message: &str| {
        render(&request, Some(session), "Profil löschen", vec![Flash::error(message)], views::pages::delete_profile())
    };

    let password = trimmed(&form.password);
    if password.is_empty() {
        return Ok(rejected(&session, "Passwort ist erforderlich."));
    }
    if trimmed(&form.confirmation) != DELETE_CONFIRMATION {
        return Ok(rejected(&session, "Bitte geben Sie \"LÖSCHEN\" zur Bestätigung ein."));
    }

    let mut database = data.lock().await;
    let user = match database.get_user(session.user_id)? {
        Some(user) => user,
        None => return account_gone(&request),
    };
    if !verify_password(password, &user.password_hash) {
        return Ok(rejected(&session, "Falsches Passwort."));
    }
    if user.is_admin && database.other_active_admins(user.id)? == 0 {
        return Ok(rejected(
            &session,
            "Sie sind der einzige Administrator. Ernennen Sie zuerst einen weiteren Administrator.",
        ));
    }

    database.delete_user_cascade(user.id)?;
    drop(database);
    info!("User {} deleted their profile", user.id);

    let mut response = redirect(
        &request,
        "/",
        vec![Flash::info(format!("Profil von {} wurde erfolgreich gelöscht.", user.name))],
    );
    response
        .add_cookie(&clear_session_cookie())
        .map_err(|err| AppError::Session(err.to_string()))?;
    Ok(response)
}

#[get("/profile/export")]
pub async fn export_profile(
    request: HttpRequest,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_login!(request, configuration);

    let database = data.lock().await;
    let user = match database.get_user(session.user_id)? {
        Some(user) => user,
        None => return Err(AppError::NotFound("Benutzer nicht gefunden.".to_string())),
    };
    let protocols = database.protocols_of_user(user.id, -1)?;
    let reminders = database.reminders_of_user(user.id)?;
    drop(database);

    let now = Utc::now();
    let export = ProfileExport {
        export_info: ExportInfo {
            datum: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            typ: "DSGVO-konformer Datenexport".to_string(),
            benutzer_id: user.id,
        },
        benutzer_daten: ExportedUser::from(&user),
        protokolle: protocols.into_iter().map(ExportedProtocol::from).collect(),
        erinnerungen: reminders.into_iter().map(ExportedReminder::from).collect(),
    };

    let filename = format!("protokolldb_export_{}.json", now.format("%Y%m%d_%H%M%S"));
    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .insert_header((header::CONTENT_DISPOSITION, format!("attachment; filename={}", filename)))
        .body(serde_json::to_string_pretty(&export)?))
}
