use std::collections::BTreeMap;

use actix_web::{
    cookie::{Cookie, SameSite},
    http::header::{self, ContentType},
    HttpRequest, HttpResponse,
};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, rngs::OsRng, thread_rng, Rng};
use regex::Regex;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::{
    error::AppError,
    mail::{templates::Notification, Mailer},
    storage::users::User,
    structs::{
        configuration::Encryption,
        session::{Flash, Session},
    },
    views,
};

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").unwrap_or_else(|_| unreachable!("static pattern is valid"))
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Parses a training year in 1..=6.
pub fn parse_training_year(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|year| (1..=6).contains(year))
}

pub fn generate_verification_token() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
}

fn token_key(secret: &str) -> Result<Hmac<Sha256>, AppError> {
    Hmac::new_from_slice(secret.as_bytes()).map_err(|err| AppError::Session(format!("Failed to create HMAC!: {:?}", err)))
}

pub fn create_session_token(user: &User, secret: &str, lifetime_hours: u64) -> Result<String, AppError> {
    let key = token_key(secret)?;
    let expiry = Utc::now().timestamp() + (lifetime_hours as i64) * 3600;

    let mut claims = BTreeMap::new();
    claims.insert("sub".to_string(), user.id.to_string());
    claims.insert("name".to_string(), user.name.clone());
    claims.insert("admin".to_string(), user.is_admin.to_string());
    claims.insert("exp".to_string(), expiry.to_string());

    claims
        .sign_with_key(&key)
        .map_err(|err| AppError::Session(format!("Failed to sign session: {:?}", err)))
}

/// Decodes and checks a session token. Anything malformed, forged or expired
/// yields `None`.
pub fn verify_session_token(token: &str, secret: &str) -> Option<Session> {
    let key = token_key(secret).ok()?;

    let claims: BTreeMap<String, String> = match token.verify_with_key(&key) {
        Ok(claims) => claims,
        Err(err) => {
            debug!("Rejected session token: {:?}", err);
            return None;
        }
    };

    let expiry = claims.get("exp")?.parse::<i64>().ok()?;
    if Utc::now().timestamp() > expiry {
        return None;
    }

    Some(Session {
        user_id: claims.get("sub")?.parse::<i64>().ok()?,
        name: claims.get("name")?.clone(),
        is_admin: claims.get("admin").map(|admin| admin == "true").unwrap_or(false),
    })
}

pub fn read_session(request: &HttpRequest, secret: &str) -> Option<Session> {
    let cookie = request.cookie(SESSION_COOKIE)?;
    verify_session_token(cookie.value(), secret)
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").finish();
    cookie.make_removal();
    cookie
}

pub fn clear_session_cookie() -> Cookie<'static> {
    removal_cookie(SESSION_COOKIE)
}

pub fn hash_password(password: &str, settings: &Encryption) -> Result<String, AppError> {
    let params = Params::new(settings.password_memory_kib, settings.password_iterations, 1, None)
        .map_err(|err| AppError::Password(err.to_string()))?;
    let salt = SaltString::generate(&mut OsRng);

    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Password(err.to_string()))
}

/// The parameters are taken from the stored hash, so hashes created with
/// other settings keep verifying.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

/// Flash messages stored by the previous response.
pub fn pending_flashes(request: &HttpRequest) -> Vec<Flash> {
    request
        .cookie(FLASH_COOKIE)
        .and_then(|cookie| URL_SAFE_NO_PAD.decode(cookie.value()).ok())
        .and_then(|raw| serde_json::from_slice::<Vec<Flash>>(&raw).ok())
        .unwrap_or_default()
}

fn flash_cookie(flashes: &[Flash]) -> Option<Cookie<'static>> {
    let raw = serde_json::to_vec(flashes).ok()?;
    Some(
        Cookie::build(FLASH_COOKIE, URL_SAFE_NO_PAD.encode(raw))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish(),
    )
}

/// 303 redirect that carries `flashes`, plus any not yet shown, to the next page.
pub fn redirect(request: &HttpRequest, location: &str, flashes: Vec<Flash>) -> HttpResponse {
    let mut all = pending_flashes(request);
    all.extend(flashes);

    let mut response = HttpResponse::SeeOther();
    response.insert_header((header::LOCATION, location));
    if !all.is_empty() {
        if let Some(cookie) = flash_cookie(&all) {
            response.cookie(cookie);
        }
    }
    response.finish()
}

/// Renders `content` inside the page layout together with pending and
/// given flash messages. The flash cookie is cleared once shown.
pub fn render(request: &HttpRequest, session: Option<&Session>, title: &str, flashes: Vec<Flash>, content: String) -> HttpResponse {
    let mut all = pending_flashes(request);
    all.extend(flashes);

    let mut response = HttpResponse::Ok();
    response.content_type(ContentType::html());
    if request.cookie(FLASH_COOKIE).is_some() {
        response.cookie(removal_cookie(FLASH_COOKIE));
    }
    response.body(views::layout(title, session, &all, &content))
}

/// Sends a notification. Failures are logged and reported as `false`, the
/// caller keeps its data change either way.
pub async fn notify(mailer: &dyn Mailer, to: &str, notification: &Notification) -> bool {
    match mailer.send(to, &notification.subject, &notification.body).await {
        Ok(_) => true,
        Err(err) => {
            warn!("Failed to send \"{}\" to {}: {}", notification.subject, to, err);
            false
        }
    }
}

/// Requires a valid session cookie. Evaluates to the `Session`, otherwise
/// returns a redirect to the login page from the enclosing handler.
#[macro_export]
macro_rules! require_login {
    ($request:expr, $configuration:expr) => {
        match $crate::services::common::read_session(&$request, &$configuration.encryption.token_encryption_secret) {
            Some(session) => session,
            None => {
                return Ok($crate::services::common::redirect(&$request, "/login", vec![]));
            }
        }
    };
}

/// Like `require_login!` but also re-reads the admin flag from the database,
/// so a demotion applies from the next request on.
#[macro_export]
macro_rules! require_admin {
    ($request:expr, $data:expr, $configuration:expr) => {{
        let session = $crate::require_login!($request, $configuration);
        let is_admin = $data.lock().await.is_admin(session.user_id)?;
        if !is_admin {
            return Ok($crate::services::common::redirect(
                &$request,
                "/dashboard",
                vec![$crate::structs::session::Flash::error("Keine Berechtigung für diese Seite.")],
            ));
        }
        session
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_admin: bool) -> User {
        User {
            id: 7,
            name: "Anna".to_string(),
            email: "anna@example.org".to_string(),
            password_hash: String::new(),
            training_year: 4,
            is_verified: true,
            is_approved: true,
            is_admin,
            verification_token: None,
            created_at: "2026-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn session_token_round_trips_claims() {
        let token = create_session_token(&user(true), "secret", 1).expect("token");
        let session = verify_session_token(&token, "secret").expect("session");

        assert_eq!(session, Session { user_id: 7, name: "Anna".to_string(), is_admin: true });
    }

    #[test]
    fn foreign_and_expired_tokens_are_rejected() {
        let token = create_session_token(&user(false), "secret", 1).expect("token");
        assert!(verify_session_token(&token, "other secret").is_none());

        let expired = create_session_token(&user(false), "secret", 0).expect("token");
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(verify_session_token(&expired, "secret").is_none());
    }

    #[test]
    fn passwords_verify_against_their_hash() {
        let settings = Encryption {
            token_encryption_secret: "secret".to_string(),
            password_memory_kib: 1024,
            password_iterations: 1,
        };
        let hash = hash_password("geheim123", &settings).expect("hash");

        assert!(verify_password("geheim123", &hash));
        assert!(!verify_password("falsch", &hash));
        assert!(!verify_password("geheim123", "not a hash"));
    }

    #[test]
    fn email_and_year_validation() {
        assert!(is_valid_email("a.b-c@uni-klinik.de"));
        assert!(!is_valid_email("no-at-sign.de"));
        assert!(!is_valid_email("a@b"));
        assert_eq!(parse_training_year(" 3 "), Some(3));
        assert_eq!(parse_training_year("7"), None);
        assert_eq!(parse_training_year("zwei"), None);
    }

    #[test]
    fn verification_tokens_are_32_alphanumerics() {
        let token = generate_verification_token();

        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
