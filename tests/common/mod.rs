#![allow(dead_code)]

use std::sync::Arc;

use actix_web::{
    cookie::Cookie,
    dev::ServiceResponse,
    http::header,
    test::TestRequest,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use tokio::sync::Mutex;

use protokolldb::{
    mail::RecordingMailer,
    services::common::{create_session_token, hash_password, FLASH_COOKIE, SESSION_COOKIE},
    storage::database::Database,
    structs::{configuration::Configuration, session::Flash},
};

pub const ADMIN_EMAIL: &str = "admin@example.org";
pub const ADMIN_PASSWORD: &str = "admin-passwort";

/// Shared state of one test application.
pub struct Context {
    pub data: Arc<Mutex<Database>>,
    pub configuration: Configuration,
    pub mailer: Arc<RecordingMailer>,
    pub admin_id: i64,
}

impl Context {
    pub async fn new() -> Context {
        let mut configuration = Configuration::default();
        configuration.encryption.password_memory_kib = 1024;
        configuration.encryption.password_iterations = 1;
        configuration.api.public_url = "http://protokolldb.test".to_string();

        let mut database = Database::in_memory().expect("database");
        let hash = hash_password(ADMIN_PASSWORD, &configuration.encryption).expect("hash");
        database.bootstrap("Admin", ADMIN_EMAIL, &hash).expect("bootstrap");
        let admin_id = database.find_user_by_email(ADMIN_EMAIL).expect("lookup").expect("admin").id;

        Context {
            data: Arc::new(Mutex::new(database)),
            configuration,
            mailer: Arc::new(RecordingMailer::new()),
            admin_id,
        }
    }

    /// Inserts a verified and approved account.
    pub async fn approved_user(&self, name: &str, email: &str, password: &str) -> i64 {
        let hash = hash_password(password, &self.configuration.encryption).expect("hash");
        let mut database = self.data.lock().await;
        let token = format!("token-{}", email);
        let id = database.create_user(name, email, &hash, 4, &token).expect("create user");
        database.consume_verification_token(&token).expect("verify");
        database.set_approved(id, true).expect("approve");
        id
    }

    pub async fn examiner(&self, name: &str, region: &str) -> i64 {
        self.data.lock().await.create_examiner(name, region).expect("examiner")
    }

    pub async fn session_for(&self, user_id: i64) -> Cookie<'static> {
        let user = self.data.lock().await.get_user(user_id).expect("get user").expect("user exists");
        let token = create_session_token(&user, &self.configuration.encryption.token_encryption_secret, 1).expect("token");
        Cookie::new(SESSION_COOKIE, token)
    }
}

// Builds the application the same way the binary does, backed by `$context`.
macro_rules! test_app {
    ($context:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($context.data.clone()))
                .app_data(actix_web::web::Data::new($context.configuration.clone()))
                .app_data(actix_web::web::Data::<dyn protokolldb::mail::Mailer>::from(
                    $context.mailer.clone() as std::sync::Arc<dyn protokolldb::mail::Mailer>,
                ))
                .configure(protokolldb::services::configure),
        )
        .await
    };
}

pub fn get(uri: &str, session: Option<&Cookie<'static>>) -> TestRequest {
    let request = TestRequest::get().uri(uri);
    match session {
        Some(cookie) => request.cookie(cookie.clone()),
        None => request,
    }
}

pub fn post_form(uri: &str, session: Option<&Cookie<'static>>, form: &[(&str, &str)]) -> TestRequest {
    let request = TestRequest::post().uri(uri).set_form(form);
    match session {
        Some(cookie) => request.cookie(cookie.clone()),
        None => request,
    }
}

pub fn location<B>(response: &ServiceResponse<B>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn cookie<B>(response: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
    response.response().cookies().find(|cookie| cookie.name() == name).map(|cookie| cookie.into_owned())
}

/// Messages a redirect carries to the next page.
pub fn flashes<B>(response: &ServiceResponse<B>) -> Vec<String> {
    cookie(response, FLASH_COOKIE)
        .and_then(|cookie| URL_SAFE_NO_PAD.decode(cookie.value()).ok())
        .and_then(|raw| serde_json::from_slice::<Vec<Flash>>(&raw).ok())
        .unwrap_or_default()
        .into_iter()
        .map(|flash| flash.message)
        .collect()
}
