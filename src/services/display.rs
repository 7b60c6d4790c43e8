use std::sync::Arc;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use tokio::sync::Mutex;

use crate::{
    error::AppError,
    require_login,
    storage::database::Database,
    structs::configuration::Configuration,
    views::{self, pages::DashboardView},
};

use super::common::{read_session, render};

#[get("/info")]
pub async fn info() -> impl Responder {
    let banner = "
     ____            _        _          _ _ ____  ____
    |  _ \\ _ __ ___ | |_ ___ | | _____ | | |  _ \\| __ )
    | |_) | '__/ _ \\| __/ _ \\| |/ / _ \\| | | | | |  _ \\
    |  __/| | | (_) | || (_) |   < (_) | | | |_| | |_) |
    |_|   |_|  \\___/ \\__\\___/|_|\\_\\___/|_|_|____/|____/

    Protokollsammlung Urologie Facharztprüfung";

    HttpResponse::Ok().body(format!("{}\n    v{}", banner, env!("CARGO_PKG_VERSION")))
}

#[get("/")]
pub async fn home(request: HttpRequest, configuration: web::Data<Configuration>) -> impl Responder {
    let session = read_session(&request, &configuration.encryption.token_encryption_secret);
    render(&request, session.as_ref(), "Start", vec![], views::pages::index(session.is_some()))
}

#[get("/privacy")]
pub async fn privacy(request: HttpRequest, configuration: web::Data<Configuration>) -> impl Responder {
    let session = read_session(&request, &configuration.encryption.token_encryption_secret);
    render(&request, session.as_ref(), "Datenschutz", vec![], views::pages::privacy())
}

#[get("/imprint")]
pub async fn imprint(request: HttpRequest, configuration: web::Data<Configuration>) -> impl Responder {
    let session = read_session(&request, &configuration.encryption.token_encryption_secret);
    render(&request, session.as_ref(), "Impressum", vec![], views::pages::imprint())
}

#[get("/dashboard")]
pub async fn dashboard(
    request: HttpRequest,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_login!(request, configuration);

    let database = data.lock().await;
    let own_protocols = database.count_user_protocols(session.user_id)?;
    let total_protocols = database.count_protocols()?;
    let total_examiners = database.count_examiners()?;
    let latest = database.latest_protocols(5)?;
    drop(database);

    let content = views::pages::dashboard(&DashboardView {
        name: &session.name,
        own_protocols,
        total_protocols,
        total_examiners,
        latest: &latest,
    });

    Ok(render(&request, Some(&session), "Dashboard", vec![], content))
}
