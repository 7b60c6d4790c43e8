use std::sync::Arc;

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::Duration;
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    error::AppError,
    require_login,
    storage::{self, database::Database},
    structs::{
        configuration::Configuration,
        get_inputs::Search,
        get_outputs::ExaminerOption,
        post_inputs::{ProtocolForm, ReminderForm},
        session::Flash,
        submitted_protocol::SubmittedProtocol,
    },
    views,
};

use super::common::{redirect, render};

/// Form validation plus the existence check of the three examiners. The
/// inner `Err` carries messages for the user.
pub(crate) fn validate_protocol(
    database: &Database,
    form: &ProtocolForm,
    min_content_chars: usize,
) -> Result<Result<SubmittedProtocol, Vec<String>>, AppError> {
    let protocol = match SubmittedProtocol::validate(form, min_content_chars) {
        Ok(protocol) => protocol,
        Err(errors) => return Ok(Err(errors)),
    };

    let mut errors = vec![];
    for id in protocol.examiner_ids {
        if !database.examiner_exists(id)? {
            errors.push(format!("Prüfer mit ID {} existiert nicht.", id));
        }
    }

    Ok(if errors.is_empty() { Ok(protocol) } else { Err(errors) })
}

#[get("/protocols")]
pub async fn list_protocols(
    request: HttpRequest,
    search: web::Query<Search>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_login!(request, configuration);

    let protocols = data.lock().await.list_protocols(&search, false)?;

    Ok(render(&request, Some(&session), "Protokolle", vec![], views::pages::protocols(&search, &protocols)))
}

#[get("/protocols/new")]
pub async fn new_protocol_page(
    request: HttpRequest,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_login!(request, configuration);

    let examiners = data.lock().await.list_examiners()?;

    let content = views::pages::new_protocol(&ProtocolForm::default(), &examiners);
    Ok(render(&request, Some(&session), "Neues Protokoll", vec![], content))
}

#[post("/protocols/new")]
pub async fn submit_protocol(
    request: HttpRequest,
    form: web::Form<ProtocolForm>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_login!(request, configuration);

    let mut database = data.lock().await;
    let protocol = match validate_protocol(&database, &form, 1)? {
        Ok(protocol) => protocol,
        Err(errors) => {
            let examiners = database.list_examiners()?;
            drop(database);
            let content = views::pages::new_protocol(&form, &examiners);
            return Ok(render(&request, Some(&session), "Neues Protokoll", Flash::errors(errors), content));
        }
    };

    let id = database.create_protocol(session.user_id, &protocol)?;
    drop(database);
    info!("User {} created protocol {}", session.user_id, id);

    Ok(redirect(&request, "/protocols", vec![Flash::success("Protokoll erfolgreich erstellt!")]))
}

/// Examiners of one region for the dependent select boxes.
#[get("/api/v1/examiners/{region}")]
pub async fn examiners_of_region(
    request: HttpRequest,
    region: web::Path<String>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    require_login!(request, configuration);

    let examiners = data.lock().await.examiners_in_region(&region)?;
    let options: Vec<ExaminerOption> = examiners.into_iter().map(ExaminerOption::from).collect();

    Ok(HttpResponse::Ok().json(options))
}

#[post("/reminders")]
pub async fn create_reminder(
    request: HttpRequest,
    form: web::Form<ReminderForm>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_login!(request, configuration);

    let exam_date = match form.exam_date.as_deref().and_then(storage::parse_date) {
        Some(date) => date,
        None => {
            return Ok(redirect(&request, "/dashboard", vec![Flash::error("Prüfungsdatum ist erforderlich.")]));
        }
    };

    let delay_hours = configuration.reminders.first_reminder_after_hours;
    let first_reminder = storage::now() + Duration::hours(delay_hours);
    let id = data.lock().await.create_reminder(session.user_id, exam_date, first_reminder)?;
    info!("User {} created reminder {} for {}", session.user_id, id, exam_date);

    let delay = if delay_hours % 24 == 0 {
        format!("{} Tagen", delay_hours / 24)
    } else {
        format!("{} Stunden", delay_hours)
    };
    Ok(redirect(
        &request,
        "/dashboard",
        vec![Flash::success(format!("Erinnerung wurde eingerichtet. Sie erhalten in {} eine E-Mail.", delay))],
    ))
}
