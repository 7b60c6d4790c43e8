use std::sync::Arc;

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    error::AppError,
    mail::{templates, Mailer},
    require_admin,
    storage::{
        admin_log::{AdminAction, PROTOCOL_TARGET},
        database::Database,
        examiners::ExaminerDeletion,
        protocols::ProtocolDetails,
        users::{BulkOutcome, UserQuery, UserStatusFilter},
    },
    structs::{
        configuration::Configuration,
        get_inputs::{is_descending, Page, Search, UserSearch},
        post_inputs::{ActionForm, BulkAction, BulkForm, ExaminerForm, ProtocolForm},
        region::Region,
        session::Flash,
    },
    views::{
        self,
        admin::{AdminDashboardView, ProtocolListView, UserDetailsView, UserListView},
    },
};

use super::{
    common::{notify, redirect, render},
    protocol::validate_protocol,
};

pub const LOGS_PER_PAGE: i64 = 50;
const ADMIN_EDIT_MIN_CONTENT: usize = 10;

fn optional(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

/// Success message depending on whether the notification went out.
fn notified(delivered: bool, done: String) -> Flash {
    if delivered {
        Flash::success(format!("{} und per E-Mail benachrichtigt.", done))
    } else {
        Flash::warning(format!("{}, aber E-Mail-Benachrichtigung fehlgeschlagen.", done))
    }
}

#[get("/admin")]
pub async fn dashboard(
    request: HttpRequest,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_admin!(request, data, configuration);

    let database = data.lock().await;
    let pending = database.pending_users(5)?;
    let counts = database.user_counts()?;
    let total_protocols = database.count_protocols()?;
    let total_examiners = database.count_examiners()?;
    let latest = database.latest_protocols(10)?;
    drop(database);

    let content = views::admin::dashboard(&AdminDashboardView {
        pending: &pending,
        counts: &counts,
        total_protocols,
        total_examiners,
        latest: &latest,
    });
    Ok(render(&request, Some(&session), "Administration", vec![], content))
}

#[post("/admin/users/{id}/approve")]
pub async fn approve_user(
    request: HttpRequest,
    id: web::Path<i64>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, AppError> {
    require_admin!(request, data, configuration);
    let id = id.into_inner();

    let mut database = data.lock().await;
    let user = match database.get_user(id)? {
        Some(user) => user,
        None => return Ok(redirect(&request, "/admin", vec![Flash::error("Benutzer nicht gefunden.")])),
    };
    database.set_approved(id, true)?;
    drop(database);
    info!("Approved user {} ({})", id, user.email);

    let delivered = notify(mailer.get_ref(), &user.email, &templates::account_approved(&user.name, &configuration.link("/login"))).await;
    let flash = notified(delivered, format!("Benutzer {} wurde freigeschaltet", user.name));

    Ok(redirect(&request, "/admin", vec![flash]))
}

#[get("/admin/users")]
pub async fn user_list(
    request: HttpRequest,
    search: web::Query<UserSearch>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_admin!(request, data, configuration);
    let search = search.into_inner();

    let query = UserQuery {
        status: search.status.clone(),
        search: search.search.clone(),
        sort: search.sort.clone(),
        descending: is_descending(search.order.as_deref()),
    };

    let database = data.lock().await;
    let users = database.list_users(&query)?;
    let counts = database.user_counts()?;
    drop(database);

    let content = views::admin::users(&UserListView {
        users: &users,
        counts: &counts,
        status: UserStatusFilter::parse(search.status.as_deref()),
        search: search.search.as_deref().unwrap_or_default(),
        own_id: session.user_id,
    });
    Ok(render(&request, Some(&session), "Benutzerverwaltung", vec![], content))
}

#[get("/admin/users/{id}")]
pub async fn user_details(
    request: HttpRequest,
    id: web::Path<i64>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_admin!(request, data, configuration);
    let id = id.into_inner();

    let database = data.lock().await;
    let user = match database.get_user(id)? {
        Some(user) => user,
        None => return Ok(redirect(&request, "/admin/users", vec![Flash::error("Benutzer nicht gefunden.")])),
    };
    let protocol_count = database.count_user_protocols(id)?;
    let (first_protocol, last_protocol) = database.user_protocol_range(id)?;
    let protocols = database.protocols_of_user(id, 10)?;
    let reminders = database.reminders_of_user(id)?;
    let hashtags = database.user_top_hashtags(id, 10)?;
    drop(database);

    let content = views::admin::user_details(&UserDetailsView {
        user: &user,
        is_self: user.id == session.user_id,
        protocol_count,
        first_protocol: first_protocol.as_deref(),
        last_protocol: last_protocol.as_deref(),
        protocols: &protocols,
        reminders: &reminders,
        hashtags: &hashtags,
    });
    Ok(render(&request, Some(&session), &user.name, vec![], content))
}

#[post("/admin/users/{id}/admin-status")]
pub async fn change_admin_status(
    request: HttpRequest,
    id: web::Path<i64>,
    form: web::Form<ActionForm>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, AppError> {
    let session = require_admin!(request, data, configuration);
    let id = id.into_inner();
    let back = "/admin/users";

    if id == session.user_id {
        return Ok(redirect(&request, back, vec![Flash::error("Sie können Ihren eigenen Admin-Status nicht ändern.")]));
    }

    let mut database = data.lock().await;
    let user = match database.get_user(id)? {
        Some(user) => user,
        None => return Ok(redirect(&request, back, vec![Flash::error("Benutzer nicht gefunden.")])),
    };

    let notification = match optional(&form.action) {
        Some("promote") => {
            if user.is_admin {
                return Ok(redirect(&request, back, vec![Flash::warning(format!("{} ist bereits ein Administrator.", user.name))]));
            }
            if !user.is_approved {
                return Ok(redirect(
                    &request,
                    back,
                    vec![Flash::error("Benutzer muss erst freigeschaltet werden, bevor er zum Admin ernannt werden kann.")],
                ));
            }
            database.set_admin(id, true)?;
            info!("User {} promoted {} to admin", session.user_id, id);
            (
                templates::promoted(&user.name, &configuration.link("/admin")),
                format!("{} wurde erfolgreich zum Administrator ernannt", user.name),
            )
        }
        Some("demote") => {
            if !user.is_admin {
                return Ok(redirect(&request, back, vec![Flash::warning(format!("{} ist kein Administrator.", user.name))]));
            }
            if database.count_admins()? <= 1 {
                return Ok(redirect(
                    &request,
                    back,
                    vec![Flash::error(
                        "Sie können den letzten Administrator nicht degradieren. Es muss mindestens ein Administrator vorhanden sein.",
                    )],
                ));
            }
            database.set_admin(id, false)?;
            info!("User {} demoted {} from admin", session.user_id, id);
            (
                templates::demoted(&user.name, &configuration.link("/dashboard")),
                format!("Administrator-Status von {} wurde entfernt", user.name),
            )
        }
        _ => return Ok(redirect(&request, back, vec![Flash::error("Ungültige Aktion.")])),
    };
    drop(database);

    let (mail, done) = notification;
    let delivered = notify(mailer.get_ref(), &user.email, &mail).await;
    Ok(redirect(&request, back, vec![notified(delivered, done)]))
}

#[post("/admin/users/{id}/suspend")]
pub async fn suspend_user(
    request: HttpRequest,
    id: web::Path<i64>,
    form: web::Form<ActionForm>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, AppError> {
    let session = require_admin!(request, data, configuration);
    let id = id.into_inner();
    let back = "/admin/users";

    if id == session.user_id {
        return Ok(redirect(&request, back, vec![Flash::error("Sie können sich nicht selbst sperren.")]));
    }

    let mut database = data.lock().await;
    let user = match database.get_user(id)? {
        Some(user) => user,
        None => return Ok(redirect(&request, back, vec![Flash::error("Benutzer nicht gefunden.")])),
    };

    let (mail, done) = match optional(&form.action) {
        Some("suspend") => {
            if !user.is_approved {
                return Ok(redirect(&request, back, vec![Flash::warning(format!("{} ist bereits gesperrt.", user.name))]));
            }
            database.set_approved(id, false)?;
            info!("User {} suspended {}", session.user_id, id);
            (templates::suspended(&user.name, optional(&form.reason)), format!("{} wurde gesperrt", user.name))
        }
        Some("unsuspend") => {
            if user.is_approved {
                return Ok(redirect(&request, back, vec![Flash::warning(format!("{} ist nicht gesperrt.", user.name))]));
            }
            database.set_approved(id, true)?;
            info!("User {} reinstated {}", session.user_id, id);
            (templates::reinstated(&user.name, &configuration.link("/login")), format!("{} wurde entsperrt", user.name))
        }
        _ => return Ok(redirect(&request, back, vec![Flash::error("Ungültige Aktion.")])),
    };
    drop(database);

    let delivered = notify(mailer.get_ref(), &user.email, &mail).await;
    Ok(redirect(&request, back, vec![notified(delivered, done)]))
}

/// Applies one action to many users. The acting admin is always left out.
#[post("/admin/users/bulk")]
pub async fn bulk_action(
    request: HttpRequest,
    body: web::Bytes,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_admin!(request, data, configuration);
    let back = "/admin/users";
    let form = BulkForm::parse(&body);

    if form.user_ids.is_empty() {
        return Ok(redirect(&request, back, vec![Flash::error("Keine Benutzer ausgewählt.")]));
    }
    let ids: Vec<i64> = form.user_ids.into_iter().filter(|id| *id != session.user_id).collect();
    if ids.is_empty() {
        return Ok(redirect(
            &request,
            back,
            vec![Flash::error("Sie können keine Bulk-Aktionen auf sich selbst anwenden.")],
        ));
    }

    let action = match form.action.as_deref().and_then(BulkAction::parse) {
        Some(action) => action,
        None => return Ok(redirect(&request, back, vec![Flash::error("Ungültige Aktion ausgewählt.")])),
    };

    let mut database = data.lock().await;
    let outcome = match action {
        BulkAction::Approve => database.bulk_approve(&ids)?,
        BulkAction::Suspend => database.bulk_suspend(&ids)?,
        BulkAction::PromoteAdmin => database.bulk_promote(&ids)?,
        BulkAction::DemoteAdmin => database.bulk_demote(&ids)?,
    };
    drop(database);

    let flash = match outcome {
        BulkOutcome::WouldRemoveLastAdmin => Flash::error("Es muss mindestens ein Administrator übrig bleiben."),
        BulkOutcome::Applied { affected } => {
            info!("User {} applied {:?} to {} users", session.user_id, action, affected);
            Flash::success(match action {
                BulkAction::Approve => format!("{} Benutzer wurden freigeschaltet.", affected),
                BulkAction::Suspend => format!("{} Benutzer wurden gesperrt.", affected),
                BulkAction::PromoteAdmin => format!("{} Benutzer wurden zu Administratoren ernannt.", affected),
                BulkAction::DemoteAdmin => format!("{} Administratoren wurden degradiert.", affected),
            })
        }
    };

    Ok(redirect(&request, back, vec![flash]))
}

#[get("/admin/examiners")]
pub async fn examiner_list(
    request: HttpRequest,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_admin!(request, data, configuration);

    let examiners = data.lock().await.list_examiners()?;

    Ok(render(&request, Some(&session), "Prüfer", vec![], views::admin::examiners(&examiners)))
}

#[post("/admin/examiners/new")]
pub async fn create_examiner(
    request: HttpRequest,
    form: web::Form<ExaminerForm>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    require_admin!(request, data, configuration);
    let back = "/admin/examiners";

    let (name, region) = match (optional(&form.name), optional(&form.region).and_then(Region::from_name)) {
        (Some(name), Some(region)) => (name, region),
        _ => return Ok(redirect(&request, back, vec![Flash::error("Name und Bundesland sind erforderlich.")])),
    };

    let id = data.lock().await.create_examiner(name, region.name())?;
    info!("Created examiner {} ({}) in {}", id, name, region);

    Ok(redirect(&request, back, vec![Flash::success(format!("Prüfer {} wurde hinzugefügt.", name))]))
}

#[post("/admin/examiners/{id}/delete")]
pub async fn delete_examiner(
    request: HttpRequest,
    id: web::Path<i64>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    require_admin!(request, data, configuration);

    let flash = match data.lock().await.delete_examiner(id.into_inner())? {
        ExaminerDeletion::Deleted => Flash::success("Prüfer wurde gelöscht."),
        ExaminerDeletion::InUse => Flash::error("Prüfer kann nicht gelöscht werden, da er in Protokollen verwendet wird."),
        ExaminerDeletion::NotFound => Flash::error("Prüfer nicht gefunden."),
    };

    Ok(redirect(&request, "/admin/examiners", vec![flash]))
}

#[get("/admin/protocols")]
pub async fn protocol_list(
    request: HttpRequest,
    search: web::Query<Search>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_admin!(request, data, configuration);

    let database = data.lock().await;
    let protocols = database.list_protocols(&search, true)?;
    let total_protocols = database.count_protocols()?;
    let total_authors = database.count_protocol_authors()?;
    let total_regions = database.count_protocol_regions()?;
    let user_names = database.approved_user_names()?;
    let examiner_names = database.examiner_names()?;
    drop(database);

    let content = views::admin::protocols(&ProtocolListView {
        search: &search,
        protocols: &protocols,
        total_protocols,
        total_authors,
        total_regions,
        user_names: &user_names,
        examiner_names: &examiner_names,
    });
    Ok(render(&request, Some(&session), "Protokollverwaltung", vec![], content))
}

fn form_from(details: &ProtocolDetails) -> ProtocolForm {
    ProtocolForm {
        exam_date: Some(details.exam_date.clone()),
        region: Some(details.region.clone()),
        examiner1: Some(details.examiners[0].id.to_string()),
        examiner2: Some(details.examiners[1].id.to_string()),
        examiner3: Some(details.examiners[2].id.to_string()),
        content: Some(details.content.clone()),
        hashtags: Some(details.hashtags.clone()),
        comment: details.comment.clone(),
        admin_note: None,
    }
}

#[get("/admin/protocols/{id}")]
pub async fn protocol_details(
    request: HttpRequest,
    id: web::Path<i64>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_admin!(request, data, configuration);

    let database = data.lock().await;
    let details = match database.get_protocol(id.into_inner())? {
        Some(details) => details,
        None => return Ok(redirect(&request, "/admin/protocols", vec![Flash::error("Protokoll nicht gefunden.")])),
    };
    let examiners = database.list_examiners()?;
    drop(database);

    let content = views::admin::protocol_details(&details, &form_from(&details), &examiners);
    Ok(render(&request, Some(&session), &format!("Protokoll #{}", details.id), vec![], content))
}

#[post("/admin/protocols/{id}/edit")]
pub async fn edit_protocol(
    request: HttpRequest,
    id: web::Path<i64>,
    form: web::Form<ProtocolForm>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, AppError> {
    let session = require_admin!(request, data, configuration);
    let id = id.into_inner();
    let details_page = format!("/admin/protocols/{}", id);

    let mut database = data.lock().await;
    let details = match database.get_protocol(id)? {
        Some(details) => details,
        None => return Ok(redirect(&request, "/admin/protocols", vec![Flash::error("Protokoll nicht gefunden.")])),
    };

    let protocol = match validate_protocol(&database, &form, ADMIN_EDIT_MIN_CONTENT)? {
        Ok(protocol) => protocol,
        Err(errors) => return Ok(redirect(&request, &details_page, Flash::errors(errors))),
    };

    let note = optional(&form.admin_note);
    let description = format!("Protokoll #{} bearbeitet", id);
    database.transaction(|db| -> Result<(), sqlite::Error> {
        db.update_protocol(id, &protocol)?;
        db.log_admin_action(session.user_id, AdminAction::Edit, PROTOCOL_TARGET, id, &description, note)
    })?;
    drop(database);
    info!("User {} edited protocol {}", session.user_id, id);

    let mut flashes = vec![Flash::success("Protokoll wurde erfolgreich aktualisiert.")];
    if let Some(note) = note {
        let exam_date = protocol.exam_date.format(crate::storage::DATE_FORMAT).to_string();
        let mail = templates::protocol_edited(&details.author_name, &exam_date, note, &configuration.link("/protocols"));
        if !notify(mailer.get_ref(), &details.author_email, &mail).await {
            flashes.push(Flash::warning("Der Autor konnte nicht per E-Mail benachrichtigt werden."));
        }
    }

    Ok(redirect(&request, &details_page, flashes))
}

#[post("/admin/protocols/{id}/delete")]
pub async fn delete_protocol(
    request: HttpRequest,
    id: web::Path<i64>,
    form: web::Form<ActionForm>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, AppError> {
    let session = require_admin!(request, data, configuration);
    let id = id.into_inner();
    let back = "/admin/protocols";

    let mut database = data.lock().await;
    let details = match database.get_protocol(id)? {
        Some(details) => details,
        None => return Ok(redirect(&request, back, vec![Flash::error("Protokoll nicht gefunden.")])),
    };

    let reason = optional(&form.reason);
    let description = format!("Protokoll #{} vom {} gelöscht", id, details.exam_date);
    database.transaction(|db| -> Result<(), sqlite::Error> {
        db.log_admin_action(session.user_id, AdminAction::Delete, PROTOCOL_TARGET, id, &description, reason)?;
        db.delete_protocol(id)
    })?;
    drop(database);
    info!("User {} deleted protocol {}", session.user_id, id);

    let mut flashes = vec![Flash::success("Protokoll wurde gelöscht.")];
    if let Some(reason) = reason {
        let mail = templates::protocol_deleted(&details.author_name, &details.exam_date, reason);
        if !notify(mailer.get_ref(), &details.author_email, &mail).await {
            flashes.push(Flash::warning("Der Autor konnte nicht per E-Mail benachrichtigt werden."));
        }
    }

    Ok(redirect(&request, back, flashes))
}

#[get("/admin/logs")]
pub async fn logs(
    request: HttpRequest,
    page: web::Query<Page>,
    data: web::Data<Arc<Mutex<Database>>>,
    configuration: web::Data<Configuration>,
) -> Result<HttpResponse, AppError> {
    let session = require_admin!(request, data, configuration);

    let database = data.lock().await;
    let total = database.count_admin_logs()?;
    let pages = (total + LOGS_PER_PAGE - 1) / LOGS_PER_PAGE;
    // Pages past the end show the last one.
    let page = page.page.unwrap_or(1).clamp(1, pages.max(1));
    let entries = database.admin_logs(LOGS_PER_PAGE, (page - 1) * LOGS_PER_PAGE)?;
    drop(database);

    Ok(render(&request, Some(&session), "Admin-Logs", vec![], views::admin::logs(&entries, page, pages)))
}
