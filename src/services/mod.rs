pub mod admin;
pub mod common;
pub mod display;
pub mod protocol;
pub mod user;

use actix_web::web;

/// Registers every route of the application.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(display::info)
        .service(display::home)
        .service(display::privacy)
        .service(display::imprint)
        .service(display::dashboard)
        .service(user::register_page)
        .service(user::register)
        .service(user::verify)
        .service(user::login_page)
        .service(user::login)
        .service(user::logout)
        .service(user::profile)
        .service(user::edit_profile_page)
        .service(user::edit_profile)
        .service(user::delete_profile_page)
        .service(user::delete_profile)
        .service(user::export_profile)
        .service(protocol::list_protocols)
        .service(protocol::new_protocol_page)
        .service(protocol::submit_protocol)
        .service(protocol::examiners_of_region)
        .service(protocol::create_reminder)
        .service(admin::dashboard)
        .service(admin::approve_user)
        .service(admin::user_list)
        .service(admin::bulk_action)
        .service(admin::user_details)
        .service(admin::change_admin_status)
        .service(admin::suspend_user)
        .service(admin::examiner_list)
        .service(admin::create_examiner)
        .service(admin::delete_examiner)
        .service(admin::protocol_list)
        .service(admin::protocol_details)
        .service(admin::edit_protocol)
        .service(admin::delete_protocol)
        .service(admin::logs);
}
