use std::{env, io, sync::Arc};

use actix_web::{middleware::Logger, web, App, HttpServer};
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use protokolldb::{
    mail::{smtp::SmtpMailer, Mailer},
    services::{self, common::hash_password},
    storage::database::Database,
    structs::configuration::Configuration,
    workers::reminders::ReminderWorker,
};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("protokolldb=info,actix_web=info")),
        )
        .init();

    let config_path = env::var("PROTOKOLLDB_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let configuration = Configuration::load(&config_path).map_err(|err| startup_error("Configuration", err))?;

    let mut database =
        Database::new(&configuration.database.file_location).map_err(|err| startup_error("Database", err))?;
    let admin_hash = hash_password(&configuration.bootstrap.password, &configuration.encryption)
        .map_err(|err| startup_error("Bootstrap admin", err))?;
    database
        .bootstrap(&configuration.bootstrap.name, &configuration.bootstrap.email, &admin_hash)
        .map_err(|err| startup_error("Bootstrap admin", err))?;
    let data = Arc::new(Mutex::new(database));

    let mailer: Arc<dyn Mailer> =
        Arc::new(SmtpMailer::new(&configuration.mail).map_err(|err| startup_error("Mail transport", err))?);

    let worker = ReminderWorker::spawn(data.clone(), mailer.clone(), configuration.clone());

    let bind = (configuration.api.bind_addr.clone(), configuration.api.bind_port);
    info!("Listening on {}:{}", bind.0, bind.1);

    let server_configuration = configuration.clone();
    let result = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(data.clone()))
            .app_data(web::Data::new(server_configuration.clone()))
            .app_data(web::Data::from(mailer.clone()))
            .configure(services::configure)
    })
    .bind(bind)?
    .run()
    .await;

    worker.shutdown().await;
    result
}
