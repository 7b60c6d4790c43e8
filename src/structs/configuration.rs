use std::{fs, io, path::Path};

use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Configuration {
    pub database: DatabaseSettings,
    pub api: APISettings,
    pub mail: MailSettings,
    pub encryption: Encryption,
    pub reminders: ReminderSettings,
    pub bootstrap: BootstrapAdmin,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub file_location: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct APISettings {
    pub bind_addr: String,
    pub bind_port: u16,
    /// Base URL used for links in outgoing mails, without trailing slash.
    pub public_url: String,
    pub session_lifetime_hours: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MailSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Encryption {
    pub token_encryption_secret: String,
    pub password_memory_kib: u32,
    pub password_iterations: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReminderSettings {
    pub poll_interval_secs: u64,
    pub first_reminder_after_hours: i64,
    pub repeat_after_days: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),
}

fn random_string(length: usize) -> String {
    thread_rng().sample_iter(&Alphanumeric).take(length).map(char::from).collect()
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            database: DatabaseSettings { file_location: "protokolldb.db".to_string() },
            api: APISettings {
                bind_addr: "127.0.0.1".to_string(),
                bind_port: 8080,
                public_url: "http://127.0.0.1:8080".to_string(),
                session_lifetime_hours: 24 * 7,
            },
            mail: MailSettings {
                server: "smtp.example.org".to_string(),
                port: 587,
                username: "protokolldb@example.org".to_string(),
                password: String::new(),
                sender: "protokolldb@example.org".to_string(),
            },
            encryption: Encryption {
                token_encryption_secret: random_string(48),
                password_memory_kib: 19 * 1024,
                password_iterations: 2,
            },
            reminders: ReminderSettings {
                poll_interval_secs: 60 * 60,
                first_reminder_after_hours: 48,
                repeat_after_days: 7,
            },
            bootstrap: BootstrapAdmin {
                name: "Admin".to_string(),
                email: "admin@protokolldb.local".to_string(),
                password: random_string(16),
            },
        }
    }
}

impl Configuration {
    /// Reads the configuration from `path`. A missing file is replaced by a
    /// freshly generated default which is written back so secrets stay stable
    /// across restarts.
    pub fn load(path: impl AsRef<Path>) -> Result<Configuration, ConfigError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(raw) => {
                info!("Loaded configuration from {}", path.display());
                Ok(serde_json::from_str(&raw)?)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("{} not found, writing default configuration", path.display());
                let configuration = Configuration::default();
                fs::write(path, serde_json::to_string_pretty(&configuration)?)?;
                warn!(
                    "Bootstrap admin is {} with password {}, change it after the first login",
                    configuration.bootstrap.email, configuration.bootstrap.password
                );
                Ok(configuration)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn link(&self, path: &str) -> String {
        format!("{}{}", self.api.public_url.trim_end_matches('/'), path)
    }
}
