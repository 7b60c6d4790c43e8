use std::path::Path;

use sqlite::{Connection, ConnectionThreadSafe, Error, State};
use tracing::{debug, info};

pub struct Database {
    connection: ConnectionThreadSafe,
}

const SETUP_QUERY: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        training_year INTEGER NOT NULL,
        is_verified INTEGER NOT NULL DEFAULT 0,
        is_approved INTEGER NOT NULL DEFAULT 0,
        is_admin INTEGER NOT NULL DEFAULT 0,
        verification_token TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS examiners (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        region TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS protocols (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id),
        exam_date TEXT NOT NULL,
        region TEXT NOT NULL,
        examiner1_id INTEGER NOT NULL REFERENCES examiners (id),
        examiner2_id INTEGER NOT NULL REFERENCES examiners (id),
        examiner3_id INTEGER NOT NULL REFERENCES examiners (id),
        content TEXT NOT NULL,
        hashtags TEXT NOT NULL DEFAULT '',
        comment TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id),
        exam_date TEXT NOT NULL,
        next_reminder TEXT NOT NULL,
        reminder_count INTEGER NOT NULL DEFAULT 0,
        protocol_created INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS admin_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        admin_user_id INTEGER NOT NULL REFERENCES users (id),
        action_type TEXT NOT NULL,
        target_type TEXT NOT NULL,
        target_id INTEGER NOT NULL,
        description TEXT NOT NULL,
        admin_note TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS protocols_user_idx ON protocols (user_id);
    CREATE INDEX IF NOT EXISTS reminders_due_idx ON reminders (protocol_created, next_reminder);
";

const EXAMPLE_EXAMINERS: [(&str, &str); 5] = [
    ("Prof. Dr. Müller", "Bayern"),
    ("Dr. Schmidt", "Nordrhein-Westfalen"),
    ("Prof. Dr. Weber", "Baden-Württemberg"),
    ("Dr. Fischer", "Berlin"),
    ("Prof. Dr. Meyer", "Hamburg"),
];

impl Database {
    pub fn new(file_location: impl AsRef<Path>) -> Result<Database, Error> {
        let connection = Connection::open_thread_safe(file_location)?;
        connection.execute(SETUP_QUERY)?;

        Ok(Database { connection })
    }

    pub fn in_memory() -> Result<Database, Error> {
        Database::new(":memory:")
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Runs `operation` inside a transaction. Any error rolls the whole
    /// operation back, success commits it.
    pub fn transaction<T, E, F>(&mut self, operation: F) -> Result<T, E>
    where
        E: From<Error>,
        F: FnOnce(&mut Database) -> Result<T, E>,
    {
        self.connection.execute("BEGIN IMMEDIATE")?;

        match operation(self) {
            Ok(value) => {
                self.connection.execute("COMMIT")?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.connection.execute("ROLLBACK") {
                    debug!("Rollback failed: {:?}", rollback_err);
                }
                Err(err)
            }
        }
    }

    pub(crate) fn last_insert_id(&self) -> Result<i64, Error> {
        let mut statement = self.connection.prepare("SELECT last_insert_rowid() AS id")?;
        statement.next()?;
        statement.read::<i64, _>("id")
    }

    pub(crate) fn changes(&self) -> usize {
        self.connection.change_count()
    }

    /// Runs a `SELECT COUNT(*)`-style query with positional text parameters.
    pub(crate) fn count(&self, query: &str, params: &[&str]) -> Result<i64, Error> {
        let mut statement = self.connection.prepare(query)?;
        for (index, param) in params.iter().enumerate() {
            statement.bind((index + 1, *param))?;
        }

        if let State::Row = statement.next()? {
            statement.read::<i64, _>(0)
        } else {
            Ok(0)
        }
    }

    /// Creates the configured admin if no admin exists and inserts the
    /// example examiners that are still missing.
    pub fn bootstrap(&mut self, admin_name: &str, admin_email: &str, admin_password_hash: &str) -> Result<(), Error> {
        if self.count_admins()? == 0 {
            let mut statement = self.connection.prepare(
                "INSERT INTO users (name, email, password_hash, training_year, is_verified, is_approved, is_admin)
                 VALUES (?, ?, ?, 6, 1, 1, 1)",
            )?;
            statement.bind((1, admin_name))?;
            statement.bind((2, admin_email))?;
            statement.bind((3, admin_password_hash))?;
            statement.next()?;
            info!("Created bootstrap admin {}", admin_email);
        }

        for (name, region) in EXAMPLE_EXAMINERS {
            if self.count("SELECT COUNT(*) FROM examiners WHERE name = ? AND region = ?", &[name, region])? == 0 {
                self.create_examiner(name, region)?;
            }
        }

        Ok(())
    }
}

pub(crate) fn read_bool(statement: &sqlite::Statement<'_>, column: &str) -> Result<bool, Error> {
    Ok(statement.read::<i64, _>(column)? != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_is_idempotent() {
        let mut database = Database::in_memory().expect("open");
        database.bootstrap("Admin", "admin@example.org", "hash").expect("first");
        database.bootstrap("Admin", "admin@example.org", "hash").expect("second");

        assert_eq!(database.count_admins().expect("admins"), 1);
        assert_eq!(database.count("SELECT COUNT(*) FROM examiners", &[]).expect("examiners"), 5);
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let mut database = Database::in_memory().expect("open");

        let result: Result<(), Error> = database.transaction(|db| {
            db.create_examiner("Dr. Rollback", "Bremen")?;
            db.connection().execute("INSERT INTO no_such_table VALUES (1)")
        });

        assert!(result.is_err());
        assert_eq!(database.count("SELECT COUNT(*) FROM examiners", &[]).expect("count"), 0);
    }
}
