use sqlite::{Error, State, Statement};

use super::database::{read_bool, Database};

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub training_year: i64,
    pub is_verified: bool,
    pub is_approved: bool,
    pub is_admin: bool,
    pub verification_token: Option<String>,
    pub created_at: String,
}

/// One row of the admin user overview.
#[derive(Debug, Clone)]
pub struct UserOverview {
    pub user: User,
    pub protocol_count: i64,
    pub last_protocol: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatusFilter {
    All,
    Pending,
    Approved,
    Admin,
}

impl UserStatusFilter {
    pub fn parse(raw: Option<&str>) -> UserStatusFilter {
        match raw {
            Some("pending") => UserStatusFilter::Pending,
            Some("approved") => UserStatusFilter::Approved,
            Some("admin") => UserStatusFilter::Admin,
            _ => UserStatusFilter::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserStatusFilter::All => "all",
            UserStatusFilter::Pending => "pending",
            UserStatusFilter::Approved => "approved",
            UserStatusFilter::Admin => "admin",
        }
    }

    fn clause(self) -> &'static str {
        match self {
            UserStatusFilter::All => "",
            UserStatusFilter::Pending => " AND u.is_verified = 1 AND u.is_approved = 0",
            UserStatusFilter::Approved => " AND u.is_approved = 1 AND u.is_admin = 0",
            UserStatusFilter::Admin => " AND u.is_admin = 1",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserCounts {
    pub pending: i64,
    pub active: i64,
    pub admins: i64,
    pub total: i64,
}

/// Result of a bulk change, `affected` counts rows actually updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    Applied { affected: usize },
    WouldRemoveLastAdmin,
}

const USER_COLUMNS: &str =
    "u.id, u.name, u.email, u.password_hash, u.training_year, u.is_verified, u.is_approved, u.is_admin, u.verification_token, u.created_at";

fn read_user(statement: &Statement<'_>) -> Result<User, Error> {
    Ok(User {
        id: statement.read::<i64, _>("id")?,
        name: statement.read::<String, _>("name")?,
        email: statement.read::<String, _>("email")?,
        password_hash: statement.read::<String, _>("password_hash")?,
        training_year: statement.read::<i64, _>("training_year")?,
        is_verified: read_bool(statement, "is_verified")?,
        is_approved: read_bool(statement, "is_approved")?,
        is_admin: read_bool(statement, "is_admin")?,
        verification_token: statement.read::<Option<String>, _>("verification_token")?,
        created_at: statement.read::<String, _>("created_at")?,
    })
}

fn id_placeholders(ids: &[i64]) -> String {
    vec!["?"; ids.len()].join(", ")
}

impl Database {
    pub fn email_taken(&self, email: &str, except_user: Option<i64>) -> Result<bool, Error> {
        let except = except_user.unwrap_or(-1).to_string();
        Ok(self.count("SELECT COUNT(*) FROM users WHERE email = ? AND id != ?", &[email, &except])? > 0)
    }

    pub fn create_user(
        &mut self,
        name: &str,
        email: &str,
        password_hash: &str,
        training_year: i64,
        verification_token: &str,
    ) -> Result<i64, Error> {
        let mut statement = self.connection().prepare(
            "INSERT INTO users (name, email, password_hash, training_year, verification_token) VALUES (?, ?, ?, ?, ?)",
        )?;
        statement.bind((1, name))?;
        statement.bind((2, email))?;
        statement.bind((3, password_hash))?;
        statement.bind((4, training_year))?;
        statement.bind((5, verification_token))?;
        statement.next()?;
        drop(statement);

        self.last_insert_id()
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>, Error> {
        let mut statement = self.connection().prepare(format!("SELECT {} FROM users u WHERE u.id = ?", USER_COLUMNS))?;
        statement.bind((1, id))?;

        if let State::Row = statement.next()? {
            Ok(Some(read_user(&statement)?))
        } else {
            Ok(None)
        }
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let mut statement = self.connection().prepare(format!("SELECT {} FROM users u WHERE u.email = ?", USER_COLUMNS))?;
        statement.bind((1, email))?;

        if let State::Row = statement.next()? {
            Ok(Some(read_user(&statement)?))
        } else {
            Ok(None)
        }
    }

    /// Marks the owner of an unused token as verified and burns the token.
    /// Returns the verified user's name.
    pub fn consume_verification_token(&mut self, token: &str) -> Result<Option<String>, Error> {
        let mut statement = self
            .connection()
            .prepare("SELECT id, name FROM users WHERE verification_token = ? AND is_verified = 0")?;
        statement.bind((1, token))?;

        let (id, name) = if let State::Row = statement.next()? {
            (statement.read::<i64, _>("id")?, statement.read::<String, _>("name")?)
        } else {
            return Ok(None);
        };
        drop(statement);

        let mut update = self
            .connection()
            .prepare("UPDATE users SET is_verified = 1, verification_token = NULL WHERE id = ?")?;
        update.bind((1, id))?;
        update.next()?;

        Ok(Some(name))
    }

    pub fn set_approved(&mut self, id: i64, approved: bool) -> Result<(), Error> {
        self.set_flag("is_approved", id, approved)
    }

    pub fn set_admin(&mut self, id: i64, admin: bool) -> Result<(), Error> {
        self.set_flag("is_admin", id, admin)
    }

    fn set_flag(&mut self, column: &str, id: i64, value: bool) -> Result<(), Error> {
        let mut statement = self.connection().prepare(format!("UPDATE users SET {} = ? WHERE id = ?", column))?;
        statement.bind((1, value as i64))?;
        statement.bind((2, id))?;
        statement.next()?;
        Ok(())
    }

    pub fn count_admins(&self) -> Result<i64, Error> {
        self.count("SELECT COUNT(*) FROM users WHERE is_admin = 1", &[])
    }

    /// Admins other than `id` that are approved and so able to log in.
    pub fn other_active_admins(&self, id: i64) -> Result<i64, Error> {
        self.count(
            "SELECT COUNT(*) FROM users WHERE is_admin = 1 AND is_approved = 1 AND id != ?",
            &[&id.to_string()],
        )
    }

    pub fn is_admin(&self, id: i64) -> Result<bool, Error> {
        Ok(self.count("SELECT COUNT(*) FROM users WHERE id = ? AND is_admin = 1", &[&id.to_string()])? > 0)
    }

    pub fn update_profile(
        &mut self,
        id: i64,
        name: &str,
        email: &str,
        training_year: i64,
        password_hash: Option<&str>,
    ) -> Result<(), Error> {
        let mut statement = match password_hash {
            Some(hash) => {
                let mut statement = self.connection().prepare(
                    "UPDATE users SET name = ?, email = ?, training_year = ?, password_hash = ? WHERE id = ?",
                )?;
                statement.bind((4, hash))?;
                statement.bind((5, id))?;
                statement
            }
            None => {
                let mut statement = self
                    .connection()
                    .prepare("UPDATE users SET name = ?, email = ?, training_year = ? WHERE id = ?")?;
                statement.bind((4, id))?;
                statement
            }
        };
        statement.bind((1, name))?;
        statement.bind((2, email))?;
        statement.bind((3, training_year))?;
        statement.next()?;
        Ok(())
    }

    /// Removes a user together with their reminders and protocols.
    pub fn delete_user_cascade(&mut self, id: i64) -> Result<(), Error> {
        self.transaction(|db| {
            for query in [
                "DELETE FROM reminders WHERE user_id = ?",
                "DELETE FROM protocols WHERE user_id = ?",
                "DELETE FROM users WHERE id = ?",
            ] {
                let mut statement = db.connection().prepare(query)?;
                statement.bind((1, id))?;
                statement.next()?;
            }
            Ok(())
        })
    }

    pub fn pending_users(&self, limit: i64) -> Result<Vec<User>, Error> {
        let mut statement = self.connection().prepare(format!(
            "SELECT {} FROM users u WHERE u.is_verified = 1 AND u.is_approved = 0 ORDER BY u.created_at DESC, u.id DESC LIMIT ?",
            USER_COLUMNS
        ))?;
        statement.bind((1, limit))?;

        let mut users = vec![];
        while let State::Row = statement.next()? {
            users.push(read_user(&statement)?);
        }
        Ok(users)
    }

    pub fn list_users(&self, query: &UserQuery) -> Result<Vec<UserOverview>, Error> {
        let mut sql = format!(
            "SELECT {}, COUNT(p.id) AS protocol_count, MAX(p.created_at) AS last_protocol
             FROM users u LEFT JOIN protocols p ON u.id = p.user_id WHERE 1 = 1",
            USER_COLUMNS
        );
        let mut params: Vec<String> = vec![];

        sql.push_str(UserStatusFilter::parse(query.status.as_deref()).clause());

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            sql.push_str(" AND (u.name LIKE ? OR u.email LIKE ?)");
            params.push(format!("%{}%", search));
            params.push(format!("%{}%", search));
        }

        sql.push_str(" GROUP BY u.id");

        let order_column = match query.sort.as_deref() {
            Some("name") => "u.name",
            Some("email") => "u.email",
            Some("protocol_count") => "protocol_count",
            _ => "u.created_at",
        };
        let direction = if query.descending { "DESC" } else { "ASC" };
        sql.push_str(&format!(" ORDER BY {} {}, u.id {}", order_column, direction, direction));

        let mut statement = self.connection().prepare(sql)?;
        for (index, param) in params.iter().enumerate() {
            statement.bind((index + 1, param.as_str()))?;
        }

        let mut users = vec![];
        while let State::Row = statement.next()? {
            users.push(UserOverview {
                user: read_user(&statement)?,
                protocol_count: statement.read::<i64, _>("protocol_count")?,
                last_protocol: statement.read::<Option<String>, _>("last_protocol")?,
            });
        }
        Ok(users)
    }

    pub fn user_counts(&self) -> Result<UserCounts, Error> {
        Ok(UserCounts {
            pending: self.count("SELECT COUNT(*) FROM users WHERE is_verified = 1 AND is_approved = 0", &[])?,
            active: self.count("SELECT COUNT(*) FROM users WHERE is_approved = 1 AND is_admin = 0", &[])?,
            admins: self.count_admins()?,
            total: self.count("SELECT COUNT(*) FROM users", &[])?,
        })
    }

    pub fn approved_user_names(&self) -> Result<Vec<String>, Error> {
        let mut statement = self
            .connection()
            .prepare("SELECT DISTINCT name FROM users WHERE is_approved = 1 ORDER BY name")?;
        let mut names = vec![];
        while let State::Row = statement.next()? {
            names.push(statement.read::<String, _>("name")?);
        }
        Ok(names)
    }

    /// Approves the given users. Users that have not verified their email are skipped.
    pub fn bulk_approve(&mut self, ids: &[i64]) -> Result<BulkOutcome, Error> {
        self.bulk_update("UPDATE users SET is_approved = 1 WHERE is_verified = 1 AND id IN", ids)
    }

    pub fn bulk_suspend(&mut self, ids: &[i64]) -> Result<BulkOutcome, Error> {
        self.bulk_update("UPDATE users SET is_approved = 0 WHERE id IN", ids)
    }

    /// Grants admin rights to the given users. Unapproved users are skipped.
    pub fn bulk_promote(&mut self, ids: &[i64]) -> Result<BulkOutcome, Error> {
        self.bulk_update("UPDATE users SET is_admin = 1 WHERE is_approved = 1 AND id IN", ids)
    }

    /// Revokes admin rights unless that would leave no admin at all.
    pub fn bulk_demote(&mut self, ids: &[i64]) -> Result<BulkOutcome, Error> {
        self.transaction(|db| {
            let selected_admins = {
                let mut statement = db.connection().prepare(format!(
                    "SELECT COUNT(*) FROM users WHERE is_admin = 1 AND id IN ({})",
                    id_placeholders(ids)
                ))?;
                for (index, id) in ids.iter().enumerate() {
                    statement.bind((index + 1, *id))?;
                }
                statement.next()?;
                statement.read::<i64, _>(0)?
            };

            if db.count_admins()? - selected_admins < 1 {
                return Ok(BulkOutcome::WouldRemoveLastAdmin);
            }

            db.bulk_update("UPDATE users SET is_admin = 0 WHERE is_admin = 1 AND id IN", ids)
        })
    }

    fn bulk_update(&mut self, prefix: &str, ids: &[i64]) -> Result<BulkOutcome, Error> {
        if ids.is_empty() {
            return Ok(BulkOutcome::Applied { affected: 0 });
        }

        let mut statement = self.connection().prepare(format!("{} ({})", prefix, id_placeholders(ids)))?;
        for (index, id) in ids.iter().enumerate() {
            statement.bind((index + 1, *id))?;
        }
        statement.next()?;
        drop(statement);

        Ok(BulkOutcome::Applied { affected: self.changes() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(database: &mut Database, email: &str) -> i64 {
        database.create_user("Test", email, "hash", 3, &format!("token-{}", email)).expect("create user")
    }

    #[test]
    fn verification_token_is_consumed_once() {
        let mut database = Database::in_memory().expect("open");
        let id = user(&mut database, "a@example.org");

        assert_eq!(database.consume_verification_token("token-a@example.org").expect("first"), Some("Test".to_string()));
        assert_eq!(database.consume_verification_token("token-a@example.org").expect("second"), None);

        let stored = database.get_user(id).expect("get").expect("exists");
        assert!(stored.is_verified);
        assert_eq!(stored.verification_token, None);
    }

    #[test]
    fn email_uniqueness_respects_the_editing_user() {
        let mut database = Database::in_memory().expect("open");
        let id = user(&mut database, "a@example.org");

        assert!(database.email_taken("a@example.org", None).expect("taken"));
        assert!(!database.email_taken("a@example.org", Some(id)).expect("own email"));
        assert!(database.create_user("Dup", "a@example.org", "hash", 1, "t").is_err());
    }

    #[test]
    fn bulk_demote_keeps_one_admin() {
        let mut database = Database::in_memory().expect("open");
        let first = user(&mut database, "a@example.org");
        let second = user(&mut database, "b@example.org");
        let plain = user(&mut database, "c@example.org");
        for id in [first, second] {
            database.set_approved(id, true).expect("approve");
            database.set_admin(id, true).expect("promote");
        }

        // A non-admin in the selection must not mask the last admin.
        let outcome = database.bulk_demote(&[first, second, plain]).expect("demote");
        assert_eq!(outcome, BulkOutcome::WouldRemoveLastAdmin);
        assert_eq!(database.count_admins().expect("admins"), 2);

        let outcome = database.bulk_demote(&[first, plain]).expect("demote one");
        assert_eq!(outcome, BulkOutcome::Applied { affected: 1 });
        assert_eq!(database.count_admins().expect("admins"), 1);
    }

    #[test]
    fn suspended_admins_do_not_count_as_active() {
        let mut database = Database::in_memory().expect("open");
        let first = user(&mut database, "a@example.org");
        let second = user(&mut database, "b@example.org");
        for id in [first, second] {
            database.set_approved(id, true).expect("approve");
            database.set_admin(id, true).expect("promote");
        }
        assert_eq!(database.other_active_admins(first).expect("count"), 1);

        database.set_approved(second, false).expect("suspend");

        assert_eq!(database.other_active_admins(first).expect("count"), 0);
        assert_eq!(database.count_admins().expect("admins"), 2);
    }

    #[test]
    fn bulk_approve_skips_unverified_users() {
        let mut database = Database::in_memory().expect("open");
        let verified = user(&mut database, "a@example.org");
        let unverified = user(&mut database, "b@example.org");
        database.consume_verification_token("token-a@example.org").expect("verify");

        let outcome = database.bulk_approve(&[verified, unverified]).expect("approve");

        assert_eq!(outcome, BulkOutcome::Applied { affected: 1 });
        assert!(database.get_user(verified).expect("get").expect("exists").is_approved);
        assert!(!database.get_user(unverified).expect("get").expect("exists").is_approved);
    }

    #[test]
    fn user_list_filters_by_status_and_search() {
        let mut database = Database::in_memory().expect("open");
        let pending = user(&mut database, "pending@example.org");
        user(&mut database, "fresh@example.org");
        database.consume_verification_token("token-pending@example.org").expect("verify");
        assert_eq!(database.user_counts().expect("counts").pending, 1);

        let listed = database
            .list_users(&UserQuery { status: Some("pending".to_string()), ..Default::default() })
            .expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user.id, pending);

        let searched = database
            .list_users(&UserQuery { search: Some("fresh".to_string()), ..Default::default() })
            .expect("search");
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].user.email, "fresh@example.org");
    }
}
