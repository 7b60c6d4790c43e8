use sqlite::{Error, State};

use super::database::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Edit,
    Delete,
}

impl AdminAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AdminAction::Edit => "edit",
            AdminAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminLogEntry {
    pub id: i64,
    pub action_type: String,
    pub target_type: String,
    pub target_id: i64,
    pub description: String,
    pub admin_note: Option<String>,
    pub created_at: String,
    pub admin_name: String,
}

pub const PROTOCOL_TARGET: &str = "protokoll";

impl Database {
    /// Appends an audit entry. Entries are never updated or removed.
    pub fn log_admin_action(
        &mut self,
        admin_user_id: i64,
        action: AdminAction,
        target_type: &str,
        target_id: i64,
        description: &str,
        admin_note: Option<&str>,
    ) -> Result<(), Error> {
        let mut statement = self.connection().prepare(
            "INSERT INTO admin_logs (admin_user_id, action_type, target_type, target_id, description, admin_note)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        statement.bind((1, admin_user_id))?;
        statement.bind((2, action.as_str()))?;
        statement.bind((3, target_type))?;
        statement.bind((4, target_id))?;
        statement.bind((5, description))?;
        statement.bind((6, admin_note))?;
        statement.next()?;
        Ok(())
    }

    pub fn admin_logs(&self, limit: i64, offset: i64) -> Result<Vec<AdminLogEntry>, Error> {
        let mut statement = self.connection().prepare(
            "SELECT l.id, l.action_type, l.target_type, l.target_id, l.description, l.admin_note, l.created_at,
                    COALESCE(u.name, '(gelöscht)') AS admin_name
             FROM admin_logs l LEFT JOIN users u ON l.admin_user_id = u.id
             ORDER BY l.created_at DESC, l.id DESC LIMIT ? OFFSET ?",
        )?;
        statement.bind((1, limit))?;
        statement.bind((2, offset))?;

        let mut entries = vec![];
        while let State::Row = statement.next()? {
            entries.push(AdminLogEntry {
                id: statement.read::<i64, _>("id")?,
                action_type: statement.read::<String, _>("action_type")?,
                target_type: statement.read::<String, _>("target_type")?,
                target_id: statement.read::<i64, _>("target_id")?,
                description: statement.read::<String, _>("description")?,
                admin_note: statement.read::<Option<String>, _>("admin_note")?,
                created_at: statement.read::<String, _>("created_at")?,
                admin_name: statement.read::<String, _>("admin_name")?,
            });
        }
        Ok(entries)
    }

    pub fn count_admin_logs(&self) -> Result<i64, Error> {
        self.count("SELECT COUNT(*) FROM admin_logs", &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_listed_newest_first() {
        let mut database = Database::in_memory().expect("open");
        let admin = database.create_user("Admin", "admin@example.org", "hash", 6, "t").expect("admin");
        database.log_admin_action(admin, AdminAction::Edit, PROTOCOL_TARGET, 1, "Protokoll #1 bearbeitet", Some("Tippfehler")).expect("edit");
        database.log_admin_action(admin, AdminAction::Delete, PROTOCOL_TARGET, 2, "Protokoll #2 gelöscht", None).expect("delete");

        let entries = database.admin_logs(50, 0).expect("list");

        assert_eq!(database.count_admin_logs().expect("count"), 2);
        assert_eq!(entries[0].action_type, "delete");
        assert_eq!(entries[1].admin_note.as_deref(), Some("Tippfehler"));
        assert_eq!(entries[1].admin_name, "Admin");
        assert_eq!(database.admin_logs(50, 2).expect("second page").len(), 0);
    }
}
