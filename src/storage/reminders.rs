use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlite::{Error, State, Statement};

use super::{database::{read_bool, Database}, format_timestamp, DATE_FORMAT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: i64,
    pub user_id: i64,
    pub exam_date: String,
    pub next_reminder: String,
    pub reminder_count: i64,
    pub protocol_created: bool,
    pub created_at: String,
}

/// A reminder selected by a scheduler pass, joined with its recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueReminder {
    pub id: i64,
    pub user_id: i64,
    pub reminder_count: i64,
    pub name: String,
    pub email: String,
}

fn read_reminder(statement: &Statement<'_>) -> Result<Reminder, Error> {
    Ok(Reminder {
        id: statement.read::<i64, _>("id")?,
        user_id: statement.read::<i64, _>("user_id")?,
        exam_date: statement.read::<String, _>("exam_date")?,
        next_reminder: statement.read::<String, _>("next_reminder")?,
        reminder_count: statement.read::<i64, _>("reminder_count")?,
        protocol_created: read_bool(statement, "protocol_created")?,
        created_at: statement.read::<String, _>("created_at")?,
    })
}

impl Database {
    pub fn create_reminder(&mut self, user_id: i64, exam_date: NaiveDate, first_reminder: NaiveDateTime) -> Result<i64, Error> {
        let exam_date = exam_date.format(DATE_FORMAT).to_string();
        let first_reminder = format_timestamp(first_reminder);

        let mut statement = self
            .connection()
            .prepare("INSERT INTO reminders (user_id, exam_date, next_reminder) VALUES (?, ?, ?)")?;
        statement.bind((1, user_id))?;
        statement.bind((2, exam_date.as_str()))?;
        statement.bind((3, first_reminder.as_str()))?;
        statement.next()?;
        drop(statement);

        self.last_insert_id()
    }

    pub fn reminders_of_user(&self, user_id: i64) -> Result<Vec<Reminder>, Error> {
        let mut statement = self.connection().prepare(
            "SELECT id, user_id, exam_date, next_reminder, reminder_count, protocol_created, created_at
             FROM reminders WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )?;
        statement.bind((1, user_id))?;

        let mut reminders = vec![];
        while let State::Row = statement.next()? {
            reminders.push(read_reminder(&statement)?);
        }
        Ok(reminders)
    }

    /// Every reminder whose next fire time is at or before `now` and whose
    /// author has not submitted a protocol since.
    pub fn due_reminders(&self, now: NaiveDateTime) -> Result<Vec<DueReminder>, Error> {
        let now = format_timestamp(now);
        let mut statement = self.connection().prepare(
            "SELECT r.id, r.user_id, r.reminder_count, u.name, u.email
             FROM reminders r JOIN users u ON r.user_id = u.id
             WHERE r.next_reminder <= ? AND r.protocol_created = 0
             ORDER BY r.next_reminder, r.id",
        )?;
        statement.bind((1, now.as_str()))?;

        let mut due = vec![];
        while let State::Row = statement.next()? {
            due.push(DueReminder {
                id: statement.read::<i64, _>("id")?,
                user_id: statement.read::<i64, _>("user_id")?,
                reminder_count: statement.read::<i64, _>("reminder_count")?,
                name: statement.read::<String, _>("name")?,
                email: statement.read::<String, _>("email")?,
            });
        }
        Ok(due)
    }

    /// Re-arms a reminder after a delivered notification. A reminder that
    /// was completed in the meantime stays untouched.
    pub fn advance_reminder(&mut self, id: i64, now: NaiveDateTime, step: Duration) -> Result<(), Error> {
        let next = format_timestamp(now + step);
        let mut statement = self.connection().prepare(
            "UPDATE reminders SET next_reminder = ?, reminder_count = reminder_count + 1
             WHERE id = ? AND protocol_created = 0",
        )?;
        statement.bind((1, next.as_str()))?;
        statement.bind((2, id))?;
        statement.next()?;
        Ok(())
    }

    /// Marks all outstanding reminders of a user as done. Returns how many
    /// reminders were affected.
    pub fn complete_reminders(&mut self, user_id: i64) -> Result<usize, Error> {
        let mut statement = self
            .connection()
            .prepare("UPDATE reminders SET protocol_created = 1 WHERE user_id = ? AND protocol_created = 0")?;
        statement.bind((1, user_id))?;
        statement.next()?;
        drop(statement);

        Ok(self.changes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::submitted_protocol::SubmittedProtocol;

    fn at(raw: &str) -> NaiveDateTime {
        crate::storage::parse_timestamp(raw).expect("timestamp")
    }

    fn date(raw: &str) -> NaiveDate {
        crate::storage::parse_date(raw).expect("date")
    }

    #[test]
    fn only_due_reminders_are_selected() {
        let mut database = Database::in_memory().expect("open");
        let user = database.create_user("Test", "t@example.org", "hash", 5, "token").expect("user");
        let due = database.create_reminder(user, date("2026-05-01"), at("2026-05-03 10:00:00")).expect("due");
        database.create_reminder(user, date("2026-06-01"), at("2026-06-03 10:00:00")).expect("future");

        let selected = database.due_reminders(at("2026-05-03 10:00:00")).expect("select");

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, due);
        assert_eq!(selected[0].email, "t@example.org");
    }

    #[test]
    fn advancing_moves_the_reminder_out_of_the_window() {
        let mut database = Database::in_memory().expect("open");
        let user = database.create_user("Test", "t@example.org", "hash", 5, "token").expect("user");
        let id = database.create_reminder(user, date("2026-05-01"), at("2026-05-03 10:00:00")).expect("create");
        let now = at("2026-05-03 11:00:00");

        database.advance_reminder(id, now, Duration::weeks(1)).expect("advance");

        assert!(database.due_reminders(now).expect("select").is_empty());
        let stored = &database.reminders_of_user(user).expect("list")[0];
        assert_eq!(stored.reminder_count, 1);
        assert_eq!(stored.next_reminder, "2026-05-10 11:00:00");
    }

    #[test]
    fn any_new_protocol_completes_every_pending_reminder() {
        let mut database = Database::in_memory().expect("open");
        let user = database.create_user("Test", "t@example.org", "hash", 5, "token").expect("user");
        let other = database.create_user("Other", "o@example.org", "hash", 5, "token2").expect("other");
        database.create_reminder(user, date("2026-05-01"), at("2026-05-03 10:00:00")).expect("first");
        database.create_reminder(user, date("2027-01-15"), at("2027-01-17 10:00:00")).expect("second");
        database.create_reminder(other, date("2026-05-01"), at("2026-05-03 10:00:00")).expect("other");
        let ids = [
            database.create_examiner("Dr. A", "Berlin").expect("a"),
            database.create_examiner("Dr. B", "Berlin").expect("b"),
            database.create_examiner("Dr. C", "Berlin").expect("c"),
        ];

        database.create_protocol(user, &SubmittedProtocol::for_tests("Berlin", ids)).expect("protocol");

        assert!(database.reminders_of_user(user).expect("list").iter().all(|r| r.protocol_created));
        assert!(database.reminders_of_user(other).expect("list").iter().all(|r| !r.protocol_created));
        assert_eq!(database.due_reminders(at("2030-01-01 00:00:00")).expect("select").len(), 1);
    }
}
