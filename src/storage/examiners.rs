use sqlite::{Error, State};

use super::database::Database;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Examiner {
    pub id: i64,
    pub name: String,
    pub region: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExaminerDeletion {
    Deleted,
    InUse,
    NotFound,
}

impl Database {
    pub fn create_examiner(&mut self, name: &str, region: &str) -> Result<i64, Error> {
        let mut statement = self.connection().prepare("INSERT INTO examiners (name, region) VALUES (?, ?)")?;
        statement.bind((1, name))?;
        statement.bind((2, region))?;
        statement.next()?;
        drop(statement);

        self.last_insert_id()
    }

    pub fn list_examiners(&self) -> Result<Vec<Examiner>, Error> {
        let mut statement = self
            .connection()
            .prepare("SELECT id, name, region FROM examiners ORDER BY region, name")?;

        let mut examiners = vec![];
        while let State::Row = statement.next()? {
            examiners.push(Examiner {
                id: statement.read::<i64, _>("id")?,
                name: statement.read::<String, _>("name")?,
                region: statement.read::<String, _>("region")?,
            });
        }
        Ok(examiners)
    }

    pub fn examiners_in_region(&self, region: &str) -> Result<Vec<Examiner>, Error> {
        let mut statement = self
            .connection()
            .prepare("SELECT id, name, region FROM examiners WHERE region = ? ORDER BY name")?;
        statement.bind((1, region))?;

        let mut examiners = vec![];
        while let State::Row = statement.next()? {
            examiners.push(Examiner {
                id: statement.read::<i64, _>("id")?,
                name: statement.read::<String, _>("name")?,
                region: statement.read::<String, _>("region")?,
            });
        }
        Ok(examiners)
    }

    pub fn examiner_names(&self) -> Result<Vec<String>, Error> {
        let mut statement = self.connection().prepare("SELECT DISTINCT name FROM examiners ORDER BY name")?;

        let mut names = vec![];
        while let State::Row = statement.next()? {
            names.push(statement.read::<String, _>("name")?);
        }
        Ok(names)
    }

    pub fn examiner_exists(&self, id: i64) -> Result<bool, Error> {
        Ok(self.count("SELECT COUNT(*) FROM examiners WHERE id = ?", &[&id.to_string()])? > 0)
    }

    pub fn count_examiners(&self) -> Result<i64, Error> {
        self.count("SELECT COUNT(*) FROM examiners", &[])
    }

    pub fn examiner_in_use(&self, id: i64) -> Result<bool, Error> {
        let id = id.to_string();
        Ok(self.count(
            "SELECT COUNT(*) FROM protocols WHERE examiner1_id = ? OR examiner2_id = ? OR examiner3_id = ?",
            &[&id, &id, &id],
        )? > 0)
    }

    /// Deletes an examiner unless a protocol still references them.
    pub fn delete_examiner(&mut self, id: i64) -> Result<ExaminerDeletion, Error> {
        self.transaction(|db| {
            if !db.examiner_exists(id)? {
                return Ok(ExaminerDeletion::NotFound);
            }
            if db.examiner_in_use(id)? {
                return Ok(ExaminerDeletion::InUse);
            }

            let mut statement = db.connection().prepare("DELETE FROM examiners WHERE id = ?")?;
            statement.bind((1, id))?;
            statement.next()?;
            Ok(ExaminerDeletion::Deleted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::submitted_protocol::SubmittedProtocol;

    #[test]
    fn referenced_examiner_cannot_be_deleted() {
        let mut database = Database::in_memory().expect("open");
        let user = database.create_user("Test", "t@example.org", "hash", 2, "token").expect("user");
        let a = database.create_examiner("Dr. A", "Hessen").expect("a");
        let b = database.create_examiner("Dr. B", "Hessen").expect("b");
        let c = database.create_examiner("Dr. C", "Hessen").expect("c");
        let unused = database.create_examiner("Dr. D", "Hessen").expect("d");

        let protocol = SubmittedProtocol::for_tests("Hessen", [a, b, c]);
        database.create_protocol(user, &protocol).expect("protocol");

        assert_eq!(database.delete_examiner(b).expect("delete b"), ExaminerDeletion::InUse);
        assert_eq!(database.delete_examiner(unused).expect("delete d"), ExaminerDeletion::Deleted);
        assert_eq!(database.delete_examiner(unused).expect("delete d twice"), ExaminerDeletion::NotFound);
        assert_eq!(database.count_examiners().expect("count"), 3);
    }

    #[test]
    fn region_listing_is_sorted_by_name() {
        let mut database = Database::in_memory().expect("open");
        database.create_examiner("Dr. Zander", "Bremen").expect("z");
        database.create_examiner("Dr. Albers", "Bremen").expect("a");
        database.create_examiner("Dr. Other", "Hamburg").expect("o");

        let names: Vec<String> = database
            .examiners_in_region("Bremen")
            .expect("list")
            .into_iter()
            .map(|examiner| examiner.name)
            .collect();

        assert_eq!(names, vec!["Dr. Albers".to_string(), "Dr. Zander".to_string()]);
    }
}
