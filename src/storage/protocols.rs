use std::collections::HashMap;

use sqlite::{Error, State, Statement};

use crate::structs::{get_inputs::Search, submitted_protocol::SubmittedProtocol};

use super::{database::Database, examiners::Examiner, DATE_FORMAT};

#[derive(Debug, Clone)]
pub struct ProtocolListing {
    pub id: i64,
    pub exam_date: String,
    pub region: String,
    pub examiners: [String; 3],
    pub content: String,
    pub hashtags: String,
    pub comment: Option<String>,
    pub author_id: i64,
    pub author_name: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ProtocolDetails {
    pub id: i64,
    pub exam_date: String,
    pub region: String,
    pub content: String,
    pub hashtags: String,
    pub comment: Option<String>,
    pub created_at: String,
    pub author_id: i64,
    pub author_name: String,
    pub author_email: String,
    pub examiners: [Examiner; 3],
}

const LISTING_QUERY: &str = "
    SELECT p.id, p.exam_date, p.region, e1.name AS examiner1, e2.name AS examiner2, e3.name AS examiner3,
           p.content, p.hashtags, p.comment, p.created_at, u.id AS author_id, u.name AS author_name
    FROM protocols p
    JOIN examiners e1 ON p.examiner1_id = e1.id
    JOIN examiners e2 ON p.examiner2_id = e2.id
    JOIN examiners e3 ON p.examiner3_id = e3.id
    JOIN users u ON p.user_id = u.id
    WHERE 1 = 1";

fn read_listing(statement: &Statement<'_>) -> Result<ProtocolListing, Error> {
    Ok(ProtocolListing {
        id: statement.read::<i64, _>("id")?,
        exam_date: statement.read::<String, _>("exam_date")?,
        region: statement.read::<String, _>("region")?,
        examiners: [
            statement.read::<String, _>("examiner1")?,
            statement.read::<String, _>("examiner2")?,
            statement.read::<String, _>("examiner3")?,
        ],
        content: statement.read::<String, _>("content")?,
        hashtags: statement.read::<String, _>("hashtags")?,
        comment: statement.read::<Option<String>, _>("comment")?,
        author_id: statement.read::<i64, _>("author_id")?,
        author_name: statement.read::<String, _>("author_name")?,
        created_at: statement.read::<String, _>("created_at")?,
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn bind_protocol(statement: &mut Statement<'_>, protocol: &SubmittedProtocol) -> Result<(), Error> {
    let exam_date = protocol.exam_date.format(DATE_FORMAT).to_string();
    statement.bind((1, exam_date.as_str()))?;
    statement.bind((2, protocol.region.name()))?;
    statement.bind((3, protocol.examiner_ids[0]))?;
    statement.bind((4, protocol.examiner_ids[1]))?;
    statement.bind((5, protocol.examiner_ids[2]))?;
    statement.bind((6, protocol.content.as_str()))?;
    statement.bind((7, protocol.hashtags.as_str()))?;
    statement.bind((8, protocol.comment.as_deref()))?;
    Ok(())
}

/// Counts whitespace separated tags over all given hashtag fields and returns
/// the `limit` most frequent ones. Ties are ordered alphabetically.
pub fn top_hashtags<'a>(fields: impl IntoIterator<Item = &'a str>, limit: usize) -> Vec<(String, usize)> {
    let mut counter: HashMap<&str, usize> = HashMap::new();
    for field in fields {
        for tag in field.split_whitespace() {
            *counter.entry(tag).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counter.into_iter().map(|(tag, count)| (tag.to_string(), count)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

impl Database {
    /// Stores a protocol and marks every pending reminder of its author as
    /// done, regardless of the exam date the reminder was created for.
    pub fn create_protocol(&mut self, user_id: i64, protocol: &SubmittedProtocol) -> Result<i64, Error> {
        self.transaction(|db| {
            let mut statement = db.connection().prepare(
                "INSERT INTO protocols (exam_date, region, examiner1_id, examiner2_id, examiner3_id, content, hashtags, comment, user_id)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            bind_protocol(&mut statement, protocol)?;
            statement.bind((9, user_id))?;
            statement.next()?;
            drop(statement);

            let id = db.last_insert_id()?;
            db.complete_reminders(user_id)?;
            Ok(id)
        })
    }

    pub fn update_protocol(&mut self, id: i64, protocol: &SubmittedProtocol) -> Result<(), Error> {
        let mut statement = self.connection().prepare(
            "UPDATE protocols SET exam_date = ?, region = ?, examiner1_id = ?, examiner2_id = ?, examiner3_id = ?,
                 content = ?, hashtags = ?, comment = ?
             WHERE id = ?",
        )?;
        bind_protocol(&mut statement, protocol)?;
        statement.bind((9, id))?;
        statement.next()?;
        Ok(())
    }

    pub fn delete_protocol(&mut self, id: i64) -> Result<(), Error> {
        let mut statement = self.connection().prepare("DELETE FROM protocols WHERE id = ?")?;
        statement.bind((1, id))?;
        statement.next()?;
        Ok(())
    }

    pub fn get_protocol(&self, id: i64) -> Result<Option<ProtocolDetails>, Error> {
        let mut statement = self.connection().prepare(
            "SELECT p.id, p.exam_date, p.region, p.content, p.hashtags, p.comment, p.created_at,
                    u.id AS author_id, u.name AS author_name, u.email AS author_email,
                    e1.id AS e1_id, e1.name AS e1_name, e1.region AS e1_region,
                    e2.id AS e2_id, e2.name AS e2_name, e2.region AS e2_region,
                    e3.id AS e3_id, e3.name AS e3_name, e3.region AS e3_region
             FROM protocols p
             JOIN users u ON p.user_id = u.id
             JOIN examiners e1 ON p.examiner1_id = e1.id
             JOIN examiners e2 ON p.examiner2_id = e2.id
             JOIN examiners e3 ON p.examiner3_id = e3.id
             WHERE p.id = ?",
        )?;
        statement.bind((1, id))?;

        if let State::Row = statement.next()? {
            let examiner = |prefix: &str| -> Result<Examiner, Error> {
                Ok(Examiner {
                    id: statement.read::<i64, _>(format!("{}_id", prefix).as_str())?,
                    name: statement.read::<String, _>(format!("{}_name", prefix).as_str())?,
                    region: statement.read::<String, _>(format!("{}_region", prefix).as_str())?,
                })
            };

            Ok(Some(ProtocolDetails {
                id: statement.read::<i64, _>("id")?,
                exam_date: statement.read::<String, _>("exam_date")?,
                region: statement.read::<String, _>("region")?,
                content: statement.read::<String, _>("content")?,
                hashtags: statement.read::<String, _>("hashtags")?,
                comment: statement.read::<Option<String>, _>("comment")?,
                created_at: statement.read::<String, _>("created_at")?,
                author_id: statement.read::<i64, _>("author_id")?,
                author_name: statement.read::<String, _>("author_name")?,
                author_email: statement.read::<String, _>("author_email")?,
                examiners: [examiner("e1")?, examiner("e2")?, examiner("e3")?],
            }))
        } else {
            Ok(None)
        }
    }

    /// Filtered listing. Region matches exactly, examiner and hashtag
    /// filters are substring matches. With `extended` the author, date range
    /// and sort parameters apply as well.
    pub fn list_protocols(&self, search: &Search, extended: bool) -> Result<Vec<ProtocolListing>, Error> {
        let mut sql = LISTING_QUERY.to_string();
        let mut params: Vec<String> = vec![];

        if let Some(region) = non_empty(&search.region) {
            sql.push_str(" AND p.region = ?");
            params.push(region.to_string());
        }
        if let Some(examiner) = non_empty(&search.examiner) {
            sql.push_str(" AND (e1.name LIKE ? OR e2.name LIKE ? OR e3.name LIKE ?)");
            params.extend(std::iter::repeat(format!("%{}%", examiner)).take(3));
        }
        if let Some(hashtag) = non_empty(&search.hashtag) {
            sql.push_str(" AND p.hashtags LIKE ?");
            params.push(format!("%{}%", hashtag));
        }

        let mut order = "p.created_at DESC, p.id DESC".to_string();
        if extended {
            if let Some(user) = non_empty(&search.user) {
                sql.push_str(" AND u.name LIKE ?");
                params.push(format!("%{}%", user));
            }
            if let Some(from) = non_empty(&search.date_from) {
                sql.push_str(" AND p.exam_date >= ?");
                params.push(from.to_string());
            }
            if let Some(to) = non_empty(&search.date_to) {
                sql.push_str(" AND p.exam_date <= ?");
                params.push(to.to_string());
            }

            let column = match search.sort.as_deref() {
                Some("date") => "p.exam_date",
                Some("region") => "p.region",
                Some("user_name") => "u.name",
                _ => "p.created_at",
            };
            let direction = if crate::structs::get_inputs::is_descending(search.order.as_deref()) { "DESC" } else { "ASC" };
            order = format!("{} {}, p.id {}", column, direction, direction);
        }
        sql.push_str(&format!(" ORDER BY {}", order));

        let mut statement = self.connection().prepare(sql)?;
        for (index, param) in params.iter().enumerate() {
            statement.bind((index + 1, param.as_str()))?;
        }

        let mut protocols = vec![];
        while let State::Row = statement.next()? {
            protocols.push(read_listing(&statement)?);
        }
        Ok(protocols)
    }

    pub fn latest_protocols(&self, limit: i64) -> Result<Vec<ProtocolListing>, Error> {
        self.query_listings(&format!("{} ORDER BY p.created_at DESC, p.id DESC LIMIT ?", LISTING_QUERY), None, limit)
    }

    pub fn protocols_of_user(&self, user_id: i64, limit: i64) -> Result<Vec<ProtocolListing>, Error> {
        self.query_listings(
            &format!("{} AND p.user_id = ? ORDER BY p.created_at DESC, p.id DESC LIMIT ?", LISTING_QUERY),
            Some(user_id),
            limit,
        )
    }

    fn query_listings(&self, sql: &str, user_id: Option<i64>, limit: i64) -> Result<Vec<ProtocolListing>, Error> {
        let mut statement = self.connection().prepare(sql)?;
        let mut index = 1;
        if let Some(user_id) = user_id {
            statement.bind((index, user_id))?;
            index += 1;
        }
        statement.bind((index, limit))?;

        let mut protocols = vec![];
        while let State::Row = statement.next()? {
            protocols.push(read_listing(&statement)?);
        }
        Ok(protocols)
    }

    pub fn count_protocols(&self) -> Result<i64, Error> {
        self.count("SELECT COUNT(*) FROM protocols", &[])
    }

    pub fn count_user_protocols(&self, user_id: i64) -> Result<i64, Error> {
        self.count("SELECT COUNT(*) FROM protocols WHERE user_id = ?", &[&user_id.to_string()])
    }

    pub fn count_protocol_authors(&self) -> Result<i64, Error> {
        self.count("SELECT COUNT(DISTINCT user_id) FROM protocols", &[])
    }

    pub fn count_protocol_regions(&self) -> Result<i64, Error> {
        self.count("SELECT COUNT(DISTINCT region) FROM protocols", &[])
    }

    /// Creation time of the first and the latest protocol of a user.
    pub fn user_protocol_range(&self, user_id: i64) -> Result<(Option<String>, Option<String>), Error> {
        let mut statement = self
            .connection()
            .prepare("SELECT MIN(created_at) AS first, MAX(created_at) AS last FROM protocols WHERE user_id = ?")?;
        statement.bind((1, user_id))?;
        statement.next()?;

        Ok((
            statement.read::<Option<String>, _>("first")?,
            statement.read::<Option<String>, _>("last")?,
        ))
    }

    pub fn user_top_hashtags(&self, user_id: i64, limit: usize) -> Result<Vec<(String, usize)>, Error> {
        let mut statement = self
            .connection()
            .prepare("SELECT hashtags FROM protocols WHERE user_id = ? AND hashtags != ''")?;
        statement.bind((1, user_id))?;

        let mut fields = vec![];
        while let State::Row = statement.next()? {
            fields.push(statement.read::<String, _>("hashtags")?);
        }

        Ok(top_hashtags(fields.iter().map(String::as_str), limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, i64, [i64; 3]) {
        let mut database = Database::in_memory().expect("open");
        let user = database.create_user("Autorin", "a@example.org", "hash", 4, "token").expect("user");
        let ids = [
            database.create_examiner("Prof. Dr. Braun", "Sachsen").expect("1"),
            database.create_examiner("Dr. Vogel", "Sachsen").expect("2"),
            database.create_examiner("Dr. Krause", "Sachsen").expect("3"),
        ];
        (database, user, ids)
    }

    #[test]
    fn listing_filters_by_region_examiner_and_hashtag() {
        let (mut database, user, ids) = setup();
        database.create_protocol(user, &SubmittedProtocol::for_tests("Sachsen", ids)).expect("create");
        database.create_protocol(user, &SubmittedProtocol::for_tests("Bremen", ids)).expect("create");

        let by_region = database
            .list_protocols(&Search { region: Some("Sachsen".to_string()), ..Default::default() }, false)
            .expect("region");
        assert_eq!(by_region.len(), 1);
        assert_eq!(by_region[0].examiners[1], "Dr. Vogel");

        let by_examiner = database
            .list_protocols(&Search { examiner: Some("Krause".to_string()), ..Default::default() }, false)
            .expect("examiner");
        assert_eq!(by_examiner.len(), 2);

        let by_tag = database
            .list_protocols(&Search { hashtag: Some("#Onkologie".to_string()), ..Default::default() }, false)
            .expect("hashtag");
        assert!(by_tag.is_empty());
    }

    #[test]
    fn details_carry_all_three_examiners() {
        let (mut database, user, ids) = setup();
        let id = database.create_protocol(user, &SubmittedProtocol::for_tests("Sachsen", ids)).expect("create");

        let details = database.get_protocol(id).expect("get").expect("exists");
        assert_eq!(details.author_email, "a@example.org");
        assert_eq!(details.examiners.map(|examiner| examiner.id), ids);

        database.delete_protocol(id).expect("delete");
        assert!(database.get_protocol(id).expect("get").is_none());
    }

    #[test]
    fn hashtags_are_ranked_by_frequency() {
        let ranked = top_hashtags(["#Niere #Blase", "#Niere", "  #Prostata   #Niere "], 2);

        assert_eq!(ranked, vec![("#Niere".to_string(), 3), ("#Blase".to_string(), 1)]);
    }
}
