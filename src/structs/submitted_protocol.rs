use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::storage::parse_date;

use super::{post_inputs::ProtocolForm, region::Region};

/// A protocol whose form fields passed validation. Examiner existence is
/// checked against the database separately.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubmittedProtocol {
    pub exam_date: NaiveDate,
    pub region: Region,
    pub examiner_ids: [i64; 3],
    pub content: String,
    pub hashtags: String,
    pub comment: Option<String>,
}

fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

impl SubmittedProtocol {
    /// Validates a submitted form. `min_content_chars` is 1 for authors and
    /// stricter for admin edits. All problems are reported at once.
    pub fn validate(form: &ProtocolForm, min_content_chars: usize) -> Result<SubmittedProtocol, Vec<String>> {
        let mut errors = vec![];

        let exam_date = match required(&form.exam_date) {
            Some(raw) => parse_date(raw).or_else(|| {
                errors.push("Ungültiges Prüfungsdatum.".to_string());
                None
            }),
            None => {
                errors.push("Datum ist erforderlich.".to_string());
                None
            }
        };

        let region = required(&form.region).and_then(Region::from_name);
        if region.is_none() {
            errors.push("Gültiges Bundesland ist erforderlich.".to_string());
        }

        let raw_ids = [&form.examiner1, &form.examiner2, &form.examiner3];
        let mut examiner_ids = [0i64; 3];
        if raw_ids.iter().any(|raw| required(raw).is_none()) {
            errors.push("Alle drei Prüfer müssen ausgewählt werden.".to_string());
        } else {
            let parsed: Result<Vec<i64>, _> = raw_ids
                .iter()
                .map(|raw| required(raw).unwrap_or_default().parse::<i64>())
                .collect();
            match parsed {
                Ok(ids) => {
                    examiner_ids.copy_from_slice(&ids);
                    if ids[0] == ids[1] || ids[0] == ids[2] || ids[1] == ids[2] {
                        errors.push("Alle drei Prüfer müssen unterschiedlich sein.".to_string());
                    }
                }
                Err(_) => errors.push("Ungültige Prüfer-IDs.".to_string()),
            }
        }

        let content = form.content.as_deref().map(str::trim).unwrap_or_default();
        if content.is_empty() {
            errors.push("Prüfungsinhalt ist erforderlich.".to_string());
        } else if content.chars().count() < min_content_chars {
            errors.push(format!("Prüfungsinhalt muss mindestens {} Zeichen lang sein.", min_content_chars));
        }

        match (exam_date, region) {
            (Some(exam_date), Some(region)) if errors.is_empty() => Ok(SubmittedProtocol {
                exam_date,
                region,
                examiner_ids,
                content: content.to_string(),
                hashtags: form.hashtags.as_deref().map(str::trim).unwrap_or_default().to_string(),
                comment: required(&form.comment).map(str::to_string),
            }),
            _ => Err(errors),
        }
    }

    #[cfg(test)]
    pub fn for_tests(region: &str, examiner_ids: [i64; 3]) -> SubmittedProtocol {
        SubmittedProtocol {
            exam_date: NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date"),
            region: Region::from_name(region).unwrap_or(Region::Berlin),
            examiner_ids,
            content: "Fragen zu Steinleiden und Harninkontinenz".to_string(),
            hashtags: "#Steinleiden #Harninkontinenz".to_string(),
            comment: None,
        }
    }
}
