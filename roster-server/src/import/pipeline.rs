//! Bulk import: parse → validate → deduplicate → transactional insert
//!
//! Duplicate detection runs against the store (one membership lookup for the
//! whole batch) and within the batch (first occurrence in file order wins).
//! The UNIQUE constraints stay authoritative: a concurrent import that slips
//! past the lookup fails the commit with `Error::UniqueViolation` and nothing
//! from this batch is kept.

use super::parse::{parse_upload, SheetRow};
use crate::db::{ExistingIdentities, PersonRepository};
use roster_common::db::models::{coerce_age, NewPerson, PersonDetail};
use roster_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{info, warn};

/// Result of one upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub inserted_count: u64,
    /// Rejected rows in file order, as uploaded
    pub duplicates: Vec<SheetRow>,
    /// Rows missing Name/Email/ContactNumber; only when reporting is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_rows: Option<Vec<SheetRow>>,
}

/// Row that passed validation, with its normalized person
#[derive(Debug, Clone)]
pub struct ValidRow {
    pub source: SheetRow,
    pub person: NewPerson,
}

/// Rows sorted into their outcome buckets, each in file order
#[derive(Debug, Default)]
pub struct Classified {
    pub accepted: Vec<NewPerson>,
    pub duplicates: Vec<SheetRow>,
}

/// Split rows into those with all required fields and the rest
pub fn validate_rows(rows: Vec<SheetRow>) -> (Vec<ValidRow>, Vec<SheetRow>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for row in rows {
        match to_new_person(&row) {
            Some(person) => valid.push(ValidRow { source: row, person }),
            None => invalid.push(row),
        }
    }

    (valid, invalid)
}

/// Walk valid rows in file order, rejecting any whose email or contact is
/// already stored or was accepted earlier in this batch
pub fn classify(rows: Vec<ValidRow>, existing: &ExistingIdentities) -> Classified {
    let mut seen_emails: HashSet<String> = HashSet::new();
    let mut seen_contacts: HashSet<String> = HashSet::new();
    let mut classified = Classified::default();

    for row in rows {
        let email = &row.person.email;
        let contact = &row.person.contact_number;

        let duplicate = existing.emails.contains(email)
            || existing.contacts.contains(contact)
            || seen_emails.contains(email)
            || seen_contacts.contains(contact);

        if duplicate {
            classified.duplicates.push(row.source);
        } else {
            seen_emails.insert(email.clone());
            seen_contacts.insert(contact.clone());
            classified.accepted.push(row.person);
        }
    }

    classified
}

fn required(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn to_new_person(row: &SheetRow) -> Option<NewPerson> {
    Some(NewPerson {
        name: required(&row.name)?,
        email: required(&row.email)?,
        contact_number: required(&row.contact_number)?,
        detail: PersonDetail {
            age: row.age.as_ref().and_then(coerce_age),
            gender: row.gender.clone(),
            location: row.location.clone(),
        },
    })
}

/// Import pipeline over an injected store handle
#[derive(Clone)]
pub struct ImportPipeline {
    repo: PersonRepository,
    report_invalid_rows: bool,
}

impl ImportPipeline {
    pub fn new(pool: SqlitePool, report_invalid_rows: bool) -> Self {
        Self {
            repo: PersonRepository::new(pool),
            report_invalid_rows,
        }
    }

    /// Run the whole pipeline on an uploaded buffer
    pub async fn run(&self, bytes: &[u8]) -> Result<ImportOutcome> {
        let rows = parse_upload(bytes)?;
        let decoded = rows.len();

        let (valid, invalid) = validate_rows(rows);

        let candidates: Vec<(String, String)> = valid
            .iter()
            .map(|r| (r.person.email.clone(), r.person.contact_number.clone()))
            .collect();
        let existing = if candidates.is_empty() {
            ExistingIdentities::default()
        } else {
            self.repo.existing_identities(&candidates).await?
        };

        let classified = classify(valid, &existing);

        let inserted_count = match self.repo.insert_batch(&classified.accepted).await {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    "Import of {} rows rolled back: {}",
                    classified.accepted.len(),
                    e
                );
                return Err(e);
            }
        };

        info!(
            "Import complete: {} decoded, {} invalid, {} duplicates, {} inserted",
            decoded,
            invalid.len(),
            classified.duplicates.len(),
            inserted_count
        );

        Ok(ImportOutcome {
            inserted_count,
            duplicates: classified.duplicates,
            invalid_rows: self.report_invalid_rows.then_some(invalid),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(name: &str, email: &str, contact: &str) -> SheetRow {
        SheetRow {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            contact_number: Some(contact.to_string()),
            ..SheetRow::default()
        }
    }

    #[test]
    fn test_validate_requires_three_fields() {
        let rows = vec![
            row("Ann", "ann@x.io", "1"),
            SheetRow {
                name: Some("NoContact".to_string()),
                email: Some("nc@x.io".to_string()),
                ..SheetRow::default()
            },
            row("", "blank@x.io", "2"),
            row("Bob", "bob@x.io", "3"),
        ];

        let (valid, invalid) = validate_rows(rows);

        assert_eq!(valid.len(), 2);
        assert_eq!(invalid.len(), 2);
        assert_eq!(invalid[0].name.as_deref(), Some("NoContact"));
    }

    #[test]
    fn test_age_is_coerced_on_import() {
        let mut with_age = row("Ann", "ann@x.io", "1");
        with_age.age = Some(json!("thirty"));
        let mut numeric = row("Bob", "bob@x.io", "2");
        numeric.age = Some(json!(44));

        let (valid, _) = validate_rows(vec![with_age, numeric]);

        assert_eq!(valid[0].person.detail.age, None);
        assert_eq!(valid[1].person.detail.age, Some(44));
    }

    #[test]
    fn test_first_occurrence_in_batch_wins() {
        let (valid, _) = validate_rows(vec![
            row("Ann", "same@x.io", "1"),
            row("Ann again", "same@x.io", "2"),
            row("Cy", "cy@x.io", "1"),
            row("Dee", "dee@x.io", "4"),
        ]);

        let classified = classify(valid, &ExistingIdentities::default());

        let accepted: Vec<&str> = classified.accepted.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(accepted, vec!["Ann", "Dee"]);
        let duplicates: Vec<&str> = classified
            .duplicates
            .iter()
            .filter_map(|r| r.name.as_deref())
            .collect();
        assert_eq!(duplicates, vec!["Ann again", "Cy"]);
    }

    #[test]
    fn test_existing_store_entries_are_duplicates() {
        let mut existing = ExistingIdentities::default();
        existing.emails.insert("old@x.io".to_string());
        existing.contacts.insert("777".to_string());

        let (valid, _) = validate_rows(vec![
            row("Old email", "old@x.io", "1"),
            row("Old contact", "new@x.io", "777"),
            row("Fresh", "fresh@x.io", "2"),
        ]);
        let classified = classify(valid, &existing);

        assert_eq!(classified.accepted.len(), 1);
        assert_eq!(classified.accepted[0].email, "fresh@x.io");
        assert_eq!(classified.duplicates.len(), 2);
    }

    #[test]
    fn test_contact_match_is_exact() {
        let mut existing = ExistingIdentities::default();
        existing.contacts.insert("555-0100".to_string());

        let (valid, _) = validate_rows(vec![row("Ann", "ann@x.io", "5550100")]);
        let classified = classify(valid, &existing);

        assert_eq!(classified.accepted.len(), 1);
    }
}
