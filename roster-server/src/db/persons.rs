//! Person persistence
//!
//! Person and detail rows are always written together inside one
//! transaction; the transaction rolls back on drop if any step fails.

use chrono::Utc;
use roster_common::db::models::{fold_case, NewPerson, PersonRecord, PersonUpdate};
use roster_common::{Error, Result};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, info};

/// Rows per membership lookup; each row binds two parameters
const LOOKUP_CHUNK: usize = 400;

const SELECT_RECORD: &str = r#"
    SELECT p.id, p.name, p.email, p.contact_number, p.created_at,
           d.age, d.gender, d.location
    FROM persons p
    JOIN person_details d ON p.id = d.user_id
"#;

/// Emails and contact numbers already present in the store
#[derive(Debug, Default, Clone)]
pub struct ExistingIdentities {
    pub emails: HashSet<String>,
    pub contacts: HashSet<String>,
}

/// Repository over `persons` + `person_details`
#[derive(Clone)]
pub struct PersonRepository {
    pool: SqlitePool,
}

impl PersonRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch stored emails/contacts matching any of the given candidates
    ///
    /// `candidates` pairs each row's email with its contact number.
    pub async fn existing_identities(
        &self,
        candidates: &[(String, String)],
    ) -> Result<ExistingIdentities> {
        let mut existing = ExistingIdentities::default();

        for chunk in candidates.chunks(LOOKUP_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT email, contact_number FROM persons WHERE email IN (");
            {
                let mut emails = qb.separated(", ");
                for (email, _) in chunk {
                    emails.push_bind(email.clone());
                }
            }
            qb.push(") OR contact_number IN (");
            {
                let mut contacts = qb.separated(", ");
                for (_, contact) in chunk {
                    contacts.push_bind(contact.clone());
                }
            }
            qb.push(")");

            let rows: Vec<(String, String)> = qb.build_query_as().fetch_all(&self.pool).await?;
            for (email, contact) in rows {
                existing.emails.insert(email);
                existing.contacts.insert(contact);
            }
        }

        debug!(
            "Found {} existing emails, {} existing contacts",
            existing.emails.len(),
            existing.contacts.len()
        );

        Ok(existing)
    }

    /// Insert all people in one transaction; all or nothing
    pub async fn insert_batch(&self, people: &[NewPerson]) -> Result<u64> {
        if people.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for person in people {
            insert_person(&mut tx, person).await?;
        }
        tx.commit().await?;

        info!("Committed {} persons", people.len());
        Ok(people.len() as u64)
    }

    /// Load one joined record
    pub async fn find(&self, id: i64) -> Result<Option<PersonRecord>> {
        let mut conn = self.pool.acquire().await?;
        load_record(&mut conn, id).await
    }

    /// Apply a partial update to both tables and return the joined record
    pub async fn update(&self, id: i64, update: &PersonUpdate) -> Result<PersonRecord> {
        update.validate()?;

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE persons
            SET name = COALESCE(?, name),
                name_folded = COALESCE(?, name_folded),
                email = COALESCE(?, email),
                contact_number = COALESCE(?, contact_number)
            WHERE id = ?
            "#,
        )
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.name.as_deref().map(|n| fold_case(n.trim())))
        .bind(update.email.as_deref().map(str::trim))
        .bind(update.contact_number.as_deref().map(str::trim))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(format!("User {} not found.", id)));
        }

        let age = update.age_value();
        let gender = update.gender_value();
        let location = update.location_value();

        sqlx::query(
            r#"
            UPDATE person_details
            SET age = CASE WHEN ? THEN ? ELSE age END,
                gender = CASE WHEN ? THEN ? ELSE gender END,
                location = CASE WHEN ? THEN ? ELSE location END,
                location_folded = CASE WHEN ? THEN ? ELSE location_folded END
            WHERE user_id = ?
            "#,
        )
        .bind(age.is_some())
        .bind(age.flatten())
        .bind(gender.is_some())
        .bind(gender.flatten())
        .bind(location.is_some())
        .bind(location.clone().flatten())
        .bind(location.is_some())
        .bind(location.flatten().as_deref().map(fold_case))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let record = load_record(&mut tx, id)
            .await?
            .ok_or_else(|| Error::Internal(format!("User {} has no detail row", id)))?;

        tx.commit().await?;

        info!("Updated user {}", id);
        Ok(record)
    }

    /// Delete a person and its detail row; missing ids are not an error
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM person_details WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM persons WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if deleted > 0 {
            info!("Deleted user {}", id);
        } else {
            debug!("Delete of user {} matched no rows", id);
        }
        Ok(deleted > 0)
    }
}

async fn insert_person(conn: &mut SqliteConnection, person: &NewPerson) -> Result<i64> {
    let user_id = sqlx::query(
        "INSERT INTO persons (name, name_folded, email, contact_number, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&person.name)
    .bind(fold_case(&person.name))
    .bind(&person.email)
    .bind(&person.contact_number)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    sqlx::query(
        "INSERT INTO person_details (user_id, age, gender, location, location_folded) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(person.detail.age)
    .bind(&person.detail.gender)
    .bind(&person.detail.location)
    .bind(person.detail.location.as_deref().map(fold_case))
    .execute(&mut *conn)
    .await?;

    Ok(user_id)
}

async fn load_record(conn: &mut SqliteConnection, id: i64) -> Result<Option<PersonRecord>> {
    let row = sqlx::query(&format!("{} WHERE p.id = ?", SELECT_RECORD))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(PersonRecord::from_row).transpose()
}
