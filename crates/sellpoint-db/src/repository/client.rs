//! # Client Repository
//!
//! Customers who receive invoices. E-mail is unique (case-insensitive) and
//! so is phone, when given.

use chrono::Utc;
use sellpoint_core::filter::Page;
use sellpoint_core::{Client, NewClient};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const CLIENT_SELECT: &str = r#"
    SELECT id, name, email, address, phone, tax_id, country, region, city, created_at
    FROM clients
"#;

#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Inserts a client.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - E-mail or phone already registered
    pub async fn insert(&self, client: &NewClient) -> DbResult<Client> {
        debug!(email = %client.email, "Inserting client");

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let email = client.email.trim().to_string();

        sqlx::query(
            r#"
            INSERT INTO clients (id, name, email, address, phone, tax_id, country, region, city, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&id)
        .bind(client.name.trim())
        .bind(&email)
        .bind(&client.address)
        .bind(&client.phone)
        .bind(&client.tax_id)
        .bind(&client.country)
        .bind(&client.region)
        .bind(&client.city)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("phone") => {
                DbError::duplicate(field, client.phone.clone().unwrap_or_default())
            }
            other => other.with_duplicate_value(&email),
        })?;

        info!(id = %id, "Client registered");

        Ok(Client {
            id,
            name: client.name.trim().to_string(),
            email,
            address: client.address.clone(),
            phone: client.phone.clone(),
            tax_id: client.tax_id.clone(),
            country: client.country.clone(),
            region: client.region.clone(),
            city: client.city.clone(),
            created_at: now,
        })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let sql = format!("{CLIENT_SELECT} WHERE id = ?1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// Exact e-mail match, ignoring case.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<Client>> {
        let sql = format!("{CLIENT_SELECT} WHERE email = ?1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// Clients ordered by name.
    pub async fn list(&self, page: Page) -> DbResult<Vec<Client>> {
        let sql = format!("{CLIENT_SELECT} ORDER BY name, email LIMIT ?1 OFFSET ?2");
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    /// Clients whose e-mail contains `needle`, ignoring case.
    pub async fn search_by_email(&self, needle: &str, page: Page) -> DbResult<Vec<Client>> {
        let sql = format!(
            "{CLIENT_SELECT} WHERE instr(LOWER(email), LOWER(?1)) > 0 ORDER BY name, email LIMIT ?2 OFFSET ?3"
        );
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(needle.trim())
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await?;

        debug!(needle = %needle, count = clients.len(), "Searched clients");
        Ok(clients)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn new_client(name: &str, email: &str, phone: Option<&str>) -> NewClient {
        NewClient {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ana = db
            .clients()
            .insert(&new_client("Ana", "ana@example.com", Some("555-0101")))
            .await
            .unwrap();

        let by_id = db.clients().get_by_id(&ana.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "ana@example.com");

        let by_email = db.clients().get_by_email("ANA@example.com").await.unwrap();
        assert_eq!(by_email.map(|c| c.id), Some(ana.id));
    }

    #[tokio::test]
    async fn test_duplicate_email_and_phone() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.clients();
        repo.insert(&new_client("Ana", "ana@example.com", Some("555-0101")))
            .await
            .unwrap();

        let err = repo
            .insert(&new_client("Ana B", "Ana@Example.com", None))
            .await
            .unwrap_err();
        match err {
            DbError::UniqueViolation { field, value } => {
                assert!(field.ends_with("email"));
                assert_eq!(value, "Ana@Example.com");
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }

        let err = repo
            .insert(&new_client("Bob", "bob@example.com", Some("555-0101")))
            .await
            .unwrap_err();
        match err {
            DbError::UniqueViolation { field, value } => {
                assert!(field.ends_with("phone"));
                assert_eq!(value, "555-0101");
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.clients();
        repo.insert(&new_client("Zoe", "zoe@shop.io", None)).await.unwrap();
        repo.insert(&new_client("Ana", "ana@example.com", None)).await.unwrap();
        repo.insert(&new_client("Bob", "bob@EXAMPLE.com", None)).await.unwrap();

        let listed = repo.list(Page::first(10)).await.unwrap();
        let names: Vec<_> = listed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bob", "Zoe"]);

        let found = repo.search_by_email("example", Page::first(10)).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(repo.count().await.unwrap(), 3);
    }
}
