//! Master user repository implementation
//!
//! The master list is reference data maintained outside the core; the only
//! write here is the seeding upsert used by setup tooling and tests.

use sqlx::{PgConnection, PgPool};
use crate::models::master::MasterUser;
use crate::utils::errors::QueueBuddyError;

#[derive(Debug, Clone)]
pub struct MasterUserRepository {
    pool: PgPool,
}

impl MasterUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<MasterUser>, QueueBuddyError> {
        let user = sqlx::query_as::<_, MasterUser>(
            "SELECT email, first_name, last_name, quota FROM master_users WHERE email = $1"
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Seed or update one master entry
    pub async fn upsert(&self, user: &MasterUser) -> Result<(), QueueBuddyError> {
        sqlx::query(
            r#"
            INSERT INTO master_users (email, first_name, last_name, quota)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                quota = EXCLUDED.quota
            "#
        )
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.quota)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Master lookup inside the caller's transaction
pub async fn find_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<MasterUser>, QueueBuddyError> {
    let user = sqlx::query_as::<_, MasterUser>(
        "SELECT email, first_name, last_name, quota FROM master_users WHERE email = $1"
    )
    .bind(email)
    .fetch_optional(conn)
    .await?;

    Ok(user)
}
