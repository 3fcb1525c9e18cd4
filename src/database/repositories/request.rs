//! Registration request repository implementation

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use crate::models::request::{RegistrationRequest, RequestSource, RequestStatus};
use crate::utils::errors::QueueBuddyError;

const REQUEST_COLUMNS: &str =
    "id, event_id, email, name, wa, source, status, is_master_match, master_quota, issued_before, created_at, updated_at";

/// Filter for the registrant listing; `None` means "all"
#[derive(Debug, Clone, Default)]
pub struct RegistrantFilter {
    pub status: Option<RequestStatus>,
    pub source: Option<RequestSource>,
    pub query: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the PENDING request for (event, email), if any
    pub async fn find_pending(&self, event_id: i64, email: &str) -> Result<Option<RegistrationRequest>, QueueBuddyError> {
        let request = sqlx::query_as::<_, RegistrationRequest>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM registration_requests
            WHERE event_id = $1 AND email = $2 AND status = 'PENDING'
            LIMIT 1
            "#
        ))
        .bind(event_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    /// Insert a new PENDING request. Returns `None` when a concurrent
    /// submission already holds the PENDING slot for (event, email); the
    /// partial unique index makes the race lose cleanly instead of erroring.
    pub async fn insert_pending(
        &self,
        event_id: i64,
        email: &str,
        name: &str,
        wa: Option<&str>,
        source: RequestSource,
        is_master_match: bool,
        master_quota: i32,
        issued_before: i32,
    ) -> Result<Option<RegistrationRequest>, QueueBuddyError> {
        let request = sqlx::query_as::<_, RegistrationRequest>(&format!(
            r#"
            INSERT INTO registration_requests
                (event_id, email, name, wa, source, status, is_master_match, master_quota, issued_before, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'PENDING', $6, $7, $8, NOW(), NOW())
            ON CONFLICT (event_id, email) WHERE status = 'PENDING' DO NOTHING
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(email)
        .bind(name)
        .bind(wa)
        .bind(source)
        .bind(is_master_match)
        .bind(master_quota)
        .bind(issued_before)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    /// All PENDING requests for an event, oldest first
    pub async fn list_pending(&self, event_id: i64) -> Result<Vec<RegistrationRequest>, QueueBuddyError> {
        let requests = sqlx::query_as::<_, RegistrationRequest>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM registration_requests
            WHERE event_id = $1 AND status = 'PENDING'
            ORDER BY created_at ASC
            "#
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    /// Filtered, paginated registrant listing with total count
    pub async fn list(
        &self,
        event_id: i64,
        filter: &RegistrantFilter,
    ) -> Result<(i64, Vec<RegistrationRequest>), QueueBuddyError> {
        let limit = filter.limit.unwrap_or(50).clamp(1, 200);
        let offset = filter.offset.unwrap_or(0).max(0);

        let mut count_qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM registration_requests WHERE event_id = "
        );
        count_qb.push_bind(event_id);
        push_filters(&mut count_qb, filter);
        let total: (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {REQUEST_COLUMNS} FROM registration_requests WHERE event_id = "
        ));
        qb.push_bind(event_id);
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at ASC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let items = qb
            .build_query_as::<RegistrationRequest>()
            .fetch_all(&self.pool)
            .await?;

        Ok((total.0, items))
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &RegistrantFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
    if let Some(source) = filter.source {
        qb.push(" AND source = ");
        qb.push_bind(source);
    }
    if let Some(query) = filter.query.as_deref() {
        let query = query.trim();
        if !query.is_empty() {
            let like = format!("%{}%", query);
            qb.push(" AND (email ILIKE ");
            qb.push_bind(like.clone());
            qb.push(" OR name ILIKE ");
            qb.push_bind(like.clone());
            qb.push(" OR wa ILIKE ");
            qb.push_bind(like);
            qb.push(")");
        }
    }
}

/// Lock and load a request by id inside the caller's transaction
pub async fn lock_by_id(conn: &mut PgConnection, request_id: i64) -> Result<Option<RegistrationRequest>, QueueBuddyError> {
    let request = sqlx::query_as::<_, RegistrationRequest>(&format!(
        r#"
        SELECT {REQUEST_COLUMNS}
        FROM registration_requests
        WHERE id = $1
        FOR UPDATE
        "#
    ))
    .bind(request_id)
    .fetch_optional(conn)
    .await?;

    Ok(request)
}

/// Move a locked PENDING request to a terminal status
pub async fn set_status(conn: &mut PgConnection, request_id: i64, status: RequestStatus) -> Result<(), QueueBuddyError> {
    sqlx::query(
        "UPDATE registration_requests SET status = $2, updated_at = NOW() WHERE id = $1"
    )
    .bind(request_id)
    .bind(status)
    .execute(conn)
    .await?;

    Ok(())
}
