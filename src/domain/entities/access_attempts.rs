use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::access_attempts;

/// One allowed, metered attempt. Written in the same transaction as its debit; the outcome
/// and refund columns are filled in later.
#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = access_attempts)]
pub struct AccessAttemptEntity {
    pub id: Uuid,
    pub user_id: i64,
    pub query: String,
    pub normalized_query: Option<String>,
    pub consumed_from: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub success: Option<bool>,
    pub result_count: Option<i32>,
    pub refunded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = access_attempts)]
pub struct InsertAccessAttemptEntity {
    pub id: Uuid,
    pub user_id: i64,
    pub query: String,
    pub normalized_query: Option<String>,
    pub consumed_from: String,
    pub created_at: DateTime<Utc>,
}

impl From<InsertAccessAttemptEntity> for AccessAttemptEntity {
    fn from(value: InsertAccessAttemptEntity) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            query: value.query,
            normalized_query: value.normalized_query,
            consumed_from: value.consumed_from,
            created_at: value.created_at,
            finished_at: None,
            success: None,
            result_count: None,
            refunded_at: None,
        }
    }
}
