use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infrastructure::postgres::schema::payments;

#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
#[diesel(primary_key(payload))]
pub struct PaymentEntity {
    pub payload: String,
    pub user_id: i64,
    pub plan: String,
    pub source: String,
    pub paid_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub payload: String,
    pub user_id: i64,
    pub plan: String,
    pub source: String,
    pub paid_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
}
