use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{PgConnection, prelude::*};
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            access_attempts::AccessAttemptEntity,
            users::{InsertUserEntitlementEntity, UserEntitlementEntity},
        },
        repositories::users::EntitlementRepository,
        value_objects::{
            access::{self, AccessDecision, AccessRequest},
            attempts::{self, AttemptLog, AttemptRefund},
            entitlement_mutations::EntitlementMutation,
            ledger::MutationOutcome,
        },
    },
    infrastructure::postgres::{
        pg_writer::PgWriter,
        schema::{access_attempts, users},
    },
};

pub struct EntitlementPostgres {
    writer: Arc<PgWriter>,
}

impl EntitlementPostgres {
    pub fn new(writer: Arc<PgWriter>) -> Self {
        Self { writer }
    }
}

/// Inserts the default row if absent, then reads it back locked `FOR UPDATE`.
/// Must run inside a transaction.
pub(crate) fn lock_or_create(
    conn: &mut PgConnection,
    user_id: i64,
    now: DateTime<Utc>,
) -> QueryResult<UserEntitlementEntity> {
    diesel::insert_into(users::table)
        .values(&InsertUserEntitlementEntity::new(user_id, now))
        .on_conflict(users::id)
        .do_nothing()
        .execute(conn)?;

    users::table
        .find(user_id)
        .select(UserEntitlementEntity::as_select())
        .for_update()
        .first::<UserEntitlementEntity>(conn)
}

pub(crate) fn save(
    conn: &mut PgConnection,
    user: &UserEntitlementEntity,
    now: DateTime<Utc>,
) -> QueryResult<UserEntitlementEntity> {
    diesel::update(users::table.find(user.id))
        .set(user.changeset(now))
        .returning(UserEntitlementEntity::as_select())
        .get_result::<UserEntitlementEntity>(conn)
}

#[async_trait]
impl EntitlementRepository for EntitlementPostgres {
    async fn find_or_create(&self, user_id: i64, now: DateTime<Utc>) -> Result<UserEntitlementEntity> {
        self.writer
            .execute(move |conn| {
                let user = conn.transaction::<_, anyhow::Error, _>(|conn| {
                    Ok(lock_or_create(conn, user_id, now)?)
                })?;
                Ok(user)
            })
            .await
    }

    async fn evaluate_access(
        &self,
        user_id: i64,
        request: AccessRequest,
        log: AttemptLog,
    ) -> Result<AccessDecision> {
        self.writer
            .execute(move |conn| {
                let decision = conn.transaction::<_, anyhow::Error, _>(|conn| {
                    let mut user = lock_or_create(conn, user_id, request.now)?;
                    let before = user.clone();

                    let decision = access::evaluate_access(&mut user, &request);
                    if user != before {
                        save(conn, &user, request.now)?;
                    }

                    if let Some((attempt_id, consumed_from)) = decision.allowed_attempt() {
                        diesel::insert_into(access_attempts::table)
                            .values(&log.into_row(attempt_id, user_id, consumed_from, request.now))
                            .execute(conn)?;
                    }

                    Ok(decision)
                })?;
                Ok(decision)
            })
            .await
    }

    async fn refund_attempt(
        &self,
        user_id: i64,
        attempt_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AttemptRefund> {
        self.writer
            .execute(move |conn| {
                let refund = conn.transaction::<_, anyhow::Error, _>(|conn| {
                    let mut user = lock_or_create(conn, user_id, now)?;
                    let before = user.clone();

                    let attempt = access_attempts::table
                        .find(attempt_id)
                        .filter(access_attempts::user_id.eq(user_id))
                        .select(AccessAttemptEntity::as_select())
                        .for_update()
                        .first::<AccessAttemptEntity>(conn)
                        .optional()?;
                    let Some(mut attempt) = attempt else {
                        return Ok(AttemptRefund::UnknownAttempt);
                    };

                    let refund = attempts::refund_attempt(&mut attempt, &mut user, now);
                    if let AttemptRefund::Refunded { .. } = refund {
                        let marked = diesel::update(
                            access_attempts::table
                                .find(attempt_id)
                                .filter(access_attempts::refunded_at.is_null()),
                        )
                        .set(access_attempts::refunded_at.eq(now))
                        .execute(conn)?;
                        if marked != 1 {
                            bail!("attempt {} was refunded concurrently", attempt_id);
                        }
                        if user != before {
                            save(conn, &user, now)?;
                        }
                    }

                    Ok(refund)
                })?;
                Ok(refund)
            })
            .await
    }

    async fn mutate(
        &self,
        user_id: i64,
        mutation: EntitlementMutation,
        now: DateTime<Utc>,
    ) -> Result<MutationOutcome> {
        self.writer
            .execute(move |conn| {
                let outcome = conn.transaction::<_, anyhow::Error, _>(|conn| {
                    let mut user = lock_or_create(conn, user_id, now)?;

                    let changed = mutation.apply(&mut user);
                    if changed {
                        user = save(conn, &user, now)?;
                    }

                    Ok(MutationOutcome { user, changed })
                })?;
                Ok(outcome)
            })
            .await
    }

    async fn list_page(&self, page: i64, page_size: i64) -> Result<(Vec<UserEntitlementEntity>, i64)> {
        let page = page.max(0);
        let page_size = page_size.max(1);

        self.writer
            .execute(move |conn| {
                let total = users::table.count().get_result::<i64>(conn)?;

                let rows = users::table
                    .select(UserEntitlementEntity::as_select())
                    .order(users::id.asc())
                    .limit(page_size)
                    .offset(page * page_size)
                    .load::<UserEntitlementEntity>(conn)?;

                Ok((rows, total))
            })
            .await
    }
}
