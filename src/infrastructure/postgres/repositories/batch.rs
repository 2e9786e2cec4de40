use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use crate::{
    domain::{
        repositories::batch::BatchMutationRepository, value_objects::batch_jobs::BatchMutation,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::users},
};

/// Mass mutations run off the request path: every call takes its own pooled connection on
/// a blocking worker thread instead of queueing behind the single writer.
pub struct BatchMutationPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BatchMutationPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BatchMutationRepository for BatchMutationPostgres {
    async fn list_user_ids(&self) -> Result<Vec<i64>> {
        let db_pool = Arc::clone(&self.db_pool);

        let ids = tokio::task::spawn_blocking(move || -> Result<Vec<i64>> {
            let mut conn = db_pool.get()?;
            let ids = users::table
                .select(users::id)
                .order(users::id.asc())
                .load::<i64>(&mut conn)?;
            Ok(ids)
        })
        .await??;

        Ok(ids)
    }

    async fn apply_chunk(&self, user_ids: Vec<i64>, mutation: BatchMutation) -> Result<usize> {
        let db_pool = Arc::clone(&self.db_pool);

        let affected = tokio::task::spawn_blocking(move || -> Result<usize> {
            let mut conn = db_pool.get()?;
            let now = Utc::now();

            let affected = conn.transaction::<_, anyhow::Error, _>(|conn| {
                let affected = match mutation {
                    BatchMutation::ExpireTrials { trial_limit } => diesel::update(
                        users::table
                            .filter(users::id.eq_any(&user_ids))
                            .filter(
                                users::trial_expired
                                    .eq(false)
                                    .or(users::trial_used_count.ne(trial_limit)),
                            ),
                    )
                    .set((
                        users::trial_used_count.eq(trial_limit),
                        users::trial_expired.eq(true),
                        users::updated_at.eq(now),
                    ))
                    .execute(conn)?,
                    BatchMutation::AcknowledgeBoot { epoch } => diesel::update(
                        users::table
                            .filter(users::id.eq_any(&user_ids))
                            .filter(users::boot_acknowledged_at.lt(epoch)),
                    )
                    .set((
                        users::boot_acknowledged_at.eq(epoch),
                        users::updated_at.eq(now),
                    ))
                    .execute(conn)?,
                };
                Ok(affected)
            })?;

            Ok(affected)
        })
        .await??;

        Ok(affected)
    }
}
