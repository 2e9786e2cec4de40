use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::{
        entities::access_attempts::AccessAttemptEntity,
        repositories::access_attempts::AccessAttemptRepository,
        value_objects::attempts::AttemptOutcome,
    },
    infrastructure::postgres::{pg_writer::PgWriter, schema::access_attempts},
};

pub struct AccessAttemptPostgres {
    writer: Arc<PgWriter>,
}

impl AccessAttemptPostgres {
    pub fn new(writer: Arc<PgWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl AccessAttemptRepository for AccessAttemptPostgres {
    async fn finish(
        &self,
        user_id: i64,
        attempt_id: Uuid,
        outcome: AttemptOutcome,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.writer
            .execute(move |conn| {
                let updated = diesel::update(
                    access_attempts::table
                        .find(attempt_id)
                        .filter(access_attempts::user_id.eq(user_id))
                        .filter(access_attempts::finished_at.is_null()),
                )
                .set((
                    access_attempts::finished_at.eq(now),
                    access_attempts::success.eq(outcome.success),
                    access_attempts::result_count.eq(outcome.result_count),
                ))
                .execute(conn)?;

                Ok(updated == 1)
            })
            .await
    }

    async fn list_page(&self, page: i64, page_size: i64) -> Result<(Vec<AccessAttemptEntity>, i64)> {
        let page = page.max(0);
        let page_size = page_size.max(1);

        self.writer
            .execute(move |conn| {
                let total = access_attempts::table.count().get_result::<i64>(conn)?;

                let rows = access_attempts::table
                    .select(AccessAttemptEntity::as_select())
                    .order((access_attempts::created_at.desc(), access_attempts::id.desc()))
                    .limit(page_size)
                    .offset(page * page_size)
                    .load::<AccessAttemptEntity>(conn)?;

                Ok((rows, total))
            })
            .await
    }
}
