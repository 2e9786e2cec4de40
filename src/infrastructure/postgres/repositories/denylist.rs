use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use crate::{
    domain::repositories::denylist::DenylistRepository,
    infrastructure::postgres::{pg_writer::PgWriter, schema::denylist},
};

pub struct DenylistPostgres {
    writer: Arc<PgWriter>,
}

impl DenylistPostgres {
    pub fn new(writer: Arc<PgWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl DenylistRepository for DenylistPostgres {
    async fn contains_any(&self, values: Vec<String>) -> Result<bool> {
        if values.is_empty() {
            return Ok(false);
        }

        self.writer
            .execute(move |conn| {
                let hit = denylist::table
                    .select(denylist::value)
                    .filter(denylist::value.eq_any(&values))
                    .first::<String>(conn)
                    .optional()?;
                Ok(hit.is_some())
            })
            .await
    }

    async fn add_values(&self, values: Vec<String>) -> Result<usize> {
        if values.is_empty() {
            return Ok(0);
        }

        self.writer
            .execute(move |conn| {
                let now = Utc::now();
                let rows: Vec<_> = values
                    .iter()
                    .map(|value| (denylist::value.eq(value), denylist::created_at.eq(now)))
                    .collect();

                let added = diesel::insert_into(denylist::table)
                    .values(rows)
                    .on_conflict(denylist::value)
                    .do_nothing()
                    .execute(conn)?;
                Ok(added)
            })
            .await
    }

    async fn remove_values(&self, values: Vec<String>) -> Result<usize> {
        if values.is_empty() {
            return Ok(0);
        }

        self.writer
            .execute(move |conn| {
                let removed = diesel::delete(denylist::table.filter(denylist::value.eq_any(&values)))
                    .execute(conn)?;
                Ok(removed)
            })
            .await
    }
}
