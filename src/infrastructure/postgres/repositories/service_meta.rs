use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{prelude::*, upsert::excluded};
use tracing::warn;

use crate::{
    domain::{repositories::service_meta::ServiceMetaRepository, value_objects::boot_epoch::BootEpoch},
    infrastructure::postgres::{pg_writer::PgWriter, schema::service_meta},
};

const BOOT_EPOCH_KEY: &str = "boot_epoch";

pub struct ServiceMetaPostgres {
    writer: Arc<PgWriter>,
}

impl ServiceMetaPostgres {
    pub fn new(writer: Arc<PgWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl ServiceMetaRepository for ServiceMetaPostgres {
    async fn claim_boot_epoch(&self, candidate: BootEpoch) -> Result<BootEpoch> {
        self.writer
            .execute(move |conn| {
                let claimed = conn.transaction::<_, anyhow::Error, _>(|conn| {
                    let previous = service_meta::table
                        .find(BOOT_EPOCH_KEY)
                        .select(service_meta::value)
                        .for_update()
                        .first::<String>(conn)
                        .optional()?;
                    let previous_epoch = previous.as_deref().and_then(BootEpoch::parse);
                    if previous.is_some() && previous_epoch.is_none() {
                        warn!(previous = ?previous, "service_meta: stored boot epoch is unreadable, overwriting");
                    }
                    let epoch = candidate.after(previous_epoch);

                    diesel::insert_into(service_meta::table)
                        .values((
                            service_meta::key.eq(BOOT_EPOCH_KEY),
                            service_meta::value.eq(epoch.to_string()),
                            service_meta::updated_at.eq(Utc::now()),
                        ))
                        .on_conflict(service_meta::key)
                        .do_update()
                        .set((
                            service_meta::value.eq(excluded(service_meta::value)),
                            service_meta::updated_at.eq(excluded(service_meta::updated_at)),
                        ))
                        .execute(conn)?;

                    Ok(epoch)
                })?;
                Ok(claimed)
            })
            .await
    }
}
