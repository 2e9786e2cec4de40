use std::time::Duration;

use anyhow::{Context, Result};
use diesel::{
    Connection, PgConnection,
    connection::CacheSize,
    r2d2::{ConnectionManager, CustomizeConnection, Error as R2d2Error, Pool},
};
use tracing::info;

use crate::config::config_model::Database;

/// Statement caching is off so the pool works behind transaction-mode poolers.
#[derive(Debug, Default)]
struct DisablePreparedStatements;

impl CustomizeConnection<PgConnection, R2d2Error> for DisablePreparedStatements {
    fn on_acquire(&self, conn: &mut PgConnection) -> std::result::Result<(), R2d2Error> {
        conn.set_prepared_statement_cache_size(CacheSize::Disabled);
        Ok(())
    }
}

pub type PgPoolSquad = Pool<ConnectionManager<PgConnection>>;

/// One connection serves the request-path writer; the rest are left for batch chunks.
pub fn establish_connection(database: &Database) -> Result<PgPoolSquad> {
    let manager = ConnectionManager::<PgConnection>::new(&database.url);
    let pool = Pool::builder()
        .max_size(database.max_connections.max(2))
        .connection_timeout(Duration::from_secs(database.connect_timeout_seconds.max(1)))
        .connection_customizer(Box::new(DisablePreparedStatements))
        .build(manager)
        .context("postgres: failed to build connection pool")?;

    info!(
        max_connections = pool.max_size(),
        "postgres: connection pool ready"
    );
    Ok(pool)
}
