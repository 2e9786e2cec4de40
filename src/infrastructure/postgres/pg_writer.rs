use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use diesel::PgConnection;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use super::postgres_connection::PgPoolSquad;

type WriteJob = Box<dyn FnOnce(Result<&mut PgConnection>) + Send>;

/// Single writer owning request-path database access.
///
/// Jobs are queued on a bounded channel and run one at a time on a dedicated OS thread, so
/// async handlers never block on diesel. Each job gets its own pooled connection and
/// answers over a oneshot channel.
#[derive(Clone)]
pub struct PgWriter {
    sender: mpsc::Sender<WriteJob>,
}

impl PgWriter {
    pub fn start(db_pool: Arc<PgPoolSquad>, queue_size: usize) -> Result<Self> {
        let (sender, mut receiver) = mpsc::channel::<WriteJob>(queue_size.max(1));

        std::thread::Builder::new()
            .name("pg-writer".to_string())
            .spawn(move || {
                info!("pg_writer: started");
                while let Some(job) = receiver.blocking_recv() {
                    match db_pool.get() {
                        Ok(mut conn) => job(Ok(&mut *conn)),
                        Err(err) => {
                            error!(db_error = ?err, "pg_writer: failed to get pooled connection");
                            job(Err(anyhow!(err).context("pg_writer: no connection")));
                        }
                    }
                }
                info!("pg_writer: channel closed, stopping");
            })
            .context("pg_writer: failed to spawn thread")?;

        Ok(Self { sender })
    }

    pub async fn execute<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let job: WriteJob = Box::new(move |conn: Result<&mut PgConnection>| {
            let result = conn.and_then(f);
            let _ = reply.send(result);
        });

        self.sender
            .send(job)
            .await
            .map_err(|_| anyhow!("pg_writer: writer thread is gone"))?;

        response
            .await
            .context("pg_writer: job dropped without a reply")?
    }
}
