//! Client facade: wires the pipeline stages to a live session.
//!
//! The client dials the server, spawns the scanner and batching stages
//! and drives the session on the calling task. The socket is owned
//! exclusively by the session; chunks are moved, never shared.

use tokio::io::AsyncBufRead;
use tokio::net::TcpStream;

use crate::batch::Batcher;
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::pipeline::{spawn_batcher, spawn_scanner};
use crate::session::{Session, SessionReport};
use crate::shutdown::ShutdownHandle;

/// A configured client for one agency session.
pub struct Client {
    config: ClientConfig,
}

impl Client {
    /// Create a client from its configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Run one full session: scan records from `reader`, batch them and
    /// exchange them with the server until the winners arrive.
    ///
    /// The done-signal behind `shutdown` stops every stage promptly; it
    /// is also triggered here on exit so no stage outlives the session.
    pub async fn run<R>(self, reader: R, shutdown: ShutdownHandle) -> Result<SessionReport>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let timeout = self.config.socket_timeout();
        let stream = TcpStream::connect(&self.config.server_address).await?;
        tracing::debug!(
            agency_id = self.config.agency_id,
            server = %self.config.server_address,
            "connected"
        );
        let conn = Connection::new(stream, timeout, timeout);
        let session = Session::new(conn, self.config.agency_id, self.config.backoff());

        let (bets, scanner_task) = spawn_scanner(reader, shutdown.subscribe());
        let batcher = Batcher::new(self.config.batch.max_count, self.config.batch.max_size);
        let (chunks, batch_task) =
            spawn_batcher(batcher, bets, shutdown.clone(), shutdown.subscribe());

        let result = session.run(chunks, shutdown.subscribe()).await;

        // Stop and drain the stages before reporting.
        shutdown.trigger();
        let _ = scanner_task.await;
        if let Ok(Err(stage_err)) = batch_task.await {
            // The pipeline aborted the session; its error is the cause.
            tracing::error!(
                agency_id = self.config.agency_id,
                error = %stage_err,
                "pipeline failed"
            );
            return Err(stage_err);
        }

        match &result {
            Ok(report) => tracing::info!(
                agency_id = self.config.agency_id,
                winners = report.winners.len(),
                "session complete"
            ),
            Err(e) => tracing::error!(
                agency_id = self.config.agency_id,
                error = %e,
                "session failed"
            ),
        }
        result
    }
}
