//! Session state machine driving one full exchange with the server.
//!
//! The session sends each completed chunk as a `BetBatch` request and
//! waits for its acknowledgement before sending the next: a single
//! request in flight, no pipelining. When chunk production ends it sends
//! `BetBatchStop`, then polls for the server's `Ready` signal under the
//! configured backoff, and finally requests and receives the winners.
//!
//! Failure policy: any write or decode failure is terminal for the
//! session (the connection is assumed broken or desynchronized). Only the
//! readiness poll retries, and only on timeout-class errors. Chunks
//! already acknowledged are never retried: at-most-once delivery.
//!
//! The shared done-signal cancels the session at every wait point, the
//! backoff sleeps of the readiness poll included.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::backoff::Backoff;
use crate::batch::Chunk;
use crate::connection::Connection;
use crate::error::{BetwireError, Result};
use crate::protocol::{Acknowledge, Request, RequestKind, Response, Winners};
use crate::shutdown::Shutdown;

/// Outcome of a completed session.
#[derive(Debug)]
pub struct SessionReport {
    /// Winning identifiers reported by the server.
    pub winners: Vec<String>,
}

/// Drives the request/response exchange over an exclusively owned
/// connection.
pub struct Session<S> {
    conn: Connection<S>,
    agency_id: u32,
    backoff: Backoff,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Create a session for one agency over a connected transport.
    pub fn new(conn: Connection<S>, agency_id: u32, backoff: Backoff) -> Self {
        Self {
            conn,
            agency_id,
            backoff,
        }
    }

    /// Run the session to completion.
    ///
    /// Consumes chunks until the channel closes (end of upstream
    /// production), then walks the stop → ready → winners tail. The
    /// done-signal is observed while waiting for chunks and at every
    /// backoff sleep of the readiness poll; in-flight socket operations
    /// are bounded by the connection deadlines.
    pub async fn run(
        mut self,
        mut chunks: mpsc::Receiver<Chunk>,
        mut shutdown: Shutdown,
    ) -> Result<SessionReport> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!(agency_id = self.agency_id, "session stopped by done-signal");
                    return Err(BetwireError::Cancelled);
                }
                next = chunks.recv() => match next {
                    Some(chunk) => self.send_batch(chunk).await?,
                    None => break,
                }
            }
        }

        if shutdown.is_cancelled() {
            return Err(BetwireError::Cancelled);
        }

        self.conn
            .send(&Request::control(RequestKind::BetBatchStop, self.agency_id))
            .await?;
        self.expect_acknowledge().await?;
        tracing::debug!(agency_id = self.agency_id, "batch stream closed");

        self.await_ready(&mut shutdown).await?;

        self.conn
            .send(&Request::control(RequestKind::GetWinners, self.agency_id))
            .await?;
        let winners = self.expect_winners().await?;
        tracing::info!(
            agency_id = self.agency_id,
            count = winners.dnis.len(),
            "winners received"
        );
        Ok(SessionReport {
            winners: winners.dnis,
        })
    }

    async fn send_batch(&mut self, chunk: Chunk) -> Result<()> {
        let records = chunk.len();
        let request = Request::with_payload(RequestKind::BetBatch, self.agency_id, &chunk);
        self.conn.send(&request).await?;
        let ack = self.expect_acknowledge().await?;
        tracing::debug!(
            agency_id = self.agency_id,
            records,
            status = ack.status,
            "batch acknowledged"
        );
        Ok(())
    }

    /// Poll for `Ready` under the backoff schedule. A read timeout means
    /// "not ready yet" and is retried; anything else is terminal. The
    /// done-signal short-circuits the backoff sleeps.
    async fn await_ready(&mut self, shutdown: &mut Shutdown) -> Result<()> {
        let delays: Vec<_> = self.backoff.delays().collect();
        for delay in delays {
            if shutdown.is_cancelled() {
                return Err(BetwireError::Cancelled);
            }
            match self.expect_ready().await {
                Ok(()) => {
                    tracing::debug!(agency_id = self.agency_id, "server ready");
                    return Ok(());
                }
                Err(BetwireError::Timeout) => {
                    tracing::warn!(
                        agency_id = self.agency_id,
                        delay_ms = delay.as_millis() as u64,
                        "server not ready, backing off"
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            tracing::debug!(
                                agency_id = self.agency_id,
                                "readiness poll stopped by done-signal"
                            );
                            return Err(BetwireError::Cancelled);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(BetwireError::RetriesExhausted {
            retries: self.backoff.retries,
        })
    }

    async fn expect_acknowledge(&mut self) -> Result<Acknowledge> {
        match self.conn.recv().await? {
            Response::Acknowledge(ack) => Ok(ack),
            other => Err(desync("acknowledge", &other)),
        }
    }

    async fn expect_ready(&mut self) -> Result<()> {
        match self.conn.recv().await? {
            Response::Ready => Ok(()),
            other => Err(desync("ready", &other)),
        }
    }

    async fn expect_winners(&mut self) -> Result<Winners> {
        match self.conn.recv().await? {
            Response::Winners(winners) => Ok(winners),
            other => Err(desync("winners", &other)),
        }
    }
}

fn desync(expected: &str, got: &Response) -> BetwireError {
    BetwireError::Protocol(format!(
        "expected {}, got {:?} response",
        expected,
        got.kind()
    ))
}
