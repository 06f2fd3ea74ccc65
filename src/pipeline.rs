//! Channel-connected pipeline stages: input scanner and batching.
//!
//! Three stages run concurrently and hand work off through bounded
//! channels of capacity one, a streaming handoff rather than a queue. Each
//! stage is a single sequential worker that exclusively owns its state;
//! the shared done-signal is observed at every suspension point.
//!
//! ```text
//! reader ─► scanner ─► bets ─► batcher ─► chunks ─► session
//! ```

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::agency::Bet;
use crate::batch::{Batcher, Chunk};
use crate::error::{BetwireError, Result};
use crate::shutdown::{Shutdown, ShutdownHandle};

/// Stage handoff capacity. One slot is enough for a streaming pipeline.
pub const STAGE_CHANNEL_CAPACITY: usize = 1;

/// Spawn the record-scanning stage.
///
/// Reads newline-delimited records, parses each and forwards the result.
/// A malformed line is forwarded as an error tagged with its 1-based line
/// number and terminates the scan; a blank line or end of input ends it
/// cleanly.
pub fn spawn_scanner<R>(
    reader: R,
    mut shutdown: Shutdown,
) -> (mpsc::Receiver<Result<Bet>>, JoinHandle<()>)
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(STAGE_CHANNEL_CAPACITY);
    let task = tokio::spawn(async move {
        let mut lines = reader.lines();
        let mut line_number: usize = 1;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("scanner stopped by done-signal");
                    return;
                }
                next = lines.next_line() => match next {
                    Ok(Some(line)) => {
                        if line.is_empty() {
                            return;
                        }
                        match Bet::parse_line(&line) {
                            Ok(bet) => {
                                if tx.send(Ok(bet)).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                let tagged = BetwireError::Parse {
                                    line: line_number,
                                    reason: e.to_string(),
                                };
                                let _ = tx.send(Err(tagged)).await;
                                return;
                            }
                        }
                        line_number += 1;
                    }
                    Ok(None) => return,
                    Err(e) => {
                        let _ = tx.send(Err(BetwireError::Io(e))).await;
                        return;
                    }
                }
            }
        }
    });
    (rx, task)
}

/// Spawn the batching stage.
///
/// Pushes each record into the batcher and forwards completed chunks as
/// they saturate. On clean end of input the batcher is flushed so the
/// still-open chunk is delivered too. An upstream error (or a fatal
/// capacity misconfiguration) triggers the done-signal so the session
/// stops promptly instead of treating the closed channel as a clean end.
pub fn spawn_batcher(
    mut batcher: Batcher,
    mut bets: mpsc::Receiver<Result<Bet>>,
    handle: ShutdownHandle,
    mut shutdown: Shutdown,
) -> (mpsc::Receiver<Chunk>, JoinHandle<Result<()>>) {
    let (tx, rx) = mpsc::channel(STAGE_CHANNEL_CAPACITY);
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("batcher stopped by done-signal");
                    return Ok(());
                }
                next = bets.recv() => match next {
                    Some(Ok(bet)) => {
                        if let Err(e) = batcher.push(&bet) {
                            tracing::error!(error = %e, "batching failed");
                            handle.trigger();
                            return Err(e);
                        }
                        while let Some(chunk) = batcher.next() {
                            if tx.send(chunk).await.is_err() {
                                return Ok(());
                            }
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "record scan failed");
                        handle.trigger();
                        return Err(e);
                    }
                    None => break,
                }
            }
        }
        if let Some(chunks) = batcher.flush() {
            for chunk in chunks {
                if tx.send(chunk).await.is_err() {
                    return Ok(());
                }
            }
        }
        Ok(())
    });
    (rx, task)
}
