//! # betwire
//!
//! Async client for the lottery agency batch wire protocol.
//!
//! Reads bet records from an input stream, packs them into size-bounded
//! binary chunks and exchanges them with the server over a
//! length-prefixed request/response protocol, finally polling for and
//! receiving the winners.
//!
//! ## Architecture
//!
//! - **Batching** ([`batch`]): bounded-capacity chunk packing with
//!   full/partial tracking and FIFO delivery.
//! - **Wire protocol** ([`protocol`]): request/response framing, header
//!   layout, response-kind dispatch.
//! - **Session** ([`session`]): send batches → signal end → poll for
//!   readiness with backoff → fetch winners.
//! - **Pipeline** ([`pipeline`]): channel-connected stages with
//!   cooperative cancellation.
//!
//! ## Example
//!
//! ```ignore
//! use betwire::{Client, ClientConfig};
//! use tokio::fs::File;
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> betwire::Result<()> {
//!     let config = ClientConfig::load(Some("config.json".as_ref()))?;
//!     let reader = BufReader::new(File::open("bets.csv").await?);
//!
//!     let (shutdown, _) = betwire::shutdown::channel();
//!     shutdown.listen_ctrl_c();
//!
//!     let report = Client::new(config).run(reader, shutdown).await?;
//!     println!("winners: {}", report.winners.len());
//!     Ok(())
//! }
//! ```

pub mod agency;
pub mod backoff;
pub mod batch;
pub mod config;
pub mod connection;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod session;
pub mod shutdown;

mod client;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{BetwireError, Result};
pub use session::SessionReport;
