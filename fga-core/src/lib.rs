//! # fga core
//!
//! Processing engine for "add photo P to group G" requests against the
//! Flickr group-pool API.
//!
//! ## Overview
//!
//! - **Attempt ledger**: append-only attempt history per submitted request,
//!   the single source of truth for terminal state and daily eligibility
//! - **Eligibility selection**: at most one attempt per request per UTC day,
//!   never after a permanent outcome
//! - **Outcome classification**: closed status taxonomy derived from
//!   structured Flickr error categories
//! - **Membership cache**: run-scoped, single-flight user and picture group
//!   lookups
//! - **Request processing**: open attempt, pre-check, add, classify, close
//!
//! ## Feature Flags
//!
//! - `postgres`: enables [`PostgresLedger`](ledger::PostgresLedger) and the
//!   embedded migrations
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fga_core::{flickr::FlickrApi, ledger::MemoryLedger, run};
//!
//! async fn once(flickr: Arc<dyn FlickrApi>) -> Result<(), fga_core::RunError> {
//!     let ledger = Arc::new(MemoryLedger::new());
//!     let stats = run::execute(ledger, flickr, run::RunOptions::default()).await?;
//!     println!("{stats}");
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]

pub mod cache;
pub mod classifier;
pub mod error;
pub mod flickr;
pub mod import;
pub mod ledger;
pub mod processor;
pub mod run;
pub mod selector;

#[cfg(feature = "postgres")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use error::{LedgerError, Result, RunError};
pub use flickr::{FlickrApi, FlickrError};
pub use import::ImportError;
pub use ledger::{AttemptLedger, MemoryLedger};
#[cfg(feature = "postgres")]
pub use ledger::PostgresLedger;
pub use processor::{ProcessOutcome, RequestProcessor};
pub use run::{RunOptions, execute};
