//! A load generator which runs write/read/delete cycles against a key-value store over HTTP.
//!
//! Every cycle takes a freshly generated [`Record`], stores it with `POST /set`, reads it back
//! with `GET /get` and finally removes it with `DELETE /remove`. The three calls of a cycle are
//! strictly sequential, while all cycles of a run are in flight concurrently and share a single
//! [`HttpRemote`] connection pool.
//!
//! Once the whole batch has finished, the individual timings are aggregated into a
//! [`RunSummary`], which reports average latencies, success and error counts, and the resulting
//! throughput.
//!
//! ```no_run
//! use std::num::NonZeroUsize;
//!
//! use kvbench::{Benchmark, HttpRemote, RecordGenerator};
//!
//! # async fn example() -> kvbench::Result<()> {
//! let remote = HttpRemote::new("http://127.0.0.1:3030", None)?;
//! let generator = RecordGenerator::builder().build();
//!
//! let summary = Benchmark::new(remote, generator)
//!     .run(NonZeroUsize::new(100).unwrap())
//!     .await;
//! print!("{summary}");
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod http;
pub mod observability;
pub mod record;
pub mod summary;

pub use crate::driver::{Benchmark, Operation};
pub use crate::error::{Error, Result};
pub use crate::http::HttpRemote;
pub use crate::record::{Record, RecordGenerator};
pub use crate::summary::RunSummary;
