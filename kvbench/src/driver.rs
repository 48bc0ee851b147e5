//! Run write/read/delete cycles concurrently against a remote key-value store.

use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::StatusCode;

use crate::error::Error;
use crate::http::HttpRemote;
use crate::record::{Record, RecordGenerator};
use crate::summary::RunSummary;

/// One of the three calls issued per cycle.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    /// `POST /set`, the write.
    Set,
    /// `GET /get`, the read.
    Get,
    /// `DELETE /remove`, the delete.
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Set => "set",
            Operation::Get => "get",
            Operation::Remove => "remove",
        })
    }
}

/// Timings and status codes of a cycle that completed all three calls.
#[derive(Clone, Debug)]
pub struct CycleOutcome {
    /// Elapsed time of the `set` call.
    pub set_time: Duration,
    /// Elapsed time of the `get` call.
    pub get_time: Duration,
    /// Elapsed time of the `remove` call.
    pub remove_time: Duration,
    /// Status returned by `set`. Informational only.
    pub set_status: StatusCode,
    /// Status returned by `get`. Informational only.
    pub get_status: StatusCode,
    /// Status returned by `remove`, which decides between success and error.
    pub remove_status: StatusCode,
    /// Elapsed time of the whole cycle.
    pub elapsed: Duration,
}

/// A cycle that was aborted because one of its calls failed on the network level.
#[derive(Debug, thiserror::Error)]
#[error("{operation} of `{key}` failed")]
pub struct CycleFault {
    /// The call that failed. Later calls of the cycle were not issued.
    pub operation: Operation,
    /// The key of the cycle's record.
    pub key: String,
    /// The underlying error.
    #[source]
    pub error: Error,
}

/// Drives a batch of cycles against an [`HttpRemote`] and aggregates a [`RunSummary`].
#[derive(Debug)]
pub struct Benchmark {
    remote: HttpRemote,
    generator: RecordGenerator,
    concurrency: Option<NonZeroUsize>,
}

impl Benchmark {
    /// Creates a benchmark which generates its records with `generator`.
    ///
    /// By default, all cycles of a run are in flight at once.
    pub fn new(remote: HttpRemote, generator: RecordGenerator) -> Self {
        Self {
            remote,
            generator,
            concurrency: None,
        }
    }

    /// Limits the number of cycles in flight. `None` removes the limit.
    pub fn concurrency(mut self, concurrency: Option<NonZeroUsize>) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Runs `num_requests` cycles and waits for all of them to finish.
    ///
    /// Cycles are polled cooperatively on the calling task. Within a cycle, `get` is only issued
    /// after the `set` response was received, and `remove` only after the `get` response. Across
    /// cycles there is no ordering.
    ///
    /// Network failures abort only the affected cycle, which is then reported as a fault.
    pub async fn run(&mut self, num_requests: NonZeroUsize) -> RunSummary {
        let records = self.generator.generate(num_requests.get());
        let limit = self
            .concurrency
            .map_or(num_requests, |limit| limit.min(num_requests));

        tracing::info!(
            requests = num_requests.get(),
            concurrency = limit.get(),
            "starting benchmark"
        );

        let remote = &self.remote;
        let start = Instant::now();
        let outcomes: Vec<_> = futures::stream::iter(records)
            .map(|record| async move {
                let result = run_cycle(remote, record).await;
                if let Err(ref fault) = result {
                    tracing::warn!(error = fault as &dyn std::error::Error, "cycle aborted");
                }
                result
            })
            .buffer_unordered(limit.get())
            .collect()
            .await;
        let total_time = start.elapsed();

        let summary = RunSummary::from_outcomes(num_requests.get(), outcomes, total_time);
        tracing::info!(
            successes = summary.successes,
            errors = summary.errors,
            faults = summary.faults,
            ?total_time,
            "benchmark finished"
        );

        summary
    }
}

async fn run_cycle(remote: &HttpRemote, record: Record) -> Result<CycleOutcome, CycleFault> {
    let fault = |operation: Operation| {
        let key = record.key.clone();
        move |error: Error| CycleFault {
            operation,
            key,
            error,
        }
    };

    let cycle_start = Instant::now();

    let start = Instant::now();
    let set_status = remote.set(&record).await.map_err(fault(Operation::Set))?;
    let set_time = start.elapsed();

    let start = Instant::now();
    let get_status = remote
        .get(&record.key)
        .await
        .map_err(fault(Operation::Get))?;
    let get_time = start.elapsed();

    let start = Instant::now();
    let remove_status = remote
        .remove(&record.key)
        .await
        .map_err(fault(Operation::Remove))?;
    let remove_time = start.elapsed();

    if remove_status != StatusCode::OK {
        tracing::debug!(key = %record.key, status = %remove_status, "remove was not successful");
    }

    Ok(CycleOutcome {
        set_time,
        get_time,
        remove_time,
        set_status,
        get_status,
        remove_status,
        elapsed: cycle_start.elapsed(),
    })
}
