//! Aggregated statistics of a benchmark run and their rendering.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use sketches_ddsketch::DDSketch;
use yansi::{Color, Paint};

use crate::driver::{CycleFault, CycleOutcome};

/// Latency samples of one operation.
///
/// The mean is exact, percentiles are approximated by a [`DDSketch`].
#[derive(Default)]
pub struct Latencies {
    sketch: DDSketch,
}

impl Latencies {
    /// Records one sample.
    pub fn add(&mut self, elapsed: Duration) {
        self.sketch.add(elapsed.as_secs_f64());
    }

    /// The number of samples.
    pub fn count(&self) -> usize {
        self.sketch.count()
    }

    /// The arithmetic mean, or `None` without any samples.
    pub fn mean(&self) -> Option<Duration> {
        let count = self.sketch.count();
        if count == 0 {
            return None;
        }
        let sum = self.sketch.sum()?;
        Some(Duration::from_secs_f64(sum / count as f64))
    }

    /// The approximate `q`-quantile, or `None` without any samples.
    pub fn quantile(&self, q: f64) -> Option<Duration> {
        let value = self.sketch.quantile(q).ok()??;
        Some(Duration::from_secs_f64(value.max(0.0)))
    }
}

impl fmt::Debug for Latencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latencies")
            .field("count", &self.count())
            .field("mean", &self.mean())
            .finish()
    }
}

/// Statistics of a finished run.
///
/// Only the status of the `remove` call decides whether a cycle counts as a success. Set and
/// get statuses are tracked separately and never change `successes` or `errors`. Aborted cycles
/// count as errors and as faults, so `successes + errors` always equals `requests`.
#[derive(Debug)]
pub struct RunSummary {
    /// The number of requested cycles.
    pub requests: usize,
    /// Latencies of `set` calls of completed cycles.
    pub set: Latencies,
    /// Latencies of `get` calls of completed cycles.
    pub get: Latencies,
    /// Latencies of `remove` calls of completed cycles.
    pub remove: Latencies,
    /// Cycles whose `remove` returned `200 OK`.
    pub successes: u64,
    /// Cycles whose `remove` returned another status, or which were aborted.
    pub errors: u64,
    /// Cycles aborted by a network failure.
    pub faults: u64,
    /// Completed cycles whose `set` did not return `200 OK`.
    pub set_non_ok: u64,
    /// Completed cycles whose `get` did not return `200 OK`.
    pub get_non_ok: u64,
    /// Wall-clock time of the whole batch.
    pub total_time: Duration,
    /// The longest time a single completed cycle took.
    pub longest_cycle: Duration,
}

impl RunSummary {
    /// Aggregates the outcomes of a batch of `requests` cycles.
    pub fn from_outcomes<I>(requests: usize, outcomes: I, total_time: Duration) -> Self
    where
        I: IntoIterator<Item = Result<CycleOutcome, CycleFault>>,
    {
        let mut summary = Self {
            requests,
            set: Latencies::default(),
            get: Latencies::default(),
            remove: Latencies::default(),
            successes: 0,
            errors: 0,
            faults: 0,
            set_non_ok: 0,
            get_non_ok: 0,
            total_time,
            longest_cycle: Duration::ZERO,
        };

        for outcome in outcomes {
            let cycle = match outcome {
                Ok(cycle) => cycle,
                Err(_) => {
                    summary.faults += 1;
                    summary.errors += 1;
                    continue;
                }
            };

            summary.set.add(cycle.set_time);
            summary.get.add(cycle.get_time);
            summary.remove.add(cycle.remove_time);
            summary.longest_cycle = summary.longest_cycle.max(cycle.elapsed);

            if cycle.set_status != StatusCode::OK {
                summary.set_non_ok += 1;
            }
            if cycle.get_status != StatusCode::OK {
                summary.get_non_ok += 1;
            }
            if cycle.remove_status == StatusCode::OK {
                summary.successes += 1;
            } else {
                summary.errors += 1;
            }
        }

        summary
    }

    /// Requested cycles per second of total run time.
    pub fn requests_per_second(&self) -> f64 {
        self.requests as f64 / self.total_time.as_secs_f64()
    }

    /// Returns the detailed report with latency percentiles and per-operation status counts.
    pub fn details(&self) -> Details<'_> {
        Details(self)
    }

    /// Prints the detailed report to stdout.
    pub fn print_details(&self) {
        println!();
        print!("{}", self.details());
    }
}

/// Detailed report of a [`RunSummary`], created by [`RunSummary::details`].
///
/// Set and get list their non-`200` counts, delete lists the non-`200` removes of completed
/// cycles. Percentiles are omitted for operations without samples.
#[derive(Debug)]
pub struct Details<'a>(&'a RunSummary);

impl fmt::Display for Details<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;
        writeln!(f, "{}", "## DETAILS".bold())?;

        write_operation(f, "SET:", &summary.set)?;
        write_issues(f, summary.set_non_ok, "NON-OK", Color::Yellow)?;
        write_percentiles(f, &summary.set)?;

        write_operation(f, "GET:", &summary.get)?;
        write_issues(f, summary.get_non_ok, "NON-OK", Color::Yellow)?;
        write_percentiles(f, &summary.get)?;

        write_operation(f, "DELETE:", &summary.remove)?;
        let remove_errors = summary.errors - summary.faults;
        write_issues(f, remove_errors, "ERRORS", Color::Red)?;
        write_percentiles(f, &summary.remove)?;

        if summary.faults > 0 {
            let faults = format!("{} FAULTS", summary.faults);
            writeln!(f, "{}", faults.bold().red())?;
        }
        writeln!(f, "longest cycle: {:.2?}", summary.longest_cycle.bold())
    }
}

fn write_operation(f: &mut fmt::Formatter<'_>, name: &str, latencies: &Latencies) -> fmt::Result {
    write!(f, "{} ({} ops", name.bold().green(), latencies.count().bold())
}

fn write_issues(f: &mut fmt::Formatter<'_>, count: u64, label: &str, color: Color) -> fmt::Result {
    if count > 0 {
        let issues = format!("{count} {label}");
        write!(f, ", {}", issues.bold().fg(color))?;
    }
    writeln!(f, ")")
}

fn write_percentiles(f: &mut fmt::Formatter<'_>, latencies: &Latencies) -> fmt::Result {
    let (Some(avg), Some(p50), Some(p90), Some(p99)) = (
        latencies.mean(),
        latencies.quantile(0.5),
        latencies.quantile(0.9),
        latencies.quantile(0.99),
    ) else {
        return Ok(());
    };
    writeln!(
        f,
        "  avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
        avg.bold()
    )
}

/// Renders an average latency in seconds, or `n/a` when there were no samples.
struct Seconds(Option<Duration>);

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(duration) => write!(f, "{:.4} seconds", duration.as_secs_f64()),
            None => f.write_str("n/a"),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of Requests: {}", self.requests)?;
        writeln!(f, "Average Set Time: {}", Seconds(self.set.mean()))?;
        writeln!(f, "Average Get Time: {}", Seconds(self.get.mean()))?;
        writeln!(f, "Average Delete Time: {}", Seconds(self.remove.mean()))?;
        writeln!(f, "Total Successes: {}", self.successes)?;
        writeln!(f, "Total Errors: {}", self.errors)?;
        if self.faults > 0 {
            writeln!(f, "Total Faults: {}", self.faults)?;
        }
        writeln!(
            f,
            "Total Time: {:.2} seconds",
            self.total_time.as_secs_f64()
        )?;
        writeln!(f, "Requests Per Second: {:.2}", self.requests_per_second())
    }
}

#[cfg(test)]
mod tests {
    use crate::driver::Operation;
    use crate::error::Error;

    use super::*;

    fn cycle(millis: [u64; 3], statuses: [u16; 3]) -> Result<CycleOutcome, CycleFault> {
        let [set, get, remove] = millis.map(Duration::from_millis);
        let [set_status, get_status, remove_status] =
            statuses.map(|code| StatusCode::from_u16(code).unwrap());
        Ok(CycleOutcome {
            set_time: set,
            get_time: get,
            remove_time: remove,
            set_status,
            get_status,
            remove_status,
            elapsed: set + get + remove,
        })
    }

    fn fault() -> Result<CycleOutcome, CycleFault> {
        Err(CycleFault {
            operation: Operation::Get,
            key: "key_broken".into(),
            error: Error::CannotBeABase("test".into()),
        })
    }

    fn assert_close(actual: Duration, expected_millis: f64) {
        let diff = (actual.as_secs_f64() * 1000.0 - expected_millis).abs();
        assert!(diff < 1e-6, "{actual:?} != {expected_millis}ms");
    }

    #[test]
    fn averages_timings() {
        let outcomes = vec![
            cycle([10, 20, 30], [200, 200, 200]),
            cycle([30, 40, 50], [200, 200, 200]),
        ];
        let summary = RunSummary::from_outcomes(2, outcomes, Duration::from_secs(1));

        assert_close(summary.set.mean().unwrap(), 20.0);
        assert_close(summary.get.mean().unwrap(), 30.0);
        assert_close(summary.remove.mean().unwrap(), 40.0);
        assert_eq!(summary.longest_cycle, Duration::from_millis(120));
    }

    #[test]
    fn tally_only_counts_remove_status() {
        let outcomes = vec![
            cycle([1, 1, 1], [200, 200, 200]),
            cycle([1, 1, 1], [500, 404, 200]),
            cycle([1, 1, 1], [200, 200, 500]),
            cycle([1, 1, 1], [200, 200, 404]),
        ];
        let summary = RunSummary::from_outcomes(4, outcomes, Duration::from_secs(1));

        assert_eq!(summary.successes, 2);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.faults, 0);
        assert_eq!(summary.set_non_ok, 1);
        assert_eq!(summary.get_non_ok, 1);
    }

    #[test]
    fn faults_count_as_errors() {
        let outcomes = vec![cycle([1, 2, 3], [200, 200, 200]), fault(), fault()];
        let summary = RunSummary::from_outcomes(3, outcomes, Duration::from_secs(1));

        assert_eq!(summary.successes, 1);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.faults, 2);
        assert_eq!(summary.set.count(), 1);
        assert_eq!(summary.successes + summary.errors, summary.requests as u64);
    }

    #[test]
    fn throughput() {
        let outcomes = (0..8).map(|_| cycle([1, 1, 1], [200, 200, 200]));
        let summary = RunSummary::from_outcomes(8, outcomes, Duration::from_millis(2500));
        assert!((summary.requests_per_second() - 3.2).abs() < 1e-9);
    }

    #[test]
    fn renders_report() {
        let outcomes = vec![
            cycle([100, 200, 300], [200, 200, 200]),
            cycle([300, 400, 500], [200, 200, 500]),
        ];
        let summary = RunSummary::from_outcomes(2, outcomes, Duration::from_millis(1250));

        let expected = "\
Number of Requests: 2
Average Set Time: 0.2000 seconds
Average Get Time: 0.3000 seconds
Average Delete Time: 0.4000 seconds
Total Successes: 1
Total Errors: 1
Total Time: 1.25 seconds
Requests Per Second: 1.60
";
        assert_eq!(summary.to_string(), expected);
    }

    #[test]
    fn renders_faults_and_missing_timings() {
        let summary = RunSummary::from_outcomes(2, vec![fault(), fault()], Duration::from_secs(2));

        let expected = "\
Number of Requests: 2
Average Set Time: n/a
Average Get Time: n/a
Average Delete Time: n/a
Total Successes: 0
Total Errors: 2
Total Faults: 2
Total Time: 2.00 seconds
Requests Per Second: 1.00
";
        assert_eq!(summary.to_string(), expected);
    }

    fn plain_details(summary: &RunSummary) -> String {
        yansi::disable();
        summary.details().to_string()
    }

    #[test]
    fn details_list_status_counts() {
        let outcomes = vec![
            cycle([1, 1, 1], [200, 200, 200]),
            cycle([1, 1, 1], [500, 404, 200]),
            cycle([1, 1, 1], [200, 200, 500]),
            fault(),
        ];
        let summary = RunSummary::from_outcomes(4, outcomes, Duration::from_secs(1));
        let details = plain_details(&summary);
        let lines: Vec<_> = details.lines().collect();

        assert_eq!(lines.len(), 9, "{details}");
        assert_eq!(lines[0], "## DETAILS");
        assert_eq!(lines[1], "SET: (3 ops, 1 NON-OK)");
        assert!(lines[2].starts_with("  avg: "), "{details}");
        assert_eq!(lines[3], "GET: (3 ops, 1 NON-OK)");
        assert!(lines[4].starts_with("  avg: "), "{details}");
        assert_eq!(lines[5], "DELETE: (3 ops, 1 ERRORS)");
        assert!(lines[6].starts_with("  avg: "), "{details}");
        assert_eq!(lines[7], "1 FAULTS");
        assert_eq!(lines[8], "longest cycle: 3.00ms");
    }

    #[test]
    fn details_without_issues() {
        let outcomes = (0..3).map(|_| cycle([10, 20, 30], [200, 200, 200]));
        let summary = RunSummary::from_outcomes(3, outcomes, Duration::from_secs(1));
        let details = plain_details(&summary);

        assert!(details.contains("SET: (3 ops)\n"), "{details}");
        assert!(details.contains("GET: (3 ops)\n"), "{details}");
        assert!(details.contains("DELETE: (3 ops)\n"), "{details}");
        assert!(!details.contains("NON-OK"), "{details}");
        assert!(!details.contains("ERRORS"), "{details}");
        assert!(!details.contains("FAULTS"), "{details}");
        assert_eq!(details.matches("p99: ").count(), 3, "{details}");
        assert!(details.ends_with("longest cycle: 60.00ms\n"), "{details}");
    }

    #[test]
    fn details_skip_empty_percentiles() {
        let summary = RunSummary::from_outcomes(2, vec![fault(), fault()], Duration::ZERO);

        let expected = "\
## DETAILS
SET: (0 ops)
GET: (0 ops)
DELETE: (0 ops)
2 FAULTS
longest cycle: 0.00ns
";
        assert_eq!(plain_details(&summary), expected);
    }
}
