//! Command line interface of the `kvbench` binary.

use std::num::{IntErrorKind, NonZeroUsize};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use argh::FromArgs;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Config;
use crate::driver::Benchmark;
use crate::http::HttpRemote;
use crate::observability;
use crate::record::RecordGenerator;

/// Load test a key-value store with concurrent write/read/delete cycles.
#[derive(Debug, FromArgs)]
struct Args {
    /// number of write/read/delete cycles to run
    #[argh(positional, from_str_fn(parse_request_count))]
    num_requests: NonZeroUsize,

    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// base URL of the key-value service
    #[argh(option, short = 'r')]
    remote: Option<String>,

    /// maximum number of cycles in flight, all at once by default
    #[argh(option, from_str_fn(parse_concurrency))]
    concurrency: Option<NonZeroUsize>,

    /// print latency percentiles and per-operation status counts
    #[argh(switch, short = 'd')]
    details: bool,
}

fn parse_request_count(value: &str) -> Result<NonZeroUsize, String> {
    parse_positive(value, "number of requests")
}

fn parse_concurrency(value: &str) -> Result<NonZeroUsize, String> {
    parse_positive(value, "concurrency")
}

fn parse_positive(value: &str, what: &str) -> Result<NonZeroUsize, String> {
    match value.parse::<usize>() {
        Ok(n) => NonZeroUsize::new(n).ok_or_else(|| format!("{what} must be at least 1, got `{value}`")),
        Err(err) if *err.kind() == IntErrorKind::PosOverflow => {
            Err(format!("{what} `{value}` is too large"))
        }
        Err(_) => Err(format!("{what} must be a positive integer, got `{value}`")),
    }
}

/// Loads the configuration and applies command line overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config =
        Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(remote) = &args.remote {
        config.remote = remote.clone();
    }
    if args.concurrency.is_some() {
        config.concurrency = args.concurrency;
    }
    Ok(config)
}

/// Bootstrap the runtime and run the benchmark.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    let config = load_config(&args)?;

    observability::init_tracing(&config.logging);
    tracing::debug!(?config);

    // All cycles interleave on a single thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let remote = HttpRemote::new(&config.remote, config.timeout)
        .with_context(|| format!("failed to set up client for `{}`", config.remote))?;

    let mut generator = RecordGenerator::builder()
        .key_prefix(config.key_prefix)
        .value_prefix(config.value_prefix)
        .suffix_len(config.suffix_len);
    if let Some(seed) = config.seed {
        generator = generator.seed(seed);
    }

    let mut benchmark = Benchmark::new(remote, generator.build()).concurrency(config.concurrency);

    let bar = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        .with_message(format!("Running {} cycles:", args.num_requests));
    bar.enable_steady_tick(Duration::from_millis(100));

    let summary = runtime.block_on(benchmark.run(args.num_requests));
    bar.finish_and_clear();

    print!("{summary}");
    if args.details {
        summary.print_details();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, argh::EarlyExit> {
        Args::from_args(&["kvbench"], args)
    }

    #[test]
    fn requires_request_count() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn parses_arguments() {
        let args = parse(&["5"]).unwrap();
        assert_eq!(args.num_requests.get(), 5);
        assert_eq!(args.config, None);
        assert_eq!(args.remote, None);
        assert_eq!(args.concurrency, None);
        assert!(!args.details);

        let args = parse(&[
            "100",
            "-r",
            "http://localhost:8080",
            "--concurrency",
            "8",
            "-d",
        ])
        .unwrap();
        assert_eq!(args.num_requests.get(), 100);
        assert_eq!(args.remote.as_deref(), Some("http://localhost:8080"));
        assert_eq!(args.concurrency, NonZeroUsize::new(8));
        assert!(args.details);
    }

    #[test]
    fn rejects_zero_requests() {
        let err = parse(&["0"]).unwrap_err();
        assert!(err.output.contains("must be at least 1"), "{}", err.output);
    }

    #[test]
    fn rejects_negative_requests() {
        let err = parse(&["-3"]).unwrap_err();
        assert!(err.output.contains("Unrecognized argument: -3"), "{}", err.output);

        let err = parse(&["--", "-3"]).unwrap_err();
        assert!(
            err.output.contains("must be a positive integer, got `-3`"),
            "{}",
            err.output
        );
    }

    #[test]
    fn rejects_non_numeric_requests() {
        assert!(parse_request_count("many").is_err());
        assert!(parse_request_count("1.5").is_err());
    }

    #[test]
    fn rejects_oversized_requests() {
        assert_eq!(
            parse_request_count("123456789012345678901234567890").unwrap_err(),
            "number of requests `123456789012345678901234567890` is too large"
        );
        assert_eq!(
            parse_request_count(&usize::MAX.to_string()).unwrap(),
            NonZeroUsize::MAX
        );
    }

    #[test]
    fn flags_override_config() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("KVBENCH__REMOTE", "http://10.0.0.1:3030");
            jail.set_env("KVBENCH__CONCURRENCY", "4");

            let args = parse(&["5", "-r", "http://localhost:8080"]).unwrap();
            let config = load_config(&args).unwrap();
            assert_eq!(config.remote, "http://localhost:8080");
            assert_eq!(config.concurrency, NonZeroUsize::new(4));

            Ok(())
        });
    }

    #[test]
    fn reports_invalid_config() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("KVBENCH__TIMEOUT", "soon");

            let args = parse(&["5"]).unwrap();
            let err = load_config(&args).unwrap_err();
            assert_eq!(err.to_string(), "failed to load configuration");

            let args = parse(&["5", "-c", "missing.yml"]).unwrap();
            let err = load_config(&args).unwrap_err();
            assert_eq!(err.to_string(), "failed to load configuration");

            Ok(())
        });
    }

    #[test]
    fn rejects_zero_concurrency() {
        assert!(parse(&["10", "--concurrency", "0"]).is_err());
    }
}
