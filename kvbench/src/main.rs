//! Command-line entry point of `kvbench`. See [`kvbench::cli`] for the available options.

fn main() -> anyhow::Result<()> {
    kvbench::cli::execute()
}
