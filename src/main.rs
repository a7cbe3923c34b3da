use anyhow::Result;
use clap::Parser;
use intensidad::cli::{Cli, LoaderKind, OutputFormat};
use intensidad::loader::{AggregatedTraceLoader, SpanTraceLoader};
use intensidad::output;
use intensidad::scorer::{evaluate, EvalOptions};
use intensidad::transform::TransformPipeline;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Validate parameter ranges before any work
    if args.interval < 1 {
        anyhow::bail!(
            "Invalid value for --interval: {} (must be >= 1 minute)",
            args.interval
        );
    }

    init_tracing(args.debug);

    let transforms = TransformPipeline::parse(&args.transforms)?;

    let opts = EvalOptions {
        start: args.start.clone(),
        end: args.end.clone(),
        interval_min: args.interval,
        transforms,
        mpw: args.mpw,
        aggregation: args.aggregation,
        normalization: args.normalization,
        constant_policy: args.constant_policy,
    };

    let records = match args.loader {
        LoaderKind::Spans => evaluate(&SpanTraceLoader::new(), &args.input, &opts)?,
        LoaderKind::Aggregated => evaluate(&AggregatedTraceLoader::new(), &args.input, &opts)?,
    };

    let rendered = match args.format {
        OutputFormat::Json => output::to_json(&records)?,
        OutputFormat::Csv => output::to_csv(&records),
    };

    match &args.output {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }

    Ok(())
}
