use std::fs;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use simreport::report::utils::{read_report_file, report_lines};
use simreport::{CodecContext, FileKind, ProbeFilter, ProbeKey, ReportRegistry};

#[derive(Parser)]
#[command(name = "simreport", about = "Encode and decode traffic simulation reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a text report into a binary blob
    Encode {
        #[arg(long)]
        kind: FileKind,

        report: PathBuf,

        /// Output blob; defaults to the report path with a `.bin` extension
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// WHATWG encoding label of the report, e.g. windows-1252
        #[arg(long)]
        encoding: Option<String>,

        /// Overwrite an existing output blob
        #[arg(long)]
        force: bool,
    },

    /// Decode a blob and print it as JSON
    Decode {
        #[arg(long)]
        kind: FileKind,

        blob: PathBuf,

        /// Probe filter as JSON; the flags below override its fields
        #[arg(long)]
        filter: Option<String>,

        #[arg(long, requires = "destination", conflicts_with = "edge")]
        origin: Option<i32>,

        #[arg(long, requires = "origin")]
        destination: Option<i32>,

        #[arg(long)]
        edge: Option<i32>,

        #[arg(long)]
        skip: Option<usize>,

        #[arg(long)]
        max: Option<usize>,

        #[arg(long)]
        stride: Option<usize>,

        #[arg(long)]
        time0: Option<f32>,

        #[arg(long)]
        time1: Option<f32>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // The CLI has no simulation store; the file system stands in for it.
    let ctx = CodecContext {
        simulation_id: 0,
        owner_id: 0,
    };

    match cli.command {
        Command::Encode {
            kind,
            report,
            output,
            encoding,
            force,
        } => {
            let output = output.unwrap_or_else(|| report.with_extension("bin"));
            let exists = output.exists() && !force;
            let registry = ReportRegistry::new(move |_: &CodecContext, _: FileKind| exists);

            let text = read_report_file(&report, encoding.as_deref())
                .with_context(|| format!("Failed to read {}", report.display()))?;
            match registry.encode(kind, &report_lines(&text), &ctx)? {
                Some(blob) => {
                    fs::write(&output, &blob).with_context(|| format!("Failed to write {}", output.display()))?;
                    println!("Encoded {} report: {} bytes -> {}", kind, blob.len(), output.display());
                }
                None => println!("{} already exists, nothing to do (use --force)", output.display()),
            }
        }
        Command::Decode {
            kind,
            blob,
            filter,
            origin,
            destination,
            edge,
            skip,
            max,
            stride,
            time0,
            time1,
        } => {
            let mut probe_filter: ProbeFilter = match filter {
                Some(json) => ProbeFilter::from_json(&json).context("Invalid --filter JSON")?,
                None => ProbeFilter::default(),
            };
            if let (Some(origin), Some(destination)) = (origin, destination) {
                probe_filter.match_key = Some(ProbeKey::OriginDestination { origin, destination });
            }
            if let Some(edge) = edge {
                probe_filter.match_key = Some(ProbeKey::Edge { edge });
            }
            probe_filter.skip = skip.unwrap_or(probe_filter.skip);
            probe_filter.max = max.unwrap_or(probe_filter.max);
            probe_filter.stride = stride.unwrap_or(probe_filter.stride);
            probe_filter.time0 = time0.unwrap_or(probe_filter.time0);
            probe_filter.time1 = time1.unwrap_or(probe_filter.time1);

            if !kind.is_indexed() && probe_filter != ProbeFilter::default() {
                bail!("{} reports do not take probe filters", kind);
            }

            let bytes = fs::read(&blob).with_context(|| format!("Failed to read {}", blob.display()))?;
            let registry = ReportRegistry::new(|_: &CodecContext, _: FileKind| false);
            let tree = registry.decode(kind, &bytes, Some(&probe_filter), &ctx)?;
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
    }

    Ok(())
}
