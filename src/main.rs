use anyhow::Context;
use clap::Parser;
use dtforge::cli::{self, ExtractOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dtforge")]
#[command(about = "Extract clinical decision tables from .xlsx workbooks into DMN, FSH and CQL.")]
#[command(long_about = "dtforge - Decision table extractor

Reads every .xlsx workbook of the input directory. The COVER sheet of each
workbook lists which activity uses which decision table on which tab; a
workbook without a cover sheet has every table on every tab extracted.

OUTPUTS (below --output):
  dmn/<table>.dmn                      DMN decision per table
  fsh/plandefinitions/<table>.fsh      rule document per table
  cql/<library>.cql                    CQL skeleton per tab
  fsh/libraries/<library>.fsh          Library resource per tab
  fsh/valuesets/*.fsh                  codes per table, per tab and overall
  fsh/codesystems/DD.fsh               every decision expression
  fsh/activitydefinitions/*.fsh        one activity per distinct output
  pagecontent/decision-logic.md        overview page

Existing definitions found in the CQL directory are copied into the
skeletons and the code system.

EXAMPLES:
  dtforge                                   # defaults, run from the IG root
  dtforge --input workbooks --output build  # custom directories
  dtforge --no-fill-dashes --report run.json  # dashes stay as written")]
#[command(version)]
struct Cli {
    /// Directory of .xlsx workbooks
    #[arg(short, long, env = "DTFORGE_INPUT", default_value = "input/decision-logic")]
    input: PathBuf,

    /// Directory of hand-written .cql libraries
    #[arg(long, env = "DTFORGE_CQL", default_value = "input/cql")]
    cql: PathBuf,

    /// Directory the generated resources are written to
    #[arg(short, long, env = "DTFORGE_OUTPUT", default_value = "output")]
    output: PathBuf,

    /// Implementation guide configuration (sushi-config.yaml)
    #[arg(short, long, env = "DTFORGE_CONFIG", default_value = "sushi-config.yaml")]
    config: PathBuf,

    /// Write the run report as JSON
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Keep "-" cells as written instead of repeating the value above
    #[arg(long)]
    no_fill_dashes: bool,

    /// Prefix of decision table, library and activity ids
    #[arg(long, env = "DTFORGE_DT_PREFIX", default_value = "DT")]
    dt_prefix: String,

    /// Id of the generated code system
    #[arg(long, env = "DTFORGE_DD_PREFIX", default_value = "DD")]
    dd_prefix: String,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress the summary
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "dtforge=debug" } else { "dtforge=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = cli.output.clone();
    cli::extract(ExtractOptions {
        input: cli.input,
        cql: cli.cql,
        output: cli.output,
        config: cli.config,
        report: cli.report,
        fill_dashes: !cli.no_fill_dashes,
        dt_prefix: cli.dt_prefix,
        dd_prefix: cli.dd_prefix,
        quiet: cli.quiet,
    })
    .with_context(|| format!("could not install resources into {}", output.display()))?;
    Ok(())
}
