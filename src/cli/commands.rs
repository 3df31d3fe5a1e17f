use crate::config::{ExtractorConfig, FillPolicy, IgConfig};
use crate::context::{RunContext, RunReport};
use crate::error::DtResult;
use crate::pipeline;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Options of the extract command, as parsed by the binary
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub input: PathBuf,
    pub cql: PathBuf,
    pub output: PathBuf,
    pub config: PathBuf,
    pub report: Option<PathBuf>,
    /// Dash cells repeat the value above, like blank cells
    pub fill_dashes: bool,
    pub dt_prefix: String,
    pub dd_prefix: String,
    pub quiet: bool,
}

impl ExtractOptions {
    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            input_dir: self.input.clone(),
            cql_dir: self.cql.clone(),
            output_dir: self.output.clone(),
            dt_prefix: self.dt_prefix.clone(),
            dd_prefix: self.dd_prefix.clone(),
            fill_policy: if self.fill_dashes {
                FillPolicy::BlankOrDash
            } else {
                FillPolicy::Blank
            },
        }
    }
}

/// Execute the extract command. Only a failure to write the output tree is
/// returned as an error; everything else is reported and skipped.
pub fn extract(options: ExtractOptions) -> DtResult<RunReport> {
    if !options.quiet {
        println!("{}", "🩺 dtforge - Extracting decision tables".bold().green());
        println!("   Input:  {}", options.input.display());
        println!("   Output: {}", options.output.display());
        println!();
    }

    let (ig, config_warning) = match IgConfig::load(&options.config) {
        Ok(ig) => (ig, None),
        Err(e) => (
            IgConfig::default(),
            Some(format!(
                "could not read {}, using defaults: {}",
                options.config.display(),
                e
            )),
        ),
    };

    let mut ctx = RunContext::new(options.extractor_config(), ig);
    if let Some(warning) = config_warning {
        ctx.report.warn(warning);
    }

    pipeline::run(&mut ctx);
    let written = pipeline::install(&mut ctx)?;

    if let Some(path) = &options.report {
        if let Err(e) = write_report(&ctx.report, path) {
            ctx.report.warn(format!("could not write report {}: {}", path.display(), e));
        }
    }

    if !options.quiet {
        print_summary(&ctx.report, written.len());
    }
    Ok(ctx.report)
}

fn write_report(report: &RunReport, path: &Path) -> DtResult<()> {
    let json = report.to_json()?;
    fs::write(path, json)?;
    Ok(())
}

fn print_summary(report: &RunReport, written: usize) {
    println!("{}", "✅ Extraction complete".bold().green());
    println!("   Workbooks:   {}", report.files.len());
    println!(
        "   Tables:      {} emitted, {}",
        report.tables_emitted().to_string().bold(),
        if report.tables_failed() > 0 {
            format!("{} failed", report.tables_failed()).red().to_string()
        } else {
            "0 failed".to_string()
        }
    );
    println!("   Expressions: {}", report.expressions);
    if !report.conflicts.is_empty() {
        println!(
            "   {}",
            format!("{} conflicting definitions", report.conflicts.len()).yellow()
        );
        for conflict in &report.conflicts {
            println!(
                "      {} in {}: {}",
                conflict.identifier.bright_blue(),
                conflict.conflict.table_id,
                conflict.conflict.definition.as_deref().unwrap_or("(no definition)")
            );
        }
    }
    println!("   Resources:   {} files written", written);

    if !report.warnings.is_empty() {
        println!();
        println!("{}", format!("⚠️  {} warnings", report.warnings.len()).yellow());
        for warning in &report.warnings {
            println!("   - {}", warning);
        }
    }
}
