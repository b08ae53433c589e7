#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process;

use olsreport::pipeline::{analyze, generate_report};
use olsreport::report::config::RenderConfig;
use olsreport::{ReportFormat, ReportRenderer, load_dataset};

#[derive(Parser)]
#[command(
    name = "olsreport",
    about = "Multifactor linear regression with typeset and spreadsheet reports",
    long_about = "Fits an ordinary-least-squares model to a delimited dataset and renders \
                 the fitted model with its diagnostics as a PDF, LaTeX source or workbook."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Selection {
    /// Path to a CSV file (TSV when the extension is .tsv or .txt) with a header row
    #[arg(value_name = "DATA")]
    data: PathBuf,

    /// Name of the dependent variable column
    #[arg(long)]
    target: String,

    /// Comma-separated names of the independent variable columns, in model order
    #[arg(long, value_delimiter = ',', required = true)]
    features: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the model and print the result as JSON
    #[command(about = "Fit an OLS model (outputs: JSON summary)")]
    Analyze {
        #[command(flatten)]
        selection: Selection,

        /// Write the JSON to this file instead of standard output
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Fit the model and render a report
    #[command(about = "Render a report (outputs: .pdf, .tex or .xlsx)")]
    Report {
        #[command(flatten)]
        selection: Selection,

        /// document (pdf), typesetting-source (latex, tex) or spreadsheet (xlsx)
        #[arg(long, default_value = "document")]
        format: String,

        /// Destination of the report; defaults to report.<ext> in the current directory
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// TOML file with plot, document and compiler settings
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = match Cli::parse().command {
        Some(Commands::Analyze { selection, output }) => run_analyze(selection, output),
        Some(Commands::Report {
            selection,
            format,
            output,
            config,
        }) => run_report(selection, &format, output, config),
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_analyze(
    selection: Selection,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = load_dataset(&selection.data)?;
    let result = analyze(&dataset, &selection.target, &selection.features)?;
    let json = serde_json::to_string_pretty(&result)?;

    match output {
        Some(path) => {
            fs::write(&path, json)?;
            println!("Model summary written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_report(
    selection: Selection,
    format: &str,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let format: ReportFormat = format.parse()?;
    let config = match config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    let renderer = ReportRenderer::new(config);

    let dataset = load_dataset(&selection.data)?;
    let artifact = generate_report(
        &dataset,
        &selection.target,
        &selection.features,
        format,
        &renderer,
    )?;

    let path = output
        .unwrap_or_else(|| PathBuf::from(format!("report.{}", artifact.file_extension())));
    artifact.write_to(&path)?;
    println!(
        "{} report ({}) written to {}",
        artifact.format(),
        artifact.mime_type(),
        path.display()
    );
    Ok(())
}
