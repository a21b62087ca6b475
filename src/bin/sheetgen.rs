//! sheetgen CLI - generate XML records and source code from tabular data
//!
//! Reads a workbook (a directory of CSV files or a single CSV file) whose
//! column headers carry a small schema language, and emits per-row XML record
//! files, a generated class hierarchy and a data-loading script.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use sheetgen::orchestrator::{self, RunOptions};

#[derive(Parser)]
#[command(name = "sheetgen")]
#[command(version, about = "Generate XML records and source code from tabular data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tables in a workbook
    List {
        /// Workbook directory or CSV file
        #[arg(short, long, default_value = "data")]
        source: PathBuf,
    },

    /// Write one XML record file per data row
    Records {
        /// Workbook directory or CSV file
        #[arg(short, long, default_value = "data")]
        source: PathBuf,

        /// Output directory for generated artifacts
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,

        /// Restrict the run to one table
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Generate the class-hierarchy source file per table
    Class {
        /// Workbook directory or CSV file
        #[arg(short, long, default_value = "data")]
        source: PathBuf,

        /// Output directory for generated artifacts
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,

        /// Restrict the run to one table
        #[arg(short, long)]
        table: Option<String>,

        /// Class template file; its extension names the output files
        #[arg(long)]
        template: PathBuf,
    },

    /// Generate the data-loading script per table
    DataScript {
        /// Workbook directory or CSV file
        #[arg(short, long, default_value = "data")]
        source: PathBuf,

        /// Output directory for generated artifacts
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,

        /// Restrict the run to one table
        #[arg(short, long)]
        table: Option<String>,

        /// Data-script template file; its extension names the output files
        #[arg(long)]
        template: PathBuf,
    },

    /// Print the inferred schema trees as JSON
    Schema {
        /// Workbook directory or CSV file
        #[arg(short, long, default_value = "data")]
        source: PathBuf,

        /// Restrict the dump to one table
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Records, class source and data script in one run
    All {
        /// Workbook directory or CSV file
        #[arg(short, long, default_value = "data")]
        source: PathBuf,

        /// Output directory for generated artifacts
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,

        /// Restrict the run to one table
        #[arg(short, long)]
        table: Option<String>,

        /// Class template file
        #[arg(long)]
        class_template: PathBuf,

        /// Data-script template file
        #[arg(long)]
        data_template: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List { source } => list_tables(source),
        Commands::Records { source, output, table } => {
            generate_records(RunOptions { source, output, table })
        }
        Commands::Class { source, output, table, template } => {
            generate_class(RunOptions { source, output, table }, template)
        }
        Commands::DataScript { source, output, table, template } => {
            generate_data_script(RunOptions { source, output, table }, template)
        }
        Commands::Schema { source, table } => dump_schema(source, table),
        Commands::All { source, output, table, class_template, data_template } => {
            generate_all(RunOptions { source, output, table }, class_template, data_template)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn list_tables(source: PathBuf) -> Result<(), String> {
    let tables = orchestrator::list_tables(&source).map_err(|e| e.to_string())?;
    for name in &tables {
        println!("{}", name);
    }
    println!("  ✓ {} tables", tables.len());
    Ok(())
}

fn generate_records(opts: RunOptions) -> Result<(), String> {
    println!("🔧 Generating records from {}...", opts.source.display());
    let written = orchestrator::generate_records(&opts).map_err(|e| e.to_string())?;
    println!("  ✓ Wrote {} record files", written);
    println!("✨ Record generation complete!");
    Ok(())
}

fn generate_class(opts: RunOptions, template: PathBuf) -> Result<(), String> {
    println!("🔧 Generating class source from {}...", opts.source.display());
    let paths = orchestrator::generate_class(&opts, &template).map_err(|e| e.to_string())?;
    for path in &paths {
        println!("  ✓ Generated {}", path.display());
    }
    println!("✨ Class generation complete!");
    Ok(())
}

fn generate_data_script(opts: RunOptions, template: PathBuf) -> Result<(), String> {
    println!("🔧 Generating data script from {}...", opts.source.display());
    let paths = orchestrator::generate_data_script(&opts, &template).map_err(|e| e.to_string())?;
    for path in &paths {
        println!("  ✓ Generated {}", path.display());
    }
    println!("✨ Data script generation complete!");
    Ok(())
}

fn dump_schema(source: PathBuf, table: Option<String>) -> Result<(), String> {
    let json =
        orchestrator::schema_json(&source, table.as_deref()).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn generate_all(
    opts: RunOptions,
    class_template: PathBuf,
    data_template: PathBuf,
) -> Result<(), String> {
    println!("🔧 Generating all artifacts from {}...", opts.source.display());
    let written = orchestrator::generate_all(&opts, &class_template, &data_template)
        .map_err(|e| e.to_string())?;
    println!("  ✓ Wrote {} record files", written);
    println!("  ✓ Generated class source and data scripts");
    println!("✨ Generation complete!");
    Ok(())
}
