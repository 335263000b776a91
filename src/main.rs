//! Restruct CLI - Restructure spreadsheets onto a template schema
//!
//! # Main Commands
//!
//! ```bash
//! restruct serve                           # Start HTTP server (port 8000)
//! restruct restructure data.csv tmpl.csv   # Offline run, prints the change log
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! restruct sample input.csv          # Show the first rows as JSON
//! restruct plan data.csv tmpl.csv    # Show the mapping plan without applying it
//! restruct operations                # Show available transformations
//! restruct example-catalog           # Show an example transformation catalog
//! ```

use clap::{Parser, Subcommand};
use restruct::config::{load_catalog, AppConfig};
use restruct::mapper::{example_catalog, map_table, plan_rules, MapperOptions, TransformCatalog};
use restruct::reader::read_table;
use restruct::sampler::sample_to_json;
use restruct::writer::{write_csv, write_xlsx};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "restruct")]
#[command(about = "Restructure spreadsheet data onto a template's column schema", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a source file onto a template schema and write the result
    Restructure {
        /// Source data file (.csv, .tsv, .xls, .xlsx)
        source: PathBuf,

        /// Template file whose header row defines the output schema
        template: PathBuf,

        /// Output file; format follows the extension (default: restructured.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Transformation catalog JSON file
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Minimum similarity score for an inferred mapping
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Show the mapping plan for a source/template pair without applying it
    Plan {
        /// Source data file
        source: PathBuf,

        /// Template file
        template: PathBuf,

        /// Transformation catalog JSON file
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },

    /// Parse a file and print its first rows as JSON
    Sample {
        /// Input file
        input: PathBuf,

        /// Number of rows to show
        #[arg(short, long, default_value = "5")]
        rows: usize,
    },

    /// Show an example transformation catalog
    ExampleCatalog,

    /// Show available transformation operations
    Operations,

    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides RESTRUCT_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Restructure {
            source,
            template,
            output,
            catalog,
            threshold,
        } => cmd_restructure(
            &source,
            &template,
            output.as_deref(),
            catalog.as_deref(),
            threshold,
        ),

        Commands::Plan {
            source,
            template,
            catalog,
        } => cmd_plan(&source, &template, catalog.as_deref()),

        Commands::Sample { input, rows } => cmd_sample(&input, rows),

        Commands::ExampleCatalog => cmd_example_catalog(),

        Commands::Operations => cmd_operations(),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_cli_catalog(path: Option<&Path>) -> Result<TransformCatalog, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(load_catalog(&p.to_string_lossy())?),
        None => Ok(TransformCatalog::default()),
    }
}

fn cmd_restructure(
    source: &Path,
    template: &Path,
    output: Option<&Path>,
    catalog_path: Option<&Path>,
    threshold: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Reading source: {}", source.display());
    let source_bytes = fs::read(source)?;
    let source_parsed = read_table(&source_bytes, &source.to_string_lossy())?;
    eprintln!(
        "   {} column(s), {} row(s)",
        source_parsed.table.column_count(),
        source_parsed.table.row_count()
    );

    eprintln!("Reading template: {}", template.display());
    let template_bytes = fs::read(template)?;
    let template_parsed = read_table(&template_bytes, &template.to_string_lossy())?;
    let targets = template_parsed.table.headers().to_vec();
    eprintln!("   {} target column(s)", targets.len());

    let catalog = load_cli_catalog(catalog_path)?;
    let mut opts = MapperOptions::default();
    if let Some(t) = threshold {
        opts.threshold = t;
    }

    let out = map_table(&source_parsed.table, &targets, &catalog, &opts);

    let output_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("restructured.xlsx"));
    let bytes = match output_path.extension().and_then(|e| e.to_str()) {
        Some("csv") => write_csv(&out.table)?,
        _ => write_xlsx(&out.table)?,
    };
    fs::write(&output_path, bytes)?;

    println!("{}", out.changelog.render());
    eprintln!("Output written to: {}", output_path.display());
    Ok(())
}

fn cmd_plan(
    source: &Path,
    template: &Path,
    catalog_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source_bytes = fs::read(source)?;
    let source_parsed = read_table(&source_bytes, &source.to_string_lossy())?;
    let template_bytes = fs::read(template)?;
    let template_parsed = read_table(&template_bytes, &template.to_string_lossy())?;
    let targets = template_parsed.table.headers().to_vec();

    let catalog = load_cli_catalog(catalog_path)?;
    let plan = plan_rules(
        &source_parsed.table,
        &targets,
        &catalog,
        &MapperOptions::default(),
    );

    for planned in &plan {
        let source_name = planned.rule.source_name.as_deref().unwrap_or("(none)");
        let ops = planned.rule.describe_ops().join(", ");
        let ops = if ops.is_empty() {
            "copy".to_string()
        } else {
            ops
        };
        match &planned.note {
            Some(note) => println!(
                "{} <- {} [{}] ({})",
                planned.rule.target, source_name, ops, note
            ),
            None => println!("{} <- {} [{}]", planned.rule.target, source_name, ops),
        }
    }
    Ok(())
}

fn cmd_sample(input: &Path, rows: usize) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(input)?;
    let parsed = read_table(&bytes, &input.to_string_lossy())?;

    if let Some(encoding) = &parsed.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(delimiter) = parsed.delimiter {
        eprintln!(
            "   Delimiter: '{}'",
            match delimiter {
                '\t' => "\\t".to_string(),
                c => c.to_string(),
            }
        );
    }
    eprintln!("   Columns: {}", parsed.table.headers().join(", "));

    println!("{}", sample_to_json(&parsed.table, rows));
    Ok(())
}

fn cmd_example_catalog() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", example_catalog().to_json()?);
    Ok(())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", restruct::mapper::operations_description());
    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env()?;
    if let Some(p) = port {
        config.port = p;
    }
    restruct::api::start_server(config).await
}
