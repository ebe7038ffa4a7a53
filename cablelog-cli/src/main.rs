//! CableLog CLI - cable tester-log extraction from the command line.

use anyhow::{bail, Context, Result};
use cablelog::{
    classify, BatchResult, CableId, CableLogCore, CableRegistry, CountPolicy, ExtractedTable,
    ExtractionOptions, Matrix, MatrixBuilder, MatrixOptions, MatrixRenderer, PhysicalLayout,
    RawFile, TestType, TextHeatmap, TieBreak,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::Level;

#[derive(Parser)]
#[command(name = "cablelog")]
#[command(about = "Cable tester-log extraction and leakage matrix tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Log extraction details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the test type of each export file name
    Classify {
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Extract and normalize a single export
    Extract {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Cable size folder the export belongs to
        #[arg(long)]
        size: String,

        /// Cable serial number
        #[arg(long)]
        serial: String,

        /// Write the derived CSV under DIR/<size>/<serial>/
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Extract every export under DIR/<size>/<serial>/
    Batch {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Write derived CSVs under this directory
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Also write all rows, with provenance, to one CSV
        #[arg(long, value_name = "FILE")]
        combined: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Arrange a leakage export into the 2x66 fixture matrix
    Matrix {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Layout JSON replacing the built-in DIB layout
        #[arg(long, value_name = "JSON")]
        layout: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "last")]
        tie_break: TieBreakArg,

        #[arg(long, value_enum, default_value = "readings")]
        count_policy: CountPolicyArg,

        #[arg(short, long, value_enum, default_value = "human")]
        format: MatrixFormat,
    },

    /// Group uploaded exports by cable serial
    Cables {
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Write derived CSVs under DIR/<paradiseTemp|teslaTemp>/
        #[arg(long, value_name = "DIR")]
        work_dir: Option<PathBuf>,

        /// Render a heatmap for every cable with leakage data
        #[arg(long)]
        heatmap: bool,
    },

    /// Print the fixture position layout
    Layout {
        #[arg(long, value_name = "JSON")]
        layout: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum MatrixFormat {
    Human,
    Json,
    /// Two CSV lines of 66 values
    Csv,
    /// Terminal heatmap in nA
    Heatmap,
}

#[derive(Clone, Copy, ValueEnum)]
enum TieBreakArg {
    Last,
    First,
}

impl From<TieBreakArg> for TieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::Last => TieBreak::LastWins,
            TieBreakArg::First => TieBreak::FirstWins,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CountPolicyArg {
    Readings,
    Positions,
}

impl From<CountPolicyArg> for CountPolicy {
    fn from(arg: CountPolicyArg) -> Self {
        match arg {
            CountPolicyArg::Readings => CountPolicy::Readings,
            CountPolicyArg::Positions => CountPolicy::Positions,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Classify { files, format } => handle_classify(&files, format),
        Commands::Extract {
            file,
            size,
            serial,
            output_dir,
            format,
        } => handle_extract(&file, &size, &serial, output_dir, format),
        Commands::Batch {
            dir,
            output_dir,
            combined,
            format,
        } => handle_batch(&dir, output_dir, combined.as_deref(), format),
        Commands::Matrix {
            file,
            layout,
            tie_break,
            count_policy,
            format,
        } => {
            let options = MatrixOptions {
                tie_break: tie_break.into(),
                count_policy: count_policy.into(),
            };
            handle_matrix(&file, layout.as_deref(), options, format)
        }
        Commands::Cables {
            files,
            work_dir,
            heatmap,
        } => handle_cables(&files, work_dir, heatmap),
        Commands::Layout { layout } => handle_layout(layout.as_deref()),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_classify(files: &[PathBuf], format: OutputFormat) -> Result<i32> {
    let classified: Vec<(String, TestType)> = files
        .iter()
        .map(|f| {
            let name = file_name(f);
            let test_type = classify(&name);
            (name, test_type)
        })
        .collect();

    match format {
        OutputFormat::Human => {
            for (name, test_type) in &classified {
                println!("{:<16} {}", test_type.label(), name);
            }
        }
        OutputFormat::Json => {
            let output: Vec<_> = classified
                .iter()
                .map(|(name, test_type)| {
                    serde_json::json!({
                        "file": name,
                        "test_type": test_type,
                        "known": test_type.is_known(),
                    })
                })
                .collect();
            print_json(&output)?;
        }
    }
    Ok(0)
}

fn handle_extract(
    file: &Path,
    size: &str,
    serial: &str,
    output_dir: Option<PathBuf>,
    format: OutputFormat,
) -> Result<i32> {
    let options = ExtractionOptions {
        output_root: output_dir.clone(),
    };
    let table = CableLogCore::extract_file(file, size, serial, options)
        .with_context(|| format!("Failed to extract {}", file.display()))?;

    match format {
        OutputFormat::Human => {
            output_table(&table);
            if let Some(root) = output_dir {
                println!("\n  Written: {}", table.derived_path(&root).display());
            }
        }
        OutputFormat::Json => print_json(&table)?,
    }
    Ok(0)
}

fn output_table(table: &ExtractedTable) {
    println!("\nFile: {}", table.provenance.source);
    println!("{}", "─".repeat(60));
    println!(
        "  {} ({} {}) - {} rows",
        table.test_type,
        table.provenance.size,
        table.provenance.serial,
        table.len()
    );
    if table.is_empty() {
        return;
    }

    let [channel, measured, expected] = table.column_headers();
    println!("\n  {:<10} {:>20} {:>20}", channel, measured, expected);
    for row in &table.rows {
        println!(
            "  {:<10} {:>20} {:>20}",
            row.channel.as_str(),
            cablelog::format_value(row.measured),
            cablelog::format_value(row.expected)
        );
    }
}

fn handle_batch(
    dir: &Path,
    output_dir: Option<PathBuf>,
    combined: Option<&Path>,
    format: OutputFormat,
) -> Result<i32> {
    let options = ExtractionOptions {
        output_root: output_dir,
    };
    let result = CableLogCore::run_batch(dir, options)
        .with_context(|| format!("Failed to walk {}", dir.display()))?;

    if let Some(path) = combined {
        let file = fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        result
            .write_combined_csv(io::BufWriter::new(file))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    match format {
        OutputFormat::Human => output_batch_human(&result),
        OutputFormat::Json => print_json(&serde_json::json!({
            "generated_at": result.generated_at,
            "tables": result.tables.iter().map(|t| serde_json::json!({
                "source": t.provenance.source,
                "size": t.provenance.size,
                "serial": t.provenance.serial,
                "test_type": t.test_type,
                "rows": t.len(),
            })).collect::<Vec<_>>(),
            "skipped": result.skipped,
            "stats": result.stats,
        }))?,
    }
    Ok(0)
}

fn output_batch_human(result: &BatchResult) {
    for table in &result.tables {
        println!(
            "  {:<16} {:>5} rows  {}",
            table.test_type.label(),
            table.len(),
            table.provenance.source
        );
    }
    if !result.skipped.is_empty() {
        println!("\n  SKIPPED:");
        for skipped in &result.skipped {
            println!("    - {}: {}", skipped.path.display(), skipped.reason);
        }
    }

    println!("\n  Summary:");
    println!("    Files:     {}", result.stats.files);
    println!("    Extracted: {}", result.stats.extracted);
    println!("    Skipped:   {}", result.stats.skipped);
    println!("    Rows:      {}", result.stats.rows);
}

fn load_layout(path: Option<&Path>) -> Result<PhysicalLayout> {
    match path {
        Some(path) => PhysicalLayout::load(path)
            .with_context(|| format!("Failed to load layout {}", path.display())),
        None => Ok(PhysicalLayout::builtin()),
    }
}

fn handle_matrix(
    file: &Path,
    layout: Option<&Path>,
    options: MatrixOptions,
    format: MatrixFormat,
) -> Result<i32> {
    let builder = MatrixBuilder::with_options(load_layout(layout)?, options);

    let name = file_name(file);
    let (size, serial) = match CableId::from_file_name(&name) {
        Ok(id) => (id.length_in.to_string(), id.serial),
        Err(_) => (String::new(), String::new()),
    };
    let table = cablelog::extract_file(file, &size, &serial)
        .with_context(|| format!("Failed to extract {}", file.display()))?;
    if !table.test_type.is_leakage() {
        bail!("{} is a {} export; matrices need leakage data", name, table.test_type);
    }
    let matrix = builder
        .build_from_table(&table)
        .with_context(|| format!("Failed to build matrix from {}", name))?;

    let cable = if serial.is_empty() { name.as_str() } else { serial.as_str() };
    match format {
        MatrixFormat::Human => output_matrix_human(&matrix, &builder),
        MatrixFormat::Json => print_json(&serde_json::json!({
            "cable": cable,
            "layout": builder.layout().name,
            "rows": matrix.rows(),
        }))?,
        MatrixFormat::Csv => {
            let stdout = io::stdout();
            matrix.write_csv(stdout.lock())?;
        }
        MatrixFormat::Heatmap => print!("{}", TextHeatmap::default().render(&matrix, cable)),
    }
    Ok(0)
}

fn output_matrix_human(matrix: &Matrix, builder: &MatrixBuilder) {
    let labels: Vec<&str> = builder.layout().positions().collect();
    for (half, row) in ["Top", "Bottom"].iter().zip(matrix.rows()) {
        println!("\n  {}:", half);
        let offset = if *half == "Top" { 0 } else { row.len() };
        for (i, value) in row.iter().enumerate() {
            println!(
                "    {:<6} {:>12} pA",
                labels.get(offset + i).copied().unwrap_or("?"),
                cablelog::format_value(*value)
            );
        }
    }
}

fn handle_cables(files: &[PathBuf], work_dir: Option<PathBuf>, heatmap: bool) -> Result<i32> {
    let mut registry = match work_dir {
        Some(dir) => CableRegistry::new(dir),
        None => CableRegistry::in_memory(),
    };

    let mut failures = 0;
    for path in files {
        let file = RawFile::from_path(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        match registry.ingest(&file) {
            Ok((serial, test_type)) => {
                tracing::info!("{}: {} for cable {}", file.name, test_type, serial)
            }
            Err(e) => {
                failures += 1;
                eprintln!("  {}: {}", file.name, e);
            }
        }
    }

    let builder = MatrixBuilder::default();
    let renderer = TextHeatmap::default();
    let mut out = io::stdout().lock();
    for cable in registry.cables() {
        writeln!(
            out,
            "\nCable {} ({}, {} in)",
            cable.id.serial, cable.id.kind, cable.id.length_in
        )?;
        for table in cable.tables() {
            writeln!(out, "  {:<16} {:>5} rows", table.test_type.label(), table.len())?;
        }
        if !heatmap {
            continue;
        }
        for test_type in [TestType::Leakage, TestType::OneSecondLeakage] {
            if cable.table(test_type).is_none() {
                continue;
            }
            match cable.matrix(test_type, &builder) {
                Ok(matrix) => {
                    writeln!(out, "\n  {}", test_type)?;
                    write!(out, "{}", renderer.render(&matrix, &cable.id.serial))?;
                }
                Err(e) => writeln!(out, "  {}: {}", test_type, e)?,
            }
        }
    }

    if registry.is_empty() {
        bail!("No cable could be identified from {} file(s)", files.len());
    }
    Ok(if failures > 0 { 1 } else { 0 })
}

fn handle_layout(layout: Option<&Path>) -> Result<i32> {
    let layout = load_layout(layout)?;
    println!("Layout: {} ({} positions)", layout.name, layout.len());
    println!("  Top:    {}", layout.top().join(" "));
    println!("  Bottom: {}", layout.bottom().join(" "));
    Ok(0)
}
