//! Extract one tester export and print its canonical rows.
//! Run with: cargo run --example extract_file <export.csv> <size> <serial>

use cablelog::prelude::*;
use std::path::Path;

fn main() -> Result<(), CableLogError> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: cargo run --example extract_file <export.csv> <size> <serial>");
        std::process::exit(1);
    }
    let path = Path::new(&args[1]);

    let table = CableLogCore::extract_file(path, &args[2], &args[3], ExtractionOptions::default())?;

    println!("{} export: {}", table.test_type, path.display());
    println!("Rows: {}", table.len());
    println!();

    let [channel, measured, expected] = table.column_headers();
    println!("{:<8} {:>16} {:>16}", channel, measured, expected);
    for row in &table.rows {
        println!("{:<8} {:>16} {:>16}", row.channel.as_str(), row.measured, row.expected);
    }

    if table.test_type.is_leakage() {
        match MatrixBuilder::default().build_from_table(&table) {
            Ok(matrix) => println!("\nMatrix: 2x{} built", matrix.row(0).map_or(0, <[f64]>::len)),
            Err(e) => println!("\nNo matrix: {}", e),
        }
    }
    Ok(())
}
