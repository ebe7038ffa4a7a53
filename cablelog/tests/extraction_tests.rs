//! Extraction tests against tester export fixtures

use cablelog::prelude::*;
use cablelog::{ExtractError, RawFile, RecordExtractor};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn data_path(size: &str, serial: &str, file: &str) -> PathBuf {
    fixture_path("Data").join(size).join(serial).join(file)
}

#[test]
fn test_extract_leakage_fixture() {
    let table = cablelog::extract_file(
        &data_path("11", "0312345678", "0312345678 Leakage Rev A.csv"),
        "11",
        "0312345678",
    )
    .expect("Should extract leakage export");

    assert_eq!(table.test_type, TestType::Leakage);
    assert_eq!(table.len(), 132, "DELAY and malformed rows are not emitted");

    let first = &table.rows[0];
    assert_eq!(first.channel.as_str(), "F1");
    assert_eq!(first.measured, 500.0);
    assert_eq!(first.expected, 10_000.0);

    let second = &table.rows[1];
    assert_eq!(second.channel.as_str(), "F2");
    assert_eq!(second.measured, 1000.0);
}

#[test]
fn test_extract_resistance_fixture() {
    let table = cablelog::extract_file(
        &data_path("11", "0312345678", "0312345678 Resistance Rev A.csv"),
        "11",
        "0312345678",
    )
    .expect("Should extract resistance export");

    assert_eq!(table.test_type, TestType::Resistance);
    let got: Vec<(&str, f64, f64)> = table
        .rows
        .iter()
        .map(|r| (r.channel.as_str(), r.measured, r.expected))
        .collect();
    assert_eq!(
        got,
        vec![
            ("RS1", 150.0, 1000.0),
            ("R2", 2_300_000.0, 0.0),
            ("FS3", 1250.0, 2000.0),
        ]
    );
}

#[test]
fn test_extract_writes_derived_csv() {
    let out = tempfile::tempdir().unwrap();
    let options = ExtractionOptions {
        output_root: Some(out.path().to_path_buf()),
    };

    let table = CableLogCore::extract_file(
        &data_path("15", "0412345678", "0412345678 Continuity-Test-Inv-RevC.csv"),
        "15",
        "0412345678",
        options,
    )
    .expect("Should extract continuity export");
    assert_eq!(table.test_type, TestType::InvertedContinuity);

    let written = out
        .path()
        .join("15")
        .join("0412345678")
        .join("inv_continuity_15_0412345678.csv");
    let content = std::fs::read_to_string(&written).expect("Derived CSV should exist");
    assert_eq!(
        content,
        "Channel,Measured_R (mOhm),Expected_R (mOhm)\nF1,500.0,0.0\nF2,750.0,1000.0\n"
    );

    let leftovers: Vec<_> = std::fs::read_dir(written.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "Temporary file should be renamed away");
}

#[test]
fn test_end_to_end_leakage_row() {
    let content = "Report\n\nInstruction Type,From Points,Value Measured,Value Expected\n\
                   CUSTOM,F5 (DIB - SIGNAL),12.5nA,10nA\n";
    let file = RawFile::new("Cable 0312345678 Leakage Rev A export.csv", content);
    let table = RecordExtractor::default()
        .extract(&file, "11", "0312345678")
        .unwrap();

    let mut buf = Vec::new();
    table.write_csv(&mut buf).unwrap();
    assert_eq!(
        String::from_utf8(buf).unwrap(),
        "Channel,Measured_pA,Expected_pA\nF5,12500.0,10000.0\n"
    );
}

#[test]
fn test_end_to_end_resistance_row() {
    let content = "Instruction Type,From Points,Value Measured,Value Expected\n\
                   4WIRE,R2,2.3 kohm,\n";
    let file = RawFile::new("Cable Resistance Rev A export.csv", content);
    let table = RecordExtractor::default().extract(&file, "15", "SN").unwrap();

    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].measured, 2_300_000.0);
    assert_eq!(table.rows[0].expected, 0.0);
}

#[test]
fn test_header_not_found_is_skip() {
    let result = cablelog::extract_file(
        &data_path("15", "0412345678", "0412345678 Leakage 1s.csv"),
        "15",
        "0412345678",
    );
    assert!(matches!(result, Err(CableLogError::Parse(_))));

    let file = RawFile::from_path(&data_path("15", "0412345678", "0412345678 Leakage 1s.csv"))
        .unwrap();
    let err = RecordExtractor::default()
        .extract(&file, "15", "0412345678")
        .unwrap_err();
    assert!(matches!(err, ExtractError::HeaderNotFound(_)));
    assert!(err.is_skip());
}

#[test]
fn test_nonexistent_file() {
    let result = cablelog::extract_file(&fixture_path("missing Leakage Rev A.csv"), "11", "SN");
    assert!(matches!(result, Err(CableLogError::Io(_))));
}

#[test]
fn test_each_family_writes_its_derived_file() {
    let out = tempfile::tempdir().unwrap();
    let cases = [
        (
            "0112345678 Leakage 1s.csv",
            TestType::OneSecondLeakage,
            "1s_leakage_15_0112345678.csv",
            "Channel,Measured_pA,Expected_pA\nF1,750.0,5000.0\nF2,1200.0,5000.0\nF3,2000.0,0.0\n",
        ),
        (
            "0112345678 Resistance Inverted Rev A.csv",
            TestType::InvertedResistance,
            "inv_resistance_15_0112345678.csv",
            "Channel,Measured_R (mOhm),Expected_R (mOhm)\nR1,350.0,1000.0\nRS2,420.0,0.0\n",
        ),
        (
            "0112345678 Continuity-Test-RevC.csv",
            TestType::Continuity,
            "continuity_15_0112345678.csv",
            "Channel,Measured_R (mOhm),Expected_R (mOhm)\nF7,1500000.0,2000000.0\n",
        ),
    ];

    for (name, test_type, derived, content) in cases {
        let options = ExtractionOptions {
            output_root: Some(out.path().to_path_buf()),
        };
        let table = CableLogCore::extract_file(
            &fixture_path("single").join(name),
            "15",
            "0112345678",
            options,
        )
        .unwrap_or_else(|e| panic!("{name} should extract: {e}"));
        assert_eq!(table.test_type, test_type, "{name}");

        let written = out.path().join("15").join("0112345678").join(derived);
        assert_eq!(
            std::fs::read_to_string(&written).unwrap(),
            content,
            "{name}"
        );
    }
}
