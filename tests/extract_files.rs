//! End-to-end extraction: container files in, tab-separated tables out.

mod common;

use std::fs;

use common::{cube, energy_hist, hit_map, json_file, parquet_file, CountingOpener};
use histkit::extract::{extract_batch, extract_file, extract_pattern, read_table, BinRecord};
use histkit::{HistError, HistogramKind};

#[test]
fn single_file_writes_named_table() {
    let dir = tempfile::tempdir().unwrap();
    let input = json_file(dir.path(), "run_01.json", &[energy_hist(1.0)]);
    let opener = CountingOpener::default();

    let output = extract_file(&opener, &input, "ENeutron", dir.path()).unwrap();

    assert_eq!(output, dir.path().join("ENeutron_run_01.txt"));
    let text = fs::read_to_string(&output).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Bin Center\tBin Content\tBin Error"));
    assert_eq!(lines.next(), Some("0.5\t1.0\t1.0"));
    assert_eq!(text.lines().count(), 6);
    assert_eq!((opener.opened(), opener.closed()), (1, 1));
}

#[test]
fn two_d_table_from_parquet() {
    let dir = tempfile::tempdir().unwrap();
    let input = parquet_file(dir.path(), "hits.parquet", &[hit_map()]);

    let output = extract_file(&CountingOpener::default(), &input, "HitMap", dir.path()).unwrap();
    let table = read_table(fs::File::open(output).unwrap()).unwrap();

    assert_eq!(table.kind, HistogramKind::TwoDimensional);
    assert_eq!(table.records.len(), 6);
    // x outer, y inner
    let coords: Vec<(f64, f64)> = table
        .records
        .iter()
        .map(|r| match *r {
            BinRecord::TwoD { x, y, .. } => (x, y),
            BinRecord::OneD { .. } => panic!("expected 2D record"),
        })
        .collect();
    assert_eq!(
        coords,
        [(-1.0, 0.5), (-1.0, 1.5), (0.0, 0.5), (0.0, 1.5), (1.0, 0.5), (1.0, 1.5)]
    );
    let contents: Vec<f64> = table.records.iter().map(BinRecord::content).collect();
    assert_eq!(contents, [1.0, 3.0, 0.0, 0.0, 2.0, 4.0]);
}

#[test]
fn written_table_parses_back_to_extracted_records() {
    let dir = tempfile::tempdir().unwrap();
    let hist = energy_hist(0.1);
    let input = json_file(dir.path(), "fine.json", &[hist.clone()]);

    let output = extract_file(&CountingOpener::default(), &input, "ENeutron", dir.path()).unwrap();
    let parsed = read_table(fs::File::open(output).unwrap()).unwrap();

    assert_eq!(parsed.records, histkit::extract(&hist).unwrap());
}

#[test]
fn rerun_overwrites_with_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let input = json_file(dir.path(), "run.json", &[energy_hist(2.5)]);
    let opener = CountingOpener::default();

    let first = extract_file(&opener, &input, "ENeutron", dir.path()).unwrap();
    let first_bytes = fs::read(&first).unwrap();
    let second = extract_file(&opener, &input, "ENeutron", dir.path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_bytes, fs::read(&second).unwrap());
    let tables = fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "txt"))
        .count();
    assert_eq!(tables, 1);
}

#[test]
fn missing_histogram_closes_file_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = json_file(dir.path(), "other.json", &[hit_map()]);
    let opener = CountingOpener::default();

    let err = extract_file(&opener, &input, "ENeutron", dir.path()).unwrap_err();

    assert!(matches!(err, HistError::ObjectNotFound { .. }));
    assert!(!dir.path().join("ENeutron_other.txt").exists());
    assert_eq!((opener.opened(), opener.closed()), (1, 1));
}

#[test]
fn unsupported_kind_closes_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = json_file(dir.path(), "cube.json", &[cube()]);
    let opener = CountingOpener::default();

    let err = extract_file(&opener, &input, "ENeutron", dir.path()).unwrap_err();

    assert!(matches!(
        err,
        HistError::UnsupportedHistogramKind {
            dimensionality: 3,
            ..
        }
    ));
    assert!(opener.balanced());
}

#[test]
fn batch_skips_bad_files_and_keeps_going() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let without = json_file(dir.path(), "without.json", &[hit_map()]);
    let good = json_file(dir.path(), "good.json", &[energy_hist(1.0)]);
    let opener = CountingOpener::default();

    let report = extract_batch(
        &opener,
        &[missing.clone(), without.clone(), good],
        "ENeutron",
        dir.path(),
    );

    assert_eq!(report.written, [dir.path().join("ENeutron_good.txt")]);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].path, missing);
    assert!(matches!(report.failures[0].error, HistError::FileOpen { .. }));
    assert_eq!(report.failures[1].path, without);
    assert!(matches!(report.failures[1].error, HistError::ObjectNotFound { .. }));
    assert_eq!(report.processed(), 3);
    // The missing file never opened; the other two closed once each.
    assert_eq!((opener.opened(), opener.closed()), (2, 2));
    assert!(opener.balanced());
}

#[test]
fn batch_pattern_with_no_match_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = format!("{}/*.json", dir.path().display());

    let err = extract_pattern(&CountingOpener::default(), &pattern, "ENeutron", dir.path()).unwrap_err();

    assert!(matches!(err, HistError::NoMatchingFiles { .. }));
}

#[test]
fn batch_pattern_processes_every_match() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = dir.path().join("in");
    let outputs = dir.path().join("out");
    fs::create_dir_all(&inputs).unwrap();
    fs::create_dir_all(&outputs).unwrap();
    json_file(&inputs, "a.json", &[energy_hist(1.0)]);
    parquet_file(&inputs, "b.parquet", &[energy_hist(2.0)]);
    json_file(&inputs, "c.json", &[cube()]);
    let opener = CountingOpener::default();

    let pattern = format!("{}/*", inputs.display());
    let report = extract_pattern(&opener, &pattern, "ENeutron", &outputs).unwrap();

    assert_eq!(
        report.written,
        [outputs.join("ENeutron_a.txt"), outputs.join("ENeutron_b.txt")]
    );
    assert_eq!(report.failures.len(), 1);
    assert!(!report.is_clean());
    assert_eq!((opener.opened(), opener.closed()), (3, 3));
}

#[test]
fn batch_survives_file_declaring_absurd_binning() {
    let dir = tempfile::tempdir().unwrap();
    let huge = dir.path().join("a_huge.json");
    fs::write(
        &huge,
        r#"{"histograms":[{"name":"ENeutron","x":{"bins":100000000000000,"min":0,"max":1},"contents":[0,1,0]}]}"#,
    )
    .unwrap();
    let good = json_file(dir.path(), "b_good.json", &[energy_hist(1.0)]);
    let opener = CountingOpener::default();

    let report = extract_batch(&opener, &[huge.clone(), good], "ENeutron", dir.path());

    assert_eq!(report.written, [dir.path().join("ENeutron_b_good.txt")]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, huge);
    assert!(matches!(report.failures[0].error, HistError::FileOpen { .. }));
    assert!(opener.balanced());
}
