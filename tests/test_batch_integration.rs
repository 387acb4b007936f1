//! Integration tests for the file-based batch path
//!
//! Light curves are written to a temp directory, discovered, scanned by the
//! aggregator and persisted through each backend.

#[cfg(test)]
mod batch_integration_tests {
    use lcps::batch::{BatchOptions, CandidateAggregator};
    use lcps::detection_core::{ScanParameters, TargetId};
    use lcps::ingest::delimited::write_delimited_series;
    use lcps::ingest::{discover_targets, FileSeriesSource};
    use lcps::output::csv_writer::{read_candidates, TITLE_LINE};
    use lcps::output::{BackendType, CandidateWriter, Checkpointer, WriteMode};
    use lcps::synthetic::{flat_series, insert_dip};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn write_fixtures(dir: &Path) {
        let k2 = flat_series(TargetId::Catalog(205919993), 200, 1.0).unwrap();
        let k2 = insert_dip(&k2, 50, 3, 0.97).unwrap();
        write_delimited_series(&dir.join("205919993.csv"), &k2).unwrap();

        let mut flux = vec![1.0; 200];
        for f in &mut flux[120..124] {
            *f = 0.97;
        }
        let time: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let json = serde_json::json!({ "target_id": 205919994, "time": time, "flux": flux });
        std::fs::write(dir.join("205919994.json"), json.to_string()).unwrap();

        std::fs::write(dir.join("broken.csv"), "time,flux\n1,abc\n").unwrap();
        std::fs::write(dir.join("notes.md"), "not a light curve").unwrap();
    }

    fn options() -> BatchOptions {
        BatchOptions {
            workers: 2,
            checkpoint_interval: 1,
            checkpoint_path: None,
            parallel_windows: false,
        }
    }

    async fn run_once(input: &Path, output: &Path, backend: BackendType, mode: WriteMode) -> lcps::batch::BatchReport {
        let locators = discover_targets(input).unwrap();
        let mut aggregator = CandidateAggregator::new(
            Arc::new(FileSeriesSource::new()),
            ScanParameters::default(),
            options(),
        )
        .unwrap()
        .with_checkpointer(Checkpointer::beside(output));
        let mut writer = CandidateWriter::new(backend, output.to_path_buf(), mode).unwrap();
        aggregator.run_and_persist(&locators, &mut writer).await.unwrap()
    }

    #[tokio::test]
    async fn test_batch_skips_broken_target_and_writes_csv() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("lightcurves");
        std::fs::create_dir(&input).unwrap();
        write_fixtures(&input);
        let output = dir.path().join("dips.log");

        let report = run_once(&input, &output, BackendType::Csv, WriteMode::Overwrite).await;

        assert_eq!(report.targets_processed, 3);
        assert_eq!(report.targets_with_candidates, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error.kind(), "malformed");
        assert!(report.failures[0].locator.path().ends_with("broken.csv"));

        let rows = read_candidates(&output).unwrap();
        let summary: Vec<(TargetId, f64)> = rows.iter().map(|c| (c.target_id.clone(), c.egress_time)).collect();
        assert_eq!(
            summary,
            vec![(TargetId::Catalog(205919993), 53.0), (TargetId::Catalog(205919994), 124.0)]
        );
        assert!(rows.iter().all(|c| (c.min_relative_flux - 0.97).abs() < 1e-12));

        // Final write supersedes the checkpoint
        assert!(!Checkpointer::beside(&output).path().exists());
    }

    #[tokio::test]
    async fn test_append_then_overwrite() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("lightcurves");
        std::fs::create_dir(&input).unwrap();
        write_fixtures(&input);
        let output = dir.path().join("dips.log");

        run_once(&input, &output, BackendType::Csv, WriteMode::Overwrite).await;
        run_once(&input, &output, BackendType::Csv, WriteMode::Append).await;
        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(content.matches(TITLE_LINE).count(), 1);
        assert_eq!(read_candidates(&output).unwrap().len(), 4);

        run_once(&input, &output, BackendType::Csv, WriteMode::Overwrite).await;
        assert_eq!(read_candidates(&output).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_jsonl_and_sqlite_backends() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("lightcurves");
        std::fs::create_dir(&input).unwrap();
        write_fixtures(&input);

        let jsonl = dir.path().join("dips.jsonl");
        run_once(&input, &jsonl, BackendType::Jsonl, WriteMode::Overwrite).await;
        let lines: Vec<serde_json::Value> = std::fs::read_to_string(&jsonl)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["record"], "parameters");
        assert_eq!(lines[2]["target_id"], 205919994);
        assert_eq!(lines[2]["egress_time"], 124.0);

        let db = dir.path().join("dips.db");
        run_once(&input, &db, BackendType::Sqlite, WriteMode::Overwrite).await;
        run_once(&input, &db, BackendType::Sqlite, WriteMode::Append).await;
        let conn = rusqlite::Connection::open(&db).unwrap();
        let runs: i64 = conn.query_row("SELECT COUNT(*) FROM scan_runs", [], |r| r.get(0)).unwrap();
        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM dip_candidates", [], |r| r.get(0)).unwrap();
        assert_eq!(runs, 2);
        assert_eq!(rows, 4);
    }

    #[tokio::test]
    async fn test_single_file_input() {
        let dir = tempdir().unwrap();
        write_fixtures(dir.path());
        let output = dir.path().join("out").join("dips.log");

        let report = run_once(&dir.path().join("205919994.json"), &output, BackendType::Csv, WriteMode::Overwrite).await;
        assert_eq!(report.targets_processed, 1);
        assert!(report.failures.is_empty());
        assert_eq!(read_candidates(&output).unwrap().len(), 1);
    }
}
