//! End-to-end tests of the `lcps` binary

#[cfg(test)]
mod cli_tests {
    use lcps::output::csv_writer::read_candidates;
    use std::process::Command;
    use tempfile::tempdir;

    fn lcps() -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_lcps"));
        cmd.env("RUST_LOG", "error");
        cmd.env_remove("LCPS_WIN_SIZE");
        cmd.env_remove("LCPS_MAX_DUR");
        cmd
    }

    #[test]
    fn test_synth_then_scan() {
        let dir = tempdir().unwrap();
        let curve = dir.path().join("201367065.csv");
        let output = dir.path().join("dips.log");

        let status = lcps()
            .args(["synth", curve.to_str().unwrap()])
            .args(["--target-id", "201367065", "--scale", "0.0005"])
            .args(["--dip-at", "500", "--dip-len", "3", "--dip-depth", "0.97"])
            .status()
            .unwrap();
        assert!(status.success());

        std::fs::write(dir.path().join("empty.csv"), "").unwrap();

        let status = lcps()
            .args(["scan", dir.path().to_str().unwrap()])
            .args(["--output", output.to_str().unwrap(), "--workers", "1"])
            .status()
            .unwrap();
        // A failed target does not fail the batch
        assert!(status.success());

        let rows = read_candidates(&output).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.as_slice()[0].target_id.to_string(), "201367065");
        assert_eq!(rows.as_slice()[0].egress_time, 503.0 * lcps::synthetic::DEFAULT_CADENCE);
    }

    #[test]
    fn test_invalid_parameters_exit_non_zero() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("dips.log");
        let status = lcps()
            .args(["scan", dir.path().to_str().unwrap()])
            .args(["--output", output.to_str().unwrap(), "--win-size", "4"])
            .status()
            .unwrap();
        assert!(!status.success());
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input_exit_non_zero() {
        let dir = tempdir().unwrap();
        let status = lcps()
            .args(["scan", dir.path().join("nope").to_str().unwrap()])
            .args(["--output", dir.path().join("dips.log").to_str().unwrap()])
            .status()
            .unwrap();
        assert!(!status.success());
    }
}
