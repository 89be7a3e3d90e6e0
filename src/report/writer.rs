use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use crate::core::{BenchError, RunContext};

use super::BenchmarkReport;

/// Persist the report as pretty JSON. The file is written beside the target
/// and renamed into place, so a failed write never leaves a partial report.
pub fn write_report(report: &BenchmarkReport, path: &Path) -> Result<(), BenchError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let mut out = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut out, report)?;
        out.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn log_summary(report: &BenchmarkReport, ctx: &RunContext) {
    info!(
        run_id = ctx.run_id();
        "Benchmark Summary ({}):",
        report.timestamp().format("%Y-%m-%d %H:%M:%S")
    );
    for category in report.categories() {
        info!(run_id = ctx.run_id(); "{}:", category.name.to_uppercase());
        for test in &category.tests {
            info!(run_id = ctx.run_id(); "  {}:", test.name);
            info!(run_id = ctx.run_id(); "    Mean: {:.4}s", test.result.mean);
            info!(run_id = ctx.run_id(); "    Median: {:.4}s", test.result.median);
            info!(run_id = ctx.run_id(); "    Std Dev: {:.4}s", test.result.std_dev);
        }
    }
    for finding in report.findings() {
        info!(run_id = ctx.run_id(); "{}", finding);
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("json").join("benchmark_report.json");
        let report = BenchmarkReport::new(3, Vec::new(), &RunContext::with_id("test"));

        write_report(&report, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["summary"]["total_queries_executed"], 0);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
