use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use histosynth_core::{ARTIFACT_VERSION, PipelineConfig};
use histosynth_generate::GenerationReport;

use super::{RegistryError, RegistryResult};

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub run_dir: PathBuf,
    /// Directory the history was loaded from, or `fixture`.
    pub history: String,
    pub strict: bool,
    pub config: PipelineConfig,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub artifact_version: String,
    pub history: String,
    pub strict: bool,
    pub pipeline: PipelineConfig,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub generation_report_path: PathBuf,
    pub new_dir: PathBuf,
    pub full_dir: PathBuf,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let config_path = root.join("config.json");
    let logs_path = root.join("logs.ndjson");

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        artifact_version: ARTIFACT_VERSION.to_string(),
        history: ctx.history.clone(),
        strict: ctx.strict,
        pipeline: ctx.config.clone(),
        git: collect_git_info(),
    };

    write_json(&config_path, &config)?;

    OpenOptions::new().create(true).append(true).open(&logs_path)?;

    Ok(RunPaths {
        generation_report_path: root.join("generation_report.json"),
        new_dir: root.join("new"),
        full_dir: root.join("full"),
        logs_path,
        root,
    })
}

pub fn write_generation_report(paths: &RunPaths, report: &GenerationReport) -> RegistryResult<()> {
    write_json(&paths.generation_report_path, report)
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_directory_holds_config_and_log() {
        let run_dir = std::env::temp_dir().join(format!("histosynth_runs_{}", uuid::Uuid::new_v4()));
        let ctx = RunContext {
            run_id: "abc".to_string(),
            started_at: Utc::now(),
            run_dir: run_dir.clone(),
            history: "fixture".to_string(),
            strict: true,
            config: PipelineConfig::new(2022, 4),
        };

        let paths = start_run(&ctx).expect("start run");
        let name = paths.root.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.ends_with("__run_abc"));
        assert!(paths.logs_path.is_file());

        let config: serde_json::Value = serde_json::from_slice(
            &std::fs::read(paths.root.join("config.json")).expect("read config"),
        )
        .expect("parse config");
        assert_eq!(config["pipeline"]["start_year"], 2022);
        assert_eq!(config["history"], "fixture");
    }
}
