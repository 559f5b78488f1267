//! End-to-end run used by the CLI: config, probing, evaluation and the receipt.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use engines_check_probe::{
    FileLogWriter, LoggingCommandRunner, OsCommandRunner, OsPathResolver, Prober, VersionProbe,
};
use engines_check_types::{
    EngineMap, EnginesError, HostMeta, Outcome, ReceiptEnvelope, Report, RunMeta, ToolMeta, Wanted,
    SCHEMA_ID, TOOL_NAME,
};
use serde::Deserialize;

use crate::Checker;

pub const CONFIG_FILE: &str = "engines-check.toml";

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Default output shape for `check`.
    #[serde(default)]
    pub detail: Option<bool>,
    #[serde(default)]
    pub ignore_engines: Vec<String>,
    /// Actual-version overrides.
    #[serde(default)]
    pub known: EngineMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Check,
    Detail,
    Assert,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub wanted: Wanted,
    /// Overrides `[known]` from the config file.
    pub known: EngineMap,
    pub config_path: Option<PathBuf>,
    pub detail: bool,
    pub debug_log_path: Option<PathBuf>,
}

pub struct CheckOutput {
    pub receipt: ReceiptEnvelope,
    pub outcome: Outcome,
    pub markdown: String,
    /// Incompatibility message, set in assert mode when unsatisfied.
    pub failure: Option<String>,
    pub exit_code: i32,
}

/// Run engines-check end-to-end from `root`.
///
/// Resolution failures are returned as errors. "Not satisfied" is a normal
/// output with exit code 2.
pub fn run_check(root: &Path, mode: Mode, options: RunOptions) -> anyhow::Result<CheckOutput> {
    let root = std::path::absolute(root).with_context(|| format!("resolve {}", root.display()))?;
    let root = root.as_path();
    let cfg = load_config(root, options.config_path.as_deref())?;

    match &options.debug_log_path {
        Some(path) => {
            let writer = FileLogWriter::new(path)
                .with_context(|| format!("open debug log {}", path.display()))?;
            let runner = LoggingCommandRunner::new(OsCommandRunner, writer);
            let prober = Prober::new(runner, OsPathResolver).context("init prober")?;
            run_with(Checker::new(prober), root, mode, &cfg, options)
        }
        None => {
            let prober = Prober::os().context("init prober")?;
            run_with(Checker::new(prober), root, mode, &cfg, options)
        }
    }
}

fn run_with<V: VersionProbe>(
    checker: Checker<V>,
    root: &Path,
    mode: Mode,
    cfg: &AppConfig,
    options: RunOptions,
) -> anyhow::Result<CheckOutput> {
    let started = Utc::now();

    let checker = checker
        .with_cwd(root)
        .with_ignored(cfg.ignore_engines.clone());

    let mut known = cfg.known.clone();
    known.extend(options.known);

    let resolved = checker.resolve_engine(&options.wanted, &known)?;
    let report = engines_check_domain::evaluate(&resolved.engine);

    let failure = match mode {
        Mode::Assert => match crate::ensure_compatible(report.clone()) {
            Ok(_) => None,
            Err(EnginesError::Incompatible(inc)) => Some(inc.message),
            Err(other) => return Err(other.into()),
        },
        Mode::Check | Mode::Detail => None,
    };

    let detail = match mode {
        Mode::Check => options.detail || cfg.detail.unwrap_or(false),
        Mode::Detail | Mode::Assert => true,
    };
    let outcome = if detail {
        Outcome::Detailed(report.clone())
    } else {
        Outcome::Summary(report.all_satisfied)
    };

    let ended = Utc::now();
    let duration_ms = ended.signed_duration_since(started).num_milliseconds().max(0) as u64;

    let receipt = ReceiptEnvelope {
        schema: SCHEMA_ID.to_string(),
        tool: ToolMeta {
            name: TOOL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        run: RunMeta {
            started_at: started,
            ended_at: Some(ended),
            duration_ms: Some(duration_ms),
            host: detect_host(),
        },
        manifest: resolved
            .manifest
            .as_deref()
            .map(|m| engines_check_sources::rel(root, m)),
        report,
    };

    let markdown = engines_check_render::render_markdown(&receipt);
    let exit_code = exit_code_for(&receipt.report);

    Ok(CheckOutput {
        receipt,
        outcome,
        markdown,
        failure,
        exit_code,
    })
}

fn exit_code_for(report: &Report) -> i32 {
    if report.all_satisfied { 0 } else { 2 }
}

/// Explicit path, else `engines-check.toml` under `root`, else defaults.
pub fn load_config(root: &Path, config_path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = root.join(CONFIG_FILE);
            if p.exists() {
                p
            } else {
                return Ok(AppConfig::default());
            }
        }
    };

    let text = fs::read_to_string(&path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

/// Write a file atomically: write temp + rename.
///
/// This avoids partial artifacts in CI.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

fn detect_host() -> Option<HostMeta> {
    Some(HostMeta {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        hostname: hostname::get().ok().and_then(|h| h.into_string().ok()),
    })
}
