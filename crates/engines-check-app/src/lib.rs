//! Composition root for engines-check.
//!
//! [`Checker`] wires expectation resolution, actual-version probing and the
//! pure comparator together. The free functions at the bottom use the real
//! PATH and the process working directory.

pub mod run;

use std::path::{Path, PathBuf};

use engines_check_domain as domain;
use engines_check_probe::{resolve_actual, OsCommandRunner, OsPathResolver, Prober, VersionProbe};
use engines_check_types::{
    CheckOptions, Engine, EngineMap, EnginesError, Incompatibility, Outcome, Report, Wanted,
};

pub use run::{run_check, write_atomic, AppConfig, CheckOutput, Mode, RunOptions, CONFIG_FILE};

/// Engine context plus the manifest expectations were read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub engine: Engine,
    pub manifest: Option<PathBuf>,
}

pub struct Checker<V: VersionProbe> {
    probe: V,
    cwd: PathBuf,
    ignore: Vec<String>,
}

impl Checker<Prober<OsCommandRunner, OsPathResolver>> {
    /// Checker that probes the real PATH.
    pub fn from_env() -> Result<Self, EnginesError> {
        let probe = Prober::os().map_err(|e| EnginesError::Runtime(format!("{:#}", e)))?;
        Ok(Self::new(probe))
    }
}

impl<V: VersionProbe> Checker<V> {
    /// Checker rooted at the process working directory.
    pub fn new(probe: V) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            probe,
            cwd,
            ignore: vec![],
        }
    }

    /// Directory used as the manifest search root for [`Wanted::DefaultCwd`]
    /// and as the working directory of probes.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Engines to drop from expectations before anything is resolved.
    pub fn with_ignored(mut self, ignore: Vec<String>) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn probe(&self) -> &V {
        &self.probe
    }

    /// Resolve expectations first, then fill in the actual versions they require.
    pub fn resolve_engine(&self, wanted: &Wanted, known: &EngineMap) -> Result<Resolved, EnginesError> {
        let located = engines_check_sources::resolve_expected(wanted, &self.cwd)?;
        let expected = domain::without_ignored(located.engines, &self.ignore);
        let actual = resolve_actual(&self.probe, &self.cwd, &expected, known)?;

        Ok(Resolved {
            engine: Engine { actual, expected },
            manifest: located.manifest,
        })
    }

    /// Are all expected engines satisfied?
    pub fn check(&self, wanted: &Wanted, known: &EngineMap) -> Result<bool, EnginesError> {
        let resolved = self.resolve_engine(wanted, known)?;
        Ok(domain::all_satisfied(&resolved.engine))
    }

    /// Boolean or detailed result depending on `options.detail`.
    pub fn check_with(
        &self,
        wanted: &Wanted,
        known: &EngineMap,
        options: &CheckOptions,
    ) -> Result<Outcome, EnginesError> {
        let resolved = self.resolve_engine(wanted, known)?;
        Ok(domain::compare(&resolved.engine, options.detail))
    }

    pub fn check_detailed(&self, wanted: &Wanted, known: &EngineMap) -> Result<Report, EnginesError> {
        let resolved = self.resolve_engine(wanted, known)?;
        Ok(domain::evaluate(&resolved.engine))
    }

    /// Detailed report, or [`EnginesError::Incompatible`] when anything is unsatisfied.
    pub fn assert_compatible(&self, wanted: &Wanted, known: &EngineMap) -> Result<Report, EnginesError> {
        let report = self.check_detailed(wanted, known)?;
        ensure_compatible(report)
    }
}

/// Turn an unsatisfied report into an incompatibility failure.
pub fn ensure_compatible(report: Report) -> Result<Report, EnginesError> {
    if report.all_satisfied {
        return Ok(report);
    }
    Err(EnginesError::Incompatible(Incompatibility {
        message: engines_check_render::incompatibility_message(&report),
        report,
    }))
}

pub fn check(wanted: &Wanted, known: &EngineMap) -> Result<bool, EnginesError> {
    Checker::from_env()?.check(wanted, known)
}

pub fn check_with(wanted: &Wanted, known: &EngineMap, options: &CheckOptions) -> Result<Outcome, EnginesError> {
    Checker::from_env()?.check_with(wanted, known, options)
}

pub fn check_detailed(wanted: &Wanted, known: &EngineMap) -> Result<Report, EnginesError> {
    Checker::from_env()?.check_detailed(wanted, known)
}

pub fn assert_compatible(wanted: &Wanted, known: &EngineMap) -> Result<Report, EnginesError> {
    Checker::from_env()?.assert_compatible(wanted, known)
}
