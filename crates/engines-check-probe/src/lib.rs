//! Determine the engine versions actually in use.
//!
//! Process spawning and PATH lookup sit behind [`CommandRunner`] and
//! [`PathResolver`]; [`VersionProbe`] is what the rest of the workspace sees.

pub mod log;

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use engines_check_types::{engines, EngineMap, EnginesError};
use regex::Regex;

pub use log::{DebugLogWriter, FileLogWriter, LoggingCommandRunner};

pub trait CommandRunner: Send + Sync {
    fn run(&self, cwd: &Path, argv: &[String]) -> Result<CmdOutput, EnginesError>;
}

#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub exit: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub struct OsCommandRunner;

impl CommandRunner for OsCommandRunner {
    fn run(&self, cwd: &Path, argv: &[String]) -> Result<CmdOutput, EnginesError> {
        if argv.is_empty() {
            return Err(EnginesError::Runtime("empty argv".into()));
        }

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);
        cmd.current_dir(cwd);

        let out = cmd.output().map_err(|e| EnginesError::Runtime(e.to_string()))?;
        Ok(CmdOutput {
            exit: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        })
    }
}

pub trait PathResolver: Send + Sync {
    fn resolve(&self, tool: &str) -> Option<PathBuf>;
}

pub struct OsPathResolver;

impl PathResolver for OsPathResolver {
    fn resolve(&self, tool: &str) -> Option<PathBuf> {
        which::which(tool).ok()
    }
}

/// Source of actual engine versions.
pub trait VersionProbe {
    /// Version of the JavaScript runtime this environment runs (`node`).
    fn runtime_version(&self, cwd: &Path) -> Result<String, EnginesError>;

    /// Version reported by an executable on PATH.
    fn tool_version(&self, cwd: &Path, tool: &str) -> Result<String, EnginesError>;
}

impl<T: VersionProbe + ?Sized> VersionProbe for &T {
    fn runtime_version(&self, cwd: &Path) -> Result<String, EnginesError> {
        (**self).runtime_version(cwd)
    }

    fn tool_version(&self, cwd: &Path, tool: &str) -> Result<String, EnginesError> {
        (**self).tool_version(cwd, tool)
    }
}

#[derive(Clone)]
pub struct Prober<R: CommandRunner, P: PathResolver> {
    runner: R,
    path: P,
    version_re: Regex,
}

impl Prober<OsCommandRunner, OsPathResolver> {
    /// Prober backed by the real PATH and process spawning.
    pub fn os() -> anyhow::Result<Self> {
        Self::new(OsCommandRunner, OsPathResolver)
    }
}

impl<R: CommandRunner, P: PathResolver> Prober<R, P> {
    pub fn new(runner: R, path: P) -> anyhow::Result<Self> {
        let version_re = Regex::new(VERSION_PATTERN).context("compile version regex")?;
        Ok(Self { runner, path, version_re })
    }
}

/// First semver-ish token: `major[.minor[.patch]][-prerelease]`.
const VERSION_PATTERN: &str = r"(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z][0-9A-Za-z.-]*))?";

impl<R: CommandRunner, P: PathResolver> VersionProbe for Prober<R, P> {
    fn runtime_version(&self, cwd: &Path) -> Result<String, EnginesError> {
        self.tool_version(cwd, engines::NODE)
    }

    fn tool_version(&self, cwd: &Path, tool: &str) -> Result<String, EnginesError> {
        if self.path.resolve(tool).is_none() {
            return Err(EnginesError::Runtime(format!("{} not found on PATH", tool)));
        }

        let argv = vec![tool.to_string(), "--version".to_string()];
        let out = self.runner.run(cwd, &argv)?;

        if out.exit != Some(0) {
            return Err(EnginesError::Runtime(format!(
                "`{} --version` exited with {}: {}",
                tool,
                out.exit.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                out.stderr.trim()
            )));
        }

        extract_version(&self.version_re, &out.stdout)
            .or_else(|| extract_version(&self.version_re, &out.stderr))
            .ok_or_else(|| {
                EnginesError::Parse(format!(
                    "could not find a version in `{} --version` output: {:?}",
                    tool,
                    out.stdout.trim()
                ))
            })
    }
}

fn extract_version(re: &Regex, text: &str) -> Option<String> {
    re.find(text).map(|m| m.as_str().trim_end_matches(['.', '-']).to_string())
}

/// Fill in the actual versions a comparison needs but the caller didn't supply.
///
/// Only `node` and `npm` are resolved, and only when expected. `node` goes
/// first so a runtime failure surfaces before the package manager is probed.
/// Anything else missing from `known` stays unknown.
pub fn resolve_actual<V: VersionProbe>(
    probe: &V,
    cwd: &Path,
    expected: &EngineMap,
    known: &EngineMap,
) -> Result<EngineMap, EnginesError> {
    let mut actual = known.clone();

    if expected.is_empty() {
        return Ok(actual);
    }

    if expected.contains_key(engines::NODE) && is_unknown(&actual, engines::NODE) {
        let version = probe.runtime_version(cwd)?;
        actual.insert(engines::NODE.to_string(), version);
    }

    if expected.contains_key(engines::NPM) && is_unknown(&actual, engines::NPM) {
        let version = probe.tool_version(cwd, engines::NPM)?;
        actual.insert(engines::NPM.to_string(), version);
    }

    Ok(actual)
}

fn is_unknown(actual: &EngineMap, name: &str) -> bool {
    actual.get(name).is_none_or(|v| v.trim().is_empty())
}

/// Fake/test adapters for use in other crates' tests.
pub mod fakes {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// A fake PathResolver that returns a synthetic path for tools in its "present" set.
    pub struct FakePathResolver {
        present: HashSet<String>,
    }

    impl FakePathResolver {
        pub fn new(tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
            Self {
                present: tools.into_iter().map(|t| t.into()).collect(),
            }
        }
    }

    impl PathResolver for FakePathResolver {
        fn resolve(&self, tool: &str) -> Option<PathBuf> {
            if self.present.contains(tool) {
                Some(PathBuf::from(format!("/fake/bin/{}", tool)))
            } else {
                None
            }
        }
    }

    /// A fake CommandRunner that returns pre-configured responses based on argv[0].
    pub struct FakeCommandRunner {
        responses: HashMap<String, CmdOutput>,
    }

    impl FakeCommandRunner {
        pub fn new() -> Self {
            Self {
                responses: HashMap::new(),
            }
        }

        pub fn with_response(mut self, cmd: impl Into<String>, output: CmdOutput) -> Self {
            self.responses.insert(cmd.into(), output);
            self
        }

        /// Shorthand for a successful `--version` run printing `stdout`.
        pub fn with_version(self, cmd: impl Into<String>, stdout: impl Into<String>) -> Self {
            self.with_response(
                cmd,
                CmdOutput {
                    exit: Some(0),
                    stdout: stdout.into(),
                    stderr: String::new(),
                },
            )
        }
    }

    impl Default for FakeCommandRunner {
        fn default() -> Self {
            Self::new()
        }
    }

    impl CommandRunner for FakeCommandRunner {
        fn run(&self, _cwd: &Path, argv: &[String]) -> Result<CmdOutput, EnginesError> {
            if argv.is_empty() {
                return Err(EnginesError::Runtime("empty argv".into()));
            }
            Ok(self
                .responses
                .get(&argv[0])
                .cloned()
                .unwrap_or(CmdOutput {
                    exit: Some(127),
                    stdout: String::new(),
                    stderr: format!("command not found: {}", argv[0]),
                }))
        }
    }

    /// A VersionProbe with fixed answers that records every call it receives.
    #[derive(Default)]
    pub struct FakeVersionProbe {
        versions: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeVersionProbe {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_version(mut self, tool: impl Into<String>, version: impl Into<String>) -> Self {
            self.versions.insert(tool.into(), version.into());
            self
        }

        /// Tools probed so far, in call order.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        fn answer(&self, tool: &str) -> Result<String, EnginesError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(tool.to_string());
            }
            self.versions
                .get(tool)
                .cloned()
                .ok_or_else(|| EnginesError::Runtime(format!("{} not found on PATH", tool)))
        }
    }

    impl VersionProbe for FakeVersionProbe {
        fn runtime_version(&self, _cwd: &Path) -> Result<String, EnginesError> {
            self.answer(engines::NODE)
        }

        fn tool_version(&self, _cwd: &Path, tool: &str) -> Result<String, EnginesError> {
            self.answer(tool)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use proptest::prelude::*;

    fn map(pairs: &[(&str, &str)]) -> EngineMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn prober(runner: FakeCommandRunner, tools: &[&str]) -> Prober<FakeCommandRunner, FakePathResolver> {
        Prober::new(runner, FakePathResolver::new(tools.iter().copied())).unwrap()
    }

    #[test]
    fn version_extraction_picks_first_numeric() {
        let re = Regex::new(VERSION_PATTERN).unwrap();
        assert_eq!(extract_version(&re, "node v20.11.0 (foo)"), Some("20.11.0".into()));
        assert_eq!(extract_version(&re, "10.2.4\n"), Some("10.2.4".into()));
        assert_eq!(extract_version(&re, "v21.0.0-nightly2023"), Some("21.0.0-nightly2023".into()));
        assert_eq!(extract_version(&re, "no digits here"), None);
    }

    #[test]
    fn runtime_version_strips_v_prefix() {
        let p = prober(FakeCommandRunner::new().with_version("node", "v20.11.0\n"), &["node"]);
        assert_eq!(p.runtime_version(Path::new("/repo")).unwrap(), "20.11.0");
    }

    #[test]
    fn tool_version_reads_npm_output() {
        let p = prober(FakeCommandRunner::new().with_version("npm", "10.2.4\n"), &["npm"]);
        assert_eq!(p.tool_version(Path::new("/repo"), "npm").unwrap(), "10.2.4");
    }

    #[test]
    fn tool_version_falls_back_to_stderr() {
        let runner = FakeCommandRunner::new().with_response(
            "npm",
            CmdOutput {
                exit: Some(0),
                stdout: String::new(),
                stderr: "npm 9.8.1".into(),
            },
        );
        let p = prober(runner, &["npm"]);
        assert_eq!(p.tool_version(Path::new("/repo"), "npm").unwrap(), "9.8.1");
    }

    #[test]
    fn missing_tool_is_a_runtime_error() {
        let p = prober(FakeCommandRunner::new(), &[]);
        let err = p.tool_version(Path::new("/repo"), "npm").unwrap_err();
        assert!(matches!(err, EnginesError::Runtime(_)));
        assert!(err.to_string().contains("npm not found on PATH"));
    }

    #[test]
    fn non_zero_exit_is_a_runtime_error() {
        let runner = FakeCommandRunner::new().with_response(
            "npm",
            CmdOutput {
                exit: Some(1),
                stdout: String::new(),
                stderr: "npm ERR! broken".into(),
            },
        );
        let p = prober(runner, &["npm"]);
        let err = p.tool_version(Path::new("/repo"), "npm").unwrap_err();
        assert!(err.to_string().contains("exited with 1"));
    }

    #[test]
    fn unparsable_output_is_a_parse_error() {
        let p = prober(FakeCommandRunner::new().with_version("npm", "unknown"), &["npm"]);
        let err = p.tool_version(Path::new("/repo"), "npm").unwrap_err();
        assert!(matches!(err, EnginesError::Parse(_)));
    }

    #[test]
    fn resolve_skips_everything_when_nothing_expected() {
        let probe = FakeVersionProbe::new();
        let actual = resolve_actual(&probe, Path::new("/"), &map(&[]), &map(&[("node", "1.0.0")])).unwrap();
        assert_eq!(actual, map(&[("node", "1.0.0")]));
        assert!(probe.calls().is_empty());
    }

    #[test]
    fn resolve_fills_node_and_npm() {
        let probe = FakeVersionProbe::new()
            .with_version("node", "20.11.0")
            .with_version("npm", "10.2.4");
        let expected = map(&[("node", ">=18"), ("npm", ">=9")]);
        let actual = resolve_actual(&probe, Path::new("/"), &expected, &map(&[])).unwrap();
        assert_eq!(actual, map(&[("node", "20.11.0"), ("npm", "10.2.4")]));
        assert_eq!(probe.calls(), vec!["node".to_string(), "npm".to_string()]);
    }

    #[test]
    fn resolve_respects_known_versions() {
        let probe = FakeVersionProbe::new();
        let expected = map(&[("node", ">=18"), ("npm", ">=9")]);
        let known = map(&[("node", "1.2.3"), ("npm", "1.2.3")]);
        let actual = resolve_actual(&probe, Path::new("/"), &expected, &known).unwrap();
        assert_eq!(actual, known);
        assert!(probe.calls().is_empty());
    }

    #[test]
    fn resolve_treats_empty_known_as_unknown() {
        let probe = FakeVersionProbe::new().with_version("node", "20.0.0");
        let actual =
            resolve_actual(&probe, Path::new("/"), &map(&[("node", "*")]), &map(&[("node", "")])).unwrap();
        assert_eq!(actual["node"], "20.0.0");
    }

    #[test]
    fn resolve_leaves_other_engines_unknown() {
        let probe = FakeVersionProbe::new();
        let actual = resolve_actual(&probe, Path::new("/"), &map(&[("yarn", "^1")]), &map(&[])).unwrap();
        assert!(actual.is_empty());
        assert!(probe.calls().is_empty());
    }

    #[test]
    fn resolve_propagates_probe_failure() {
        let probe = FakeVersionProbe::new().with_version("node", "20.0.0");
        let err = resolve_actual(&probe, Path::new("/"), &map(&[("npm", ">=9")]), &map(&[])).unwrap_err();
        assert!(err.is_resolution_failure());
    }

    proptest! {
        #[test]
        fn version_extraction_never_panics(s in ".*") {
            let re = Regex::new(VERSION_PATTERN).unwrap();
            let _ = extract_version(&re, &s);
        }
    }
}
