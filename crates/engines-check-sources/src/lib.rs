//! Resolve expected engine ranges from explicit input or the nearest manifest.

pub mod package_json;

use std::path::{Path, PathBuf};

use engines_check_types::{EngineMap, EnginesError, Wanted};

pub use package_json::{parse_engines, parse_engines_str, MANIFEST_FILE};

/// Expected ranges plus the manifest they came from (if any).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatedEngines {
    pub manifest: Option<PathBuf>,
    pub engines: EngineMap,
}

/// Produce the expected mapping for `wanted`.
///
/// `cwd` is the search root used for [`Wanted::DefaultCwd`].
pub fn resolve_expected(wanted: &Wanted, cwd: &Path) -> Result<LocatedEngines, EnginesError> {
    match wanted {
        Wanted::DefaultCwd => locate_engines(cwd),
        Wanted::ManifestRoot(root) => locate_engines(&under_cwd(cwd, root)),
        Wanted::Explicit(map) => Ok(LocatedEngines {
            manifest: None,
            engines: map.clone(),
        }),
    }
}

/// Walk upward from `start` and read the `engines` field of the first manifest found.
///
/// No manifest, or a manifest without `engines`, yields an empty mapping.
pub fn locate_engines(start: &Path) -> Result<LocatedEngines, EnginesError> {
    let Some(manifest) = find_manifest(start) else {
        return Ok(LocatedEngines::default());
    };

    let engines = parse_engines(&manifest).map_err(|e| match e.downcast_ref::<std::io::Error>() {
        Some(_) => EnginesError::Io(format!("{:#}", e)),
        None => EnginesError::Parse(format!("{:#}", e)),
    })?;

    Ok(LocatedEngines {
        manifest: Some(manifest),
        engines,
    })
}

/// Nearest `package.json` at or above `start`. A file path starts from its directory.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    // Relative paths have truncated ancestors.
    let start = std::path::absolute(start).ok()?;
    let dir = if start.is_file() { start.parent()? } else { start.as_path() };
    dir.ancestors()
        .map(|d| d.join(MANIFEST_FILE))
        .find(|candidate| candidate.is_file())
}

fn under_cwd(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Render `path` relative to `root` when possible, with forward slashes.
pub fn rel(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn explicit_mapping_is_used_as_is() {
        let map = EngineMap::from([("node".to_string(), ">=18".to_string())]);
        let got = resolve_expected(&Wanted::Explicit(map.clone()), Path::new("/nowhere")).unwrap();
        assert_eq!(got.engines, map);
        assert_eq!(got.manifest, None);
    }

    #[test]
    fn finds_manifest_in_start_dir() {
        let tmp = tempdir().unwrap();
        fs::write(
            tmp.path().join("package.json"),
            r#"{"name":"x","engines":{"node":">=18","npm":">=9"}}"#,
        )
        .unwrap();

        let got = locate_engines(tmp.path()).unwrap();
        assert_eq!(got.manifest, Some(tmp.path().join("package.json")));
        assert_eq!(got.engines.len(), 2);
        assert_eq!(got.engines["npm"], ">=9");
    }

    #[test]
    fn walks_up_to_nearest_manifest() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("package.json"), r#"{"engines":{"node":"^20"}}"#).unwrap();
        let nested = tmp.path().join("packages").join("web").join("src");
        fs::create_dir_all(&nested).unwrap();

        let got = locate_engines(&nested).unwrap();
        assert_eq!(got.engines["node"], "^20");
    }

    #[test]
    fn nearest_manifest_wins_even_without_engines() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("package.json"), r#"{"engines":{"node":"^20"}}"#).unwrap();
        let pkg = tmp.path().join("packages").join("lib");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("package.json"), r#"{"name":"lib"}"#).unwrap();

        let got = locate_engines(&pkg).unwrap();
        assert_eq!(got.manifest, Some(pkg.join("package.json")));
        assert!(got.engines.is_empty());
    }

    #[test]
    fn file_path_starts_from_its_directory() {
        let tmp = tempdir().unwrap();
        let manifest = tmp.path().join("package.json");
        fs::write(&manifest, r#"{"engines":{"node":">=16"}}"#).unwrap();

        let got = resolve_expected(&Wanted::ManifestRoot(manifest.clone()), Path::new("/")).unwrap();
        assert_eq!(got.manifest, Some(manifest));
        assert_eq!(got.engines["node"], ">=16");
    }

    #[test]
    fn relative_manifest_root_is_joined_to_cwd() {
        let tmp = tempdir().unwrap();
        let app = tmp.path().join("app");
        fs::create_dir_all(&app).unwrap();
        fs::write(app.join("package.json"), r#"{"engines":{"npm":"^10"}}"#).unwrap();

        let got = resolve_expected(&Wanted::ManifestRoot(PathBuf::from("app")), tmp.path()).unwrap();
        assert_eq!(got.engines["npm"], "^10");
    }

    #[test]
    fn invalid_manifest_is_a_parse_failure() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("package.json"), "{ not json").unwrap();

        let err = locate_engines(tmp.path()).unwrap_err();
        assert!(matches!(err, EnginesError::Parse(_)));
        assert!(err.is_resolution_failure());
    }

    #[test]
    fn relative_start_still_walks_up() {
        let here = std::env::current_dir().unwrap();
        let from_relative = find_manifest(Path::new("."));
        let from_absolute = find_manifest(&here);
        assert_eq!(from_relative, from_absolute);
    }

    #[test]
    fn rel_uses_forward_slashes() {
        let root = Path::new("/repo");
        assert_eq!(rel(root, &root.join("package.json")), "package.json");
        assert_eq!(rel(root, Path::new("/elsewhere/package.json")), "/elsewhere/package.json");
    }
}
