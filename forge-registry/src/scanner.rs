//! Bounded-depth, symlink-cycle-safe filesystem scan for module-bearing
//! files.
//!
//! A "module-bearing file" is a compiled dynamic library (platform `DLL`
//! extension) alongside an optional companion metadata file — see
//! [`crate::entry_point`] for how the library's exported entry point is
//! resolved once the scan finds it.

use forge_core::id::ModuleId;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

const IGNORED_DIR_NAMES: &[&str] = &["__pycache__", "node_modules", "target", ".git"];
const COMPILED_ARTIFACT_EXTENSIONS: &[&str] = &["o", "obj", "rlib", "pdb"];

/// One filesystem root to scan, with an optional explicit namespace prefix
/// applied to every id derived under it.
#[derive(Debug, Clone)]
pub struct ScanRoot {
    /// Directory to scan.
    pub path: PathBuf,
    /// Explicit namespace; defaults to the root directory's file name.
    pub namespace: Option<String>,
}

impl ScanRoot {
    /// A root with no explicit namespace (derived from the directory name).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            namespace: None,
        }
    }

    fn resolved_namespace(&self) -> String {
        self.namespace.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("root")
                .to_string()
        })
    }
}

/// One discovered module-bearing file.
#[derive(Debug, Clone)]
pub struct ScanEntry {
    /// Canonical, namespace-prefixed-in-multi-root-mode id.
    pub module_id: ModuleId,
    /// Absolute path to the discovered library file.
    pub path: PathBuf,
}

fn should_ignore_dir(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || IGNORED_DIR_NAMES.contains(&name.as_ref())
}

fn is_accepted_file(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') || name.starts_with('_') {
        return false;
    }
    let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if COMPILED_ARTIFACT_EXTENSIONS.contains(&ext) {
        return false;
    }
    ext == std::env::consts::DLL_EXTENSION
}

/// Derive a canonical, dot-separated id from a file's path relative to its
/// scan root: lower-cased, illegal characters replaced with `_`, and any
/// segment starting with a digit prefixed with `_`.
pub fn derive_id(relative_path: &Path) -> String {
    let stem = relative_path.with_extension("");
    let mut segments = Vec::new();

    for component in stem.components() {
        let raw = component.as_os_str().to_string_lossy().to_lowercase();
        let mut seg = String::with_capacity(raw.len());
        for ch in raw.chars() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                seg.push(ch);
            } else {
                seg.push('_');
            }
        }
        if seg.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            seg.insert(0, '_');
        }
        if !seg.is_empty() {
            segments.push(seg);
        }
    }

    segments.join(".")
}

/// Scan a single root up to `max_depth`, optionally following symlinks.
///
/// Symlink cycles are detected via a visited-real-path set: a symlink
/// whose canonical target has already been visited is skipped rather than
/// followed again.
pub fn scan_root(root: &ScanRoot, max_depth: usize, follow_symlinks: bool) -> Vec<(String, PathBuf)> {
    if !root.path.exists() {
        return Vec::new();
    }

    let mut visited_real_paths: HashSet<PathBuf> = HashSet::new();
    let mut found = Vec::new();

    let walker = WalkDir::new(&root.path)
        .max_depth(max_depth)
        .follow_links(follow_symlinks)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_type().is_dir() || !should_ignore_dir(e));

    for entry in walker {
        let Ok(entry) = entry else { continue };

        if entry.path_is_symlink() {
            if !follow_symlinks {
                continue;
            }
            match std::fs::canonicalize(entry.path()) {
                Ok(real) if !visited_real_paths.insert(real) => continue,
                Ok(_) => {}
                Err(_) => continue,
            }
        }

        if !entry.file_type().is_file() || !is_accepted_file(&entry) {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(&root.path) else {
            continue;
        };
        let id = derive_id(relative);
        found.push((id, entry.path().to_path_buf()));
    }

    found
}

/// Scan every root, applying namespace prefixes in multi-root mode and
/// detecting duplicate / case-colliding ids across the whole batch.
///
/// A single root scans without a namespace prefix. With more than one
/// root, every id is prefixed with that root's namespace, and conflicting
/// namespaces across roots are an error.
pub fn scan_all(roots: &[ScanRoot], max_depth: usize, follow_symlinks: bool) -> forge_core::error::Result<Vec<ScanEntry>> {
    use forge_core::error::ForgeError;

    let multi_root = roots.len() > 1;

    if multi_root {
        let mut seen_namespaces: HashMap<String, &Path> = HashMap::new();
        for root in roots {
            let ns = root.resolved_namespace();
            if let Some(existing) = seen_namespaces.get(&ns) {
                if *existing != root.path.as_path() {
                    return Err(ForgeError::ConfigInvalid {
                        message: format!(
                            "namespace '{ns}' is claimed by both {} and {}",
                            existing.display(),
                            root.path.display()
                        ),
                    });
                }
            }
            seen_namespaces.insert(ns, &root.path);
        }
    }

    let mut by_lowercase: HashMap<String, String> = HashMap::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();

    for root in roots {
        let prefix = multi_root.then(|| root.resolved_namespace());
        for (raw_id, path) in scan_root(root, max_depth, follow_symlinks) {
            let id = match &prefix {
                Some(ns) => format!("{ns}.{raw_id}"),
                None => raw_id,
            };

            if !seen_ids.insert(id.clone()) {
                warn!(module_id = %id, path = %path.display(), "duplicate module id in scan, skipping later occurrence");
                continue;
            }

            let lower = id.to_lowercase();
            if let Some(existing) = by_lowercase.get(&lower) {
                if existing != &id {
                    warn!(existing = %existing, found = %id, "case-only module id collision");
                }
            } else {
                by_lowercase.insert(lower, id.clone());
            }

            entries.push(ScanEntry {
                module_id: ModuleId::from(id),
                path,
            });
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn derives_dotted_lowercase_id() {
        let id = derive_id(&PathBuf::from("Fs/ReadFile"));
        assert_eq!(id, "fs.readfile");
    }

    #[test]
    fn illegal_characters_become_underscores() {
        let id = derive_id(&PathBuf::from("fs/read-file v2"));
        assert_eq!(id, "fs.read_file_v2");
    }

    #[test]
    fn leading_digit_segment_is_prefixed() {
        let id = derive_id(&PathBuf::from("3rdparty/tool"));
        assert_eq!(id, "_3rdparty.tool");
    }

    #[test]
    fn scan_root_ignores_dotfiles_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("__pycache__")).unwrap();
        let ext = std::env::consts::DLL_EXTENSION;
        std::fs::write(dir.path().join("__pycache__").join(format!("bad.{ext}")), b"").unwrap();
        std::fs::write(dir.path().join(format!(".hidden.{ext}")), b"").unwrap();
        std::fs::write(dir.path().join(format!("good.{ext}")), b"").unwrap();

        let root = ScanRoot::new(dir.path());
        let found = scan_root(&root, 8, false);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "good");
    }

    #[test]
    fn scan_all_skips_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let ext = std::env::consts::DLL_EXTENSION;
        std::fs::write(dir.path().join(format!("a.{ext}")), b"").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join(format!("_hidden.{ext}")), b"").unwrap();

        let root = ScanRoot::new(dir.path());
        let entries = scan_all(&[root], 8, false).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].module_id.as_str(), "a");
    }

    #[test]
    fn multi_root_namespaces_prefix_ids() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let ext = std::env::consts::DLL_EXTENSION;
        std::fs::write(dir_a.path().join(format!("mod.{ext}")), b"").unwrap();
        std::fs::write(dir_b.path().join(format!("mod.{ext}")), b"").unwrap();

        let roots = vec![
            ScanRoot {
                path: dir_a.path().to_path_buf(),
                namespace: Some("alpha".into()),
            },
            ScanRoot {
                path: dir_b.path().to_path_buf(),
                namespace: Some("beta".into()),
            },
        ];
        let entries = scan_all(&roots, 8, false).unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.module_id.as_str()).collect();
        assert!(ids.contains(&"alpha.mod"));
        assert!(ids.contains(&"beta.mod"));
    }

    #[test]
    fn conflicting_namespaces_across_distinct_roots_error() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let roots = vec![
            ScanRoot {
                path: dir_a.path().to_path_buf(),
                namespace: Some("shared".into()),
            },
            ScanRoot {
                path: dir_b.path().to_path_buf(),
                namespace: Some("shared".into()),
            },
        ];
        assert!(scan_all(&roots, 8, false).is_err());
    }
}
