//! Type Index
//!
//! Maps fully-qualified type names to their parsed AST snapshots.
//!
//! Building scans the snapshot directory once (parallel parse, bad files
//! skipped) and records the FQN -> file mapping in a manifest next to the
//! snapshots. A later index over an unchanged directory reuses the manifest
//! and parses each snapshot lazily on first lookup.
//!
//! The index is `Send + Sync`: the build runs behind a once-latch and
//! lazily parsed types are cached behind a read-write lock, so many traces
//! can share one index.
//!
//! @module trace/index

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::ast::TypeAstData;
use super::method_id::strip_generics;
use crate::core::error::{Error, Result};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Manifest file written into the snapshot directory
pub const MANIFEST_FILE: &str = ".seqtrace-index.json";

/// Current manifest format version
const MANIFEST_VERSION: u32 = 1;

// =============================================================================
// STATS
// =============================================================================

/// Summary of the last build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub types: usize,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub manifest_reused: bool,
    pub builds: usize,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} types, {} files scanned, {} skipped{}",
            self.types,
            self.files_scanned,
            self.files_skipped,
            if self.manifest_reused {
                " (manifest reused)"
            } else {
                ""
            }
        )
    }
}

// =============================================================================
// MANIFEST
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    fingerprint: u64,
    built_at: DateTime<Utc>,
    /// Snapshot files left out because they failed to parse
    #[serde(default)]
    files_skipped: usize,
    /// FQN -> snapshot path relative to the index root
    types: BTreeMap<String, PathBuf>,
}

/// Snapshot file discovered on disk
struct SnapshotFile {
    path: PathBuf,
    len: u64,
    modified: u128,
}

/// FQN -> file mapping produced by one build
struct Catalog {
    types: HashMap<String, PathBuf>,
    stats: IndexStats,
}

// =============================================================================
// TYPE INDEX
// =============================================================================

/// Lookup from type FQN to parsed snapshot data
pub struct TypeIndex {
    root: PathBuf,
    use_manifest: bool,
    catalog: OnceCell<Catalog>,
    loaded: RwLock<HashMap<String, Arc<TypeAstData>>>,
    builds: AtomicUsize,
}

impl fmt::Debug for TypeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeIndex")
            .field("root", &self.root)
            .field("built", &self.catalog.get().is_some())
            .field("loaded", &self.loaded.read().len())
            .finish()
    }
}

impl TypeIndex {
    /// Create an unbuilt index over a snapshot directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            use_manifest: true,
            catalog: OnceCell::new(),
            loaded: RwLock::new(HashMap::new()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Never read or write the manifest file
    pub fn without_manifest(mut self) -> Self {
        self.use_manifest = false;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Build the index unless it is already built.
    ///
    /// Concurrent first callers block on a single build. A missing
    /// snapshot directory is a configuration error and is not retried
    /// silently: the next call attempts the build again.
    pub fn load_or_build(&self) -> Result<()> {
        self.catalog
            .get_or_try_init(|| self.build(false))
            .map(|_| ())
    }

    /// Discard everything and rescan the directory, ignoring the manifest
    pub fn rebuild(&mut self) -> Result<()> {
        self.catalog = OnceCell::new();
        self.loaded.write().clear();
        self.catalog.get_or_try_init(|| self.build(true)).map(|_| ())
    }

    pub fn is_built(&self) -> bool {
        self.catalog.get().is_some()
    }

    /// Look up a type by FQN (generic arguments ignored).
    ///
    /// Returns `None` for unknown types and before the index is built.
    pub fn get(&self, type_fqn: &str) -> Option<Arc<TypeAstData>> {
        let key = strip_generics(type_fqn);
        if let Some(data) = self.loaded.read().get(&key) {
            return Some(Arc::clone(data));
        }

        let catalog = self.catalog.get()?;
        let path = catalog.types.get(&key)?;

        let data = match parse_snapshot(path) {
            Ok(data) => Arc::new(data),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to load snapshot");
                return None;
            }
        };
        debug!(type_fqn = %key, file = %path.display(), "Loaded snapshot lazily");

        let mut loaded = self.loaded.write();
        for fqn in data.type_fqns() {
            if catalog.types.get(&fqn) == Some(path) {
                loaded.entry(fqn).or_insert_with(|| Arc::clone(&data));
            }
        }
        loaded.get(&key).cloned()
    }

    pub fn contains(&self, type_fqn: &str) -> bool {
        self.catalog
            .get()
            .map(|c| c.types.contains_key(&strip_generics(type_fqn)))
            .unwrap_or(false)
    }

    /// All indexed type FQNs, sorted
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .catalog
            .get()
            .map(|c| c.types.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.catalog.get().map(|c| c.types.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot file that declares a type
    pub fn snapshot_path(&self, type_fqn: &str) -> Option<PathBuf> {
        self.catalog
            .get()?
            .types
            .get(&strip_generics(type_fqn))
            .cloned()
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = self
            .catalog
            .get()
            .map(|c| c.stats.clone())
            .unwrap_or_default();
        stats.builds = self.builds.load(Ordering::SeqCst);
        stats
    }

    // =========================================================================
    // BUILD
    // =========================================================================

    fn build(&self, force_scan: bool) -> Result<Catalog> {
        if !self.root.is_dir() {
            return Err(Error::SnapshotDirNotFound {
                path: self.root.clone(),
            });
        }

        let files = discover_snapshots(&self.root);
        let fingerprint = fingerprint(&self.root, &files);

        if self.use_manifest && !force_scan {
            if let Some(catalog) = self.read_manifest(fingerprint, files.len()) {
                self.builds.fetch_add(1, Ordering::SeqCst);
                info!(
                    root = %self.root.display(),
                    types = catalog.stats.types,
                    "Reused snapshot manifest"
                );
                return Ok(catalog);
            }
        }

        info!(files = files.len(), root = %self.root.display(), "Building type index");

        let parsed: Vec<(PathBuf, Result<TypeAstData>)> = files
            .par_iter()
            .map(|f| (f.path.clone(), parse_snapshot(&f.path)))
            .collect();

        let mut types: HashMap<String, PathBuf> = HashMap::new();
        let mut loaded = self.loaded.write();
        let mut skipped = 0;

        for (path, result) in parsed {
            let data = match result {
                Ok(data) => Arc::new(data),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping unreadable snapshot");
                    skipped += 1;
                    continue;
                }
            };
            for fqn in data.type_fqns() {
                if let Some(previous) = types.insert(fqn.clone(), path.clone()) {
                    warn!(
                        type_fqn = %fqn,
                        previous = %previous.display(),
                        file = %path.display(),
                        "Duplicate type declaration, keeping the later file"
                    );
                }
                loaded.insert(fqn, Arc::clone(&data));
            }
        }
        drop(loaded);

        if self.use_manifest {
            if let Err(e) = self.write_manifest(fingerprint, skipped, &types) {
                warn!(file = %self.manifest_path().display(), error = %e, "Failed to write manifest");
            }
        }

        let stats = IndexStats {
            types: types.len(),
            files_scanned: files.len(),
            files_skipped: skipped,
            manifest_reused: false,
            builds: 0,
        };
        self.builds.fetch_add(1, Ordering::SeqCst);
        info!(%stats, "Type index built");

        Ok(Catalog { types, stats })
    }

    fn read_manifest(&self, fingerprint: u64, file_count: usize) -> Option<Catalog> {
        let path = self.manifest_path();
        let content = std::fs::read_to_string(&path).ok()?;
        let manifest: Manifest = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "Ignoring unreadable manifest");
                return None;
            }
        };
        if manifest.version != MANIFEST_VERSION || manifest.fingerprint != fingerprint {
            debug!(file = %path.display(), "Manifest is stale");
            return None;
        }

        let types: HashMap<String, PathBuf> = manifest
            .types
            .into_iter()
            .map(|(fqn, rel)| (fqn, self.root.join(rel)))
            .collect();
        Some(Catalog {
            stats: IndexStats {
                types: types.len(),
                files_scanned: file_count,
                files_skipped: manifest.files_skipped,
                manifest_reused: true,
                builds: 0,
            },
            types,
        })
    }

    fn write_manifest(
        &self,
        fingerprint: u64,
        files_skipped: usize,
        types: &HashMap<String, PathBuf>,
    ) -> Result<()> {
        let manifest = Manifest {
            version: MANIFEST_VERSION,
            fingerprint,
            built_at: Utc::now(),
            files_skipped,
            types: types
                .iter()
                .map(|(fqn, path)| {
                    let rel = path.strip_prefix(&self.root).unwrap_or(path);
                    (fqn.clone(), rel.to_path_buf())
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(self.manifest_path(), json)?;
        Ok(())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Parse one snapshot file
pub fn parse_snapshot(path: &Path) -> Result<TypeAstData> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// All `*.json` snapshot files under `root`, sorted by path
fn discover_snapshots(root: &Path) -> Vec<SnapshotFile> {
    let mut files: Vec<SnapshotFile> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name() != MANIFEST_FILE)
        .filter(|e| e.path().extension().map(|x| x == "json").unwrap_or(false))
        .filter_map(|e| {
            let meta = e.metadata().ok()?;
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            Some(SnapshotFile {
                path: e.into_path(),
                len: meta.len(),
                modified,
            })
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

/// Hash of the snapshot listing used to detect a stale manifest
fn fingerprint(root: &Path, files: &[SnapshotFile]) -> u64 {
    let mut listing = String::new();
    for f in files {
        let rel = f.path.strip_prefix(root).unwrap_or(&f.path);
        listing.push_str(&format!("{}|{}|{}\n", rel.display(), f.len, f.modified));
    }
    xxhash_rust::xxh3::xxh3_64(listing.as_bytes())
}

// =============================================================================
// TESTS
// =============================================================================
