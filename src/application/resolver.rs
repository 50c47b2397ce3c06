//! Node-style module resolution and dependency collection discovery
//!
//! Every cache lives on the resolver instance, which the compiler context
//! owns, so two compilers in one process never share resolution state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::entities::{CollectionManifest, CollectionMeta, ModuleMeta};
use crate::domain::services::is_relative_specifier;
use crate::domain::value_objects::path::RESOLVE_EXTENSIONS;
use crate::domain::value_objects::{normalize_path, resolve_path};

use super::fs::InMemoryFileSystem;

const PACKAGE_ENTRY_FIELDS: [&str; 3] = ["collection:main", "module", "main"];

/// `base` itself, `base` plus a script extension, or an index file below it
pub fn probe_module(fs: &InMemoryFileSystem, base: &Path) -> Option<PathBuf> {
    let is_file = |p: &Path| fs.stat(p).is_some_and(|s| s.is_file);
    let base_str = base.to_string_lossy();
    for ext in RESOLVE_EXTENSIONS {
        let candidate = PathBuf::from(format!("{}{}", base_str, ext));
        if is_file(&candidate) {
            return Some(candidate);
        }
    }
    ["index.ts", "index.tsx", "index.js", "index.mjs"]
        .iter()
        .map(|index| base.join(index))
        .find(|candidate| is_file(candidate))
}

/// The parts of a `package.json` the build reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default, rename = "collection:main")]
    pub collection_main: Option<String>,
}

impl PackageManifest {
    fn entry_field(&self, field: &str) -> Option<&str> {
        match field {
            "collection:main" => self.collection_main.as_deref(),
            "module" => self.module.as_deref(),
            "main" => self.main.as_deref(),
            _ => None,
        }
    }
}

pub struct ModuleResolver {
    fs: Arc<InMemoryFileSystem>,
    root_dir: PathBuf,
    resolutions: Mutex<HashMap<(PathBuf, String), Option<PathBuf>>>,
    manifests: Mutex<HashMap<PathBuf, Option<PackageManifest>>>,
}

impl ModuleResolver {
    pub fn new(fs: Arc<InMemoryFileSystem>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root_dir: root_dir.into(),
            resolutions: Mutex::new(HashMap::new()),
            manifests: Mutex::new(HashMap::new()),
        }
    }

    pub fn clear_cache(&self) {
        self.resolutions.lock().clear();
        self.manifests.lock().clear();
    }

    /// Resolve `specifier` as imported from `importer` (the root when `None`)
    pub fn resolve(&self, specifier: &str, importer: Option<&Path>) -> Option<PathBuf> {
        let base_dir = importer
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root_dir.clone());
        let key = (base_dir.clone(), specifier.to_string());
        if let Some(hit) = self.resolutions.lock().get(&key) {
            return hit.clone();
        }

        let resolved = if is_relative_specifier(specifier) {
            self.probe_file(&resolve_path(&base_dir, specifier))
        } else {
            self.resolve_package(specifier, &base_dir)
        };
        self.resolutions.lock().insert(key, resolved.clone());
        resolved
    }

    fn probe_file(&self, base: &Path) -> Option<PathBuf> {
        probe_module(&self.fs, base)
    }

    fn resolve_package(&self, specifier: &str, from_dir: &Path) -> Option<PathBuf> {
        let (name, subpath) = split_package_specifier(specifier)?;
        let package_dir = self.find_package_dir(name, from_dir)?;

        if let Some(subpath) = subpath {
            return self.probe_file(&package_dir.join(subpath));
        }

        let manifest = self.read_manifest(&package_dir.join("package.json"));
        if let Some(manifest) = manifest {
            for field in PACKAGE_ENTRY_FIELDS {
                if let Some(entry) = manifest.entry_field(field) {
                    if let Some(found) = self.probe_file(&resolve_path(&package_dir, entry)) {
                        return Some(found);
                    }
                }
            }
        }
        self.probe_file(&package_dir.join("index"))
    }

    /// Walk up from `from_dir` looking for `node_modules/<name>`, stopping at the root
    fn find_package_dir(&self, name: &str, from_dir: &Path) -> Option<PathBuf> {
        let mut dir = Some(from_dir.to_path_buf());
        while let Some(current) = dir {
            let candidate = current.join("node_modules").join(name);
            if self.fs.stat(&candidate).is_some_and(|s| s.is_directory) {
                return Some(normalize_path(candidate));
            }
            if current == self.root_dir {
                break;
            }
            dir = current.parent().map(Path::to_path_buf);
        }
        None
    }

    pub fn read_manifest(&self, path: &Path) -> Option<PackageManifest> {
        if let Some(hit) = self.manifests.lock().get(path) {
            return hit.clone();
        }
        let manifest = self.fs.read_file(path).and_then(|text| {
            serde_json::from_str::<PackageManifest>(&text)
                .map_err(|e| warn!(target: "kiln::build", path = %path.display(), "invalid package.json: {}", e))
                .ok()
        });
        self.manifests
            .lock()
            .insert(path.to_path_buf(), manifest.clone());
        manifest
    }

    /// Dependency collections declared by the root `package.json`, plus the
    /// module metadata of every component they ship
    pub fn load_collections(&self) -> (Vec<CollectionMeta>, Vec<ModuleMeta>) {
        let Some(root) = self.read_manifest(&self.root_dir.join("package.json")) else {
            return (Vec::new(), Vec::new());
        };

        let mut names: Vec<&String> = root.dependencies.keys().collect();
        names.sort();

        let mut collections = Vec::new();
        let mut modules = Vec::new();
        for name in names {
            let Some(package_dir) = self.find_package_dir(name, &self.root_dir) else {
                continue;
            };
            let Some(manifest_rel) = self
                .read_manifest(&package_dir.join("package.json"))
                .and_then(|m| m.collection)
            else {
                continue;
            };
            let manifest_path = resolve_path(&package_dir, &manifest_rel);
            let Some(manifest) = self.fs.read_file(&manifest_path).and_then(|text| {
                serde_json::from_str::<CollectionManifest>(&text)
                    .map_err(|e| warn!(target: "kiln::build", collection = %name, "invalid collection manifest: {}", e))
                    .ok()
            }) else {
                continue;
            };

            let dir = manifest_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| package_dir.clone());
            for component in &manifest.components {
                let file = resolve_path(&dir, &component.file);
                let mut meta = component.meta.clone();
                meta.source_file_path = file.clone();
                modules.push(ModuleMeta {
                    source_file_path: file.clone(),
                    js_file_path: file,
                    components: vec![meta],
                    collection_name: Some(name.clone()),
                    is_collection_dependency: true,
                    ..ModuleMeta::default()
                });
            }

            debug!(target: "kiln::build", collection = %name, components = manifest.components.len(), "loaded collection");
            collections.push(CollectionMeta {
                name: name.clone(),
                dir: dir.clone(),
                manifest_path,
                components: manifest
                    .components
                    .iter()
                    .map(|c| c.meta.tag_name.clone())
                    .collect(),
                global_script: manifest.global_script.map(|g| resolve_path(&dir, g)),
            });
        }
        (collections, modules)
    }
}

/// `@scope/pkg/sub/path` -> (`@scope/pkg`, Some(`sub/path`))
fn split_package_specifier(specifier: &str) -> Option<(&str, Option<&str>)> {
    if specifier.is_empty() {
        return None;
    }
    let segments = if specifier.starts_with('@') { 2 } else { 1 };
    let mut split_at = None;
    let mut seen = 0;
    for (i, ch) in specifier.char_indices() {
        if ch == '/' {
            seen += 1;
            if seen == segments {
                split_at = Some(i);
                break;
            }
        }
    }
    match split_at {
        Some(i) => Some((&specifier[..i], Some(&specifier[i + 1..]))),
        None if segments == 2 && seen == 0 => None,
        None => Some((specifier, None)),
    }
}
