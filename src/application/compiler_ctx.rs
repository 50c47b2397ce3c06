//! Long-lived state of one compiler instance
//!
//! The module map and collection registry survive across builds; a build
//! only ever replaces whole entries. `reset` drops everything derived from
//! sources but keeps the backing store.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::domain::entities::{BuildResults, CollectionMeta, ComponentMeta, ModuleMeta};
use crate::domain::ports::BundleCache;

use super::events::BuildEvents;
use super::fs::InMemoryFileSystem;
use super::resolver::ModuleResolver;

pub struct CompilerContext {
    config: Arc<Config>,
    fs: Arc<InMemoryFileSystem>,
    events: BuildEvents,
    resolver: Arc<ModuleResolver>,
    module_map: RwLock<BTreeMap<PathBuf, ModuleMeta>>,
    collections: RwLock<Vec<CollectionMeta>>,
    bundle_caches: Mutex<HashMap<String, BundleCache>>,
    build_counter: AtomicU64,
    last_build_results: RwLock<Option<Arc<BuildResults>>>,
}

impl CompilerContext {
    /// `config` must already be validated (absolute paths)
    pub fn new(config: Config, fs: Arc<InMemoryFileSystem>, events: BuildEvents) -> Self {
        let resolver = Arc::new(ModuleResolver::new(fs.clone(), config.root_dir.clone()));
        Self {
            config: Arc::new(config),
            fs,
            events,
            resolver,
            module_map: RwLock::new(BTreeMap::new()),
            collections: RwLock::new(Vec::new()),
            bundle_caches: Mutex::new(HashMap::new()),
            build_counter: AtomicU64::new(0),
            last_build_results: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn fs(&self) -> &Arc<InMemoryFileSystem> {
        &self.fs
    }

    pub fn events(&self) -> &BuildEvents {
        &self.events
    }

    pub fn resolver(&self) -> &Arc<ModuleResolver> {
        &self.resolver
    }

    /// Monotonic, starting at 1
    pub fn next_build_id(&self) -> u64 {
        self.build_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    // module map

    /// Insert or replace the entry for `meta.source_file_path`
    pub fn set_module(&self, meta: ModuleMeta) {
        self.module_map
            .write()
            .insert(meta.source_file_path.clone(), meta);
    }

    pub fn remove_module(&self, path: &Path) -> Option<ModuleMeta> {
        self.module_map.write().remove(path)
    }

    pub fn get_module(&self, path: &Path) -> Option<ModuleMeta> {
        self.module_map.read().get(path).cloned()
    }

    pub fn has_module(&self, path: &Path) -> bool {
        self.module_map.read().contains_key(path)
    }

    pub fn module_paths(&self) -> Vec<PathBuf> {
        self.module_map.read().keys().cloned().collect()
    }

    /// Snapshot of every entry, ordered by path
    pub fn modules(&self) -> Vec<ModuleMeta> {
        self.module_map.read().values().cloned().collect()
    }

    /// Drop entries that fail `keep`; returns the removed paths
    pub fn retain_modules<F>(&self, mut keep: F) -> Vec<PathBuf>
    where
        F: FnMut(&ModuleMeta) -> bool,
    {
        let mut map = self.module_map.write();
        let removed: Vec<PathBuf> = map
            .iter()
            .filter(|(_, m)| !keep(m))
            .map(|(p, _)| p.clone())
            .collect();
        for path in &removed {
            map.remove(path);
        }
        removed
    }

    /// Every declared component, sorted by tag
    pub fn get_components(&self) -> Vec<ComponentMeta> {
        let map = self.module_map.read();
        let mut components: Vec<ComponentMeta> = map
            .values()
            .flat_map(|m| m.components.iter().cloned())
            .collect();
        components.sort_by(|a, b| a.tag_name.cmp(&b.tag_name));
        components
    }

    // collections

    pub fn collections(&self) -> Vec<CollectionMeta> {
        self.collections.read().clone()
    }

    /// Replace the registry and the module entries of collection components
    pub fn set_collections(&self, collections: Vec<CollectionMeta>, modules: Vec<ModuleMeta>) {
        *self.collections.write() = collections;
        let mut map = self.module_map.write();
        map.retain(|_, m| !m.is_collection_dependency);
        for meta in modules {
            map.insert(meta.source_file_path.clone(), meta);
        }
    }

    // incremental caches

    pub fn bundle_cache(&self, bundle_id: &str) -> Option<BundleCache> {
        self.bundle_caches.lock().get(bundle_id).cloned()
    }

    pub fn set_bundle_cache(&self, bundle_id: &str, cache: BundleCache) {
        self.bundle_caches.lock().insert(bundle_id.to_string(), cache);
    }

    pub fn last_build_results(&self) -> Option<Arc<BuildResults>> {
        self.last_build_results.read().clone()
    }

    pub fn set_last_build_results(&self, results: Arc<BuildResults>) {
        *self.last_build_results.write() = Some(results);
    }

    /// Clear derived state; the VFS backing store is untouched
    pub fn reset(&self) {
        self.module_map.write().clear();
        self.collections.write().clear();
        self.bundle_caches.lock().clear();
        self.resolver.clear_cache();
        *self.last_build_results.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sys::MemorySystem;

    fn ctx() -> CompilerContext {
        let fs = Arc::new(InMemoryFileSystem::new(Arc::new(MemorySystem::new())));
        CompilerContext::new(Config::for_root("/app"), fs, BuildEvents::new())
    }

    fn module(path: &str, tags: &[&str]) -> ModuleMeta {
        ModuleMeta {
            source_file_path: PathBuf::from(path),
            components: tags
                .iter()
                .map(|t| ComponentMeta {
                    tag_name: t.to_string(),
                    ..ComponentMeta::default()
                })
                .collect(),
            ..ModuleMeta::default()
        }
    }

    #[test]
    fn test_set_module_replaces_whole_entry() {
        let ctx = ctx();
        ctx.set_module(module("/app/src/a.tsx", &["x-a", "x-b"]));
        ctx.set_module(module("/app/src/a.tsx", &["x-c"]));

        let tags: Vec<String> = ctx.get_components().into_iter().map(|c| c.tag_name).collect();
        assert_eq!(tags, vec!["x-c"]);
    }

    #[test]
    fn test_get_components_is_sorted_across_modules() {
        let ctx = ctx();
        ctx.set_module(module("/app/src/b.tsx", &["x-zed"]));
        ctx.set_module(module("/app/src/a.tsx", &["x-mid", "x-alpha"]));
        ctx.set_module(module("/app/src/util.ts", &[]));

        let tags: Vec<String> = ctx.get_components().into_iter().map(|c| c.tag_name).collect();
        assert_eq!(tags, vec!["x-alpha", "x-mid", "x-zed"]);
    }

    #[test]
    fn test_retain_modules_reports_removed() {
        let ctx = ctx();
        ctx.set_module(module("/app/src/a.tsx", &[]));
        ctx.set_module(module("/app/src/b.tsx", &[]));

        let removed = ctx.retain_modules(|m| m.source_file_path.ends_with("a.tsx"));
        assert_eq!(removed, vec![PathBuf::from("/app/src/b.tsx")]);
        assert_eq!(ctx.module_paths(), vec![PathBuf::from("/app/src/a.tsx")]);
    }

    #[test]
    fn test_set_collections_replaces_collection_modules_only() {
        let ctx = ctx();
        ctx.set_module(module("/app/src/a.tsx", &["x-a"]));
        let mut dep = module("/app/node_modules/kit/b.js", &["kit-b"]);
        dep.is_collection_dependency = true;
        ctx.set_collections(Vec::new(), vec![dep]);
        assert_eq!(ctx.get_components().len(), 2);

        ctx.set_collections(Vec::new(), Vec::new());
        assert_eq!(ctx.module_paths(), vec![PathBuf::from("/app/src/a.tsx")]);
    }

    #[test]
    fn test_reset_clears_derived_state_but_keeps_fs() {
        let ctx = ctx();
        ctx.fs()
            .write_file(Path::new("/app/src/a.ts"), "x", Default::default())
            .unwrap();
        ctx.set_module(module("/app/src/a.tsx", &["x-a"]));
        ctx.set_bundle_cache("lazy", BundleCache::default());

        ctx.reset();

        assert!(ctx.modules().is_empty());
        assert!(ctx.bundle_cache("lazy").is_none());
        assert_eq!(ctx.fs().read_file(Path::new("/app/src/a.ts")).as_deref(), Some("x"));
    }

    #[test]
    fn test_build_ids_are_monotonic() {
        let ctx = ctx();
        assert_eq!(ctx.next_build_id(), 1);
        assert_eq!(ctx.next_build_id(), 2);
    }
}
