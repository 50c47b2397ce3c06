//! Bundler plugins
//!
//! Virtual modules are answered by `resolve_id`/`load` pairs and never
//! touch the VFS. Real modules go through the program (so every generator
//! sees its own transforms) or straight through the VFS.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::build::{BuildFeatures, CORE_SPECIFIER};
use crate::application::fs::InMemoryFileSystem;
use crate::application::resolver::{probe_module, ModuleResolver};
use crate::domain::ports::{CustomTransformers, Plugin, Program, ResolvedId};
use crate::domain::services::is_relative_specifier;
use crate::domain::value_objects::{normalize_path, resolve_path};
use crate::error::{KilnError, KilnResult};

pub const APP_DATA_ID: &str = "@kiln/core/internal/app-data";
pub const LAZY_BROWSER_ID: &str = "@kiln/core/internal/lazy-browser";
pub const LAZY_EXTERNAL_ID: &str = "@kiln/core/internal/lazy-external";
pub const HYDRATE_ENTRY_ID: &str = "@kiln/core/internal/hydrate-entry";
pub const USER_INDEX_ID: &str = "@user-index-entrypoint";
pub const LAZY_ENTRY_PREFIX: &str = "@lazy-entry:";

fn claim(importee: &str, id: &str) -> Option<ResolvedId> {
    (importee == id).then(|| ResolvedId::Module(id.to_string()))
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Component class to import into a generated entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentEntry {
    pub tag_name: String,
    pub class_name: String,
    pub file: PathBuf,
    pub members: Vec<String>,
}

impl ComponentEntry {
    /// `my-cmp` -> `my_cmp`, usable as an export name
    pub fn export_name(&self) -> String {
        self.tag_name.replace('-', "_")
    }

    pub fn entry_id(&self) -> String {
        format!("{}{}", LAZY_ENTRY_PREFIX, self.tag_name)
    }

    /// Output chunk name of the component's lazy bundle
    pub fn bundle_key(&self) -> String {
        format!("{}.entry", self.tag_name)
    }
}

/// `@kiln/core/internal/app-data`: build conditionals, namespace and global scripts
pub struct AppDataPlugin {
    features: BuildFeatures,
    namespace: String,
    global_scripts: Vec<PathBuf>,
}

impl AppDataPlugin {
    pub fn new(features: BuildFeatures, namespace: impl Into<String>, global_scripts: Vec<PathBuf>) -> Self {
        Self {
            features,
            namespace: namespace.into(),
            global_scripts,
        }
    }
}

impl Plugin for AppDataPlugin {
    fn name(&self) -> &'static str {
        "appDataPlugin"
    }

    fn resolve_id(&self, importee: &str, _importer: Option<&str>) -> KilnResult<Option<ResolvedId>> {
        Ok(claim(importee, APP_DATA_ID))
    }

    fn load(&self, id: &str) -> KilnResult<Option<String>> {
        if id != APP_DATA_ID {
            return Ok(None);
        }
        let mut code = String::new();
        for script in &self.global_scripts {
            code.push_str(&format!("import {};\n", js_string(&script.to_string_lossy())));
        }
        code.push_str(&self.features.render()?);
        code.push_str(&format!("export const NAMESPACE = {};\n", js_string(&self.namespace)));
        let scripts: Vec<String> = self
            .global_scripts
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        code.push_str(&format!(
            "export const GLOBAL_SCRIPTS = {};\n",
            serde_json::to_string(&scripts)?
        ));
        Ok(Some(code))
    }
}

/// Lazy loader entries: the browser bootstrap and the `defineCustomElements` loader
pub struct LazyCorePlugin {
    core_path: String,
    lazy_data: String,
}

impl LazyCorePlugin {
    pub fn new(core_path: impl Into<String>, components: &[ComponentEntry]) -> KilnResult<Self> {
        Ok(Self {
            core_path: core_path.into(),
            lazy_data: lazy_data(components)?,
        })
    }
}

/// `[[bundle_key, [[tag, members]]]]`
pub fn lazy_data(components: &[ComponentEntry]) -> KilnResult<String> {
    let data: Vec<serde_json::Value> = components
        .iter()
        .map(|c| {
            serde_json::json!([c.bundle_key(), [[c.tag_name, c.members]]])
        })
        .collect();
    Ok(serde_json::to_string(&data)?)
}

impl Plugin for LazyCorePlugin {
    fn name(&self) -> &'static str {
        "lazyCorePlugin"
    }

    fn resolve_id(&self, importee: &str, _importer: Option<&str>) -> KilnResult<Option<ResolvedId>> {
        Ok(claim(importee, LAZY_BROWSER_ID).or_else(|| claim(importee, LAZY_EXTERNAL_ID)))
    }

    fn load(&self, id: &str) -> KilnResult<Option<String>> {
        let body = match id {
            LAZY_BROWSER_ID => format!(
                "bootstrapLazy({}, {{ namespace: NAMESPACE, build: BUILD }});\n",
                self.lazy_data
            ),
            LAZY_EXTERNAL_ID => format!(
                "export const defineCustomElements = (win, options) => bootstrapLazy({}, options);\n",
                self.lazy_data
            ),
            _ => return Ok(None),
        };
        Ok(Some(format!(
            "import {{ bootstrapLazy }} from '{}';\nimport {{ BUILD, NAMESPACE }} from '{}';\n{}",
            self.core_path, APP_DATA_ID, body
        )))
    }
}

/// `@lazy-entry:<tag>`: re-exports one component class under its tag
pub struct LazyComponentPlugin {
    entries: BTreeMap<String, ComponentEntry>,
}

impl LazyComponentPlugin {
    pub fn new(components: &[ComponentEntry]) -> Self {
        Self {
            entries: components
                .iter()
                .map(|c| (c.entry_id(), c.clone()))
                .collect(),
        }
    }
}

impl Plugin for LazyComponentPlugin {
    fn name(&self) -> &'static str {
        "lazyComponentPlugin"
    }

    fn resolve_id(&self, importee: &str, _importer: Option<&str>) -> KilnResult<Option<ResolvedId>> {
        Ok(self
            .entries
            .contains_key(importee)
            .then(|| ResolvedId::Module(importee.to_string())))
    }

    fn load(&self, id: &str) -> KilnResult<Option<String>> {
        Ok(self.entries.get(id).map(|c| {
            format!(
                "import {{ {} }} from {};\nexport {{ {} as {} }};\n",
                c.class_name,
                js_string(&c.file.to_string_lossy()),
                c.class_name,
                c.export_name()
            )
        }))
    }
}

/// `@user-index-entrypoint`: the app's own index module, or nothing
pub struct UserIndexPlugin {
    user_index: Option<PathBuf>,
}

impl UserIndexPlugin {
    pub fn new(fs: &InMemoryFileSystem, user_index: &Path) -> Self {
        Self {
            user_index: fs.access(user_index).then(|| user_index.to_path_buf()),
        }
    }
}

impl Plugin for UserIndexPlugin {
    fn name(&self) -> &'static str {
        "userIndexPlugin"
    }

    fn resolve_id(&self, importee: &str, _importer: Option<&str>) -> KilnResult<Option<ResolvedId>> {
        Ok(claim(importee, USER_INDEX_ID))
    }

    fn load(&self, id: &str) -> KilnResult<Option<String>> {
        if id != USER_INDEX_ID {
            return Ok(None);
        }
        Ok(Some(match &self.user_index {
            Some(path) => format!("export * from {};\n", js_string(&path.to_string_lossy())),
            None => "export {};\n".to_string(),
        }))
    }
}

/// `@kiln/core/internal/hydrate-entry`: registers every component for hydration
pub struct HydratePlugin {
    core_path: String,
    components: Vec<ComponentEntry>,
}

impl HydratePlugin {
    pub fn new(core_path: impl Into<String>, components: Vec<ComponentEntry>) -> Self {
        Self {
            core_path: core_path.into(),
            components,
        }
    }
}

impl Plugin for HydratePlugin {
    fn name(&self) -> &'static str {
        "hydratePlugin"
    }

    fn resolve_id(&self, importee: &str, _importer: Option<&str>) -> KilnResult<Option<ResolvedId>> {
        Ok(claim(importee, HYDRATE_ENTRY_ID))
    }

    fn load(&self, id: &str) -> KilnResult<Option<String>> {
        if id != HYDRATE_ENTRY_ID {
            return Ok(None);
        }
        let mut code = format!(
            "import {{ registerComponents, hydrateDocument }} from '{}';\nimport {{ BUILD }} from '{}';\n",
            self.core_path, APP_DATA_ID
        );
        for c in &self.components {
            code.push_str(&format!(
                "import {{ {} }} from {};\n",
                c.class_name,
                js_string(&c.file.to_string_lossy())
            ));
        }
        let classes: Vec<&str> = self.components.iter().map(|c| c.class_name.as_str()).collect();
        code.push_str(&format!("registerComponents([{}], BUILD);\n", classes.join(", ")));
        code.push_str("export { hydrateDocument };\n");
        Ok(Some(code))
    }
}

/// Loads program source files by emitting them with the generator's transforms
pub struct ProgramTransformPlugin {
    program: Arc<dyn Program>,
    transformers: CustomTransformers,
}

impl ProgramTransformPlugin {
    pub fn new(program: Arc<dyn Program>, transformers: CustomTransformers) -> Self {
        Self {
            program,
            transformers,
        }
    }
}

impl Plugin for ProgramTransformPlugin {
    fn name(&self) -> &'static str {
        "programTransformPlugin"
    }

    fn load(&self, id: &str) -> KilnResult<Option<String>> {
        let path = Path::new(id);
        if self.program.source_file(path).is_none() {
            return Ok(None);
        }
        let (code, diagnostics) = self.program.emit_to_string(path, &self.transformers);
        match code {
            Some(code) => Ok(Some(code)),
            None => {
                let reason = diagnostics
                    .first()
                    .map(|d| d.message.clone())
                    .unwrap_or_else(|| "nothing was emitted".to_string());
                Err(KilnError::Program(format!("{}: {}", id, reason)))
            }
        }
    }
}

/// Relative and absolute module ids resolved and loaded through the VFS
pub struct SysPlugin {
    fs: Arc<InMemoryFileSystem>,
}

impl SysPlugin {
    pub fn new(fs: Arc<InMemoryFileSystem>) -> Self {
        Self { fs }
    }
}

impl Plugin for SysPlugin {
    fn name(&self) -> &'static str {
        "sysPlugin"
    }

    fn resolve_id(&self, importee: &str, importer: Option<&str>) -> KilnResult<Option<ResolvedId>> {
        let base = if importee.starts_with('/') {
            normalize_path(importee)
        } else if is_relative_specifier(importee) {
            let dir = importer
                .map(Path::new)
                .and_then(Path::parent)
                .unwrap_or_else(|| Path::new("/"));
            resolve_path(dir, importee)
        } else {
            return Ok(None);
        };
        Ok(probe_module(&self.fs, &base)
            .map(|path| ResolvedId::Module(path.to_string_lossy().into_owned())))
    }

    fn load(&self, id: &str) -> KilnResult<Option<String>> {
        if !id.starts_with('/') {
            return Ok(None);
        }
        Ok(self.fs.read_file(Path::new(id)))
    }
}

/// Bare specifiers through `node_modules`; the runtime stays external
pub struct NodeResolvePlugin {
    resolver: Arc<ModuleResolver>,
}

impl NodeResolvePlugin {
    pub fn new(resolver: Arc<ModuleResolver>) -> Self {
        Self { resolver }
    }
}

impl Plugin for NodeResolvePlugin {
    fn name(&self) -> &'static str {
        "nodeResolvePlugin"
    }

    fn resolve_id(&self, importee: &str, importer: Option<&str>) -> KilnResult<Option<ResolvedId>> {
        if importee == CORE_SPECIFIER || importee.starts_with("@kiln/core/") {
            return Ok(Some(ResolvedId::External(importee.to_string())));
        }
        if is_relative_specifier(importee) || importee.starts_with('/') {
            return Ok(None);
        }
        Ok(self
            .resolver
            .resolve(importee, importer.map(Path::new))
            .map(|path| ResolvedId::Module(path.to_string_lossy().into_owned())))
    }
}
