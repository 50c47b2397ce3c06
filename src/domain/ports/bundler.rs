//! Bundler port - module-graph bundling behind an ordered plugin pipeline
//!
//! Hook order per module is fixed: `resolve_id` → `load` → `transform`.
//! `resolve_id` and `load` take the first plugin answer in pipeline order;
//! `transform` chains through every plugin in order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::KilnResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedId {
    Module(String),
    External(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub code: String,
    pub map: Option<String>,
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve_id(&self, _importee: &str, _importer: Option<&str>) -> KilnResult<Option<ResolvedId>> {
        Ok(None)
    }

    fn load(&self, _id: &str) -> KilnResult<Option<String>> {
        Ok(None)
    }

    fn transform(&self, _code: &str, _id: &str) -> KilnResult<Option<TransformResult>> {
        Ok(None)
    }
}

/// Ordered list of plugin stages
#[derive(Clone, Default)]
pub struct PluginPipeline {
    stages: Vec<Arc<dyn Plugin>>,
}

impl PluginPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.stages.push(plugin);
        self
    }

    pub fn push(&mut self, plugin: Arc<dyn Plugin>) {
        self.stages.push(plugin);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|p| p.name()).collect()
    }

    pub fn resolve_id(&self, importee: &str, importer: Option<&str>) -> KilnResult<Option<ResolvedId>> {
        for stage in &self.stages {
            if let Some(resolved) = stage.resolve_id(importee, importer)? {
                return Ok(Some(resolved));
            }
        }
        Ok(None)
    }

    pub fn load(&self, id: &str) -> KilnResult<Option<String>> {
        for stage in &self.stages {
            if let Some(code) = stage.load(id)? {
                return Ok(Some(code));
            }
        }
        Ok(None)
    }

    pub fn transform(&self, code: String, id: &str) -> KilnResult<String> {
        let mut code = code;
        for stage in &self.stages {
            if let Some(result) = stage.transform(&code, id)? {
                code = result.code;
            }
        }
        Ok(code)
    }
}

/// Transformed module text keyed by module id, reused across builds
#[derive(Debug, Clone, Default)]
pub struct BundleCache {
    pub modules: HashMap<String, CachedModule>,
}

#[derive(Debug, Clone)]
pub struct CachedModule {
    /// Hash of the loaded (pre-transform) text
    pub source_hash: String,
    pub code: String,
}

pub struct BundleRequest {
    /// Stable id used to key the bundle cache
    pub id: String,
    /// Entry name -> module id
    pub input: BTreeMap<String, String>,
    pub pipeline: PluginPipeline,
    pub cache: Option<BundleCache>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputOptions {
    pub sourcemap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub file_name: String,
    pub code: String,
    pub map: Option<String>,
    pub is_entry: bool,
    /// Module ids included in this chunk, in output order
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BundleOutput {
    pub output: Vec<OutputChunk>,
    pub warnings: Vec<String>,
}

pub trait BundleBuild: Send {
    fn generate(&self, options: &OutputOptions) -> KilnResult<BundleOutput>;
    fn cache(&self) -> BundleCache;
}

pub trait Bundler: Send + Sync {
    fn name(&self) -> &'static str;
    fn bundle(&self, request: BundleRequest) -> KilnResult<Box<dyn BundleBuild>>;
}
