//! Built-in module-graph bundler
//!
//! Walks each entry's import graph depth-first through the plugin pipeline
//! and concatenates the modules into one chunk per entry, dependencies
//! first. Specifiers no plugin resolves stay as imports of the chunk and are
//! reported as warnings.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::debug;

use crate::domain::ports::{
    BundleBuild, BundleCache, BundleOutput, BundleRequest, Bundler, CachedModule, OutputChunk,
    OutputOptions, PluginPipeline, ResolvedId,
};
use crate::domain::services::import_refs;
use crate::domain::value_objects::ContentHash;
use crate::error::{KilnError, KilnResult};

lazy_static! {
    static ref EXPORT_DEFAULT_RE: Regex = Regex::new(r"(?m)^([ \t]*)export\s+default\s+").unwrap();
    static ref EXPORT_DECL_RE: Regex = Regex::new(
        r"(?m)^([ \t]*)export\s+((?:abstract\s+)?class|(?:async\s+)?function|const|let|var|enum)\b"
    )
    .unwrap();
    static ref EXPORT_LIST_RE: Regex =
        Regex::new(r"(?m)^[ \t]*export\s*\{[^}]*\}[ \t]*;?[ \t]*$").unwrap();
}

#[derive(Debug, Default)]
pub struct GraphBundler;

impl GraphBundler {
    pub fn new() -> Self {
        Self
    }
}

impl Bundler for GraphBundler {
    fn name(&self) -> &'static str {
        "graph"
    }

    fn bundle(&self, request: BundleRequest) -> KilnResult<Box<dyn BundleBuild>> {
        let mut walker = GraphWalker {
            bundle_id: &request.id,
            pipeline: &request.pipeline,
            previous: request.cache.unwrap_or_default(),
            records: HashMap::new(),
            warnings: BTreeSet::new(),
            cache_hits: 0,
        };

        let mut entries = Vec::with_capacity(request.input.len());
        for (name, entry_id) in &request.input {
            let id = match request.pipeline.resolve_id(entry_id, None)? {
                Some(ResolvedId::Module(id)) => id,
                Some(ResolvedId::External(_)) | None => {
                    return Err(KilnError::bundle(
                        &request.id,
                        format!("could not resolve entry module '{}'", entry_id),
                    ));
                }
            };
            let mut order = Vec::new();
            walker.visit(&id, &mut BTreeSet::new(), &mut order)?;
            entries.push(EntryGraph {
                name: name.clone(),
                entry: id,
                order,
            });
        }

        debug!(
            target: "kiln::bundle",
            bundle = %request.id,
            entries = entries.len(),
            modules = walker.records.len(),
            cache_hits = walker.cache_hits,
            "bundled module graph"
        );

        Ok(Box::new(GraphBuild {
            entries,
            records: walker.records,
            warnings: walker.warnings.into_iter().collect(),
        }))
    }
}

/// One transformed module plus the spans of its bundled imports
#[derive(Debug, Clone)]
struct ModuleRecord {
    source_hash: String,
    code: String,
    internal_imports: Vec<Range<usize>>,
}

struct EntryGraph {
    name: String,
    entry: String,
    /// Dependencies first, entry last
    order: Vec<String>,
}

struct GraphWalker<'a> {
    bundle_id: &'a str,
    pipeline: &'a PluginPipeline,
    previous: BundleCache,
    records: HashMap<String, ModuleRecord>,
    warnings: BTreeSet<String>,
    cache_hits: usize,
}

impl GraphWalker<'_> {
    fn visit(&mut self, id: &str, seen: &mut BTreeSet<String>, order: &mut Vec<String>) -> KilnResult<()> {
        if !seen.insert(id.to_string()) {
            return Ok(());
        }
        if !self.records.contains_key(id) {
            let record = self.build_record(id)?;
            self.records.insert(id.to_string(), record);
        }

        let deps: Vec<String> = self.records[id]
            .internal_imports
            .iter()
            .filter_map(|span| self.resolved_at(id, span))
            .collect();
        for dep in deps {
            self.visit(&dep, seen, order)?;
        }
        order.push(id.to_string());
        Ok(())
    }

    fn resolved_at(&self, id: &str, span: &Range<usize>) -> Option<String> {
        let code = &self.records.get(id)?.code;
        let statement = code.get(span.clone())?;
        import_refs(statement).into_iter().next().and_then(|r| {
            match self.pipeline.resolve_id(&r.specifier, Some(id)) {
                Ok(Some(ResolvedId::Module(dep))) => Some(dep),
                _ => None,
            }
        })
    }

    fn build_record(&mut self, id: &str) -> KilnResult<ModuleRecord> {
        let source = self.pipeline.load(id)?.ok_or_else(|| {
            KilnError::bundle(self.bundle_id, format!("could not load '{}'", id))
        })?;
        let source_hash = ContentHash::from_content(&source).to_string();

        let code = match self.previous.modules.get(id) {
            Some(cached) if cached.source_hash == source_hash => {
                self.cache_hits += 1;
                cached.code.clone()
            }
            _ => self.pipeline.transform(source, id)?,
        };

        let mut internal_imports = Vec::new();
        for import in import_refs(&code).into_iter().filter(|r| !r.dynamic) {
            match self.pipeline.resolve_id(&import.specifier, Some(id))? {
                Some(ResolvedId::Module(_)) => internal_imports.push(import.span),
                Some(ResolvedId::External(_)) => {}
                None => {
                    self.warnings.insert(format!(
                        "'{}' is imported by {}, but could not be resolved, treating it as external",
                        import.specifier, id
                    ));
                }
            }
        }

        Ok(ModuleRecord {
            source_hash,
            code,
            internal_imports,
        })
    }
}

fn render_module(record: &ModuleRecord, is_entry: bool) -> String {
    let mut out = String::with_capacity(record.code.len());
    let mut cursor = 0;
    for span in &record.internal_imports {
        if span.start < cursor {
            continue;
        }
        out.push_str(&record.code[cursor..span.start]);
        cursor = span.end;
    }
    out.push_str(&record.code[cursor..]);

    if is_entry {
        return out;
    }
    let out = EXPORT_LIST_RE.replace_all(&out, "");
    let out = EXPORT_DEFAULT_RE.replace_all(&out, "$1");
    EXPORT_DECL_RE.replace_all(&out, "$1$2").into_owned()
}

struct GraphBuild {
    entries: Vec<EntryGraph>,
    records: HashMap<String, ModuleRecord>,
    warnings: Vec<String>,
}

impl BundleBuild for GraphBuild {
    fn generate(&self, options: &OutputOptions) -> KilnResult<BundleOutput> {
        let mut output = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let file_name = format!("{}.js", entry.name);
            let mut code = String::new();
            for id in &entry.order {
                let Some(record) = self.records.get(id) else {
                    continue;
                };
                code.push_str(&format!("// {}\n", id));
                code.push_str(render_module(record, *id == entry.entry).trim_end());
                code.push('\n');
            }

            let map = if options.sourcemap {
                code.push_str(&format!("//# sourceMappingURL={}.map\n", file_name));
                Some(
                    json!({
                        "version": 3,
                        "file": file_name,
                        "sources": entry.order,
                        "names": [],
                        "mappings": "",
                    })
                    .to_string(),
                )
            } else {
                None
            };

            output.push(OutputChunk {
                file_name,
                code,
                map,
                is_entry: true,
                modules: entry.order.clone(),
            });
        }

        Ok(BundleOutput {
            output,
            warnings: self.warnings.clone(),
        })
    }

    fn cache(&self) -> BundleCache {
        BundleCache {
            modules: self
                .records
                .iter()
                .map(|(id, record)| {
                    (
                        id.clone(),
                        CachedModule {
                            source_hash: record.source_hash.clone(),
                            code: record.code.clone(),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Entry map helper: `{ name: id }`
pub fn entry_map<I, K, V>(entries: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
