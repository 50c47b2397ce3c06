//! Built-in incremental program engine
//!
//! `ScriptEngine` reads the program config and root files through the
//! `ProgramHost`, versions every file by content hash and reuses the parse
//! results of unchanged files from the previous program. Diagnostics are
//! computed on first request and cached on the program.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::domain::entities::{Diagnostic, DiagnosticCategory, FsWatchResults};
use crate::domain::ports::{
    CustomTransformers, EmitResult, Program, ProgramEngine, ProgramHost, ProgramOptions,
    SourceFile, TypeResolver,
};
use crate::domain::services::{exported_names, find_components, import_specifiers, is_relative_specifier};
use crate::domain::value_objects::path::{is_script_file, is_within, to_js_path, RESOLVE_EXTENSIONS};
use crate::domain::value_objects::{normalize_path, relative_to, resolve_path, ContentHash};
use crate::error::{KilnError, KilnResult};

use super::scanner::check_syntax;

const INDEX_FILES: [&str; 3] = ["index.ts", "index.tsx", "index.js"];

lazy_static! {
    static ref IMPORT_TYPE_RE: Regex =
        Regex::new(r#"(?m)^[ \t]*import\s+type\s[^;]*;[ \t]*\r?\n?"#).unwrap();
}

/// The program config JSON
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgramConfig {
    pub compiler_options: serde_json::Value,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ProgramConfig {
    pub fn parse(path: &Path, text: &str) -> KilnResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| KilnError::Program(format!("{}: {}", path.display(), e)))
    }
}

/// Per-file analysis shared between successive programs while the text is unchanged
#[derive(Debug)]
struct ParsedFile {
    source: SourceFile,
    specifiers: Vec<String>,
    exports: Vec<String>,
    tags: Vec<String>,
    syntax: OnceLock<Vec<Diagnostic>>,
}

impl ParsedFile {
    fn parse(path: PathBuf, text: String) -> Self {
        let version = ContentHash::from_content(&text).into();
        let specifiers = import_specifiers(&text);
        let exports = exported_names(&text);
        let tags = find_components(&text)
            .into_iter()
            .map(|c| c.meta.tag_name)
            .collect();
        Self {
            source: SourceFile {
                path,
                text: Arc::from(text),
                version,
            },
            specifiers,
            exports,
            tags,
            syntax: OnceLock::new(),
        }
    }

    fn syntax_diagnostics(&self) -> &[Diagnostic] {
        self.syntax.get_or_init(|| {
            check_syntax(&self.source.text)
                .map(|err| {
                    vec![Diagnostic::error(DiagnosticCategory::Syntax, err.message)
                        .with_file(&self.source.path)
                        .with_location(err.line, err.column)]
                })
                .unwrap_or_default()
        })
    }
}

#[derive(Debug, Default)]
pub struct ScriptEngine;

impl ScriptEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ProgramEngine for ScriptEngine {
    fn name(&self) -> &'static str {
        "script"
    }

    fn create_program(
        &self,
        config_path: Option<&Path>,
        options: &ProgramOptions,
        host: &dyn ProgramHost,
        previous: Option<&Arc<dyn Program>>,
    ) -> KilnResult<Arc<dyn Program>> {
        let config = match config_path {
            Some(path) => {
                let text = host.read_file(path).ok_or_else(|| KilnError::NotFound {
                    path: path.to_path_buf(),
                })?;
                ProgramConfig::parse(path, &text)?
            }
            None => ProgramConfig::default(),
        };
        let config_dir = config_path
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| options.root_dir.clone());

        let previous = previous.and_then(|p| p.as_any().downcast_ref::<ScriptProgram>());
        let root_files = collect_root_files(&config, &config_dir, options, host);

        let mut files = BTreeMap::new();
        let mut reused = 0usize;
        for path in root_files {
            let Some(text) = host.read_file(&path) else {
                continue;
            };
            let prior = previous.and_then(|p| p.files.get(&path));
            let parsed = match prior {
                Some(prior) if *prior.source.text == *text => {
                    reused += 1;
                    Arc::clone(prior)
                }
                _ => Arc::new(ParsedFile::parse(path.clone(), text)),
            };
            files.insert(path, parsed);
        }

        let program = ScriptProgram::new(options.clone(), config, files, previous);
        debug!(
            target: "kiln::build",
            files = program.files.len(),
            reused,
            changed = program.changes.files_changed().len(),
            "created program"
        );
        Ok(Arc::new(program))
    }
}

fn collect_root_files(
    config: &ProgramConfig,
    config_dir: &Path,
    options: &ProgramOptions,
    host: &dyn ProgramHost,
) -> BTreeSet<PathBuf> {
    let include_dirs: Vec<PathBuf> = if config.include.is_empty() {
        vec![options.src_dir.clone()]
    } else {
        config
            .include
            .iter()
            .map(|pattern| resolve_path(config_dir, glob_base(pattern)))
            .collect()
    };

    let mut roots = BTreeSet::new();
    for dir in include_dirs {
        for path in host.read_directory(&dir, true) {
            let path = normalize_path(path);
            if !is_script_file(&path)
                || is_within(&path, &options.out_dir)
                || path.components().any(|c| c.as_os_str() == "node_modules")
                || is_excluded(&path, &config.exclude, config_dir)
            {
                continue;
            }
            roots.insert(path);
        }
    }
    roots
}

/// Directory part of an include/exclude pattern, before any glob segment
fn glob_base(pattern: &str) -> &str {
    let cut = pattern.find(&['*', '?', '{'][..]).unwrap_or(pattern.len());
    pattern[..cut].trim_end_matches('/')
}

fn is_excluded(path: &Path, exclude: &[String], config_dir: &Path) -> bool {
    exclude.iter().any(|pattern| {
        if let Some(suffix) = pattern.strip_prefix("**/*") {
            return !suffix.is_empty() && path.to_string_lossy().ends_with(suffix);
        }
        let base = glob_base(pattern);
        !base.is_empty() && is_within(path, &resolve_path(config_dir, base))
    })
}

pub struct ScriptProgram {
    options: ProgramOptions,
    config: ProgramConfig,
    files: BTreeMap<PathBuf, Arc<ParsedFile>>,
    resolver: ScriptResolver,
    changes: FsWatchResults,
    affected: Vec<PathBuf>,
    /// Output path to the first source, in path order, that emits it
    out_owners: BTreeMap<PathBuf, PathBuf>,
    out_collisions: Vec<Diagnostic>,
    semantic: OnceLock<Vec<Diagnostic>>,
}

impl ScriptProgram {
    fn new(
        options: ProgramOptions,
        config: ProgramConfig,
        files: BTreeMap<PathBuf, Arc<ParsedFile>>,
        previous: Option<&ScriptProgram>,
    ) -> Self {
        let resolver = ScriptResolver {
            exports: files
                .iter()
                .map(|(path, f)| (path.clone(), f.exports.clone()))
                .collect(),
        };

        let mut changes = FsWatchResults::default();
        match previous {
            Some(prev) => {
                for (path, file) in &files {
                    match prev.files.get(path) {
                        None => changes.files_added.push(path.clone()),
                        Some(old) if old.source.version != file.source.version => {
                            changes.files_updated.push(path.clone())
                        }
                        Some(_) => {}
                    }
                }
                changes.files_deleted = prev
                    .files
                    .keys()
                    .filter(|path| !files.contains_key(*path))
                    .cloned()
                    .collect();
            }
            None => changes.files_added = files.keys().cloned().collect(),
        }

        let mut program = Self {
            options,
            config,
            files,
            resolver,
            changes,
            affected: Vec::new(),
            out_owners: BTreeMap::new(),
            out_collisions: Vec::new(),
            semantic: OnceLock::new(),
        };
        program.affected = program.compute_affected(previous);
        program.assign_out_paths();
        program
    }

    /// Two sources that map to one output: the later one is reported and never emitted
    fn assign_out_paths(&mut self) {
        let mut owners: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
        let mut collisions = Vec::new();
        for path in self.files.keys() {
            let out = self.out_path(path);
            match owners.get(&out) {
                Some(owner) => collisions.push(
                    Diagnostic::error(
                        DiagnosticCategory::Config,
                        format!(
                            "output {} is already emitted from {}",
                            out.display(),
                            owner.display()
                        ),
                    )
                    .with_file(path),
                ),
                None => {
                    owners.insert(out, path.clone());
                }
            }
        }
        self.out_owners = owners;
        self.out_collisions = collisions;
    }

    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    fn local_imports(&self, path: &Path, file: &ParsedFile) -> Vec<PathBuf> {
        file.specifiers
            .iter()
            .filter(|s| is_relative_specifier(s))
            .filter_map(|s| self.resolver.resolve_module(path, s))
            .collect()
    }

    fn compute_affected(&self, previous: Option<&ScriptProgram>) -> Vec<PathBuf> {
        let mut importers: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
        for (path, file) in &self.files {
            for dep in self.local_imports(path, file) {
                importers.entry(dep).or_default().push(path.clone());
            }
        }
        // files that imported something which is now gone
        if let Some(prev) = previous {
            for deleted in &self.changes.files_deleted {
                for (path, file) in &self.files {
                    let spec_hits = file.specifiers.iter().any(|s| {
                        is_relative_specifier(s)
                            && probe(path, s, |p| prev.files.contains_key(p)).as_deref()
                                == Some(deleted.as_path())
                    });
                    if spec_hits {
                        importers.entry(deleted.clone()).or_default().push(path.clone());
                    }
                }
            }
        }

        let mut affected: BTreeSet<PathBuf> = BTreeSet::new();
        let mut queue: Vec<PathBuf> = self.changes.files_added.clone();
        queue.extend(self.changes.files_updated.iter().cloned());
        queue.extend(self.changes.files_deleted.iter().cloned());
        while let Some(path) = queue.pop() {
            if let Some(users) = importers.get(&path) {
                for user in users {
                    if !affected.contains(user) {
                        queue.push(user.clone());
                    }
                }
            }
            if self.files.contains_key(&path) {
                affected.insert(path);
            }
        }
        affected.into_iter().collect()
    }

    fn out_path(&self, source: &Path) -> PathBuf {
        let rel = relative_to(source, &self.options.src_dir)
            .or_else(|| relative_to(source, &self.options.root_dir))
            .unwrap_or_else(|| source.file_name().map(PathBuf::from).unwrap_or_default());
        to_js_path(&self.options.out_dir.join(rel))
    }

    fn compute_semantic(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut tag_owners: BTreeMap<&str, &Path> = BTreeMap::new();

        for (path, file) in &self.files {
            for spec in file.specifiers.iter().filter(|s| is_relative_specifier(s)) {
                if self.resolver.resolve_module(path, spec).is_none() {
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCategory::Type,
                            format!("cannot find module '{}'", spec),
                        )
                        .with_file(path),
                    );
                }
            }
            for tag in &file.tags {
                if !tag.contains('-') {
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCategory::Type,
                            format!("component tag '{}' must contain a dash", tag),
                        )
                        .with_file(path),
                    );
                }
                if let Some(owner) = tag_owners.insert(tag, path) {
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCategory::Type,
                            format!(
                                "component tag '{}' is already declared in {}",
                                tag,
                                owner.display()
                            ),
                        )
                        .with_file(path),
                    );
                }
            }
        }
        diagnostics
    }
}

/// Drop `import type` statements; everything else is emitted as written
fn lower(code: String) -> String {
    let code = if code.contains('\r') {
        code.replace("\r\n", "\n")
    } else {
        code
    };
    if IMPORT_TYPE_RE.is_match(&code) {
        IMPORT_TYPE_RE.replace_all(&code, "").into_owned()
    } else {
        code
    }
}

fn declaration_stub(exports: &[String]) -> String {
    let mut out = String::new();
    for name in exports {
        out.push_str(&format!("export declare const {}: any;\n", name));
    }
    if out.is_empty() {
        out.push_str("export {};\n");
    }
    out
}

impl Program for ScriptProgram {
    fn options(&self) -> &ProgramOptions {
        &self.options
    }

    fn root_files(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    fn source_files(&self) -> Vec<SourceFile> {
        self.files.values().map(|f| f.source.clone()).collect()
    }

    fn source_file(&self, path: &Path) -> Option<SourceFile> {
        self.files.get(&normalize_path(path)).map(|f| f.source.clone())
    }

    fn changes(&self) -> FsWatchResults {
        self.changes.clone()
    }

    fn affected_files(&self) -> Vec<PathBuf> {
        self.affected.clone()
    }

    fn syntactic_diagnostics(&self) -> Vec<Diagnostic> {
        self.files
            .values()
            .flat_map(|f| f.syntax_diagnostics().iter().cloned())
            .chain(self.out_collisions.iter().cloned())
            .collect()
    }

    fn semantic_diagnostics(&self) -> Vec<Diagnostic> {
        self.semantic.get_or_init(|| self.compute_semantic()).clone()
    }

    fn emit(
        &self,
        target: Option<&Path>,
        transformers: &CustomTransformers,
        write: &mut dyn FnMut(&Path, &str),
        emit_only_dts: bool,
    ) -> EmitResult {
        let targets: Vec<PathBuf> = match target {
            Some(path) => vec![normalize_path(path)],
            None => self.affected.clone(),
        };

        let mut result = EmitResult::default();
        for path in targets {
            let Some(file) = self.files.get(&path) else {
                result.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCategory::Internal,
                        "file is not part of the program",
                    )
                    .with_file(&path),
                );
                continue;
            };

            let syntax = file.syntax_diagnostics();
            if !syntax.is_empty() {
                result.diagnostics.extend(syntax.iter().cloned());
                result.emit_skipped = true;
                continue;
            }

            let out = self.out_path(&path);
            if self.out_owners.get(&out).is_some_and(|owner| *owner != path) {
                result.emit_skipped = true;
                continue;
            }
            if emit_only_dts {
                write(&out.with_extension("d.ts"), &declaration_stub(&file.exports));
                result.emitted.push(path);
                continue;
            }

            let mut code = file.source.text.to_string();
            for t in &transformers.before {
                code = t.transform(&file.source, code, &mut result.diagnostics);
            }
            code = lower(code);
            for t in &transformers.after {
                code = t.transform(&file.source, code, &mut result.diagnostics);
            }
            write(&out, &code);
            result.emitted.push(path);
        }
        result
    }

    fn type_resolver(&self) -> &dyn TypeResolver {
        &self.resolver
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Resolution limited to the files of one program
#[derive(Debug, Default)]
struct ScriptResolver {
    exports: BTreeMap<PathBuf, Vec<String>>,
}

fn probe(importer: &Path, specifier: &str, exists: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    let base = match importer.parent() {
        Some(dir) => resolve_path(dir, specifier),
        None => normalize_path(specifier),
    };
    let base_str = base.to_string_lossy().into_owned();

    // `./cmp.js` written against a `cmp.ts` source
    let stripped = base_str
        .strip_suffix(".js")
        .map(str::to_string)
        .into_iter();

    for stem in std::iter::once(base_str.clone()).chain(stripped) {
        for ext in RESOLVE_EXTENSIONS {
            let candidate = PathBuf::from(format!("{}{}", stem, ext));
            if exists(&candidate) {
                return Some(candidate);
            }
        }
    }
    INDEX_FILES
        .iter()
        .map(|index| base.join(index))
        .find(|candidate| exists(candidate))
}

impl TypeResolver for ScriptResolver {
    fn resolve_module(&self, importer: &Path, specifier: &str) -> Option<PathBuf> {
        if !is_relative_specifier(specifier) {
            return None;
        }
        probe(importer, specifier, |p| self.exports.contains_key(p))
    }

    fn exported_symbols(&self, file: &Path) -> Vec<String> {
        self.exports
            .get(&normalize_path(file))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::SourceTransform;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MapHost {
        files: Mutex<BTreeMap<PathBuf, String>>,
    }

    impl MapHost {
        fn with(files: &[(&str, &str)]) -> Self {
            let host = Self::default();
            for (path, text) in files {
                host.set(path, text);
            }
            host
        }

        fn set(&self, path: &str, text: &str) {
            self.files
                .lock()
                .insert(PathBuf::from(path), text.to_string());
        }

        fn remove(&self, path: &str) {
            self.files.lock().remove(Path::new(path));
        }
    }

    impl ProgramHost for MapHost {
        fn read_file(&self, path: &Path) -> Option<String> {
            self.files.lock().get(path).cloned()
        }

        fn file_exists(&self, path: &Path) -> bool {
            self.files.lock().contains_key(path)
        }

        fn read_directory(&self, dir: &Path, _recursive: bool) -> Vec<PathBuf> {
            self.files
                .lock()
                .keys()
                .filter(|p| p.starts_with(dir))
                .cloned()
                .collect()
        }

        fn write_file(&self, path: &Path, content: &str) -> KilnResult<()> {
            self.set(&path.to_string_lossy(), content);
            Ok(())
        }
    }

    fn options() -> ProgramOptions {
        ProgramOptions {
            root_dir: PathBuf::from("/app"),
            src_dir: PathBuf::from("/app/src"),
            out_dir: PathBuf::from("/app/.kiln"),
        }
    }

    fn create(host: &MapHost, previous: Option<&Arc<dyn Program>>) -> Arc<dyn Program> {
        ScriptEngine::new()
            .create_program(None, &options(), host, previous)
            .unwrap()
    }

    #[test]
    fn test_root_files_skip_declarations_and_out_dir() {
        let host = MapHost::with(&[
            ("/app/src/a.ts", "export const a = 1;"),
            ("/app/src/types.d.ts", "declare const x: number;"),
            ("/app/src/style.css", "a {}"),
            ("/app/.kiln/a.js", "export const a = 1;"),
        ]);
        let program = create(&host, None);
        assert_eq!(program.root_files(), vec![PathBuf::from("/app/src/a.ts")]);
    }

    #[test]
    fn test_include_and_exclude_from_config() {
        let host = MapHost::with(&[
            ("/app/lib/a.ts", "export const a = 1;"),
            ("/app/lib/a.spec.ts", "test();"),
            ("/app/lib/legacy/old.ts", "export const o = 1;"),
            ("/app/src/ignored.ts", "export const i = 1;"),
            (
                "/app/program.json",
                r#"{"include": ["lib/**/*"], "exclude": ["**/*.spec.ts", "lib/legacy"]}"#,
            ),
        ]);
        let program = ScriptEngine::new()
            .create_program(Some(Path::new("/app/program.json")), &options(), &host, None)
            .unwrap();
        assert_eq!(program.root_files(), vec![PathBuf::from("/app/lib/a.ts")]);
    }

    #[test]
    fn test_missing_config_is_not_found() {
        let host = MapHost::default();
        let err = ScriptEngine::new()
            .create_program(Some(Path::new("/app/nope.json")), &options(), &host, None)
            .err()
            .unwrap();
        assert!(matches!(err, KilnError::NotFound { .. }));
    }

    #[test]
    fn test_changes_and_affected_against_previous() {
        let host = MapHost::with(&[
            ("/app/src/util.ts", "export const u = 1;"),
            ("/app/src/cmp.tsx", "import { u } from './util';\nexport const c = u;"),
            ("/app/src/other.ts", "export const o = 1;"),
            ("/app/src/gone.ts", "export const g = 1;"),
        ]);
        let first = create(&host, None);
        assert_eq!(first.changes().files_added.len(), 4);

        host.set("/app/src/util.ts", "export const u = 2;");
        host.remove("/app/src/gone.ts");
        host.set("/app/src/new.ts", "export const n = 1;");
        let second = create(&host, Some(&first));

        let changes = second.changes();
        assert_eq!(changes.files_added, vec![PathBuf::from("/app/src/new.ts")]);
        assert_eq!(changes.files_updated, vec![PathBuf::from("/app/src/util.ts")]);
        assert_eq!(changes.files_deleted, vec![PathBuf::from("/app/src/gone.ts")]);
        assert_eq!(
            second.affected_files(),
            vec![
                PathBuf::from("/app/src/cmp.tsx"),
                PathBuf::from("/app/src/new.ts"),
                PathBuf::from("/app/src/util.ts"),
            ]
        );
    }

    #[test]
    fn test_unchanged_files_are_reused() {
        let host = MapHost::with(&[("/app/src/a.ts", "export const a = 1;")]);
        let first = create(&host, None);
        let second = create(&host, Some(&first));

        assert!(second.changes().is_empty());
        assert!(second.affected_files().is_empty());

        let first = first.as_any().downcast_ref::<ScriptProgram>().unwrap();
        let second = second.as_any().downcast_ref::<ScriptProgram>().unwrap();
        let path = Path::new("/app/src/a.ts");
        assert!(Arc::ptr_eq(&first.files[path], &second.files[path]));
    }

    #[test]
    fn test_syntax_error_skips_emit() {
        let host = MapHost::with(&[
            ("/app/src/good.ts", "export const g = () => { return 1; };"),
            ("/app/src/bad.ts", "export function b() {\n  return (1;\n}"),
        ]);
        let program = create(&host, None);

        let diagnostics = program.syntactic_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].file.as_deref(), Some(Path::new("/app/src/bad.ts")));

        let mut written = Vec::new();
        let result = program.emit(
            None,
            &CustomTransformers::new(),
            &mut |path: &Path, _: &str| written.push(path.to_path_buf()),
            false,
        );
        assert!(result.emit_skipped);
        assert_eq!(written, vec![PathBuf::from("/app/.kiln/good.js")]);
    }

    #[test]
    fn test_sources_sharing_an_output_are_reported() {
        let host = MapHost::with(&[
            ("/app/src/a.ts", "export const a = 1;\n"),
            ("/app/src/a.tsx", "export const b = 2;\n"),
        ]);
        let program = create(&host, None);

        let diagnostics = program.syntactic_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].file.as_deref(), Some(Path::new("/app/src/a.tsx")));
        assert!(diagnostics[0].message.contains("/app/.kiln/a.js"));

        let mut written = Vec::new();
        let result = program.emit(
            None,
            &CustomTransformers::new(),
            &mut |path: &Path, text: &str| written.push((path.to_path_buf(), text.to_string())),
            false,
        );
        assert!(result.emit_skipped);
        assert_eq!(result.emitted, vec![PathBuf::from("/app/src/a.ts")]);
        assert_eq!(
            written,
            vec![(PathBuf::from("/app/.kiln/a.js"), "export const a = 1;\n".to_string())]
        );
    }

    #[test]
    fn test_semantic_diagnostics() {
        let host = MapHost::with(&[
            ("/app/src/a.tsx", "import { x } from './missing';\n@Component({ tag: 'x-a' })\nclass A {}\n"),
            ("/app/src/b.tsx", "@Component({ tag: 'x-a' })\nclass B {}\n@Component({ tag: 'nodash' })\nclass C {}\n"),
        ]);
        let program = create(&host, None);
        let messages: Vec<String> = program
            .semantic_diagnostics()
            .into_iter()
            .map(|d| d.message)
            .collect();

        assert_eq!(messages.len(), 3);
        assert!(messages.contains(&"cannot find module './missing'".to_string()));
        assert!(messages.iter().any(|m| m.contains("already declared in /app/src/a.tsx")));
        assert!(messages.iter().any(|m| m.contains("'nodash' must contain a dash")));
    }

    struct Shout;

    impl SourceTransform for Shout {
        fn name(&self) -> &'static str {
            "shout"
        }

        fn transform(&self, _: &SourceFile, code: String, _: &mut Vec<Diagnostic>) -> String {
            code.to_uppercase()
        }
    }

    #[test]
    fn test_emit_runs_transformers_and_lowering() {
        let host = MapHost::with(&[(
            "/app/src/nested/a.ts",
            "import type { T } from './t';\nexport const a = 1;\n",
        )]);
        let program = create(&host, None);

        let transformers = CustomTransformers::new().after(Arc::new(Shout));
        let (js, diagnostics) =
            program.emit_to_string(Path::new("/app/src/nested/a.ts"), &transformers);
        assert!(diagnostics.is_empty());
        assert_eq!(js.as_deref(), Some("EXPORT CONST A = 1;\n"));

        let mut written = Vec::new();
        program.emit(
            None,
            &CustomTransformers::new(),
            &mut |path: &Path, text: &str| written.push((path.to_path_buf(), text.to_string())),
            true,
        );
        assert_eq!(
            written,
            vec![(
                PathBuf::from("/app/.kiln/nested/a.d.ts"),
                "export declare const a: any;\n".to_string()
            )]
        );
    }

    #[test]
    fn test_type_resolver_probes_extensions() {
        let host = MapHost::with(&[
            ("/app/src/a.ts", "export const a = 1;\nexport class Foo {}"),
            ("/app/src/cmp/index.tsx", "export const c = 1;"),
            ("/app/src/main.ts", "import './a.js';"),
        ]);
        let program = create(&host, None);
        let resolver = program.type_resolver();
        let main = Path::new("/app/src/main.ts");

        assert_eq!(resolver.resolve_module(main, "./a"), Some(PathBuf::from("/app/src/a.ts")));
        assert_eq!(resolver.resolve_module(main, "./a.js"), Some(PathBuf::from("/app/src/a.ts")));
        assert_eq!(
            resolver.resolve_module(main, "./cmp"),
            Some(PathBuf::from("/app/src/cmp/index.tsx"))
        );
        assert_eq!(resolver.resolve_module(main, "@kiln/core"), None);
        assert_eq!(resolver.exported_symbols(Path::new("/app/src/a.ts")), vec!["Foo", "a"]);
    }
}
