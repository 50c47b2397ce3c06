//! Component, module and collection metadata

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Public surface of one declared component
///
/// The declared fields round-trip through the `static get cmpMeta()` block
/// the decorator transform emits. The dependency fields are filled in per
/// build and never stored in emitted code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMeta {
    pub tag_name: String,
    pub class_name: String,
    #[serde(default)]
    pub shadow: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub style_urls: Vec<String>,

    #[serde(skip)]
    pub source_file_path: PathBuf,
    #[serde(skip)]
    pub direct_dependencies: Vec<String>,
    #[serde(skip)]
    pub dependencies: Vec<String>,
    #[serde(skip)]
    pub dependents: Vec<String>,
}

impl ComponentMeta {
    /// Member names in the order the runtime expects them
    pub fn members(&self) -> Vec<String> {
        self.props
            .iter()
            .chain(&self.states)
            .chain(&self.methods)
            .cloned()
            .collect()
    }

    /// `my-button` -> `MyButton`
    pub fn pascal_tag(&self) -> String {
        self.tag_name
            .split('-')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect()
    }
}

/// Metadata for one compiled source file
///
/// Entries are replaced wholesale on every transpile of the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMeta {
    pub source_file_path: PathBuf,
    pub js_file_path: PathBuf,
    pub components: Vec<ComponentMeta>,
    /// Resolved local imports
    pub imports: Vec<PathBuf>,
    /// Bare or unresolved import specifiers
    pub external_imports: Vec<String>,
    /// Custom element tags referenced from templates
    pub tag_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub is_collection_dependency: bool,
}

impl ModuleMeta {
    pub fn has_components(&self) -> bool {
        !self.components.is_empty()
    }
}

/// An imported dependency collection (external component library)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMeta {
    pub name: String,
    pub dir: PathBuf,
    pub manifest_path: PathBuf,
    pub components: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_script: Option<PathBuf>,
}

/// `collection-manifest.json`, written by the collection output target and
/// read back when another project depends on the package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionManifest {
    /// Module paths relative to the manifest directory
    #[serde(default)]
    pub entries: Vec<String>,
    #[serde(default)]
    pub components: Vec<CollectionComponent>,
    #[serde(default)]
    pub compiler: CompilerInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_script: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionComponent {
    #[serde(flatten)]
    pub meta: ComponentMeta,
    /// Module path relative to the manifest directory
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerInfo {
    pub name: String,
    pub version: String,
}

impl CompilerInfo {
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
