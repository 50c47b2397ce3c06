//! Output target value objects - which artifacts a build produces

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Kind of build artifact a target produces
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum OutputTargetKind {
    /// Transpiled modules plus a collection manifest, for consumption by other apps
    Collection,
    /// One self-defining custom element bundle per component module
    CustomElement,
    /// Lazy-loaded component bundles behind a small loader
    Lazy,
    /// Hydration module for server and client pre-rendering
    Hydrate,
}

impl OutputTargetKind {
    pub const ALL: [OutputTargetKind; 4] = [
        OutputTargetKind::Collection,
        OutputTargetKind::CustomElement,
        OutputTargetKind::Lazy,
        OutputTargetKind::Hydrate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputTargetKind::Collection => "collection",
            OutputTargetKind::CustomElement => "custom-element",
            OutputTargetKind::Lazy => "lazy",
            OutputTargetKind::Hydrate => "hydrate",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OutputTargetKind::Collection => "Collection",
            OutputTargetKind::CustomElement => "Custom Elements",
            OutputTargetKind::Lazy => "Lazy Bundles",
            OutputTargetKind::Hydrate => "Hydrate",
        }
    }

    /// Whether this kind goes through the bundler
    pub fn is_bundled(&self) -> bool {
        !matches!(self, OutputTargetKind::Collection)
    }
}

impl fmt::Display for OutputTargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured output target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutputTarget {
    Collection { dir: PathBuf },
    CustomElement { dir: PathBuf },
    Lazy { dir: PathBuf },
    Hydrate { dir: PathBuf },
}

impl OutputTarget {
    pub fn new(kind: OutputTargetKind, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        match kind {
            OutputTargetKind::Collection => OutputTarget::Collection { dir },
            OutputTargetKind::CustomElement => OutputTarget::CustomElement { dir },
            OutputTargetKind::Lazy => OutputTarget::Lazy { dir },
            OutputTargetKind::Hydrate => OutputTarget::Hydrate { dir },
        }
    }

    pub fn kind(&self) -> OutputTargetKind {
        match self {
            OutputTarget::Collection { .. } => OutputTargetKind::Collection,
            OutputTarget::CustomElement { .. } => OutputTargetKind::CustomElement,
            OutputTarget::Lazy { .. } => OutputTargetKind::Lazy,
            OutputTarget::Hydrate { .. } => OutputTargetKind::Hydrate,
        }
    }

    pub fn dir(&self) -> &Path {
        match self {
            OutputTarget::Collection { dir }
            | OutputTarget::CustomElement { dir }
            | OutputTarget::Lazy { dir }
            | OutputTarget::Hydrate { dir } => dir,
        }
    }

    pub fn with_dir(&self, dir: impl Into<PathBuf>) -> Self {
        OutputTarget::new(self.kind(), dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tagged_table() {
        #[derive(Deserialize)]
        struct Wrapper {
            output_targets: Vec<OutputTarget>,
        }
        let parsed: Wrapper = toml::from_str(
            r#"
            [[output_targets]]
            type = "custom-element"
            dir = "dist/components"

            [[output_targets]]
            type = "lazy"
            dir = "www/build"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.output_targets.len(), 2);
        assert_eq!(parsed.output_targets[0].kind(), OutputTargetKind::CustomElement);
        assert_eq!(parsed.output_targets[1].dir(), Path::new("www/build"));
    }

    #[test]
    fn only_collection_skips_bundler() {
        let bundled: Vec<_> = OutputTargetKind::ALL
            .iter()
            .filter(|k| k.is_bundled())
            .collect();
        assert_eq!(bundled.len(), 3);
        assert_eq!(OutputTargetKind::CustomElement.to_string(), "custom-element");
    }
}
