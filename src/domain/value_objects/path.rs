//! Path normalization and file classification
//!
//! Every key the build core stores (VFS items, module map, change sets) is a
//! normalized path: forward slashes, no `.` segments, `..` resolved lexically.
//! Normalization never touches the file system.

use std::path::{Path, PathBuf};

pub const SCRIPT_EXTENSIONS: [&str; 5] = ["ts", "tsx", "js", "jsx", "mjs"];
pub const STYLE_EXTENSIONS: [&str; 6] = ["css", "scss", "sass", "less", "pcss", "styl"];
/// Suffixes probed, in order, when an import specifier has no extension
pub const RESOLVE_EXTENSIONS: [&str; 5] = ["", ".ts", ".tsx", ".js", ".mjs"];

/// Normalize a path to forward-slash form with `.` and `..` resolved
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let raw = path.as_ref().to_string_lossy().replace('\\', "/");
    let absolute = raw.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        PathBuf::from(format!("/{}", joined))
    } else if joined.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(joined)
    }
}

/// Join `path` onto `base` unless it is already absolute, then normalize
pub fn resolve_path(base: impl AsRef<Path>, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let raw = path.to_string_lossy();
    if raw.starts_with('/') || raw.starts_with('\\') || path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(base.as_ref().join(path))
    }
}

/// `path` relative to `base`, both normalized; `None` when `path` is outside `base`
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    normalize_path(path)
        .strip_prefix(normalize_path(base))
        .ok()
        .map(Path::to_path_buf)
}

/// True when `path` is `dir` or lies below it
pub fn is_within(path: &Path, dir: &Path) -> bool {
    path.starts_with(dir)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Declaration files are never program roots and never emitted
pub fn is_dts_file(path: &Path) -> bool {
    path.to_string_lossy().to_ascii_lowercase().ends_with(".d.ts")
}

pub fn is_script_file(path: &Path) -> bool {
    !is_dts_file(path)
        && extension(path).is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_style_file(path: &Path) -> bool {
    extension(path).is_some_and(|ext| STYLE_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_html_file(path: &Path) -> bool {
    extension(path).is_some_and(|ext| ext == "html" || ext == "htm")
}

/// Replace a script extension with `.js`
pub fn to_js_path(path: &Path) -> PathBuf {
    path.with_extension("js")
}
