//! Domain Services
//!
//! Pure functions over module text and domain entities. No I/O.

pub mod decorators;
pub mod source_scan;

pub use decorators::{decorators_to_static, find_components, DecoratedComponent};
pub use source_scan::{
    exported_names, import_refs, import_specifiers, is_relative_specifier,
    parse_component_metas, render_cmp_meta_getter, tag_references, ImportRef,
};
