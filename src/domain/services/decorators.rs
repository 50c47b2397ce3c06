//! Component decorator extraction
//!
//! Finds `@Component({...})` classes and their member decorators
//! (`@Prop`, `@State`, `@Event`, `@Method`, `@Listen`) in source text and
//! rewrites them into the static getters the rest of the pipeline reads.

use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use crate::domain::entities::ComponentMeta;

use super::source_scan::render_cmp_meta_getter;

lazy_static! {
    static ref COMPONENT_RE: Regex = Regex::new(r"@Component\s*\(").unwrap();
    static ref CLASS_RE: Regex = Regex::new(r"\bclass\s+([A-Za-z_$][\w$]*)").unwrap();
    static ref TAG_RE: Regex = Regex::new(r#"\btag\s*:\s*['"]([^'"]*)['"]"#).unwrap();
    static ref SHADOW_RE: Regex = Regex::new(r"\bshadow\s*:\s*true\b").unwrap();
    static ref STYLE_URL_RE: Regex = Regex::new(r#"\bstyleUrl\s*:\s*['"]([^'"]+)['"]"#).unwrap();
    static ref STYLE_URLS_RE: Regex = Regex::new(r"\bstyleUrls\s*:\s*\[([^\]]*)\]").unwrap();
    static ref QUOTED_RE: Regex = Regex::new(r#"['"]([^'"]+)['"]"#).unwrap();
    static ref MEMBER_RE: Regex = Regex::new(
        r"@(Prop|State|Event|Method|Listen)\s*\(([^)]*)\)\s*(?:(?:public|private|protected|readonly|static|async)\s+)*([A-Za-z_$][\w$]*)"
    )
    .unwrap();
}

/// One decorated component class found in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedComponent {
    pub meta: ComponentMeta,
    /// Byte range of the `@Component(...)` decorator
    pub decorator: Range<usize>,
    /// Offset just past the `{` opening the class body
    pub body_start: usize,
}

/// Member decorator occurrence; `decorator` covers `@Name(...)` only
#[derive(Debug, Clone, PartialEq, Eq)]
struct MemberDecorator {
    kind: String,
    args: String,
    name: String,
    decorator: Range<usize>,
}

/// Every `@Component` class in `code`, in source order
pub fn find_components(code: &str) -> Vec<DecoratedComponent> {
    let mut components = Vec::new();

    for m in COMPONENT_RE.find_iter(code) {
        let open = m.end() - 1;
        let Some(close) = matching_paren(code, open) else {
            continue;
        };
        let args = &code[open + 1..close];
        let rest = &code[close + 1..];
        let Some(class) = CLASS_RE.captures(rest) else {
            continue;
        };
        let class_end = close + 1 + class.get(0).map(|c| c.end()).unwrap_or(0);
        let Some(brace) = code[class_end..].find('{') else {
            continue;
        };

        let mut meta = ComponentMeta {
            tag_name: capture(&TAG_RE, args).unwrap_or_default(),
            class_name: class[1].to_string(),
            shadow: SHADOW_RE.is_match(args),
            ..ComponentMeta::default()
        };
        if let Some(url) = capture(&STYLE_URL_RE, args) {
            meta.style_urls.push(url);
        }
        if let Some(list) = capture(&STYLE_URLS_RE, args) {
            meta.style_urls.extend(
                QUOTED_RE
                    .captures_iter(&list)
                    .map(|c| c[1].to_string()),
            );
        }

        components.push(DecoratedComponent {
            meta,
            decorator: m.start()..close + 1,
            body_start: class_end + brace + 1,
        });
    }

    for member in member_decorators(code) {
        let Some(owner) = components
            .iter_mut()
            .rev()
            .find(|c| c.body_start <= member.decorator.start)
        else {
            continue;
        };
        let meta = &mut owner.meta;
        match member.kind.as_str() {
            "Prop" => meta.props.push(member.name),
            "State" => meta.states.push(member.name),
            "Event" => meta.events.push(member.name),
            "Method" => meta.methods.push(member.name),
            _ => {
                let event = capture(&QUOTED_RE, &member.args).unwrap_or(member.name);
                meta.listeners.push(event);
            }
        }
    }

    components
}

/// Replace decorators with `static get is()` / `static get cmpMeta()` getters
pub fn decorators_to_static(code: &str) -> Result<String, serde_json::Error> {
    let components = find_components(code);
    if components.is_empty() {
        return Ok(code.to_string());
    }

    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    for component in &components {
        edits.push((component.decorator.clone(), String::new()));
        let getters = format!(
            "\n  static get is() {{ return \"{}\"; }}\n  {}",
            component.meta.tag_name,
            render_cmp_meta_getter(&component.meta)?
        );
        edits.push((component.body_start..component.body_start, getters));
    }
    for member in member_decorators(code) {
        edits.push((member.decorator, String::new()));
    }

    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(code.len() + 256);
    let mut cursor = 0;
    for (range, replacement) in edits {
        if range.start < cursor {
            continue;
        }
        out.push_str(&code[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&code[cursor..]);
    Ok(out)
}

fn member_decorators(code: &str) -> Vec<MemberDecorator> {
    MEMBER_RE
        .captures_iter(code)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let args = caps.get(2)?;
            Some(MemberDecorator {
                kind: caps[1].to_string(),
                args: args.as_str().to_string(),
                name: caps[3].to_string(),
                // up to and including the closing paren
                decorator: whole.start()..args.end() + 1,
            })
        })
        .collect()
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|c| c[1].to_string())
}

fn matching_paren(code: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    for (i, &b) in code.as_bytes().iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
