//! Output Rendering
//!
//! Turns build results and watch events into console lines.

use std::io::{self, Write};
use std::path::Path;

use crate::application::CompilerEvent;
use crate::domain::entities::{BuildResults, DiagnosticLevel};

/// Output format for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Icons for output rendering
struct Icons {
    check: &'static str,
    cross: &'static str,
    write: &'static str,
    warn: &'static str,
    change: &'static str,
}

impl Icons {
    fn unicode() -> Self {
        Self {
            check: "✓",
            cross: "✗",
            write: "→",
            warn: "⚠",
            change: "•",
        }
    }

    fn ascii() -> Self {
        Self {
            check: "[OK]",
            cross: "[FAIL]",
            write: "->",
            warn: "[!]",
            change: "*",
        }
    }
}

fn paint(text: &str, code: &str, color: bool) -> String {
    if color {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Trait for rendering build results
pub trait BuildResultRenderer: Send + Sync {
    fn render(&self, results: &BuildResults, out: &mut dyn Write) -> io::Result<()>;

    /// One line for a watch event, if the event is worth showing
    fn render_event(&self, event: &CompilerEvent, out: &mut dyn Write) -> io::Result<()>;
}

/// Text renderer for build results
pub struct TextRenderer {
    /// Whether to use colors
    pub color: bool,
    /// Whether to use unicode
    pub unicode: bool,
    /// Verbosity level
    pub verbose: u8,
    /// Paths are shown relative to this directory
    pub root: Option<std::path::PathBuf>,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            color: true,
            unicode: true,
            verbose: 0,
            root: None,
        }
    }
}

impl TextRenderer {
    fn icons(&self) -> Icons {
        if self.unicode {
            Icons::unicode()
        } else {
            Icons::ascii()
        }
    }

    fn display_path(&self, path: &Path) -> String {
        self.root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

impl BuildResultRenderer for TextRenderer {
    fn render(&self, results: &BuildResults, out: &mut dyn Write) -> io::Result<()> {
        let icons = self.icons();
        let label = if results.is_rebuild { "Rebuild" } else { "Build" };

        if results.no_change {
            writeln!(
                out,
                "{} {} #{}: no changes",
                paint(icons.check, "32", self.color),
                label,
                results.build_id
            )?;
            return Ok(());
        }

        for diagnostic in &results.diagnostics {
            let (icon, code) = match diagnostic.level {
                DiagnosticLevel::Error => (icons.cross, "31"),
                DiagnosticLevel::Warn => (icons.warn, "33"),
                DiagnosticLevel::Info if self.verbose == 0 => continue,
                DiagnosticLevel::Info => (icons.change, "2"),
            };
            write!(out, "  {} {}: {}", paint(icon, code, self.color), diagnostic.header, diagnostic.message)?;
            if let Some(file) = &diagnostic.file {
                write!(out, " ({}", self.display_path(file))?;
                if let (Some(line), Some(column)) = (diagnostic.line, diagnostic.column) {
                    write!(out, ":{}:{}", line, column)?;
                }
                write!(out, ")")?;
            }
            writeln!(out)?;
        }

        if results.has_error {
            writeln!(
                out,
                "{} {} #{} failed with {} error(s) in {} ms",
                paint(icons.cross, "31", self.color),
                label,
                results.build_id,
                results.errors().count(),
                results.duration_ms
            )?;
        } else {
            writeln!(
                out,
                "{} {} #{} finished in {} ms",
                paint(icons.check, "32", self.color),
                label,
                results.build_id,
                results.duration_ms
            )?;
        }

        for output in &results.outputs {
            writeln!(
                out,
                "  {} {} ({} files)",
                output.target_type.display_name(),
                self.display_path(&output.dir),
                output.files.len()
            )?;
            if self.verbose > 0 {
                for file in &output.files {
                    writeln!(out, "    {} {}", icons.write, self.display_path(file))?;
                }
            }
        }
        Ok(())
    }

    fn render_event(&self, event: &CompilerEvent, out: &mut dyn Write) -> io::Result<()> {
        let icons = self.icons();
        let line = match event {
            CompilerEvent::FileAdd { path } => format!("added {}", self.display_path(path)),
            CompilerEvent::FileUpdate { path } => format!("changed {}", self.display_path(path)),
            CompilerEvent::FileDelete { path } => format!("deleted {}", self.display_path(path)),
            CompilerEvent::DirAdd { path } if self.verbose > 0 => {
                format!("added dir {}", self.display_path(path))
            }
            CompilerEvent::DirDelete { path } if self.verbose > 0 => {
                format!("deleted dir {}", self.display_path(path))
            }
            CompilerEvent::BuildLog { message, .. } if self.verbose > 0 => message.clone(),
            CompilerEvent::BuildFinish { results } | CompilerEvent::BuildNoChange { results } => {
                return self.render(results, out);
            }
            _ => return Ok(()),
        };
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        writeln!(out, "[{}] {} {}", timestamp, paint(icons.change, "36", self.color), line)
    }
}

/// JSON renderer for build results
pub struct JsonRenderer;

impl BuildResultRenderer for JsonRenderer {
    fn render(&self, results: &BuildResults, out: &mut dyn Write) -> io::Result<()> {
        let json = serde_json::json!({
            "event": "buildSummary",
            "command": "kiln",
            "success": !results.has_error,
            "buildId": results.build_id,
            "isRebuild": results.is_rebuild,
            "noChange": results.no_change,
            "durationMs": results.duration_ms,
            "errors": results.errors().count(),
            "outputs": results.outputs,
        });
        writeln!(out, "{}", json)
    }

    fn render_event(&self, event: &CompilerEvent, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", event.to_json())
    }
}

/// Create a renderer based on format
pub fn create_renderer(
    format: OutputFormat,
    color: bool,
    unicode: bool,
    verbose: u8,
    root: Option<&Path>,
) -> Box<dyn BuildResultRenderer> {
    match format {
        OutputFormat::Text => Box::new(TextRenderer {
            color,
            unicode,
            verbose,
            root: root.map(Path::to_path_buf),
        }),
        OutputFormat::Json => Box::new(JsonRenderer),
    }
}
