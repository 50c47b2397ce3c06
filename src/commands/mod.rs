pub mod build;
pub mod watch;

use is_terminal::IsTerminal;

use kiln::domain::entities::Diagnostic;
use kiln::presentation::{create_renderer, BuildResultRenderer, OutputFormat};
use kiln::Compiler;

use crate::cli::ColorWhen;

/// How the binary talks to the user
pub struct UiContext {
    pub json: bool,
    pub verbose: u8,
    pub color: bool,
}

impl UiContext {
    pub fn new(json: bool, verbose: u8, color: Option<ColorWhen>) -> Self {
        let color = match color {
            Some(ColorWhen::Never) => false,
            Some(ColorWhen::Always) => true,
            Some(ColorWhen::Auto) | None => {
                std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
            }
        };
        Self {
            json,
            verbose,
            color,
        }
    }

    pub fn renderer(&self, compiler: &Compiler) -> Box<dyn BuildResultRenderer> {
        let format = if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        };
        create_renderer(
            format,
            self.color,
            self.color,
            self.verbose,
            Some(&compiler.config().root_dir),
        )
    }

    /// Config warnings go to stderr so NDJSON on stdout stays clean
    pub fn print_config_warnings(&self, diagnostics: &[Diagnostic]) {
        for diagnostic in diagnostics {
            eprintln!("{}", diagnostic);
        }
    }
}
