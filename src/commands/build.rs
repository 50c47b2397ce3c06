use std::io;
use std::sync::Arc;

use anyhow::Result;

use kiln::infrastructure::JsonEventSink;
use kiln::Compiler;

use super::UiContext;

/// One build; exit code 1 when it produced an error-level diagnostic
pub fn cmd_build(compiler: &Compiler, ui: &UiContext) -> Result<i32> {
    let renderer = ui.renderer(compiler);
    if ui.json {
        Arc::new(JsonEventSink::stdout()).attach(compiler.context().events());
    }

    let results = compiler.build();
    renderer.render(&results, &mut io::stdout().lock())?;
    compiler.destroy();

    Ok(if results.has_error { 1 } else { 0 })
}
