use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};

use kiln::presentation::BuildResultRenderer;
use kiln::Compiler;

use super::UiContext;

pub fn cmd_watch(compiler: &Compiler, ui: &UiContext) -> Result<i32> {
    let renderer: Arc<dyn BuildResultRenderer> = Arc::from(ui.renderer(compiler));
    compiler.on_any(move |event| {
        // stdout going away must not take the watcher down
        let _ = renderer.render_event(event, &mut io::stdout().lock());
    });

    let watcher = compiler.create_watcher();
    let handle = watcher.handle();
    ctrlc::set_handler(move || handle.close(0)).context("failed to install Ctrl+C handler")?;

    if !ui.json {
        println!(
            "Watching {} (Ctrl+C to stop)",
            compiler.config().src_dir.display()
        );
    }

    let closed = watcher.start()?;
    compiler.destroy();
    Ok(closed.exit_code)
}
