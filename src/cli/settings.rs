use anyhow::Result;
use serde_json::Value;
use wattgrid_settings::SUPPORTED_PATHS;

use super::context::CliContext;
use super::output::{emit, OutputFormat};

pub fn cmd_settings(ctx: &CliContext) -> Result<()> {
    let snapshot = ctx.settings();
    if ctx.output() != OutputFormat::Human {
        return emit(ctx.output(), snapshot, |_| {});
    }

    let tree = serde_json::to_value(snapshot)?;
    match ctx.settings_path() {
        Some(path) => println!("Settings file: {}", path.display()),
        None => println!("Settings file: (none, builtin defaults)"),
    }
    println!("Revision: {}", snapshot.rev);
    println!();
    for path in SUPPORTED_PATHS {
        let pointer = format!("/{}", path.replace('.', "/"));
        let value = tree.pointer(&pointer).unwrap_or(&Value::Null).to_string();
        let source = snapshot
            .source_of(path)
            .map(|source| format!("{source:?}").to_lowercase())
            .unwrap_or_else(|| "unknown".to_string());
        println!("{path:<36} {value:<32} [{source}]");
    }
    Ok(())
}
