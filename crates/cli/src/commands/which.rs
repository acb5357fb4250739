use anyhow::Result;
use colored::*;
use kbox_core::plugin::uses_app;
use kbox_core::Kbox;

pub fn execute(kbox: &Kbox, plugin: &str) -> Result<()> {
    let roots = kbox.global_config().plugin_dirs();
    let path = kbox.loader().resolve(plugin, &roots)?;
    let raw = kbox.loader().load_raw(plugin, &roots)?;

    let kind = if uses_app(raw.as_ref()) {
        "app plugin".green()
    } else {
        "global plugin".blue()
    };
    println!("{} {} {}", plugin.cyan().bold(), path.display(), format!("[{kind}]").dimmed());
    Ok(())
}
