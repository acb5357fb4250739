use anyhow::Result;
use kbox_plugin_protocol::PluginManifest;

pub fn execute() -> Result<()> {
    let schema = schemars::schema_for!(PluginManifest);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
