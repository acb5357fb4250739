use colored::*;
use kbox_core::PluginReport;

pub mod run;
pub mod schema;
pub mod tasks;
pub mod which;

/// Print plugins that failed to load. Loading carries on without them.
pub fn report_plugins(report: &PluginReport) {
    for (plugin, err) in &report.failed {
        eprintln!("{} {} {}", "warning:".yellow().bold(), plugin.cyan(), err);
    }
}
