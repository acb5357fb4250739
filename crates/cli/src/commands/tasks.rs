use anyhow::{bail, Result};
use colored::*;
use kbox_core::task_tree::NodeId;
use kbox_core::Kbox;

/// Node the menu starts from. A non-empty path has to name a group.
fn menu_start(kbox: &Kbox, path: &[String]) -> Result<Option<NodeId>> {
    if path.is_empty() {
        return Ok(None);
    }
    match kbox.tasks().get_task(path.to_vec(), None)? {
        Some(found) if found.args.is_empty() && !found.is_leaf => Ok(Some(found.node)),
        _ => bail!("No task group named '{}'", path.join(" ")),
    }
}

pub fn execute(kbox: &Kbox, path: &[String]) -> Result<()> {
    let start = menu_start(kbox, path)?;

    let count = kbox.tasks().count()?;
    if count == 0 {
        println!("  {}", "No tasks registered".dimmed());
        return Ok(());
    }

    print!("{}", kbox.tasks().pretty_print(start)?);
    println!();
    println!("{} {}", count.to_string().bold(), "tasks available".dimmed());
    Ok(())
}
