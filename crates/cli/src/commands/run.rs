use anyhow::{bail, Result};
use colored::*;
use kbox_core::{Kbox, RunOutcome};

pub async fn execute(kbox: &Kbox, argv: &[String]) -> Result<()> {
    let target = argv.join(" ");
    println!("{} {}", "Running task".bold(), target.cyan());
    println!();

    match kbox
        .run(argv)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run task: {}", e))?
    {
        RunOutcome::Ran { task } => {
            println!();
            println!(
                "{} {}",
                "✓".green().bold(),
                format!("Task {task} completed").green().bold()
            );
        }
        RunOutcome::Menu(menu) => print!("{menu}"),
        RunOutcome::NotFound => bail!("No task found for '{}'", target),
    }

    Ok(())
}
