//! Publish history listing.

use console::style;

use crate::history::HistoryManager;

/// Maximum entries shown without a flag.
const DEFAULT_LIMIT: usize = 20;

/// Lists previously published episodes, most recent first.
///
/// # Errors
/// - If the data directory cannot be determined
/// - If the history database cannot be read
pub async fn handle_history() -> Result<(), anyhow::Error> {
    let data_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".local")
        .join("share")
        .join("castup");
    std::fs::create_dir_all(&data_dir)?;

    let mut history_manager = HistoryManager::new(&data_dir)?;
    let entries = history_manager.get_all_published()?;

    if entries.is_empty() {
        println!("No published episodes yet. Run 'castup' to publish one.");
        return Ok(());
    }

    println!();
    println!("{}", style("Published episodes").bold());
    println!();

    for entry in entries.iter().take(DEFAULT_LIMIT) {
        println!(
            "  {}  {}  [{}]",
            style(entry.published_at.format("%Y-%m-%d %H:%M")).dim(),
            entry.title,
            style(&entry.format).cyan()
        );
        println!("      {}", style(&entry.url).dim());
    }

    if entries.len() > DEFAULT_LIMIT {
        println!();
        println!(
            "  ({} older entries not shown)",
            entries.len() - DEFAULT_LIMIT
        );
    }
    println!();

    Ok(())
}
