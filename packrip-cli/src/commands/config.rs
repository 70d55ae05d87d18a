use crate::config::CliContext;
use anyhow::Context;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use packrip_core::{tier_weights, CollectionConfig, ConfigStore};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Replace the channel's collection config with a JSON file
    Sync {
        /// Path to the collection config JSON
        file: PathBuf,
    },
    /// Show the channel's collections and current drop rates
    Show,
}

pub async fn handle_config_command(cmd: ConfigCommands, ctx: &CliContext) -> anyhow::Result<()> {
    let channel_id = ctx.channel_id()?;

    match cmd {
        ConfigCommands::Sync { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let config = CollectionConfig::from_json(&raw)?;

            ctx.configs.save_config(channel_id, &config).await?;
            let active = config.active()?;

            println!("Config synced for channel '{}'", channel_id);
            println!("  Active collection: {}", active.id);
            println!("  Rarities: {}", active.rarities.len());
            println!("  Cards: {}", active.items.len());
        }

        ConfigCommands::Show => {
            let Some(config) = ctx.configs.load_config(channel_id).await? else {
                println!("No collection config for channel '{}'.", channel_id);
                println!("Sync one with: packrip config sync <file>");
                return Ok(());
            };

            println!("Channel: {}", channel_id);
            println!("Data directory: {}", ctx.data_dir.display());
            println!();

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Collection", "Rarities", "Cards", "Active"]);
            for collection in &config.collections {
                let active = config.default_collection_id.as_deref() == Some(collection.id.as_str());
                table.add_row(vec![
                    collection.id.clone(),
                    collection.rarities.len().to_string(),
                    collection.items.len().to_string(),
                    if active { "yes".to_string() } else { String::new() },
                ]);
            }
            println!("{}", table);

            let active = config.active()?;
            let ladder = active.ladder();
            let pools = active.pools();
            let weights = tier_weights(&ladder, &pools);
            let total: u64 = weights.iter().map(|(_, w)| w).sum();

            if total == 0 {
                println!("The active collection has no cards to draw.");
                return Ok(());
            }

            let mut rates = Table::new();
            rates.load_preset(UTF8_FULL);
            rates.set_header(vec!["Rarity", "Cards", "Weight", "Drop rate"]);
            for (tier, weight) in weights {
                let cards = pools.get(&tier.name).map_or(0, |p| p.len());
                rates.add_row(vec![
                    tier.name.clone(),
                    cards.to_string(),
                    weight.to_string(),
                    format!("{:.2}%", weight as f64 * 100.0 / total as f64),
                ]);
            }
            println!("{}", rates);
        }
    }

    Ok(())
}
