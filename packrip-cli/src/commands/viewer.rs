use crate::config::CliContext;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use packrip_core::{CollectionLedger, Item};

#[derive(Subcommand)]
pub enum ViewerCommands {
    /// Show a viewer's collection
    Show {
        /// Viewer id
        viewer: String,
    },
    /// Grant a specific card to a viewer
    Give {
        /// Viewer id
        viewer: String,
        /// Card name
        name: String,
        /// Card rarity
        #[arg(short, long)]
        rarity: String,
        /// Card price
        #[arg(short, long, default_value_t = 0.0)]
        price: f64,
    },
    /// Top collections by total value
    Leaderboard {
        /// Number of entries
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
}

pub async fn handle_viewer_command(cmd: ViewerCommands, ctx: &CliContext) -> anyhow::Result<()> {
    let channel_id = ctx.channel_id()?;

    match cmd {
        ViewerCommands::Show { viewer } => {
            let record = ctx.ledger.get(channel_id, &viewer).await?;

            if record.items.is_empty() {
                println!("'{}' has not ripped any cards yet.", viewer);
                return Ok(());
            }

            println!("Collection for '{}':", viewer);
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Card", "Rarity", "Price"]);
            for item in &record.items {
                table.add_row(vec![
                    item.name.clone(),
                    item.rarity.clone(),
                    format!("{:.2}", item.price_value()),
                ]);
            }
            println!("{}", table);
            println!("  Cards: {}", record.card_count());
            println!("  Total value: {:.2}", record.total_value);
        }

        ViewerCommands::Give {
            viewer,
            name,
            rarity,
            price,
        } => {
            let item = Item::new(name, rarity, price);
            let record = ctx.ledger.append(channel_id, &viewer, &item).await?;
            tracing::info!("Granted {} to {} in {}", item.name, viewer, channel_id);

            println!("Gave '{}' ({}) to '{}'", item.name, item.rarity, viewer);
            println!("  Cards: {}", record.card_count());
            println!("  Total value: {:.2}", record.total_value);
        }

        ViewerCommands::Leaderboard { limit } => {
            let entries = ctx.ledger.top_n(channel_id, limit).await?;

            if entries.is_empty() {
                println!("No collections yet for channel '{}'.", channel_id);
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["#", "Viewer", "Cards", "Total value"]);
            for (idx, entry) in entries.iter().enumerate() {
                table.add_row(vec![
                    (idx + 1).to_string(),
                    entry.viewer_id.clone(),
                    entry.card_count.to_string(),
                    format!("{:.2}", entry.total_value),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
