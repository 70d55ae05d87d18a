use crate::config::CliContext;
use packrip_core::rip_card;
use packrip_window::ResultBroadcaster;

pub async fn handle_rip_command(viewer: &str, ctx: &CliContext) -> anyhow::Result<()> {
    let channel_id = ctx.channel_id()?;
    ctx.service.validate()?;

    let award = rip_card(ctx.configs.as_ref(), ctx.ledger.as_ref(), channel_id, viewer).await?;

    println!(
        "'{}' ripped a {} card: {}",
        viewer, award.result.rarity, award.result.item.name
    );
    println!("  Cards: {}", award.record.card_count());
    println!("  Total value: {:.2}", award.record.total_value);

    if let Some(settings) = &ctx.service.broadcast {
        let broadcaster = ResultBroadcaster::from_settings(settings)?;
        if broadcaster.publish(channel_id, &award.result).await.is_err() {
            println!("  (overlay broadcast failed, see log)");
        }
    }

    Ok(())
}
