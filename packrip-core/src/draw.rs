//! Weighted rarity draws.
//!
//! Tiers that currently have cards are weighted by their position on the
//! ladder: with `N` available tiers the i-th (1-based) gets `(N - i + 1)^2`.
//! Dropping an empty tier therefore rescales the remaining weights without
//! changing their order.

use crate::collection::Collection;
use crate::error::{PackripError, Result};
use crate::types::{DrawResult, Item, RarityTier};
use rand::Rng;
use std::collections::HashMap;

/// Available tiers paired with their draw weight, most common first.
pub fn tier_weights<'a>(
    rarities: &'a [RarityTier],
    pool: &HashMap<String, Vec<Item>>,
) -> Vec<(&'a RarityTier, u64)> {
    let valid: Vec<&RarityTier> = rarities
        .iter()
        .filter(|tier| pool.get(&tier.name).map_or(false, |bucket| !bucket.is_empty()))
        .collect();

    let n = valid.len() as u64;
    valid
        .into_iter()
        .enumerate()
        .map(|(idx, tier)| {
            let rank = idx as u64 + 1;
            let step = n - rank + 1;
            (tier, step * step)
        })
        .collect()
}

/// Draw one rarity and then one card from that rarity's bucket.
pub fn draw<'a, R: Rng + ?Sized>(
    rarities: &'a [RarityTier],
    pool: &'a HashMap<String, Vec<Item>>,
    rng: &mut R,
) -> Result<(&'a RarityTier, &'a Item)> {
    let weighted = tier_weights(rarities, pool);
    let (last_tier, _) = *weighted.last().ok_or(PackripError::EmptyPool)?;

    let total_weight: u64 = weighted.iter().map(|(_, w)| w).sum();
    let roll = rng.gen::<f64>() * total_weight as f64;

    let mut cumulative = 0.0;
    let mut selected = last_tier;
    for (tier, weight) in &weighted {
        cumulative += *weight as f64;
        if roll <= cumulative {
            selected = *tier;
            break;
        }
    }

    let bucket = pool.get(&selected.name).ok_or(PackripError::EmptyPool)?;
    let item = &bucket[rng.gen_range(0..bucket.len())];

    Ok((selected, item))
}

/// Draw a card for `viewer_id` from a configured collection.
pub fn draw_from_collection<R: Rng + ?Sized>(
    collection: &Collection,
    viewer_id: &str,
    rng: &mut R,
) -> Result<DrawResult> {
    let ladder = collection.ladder();
    let pools = collection.pools();
    let (tier, item) = draw(&ladder, &pools, rng)?;

    Ok(DrawResult {
        viewer_id: viewer_id.to_string(),
        rarity: tier.name.clone(),
        item: item.clone(),
    })
}
