//! Canteen, store, and academy purchases.
//!
//! A refused purchase returns its reason as an error and leaves state
//! untouched.

use cubicle_types::{NpcId, ProjectId};
use tracing::debug;

use crate::catalog::{Store, StoreItem};
use crate::commands::Handled;
use crate::effects::clamp_player;
use crate::num::{ceil, pct_add, real, round2, trunc};
use crate::org;
use crate::turn::Turn;

const fn store_name(store: Store) -> &'static str {
    match store {
        Store::Meal => "canteen",
        Store::Shop => "company store",
        Store::Course => "academy",
    }
}

fn counter_key(store: Store, id: &str) -> String {
    format!("{}:{id}", store.key_prefix())
}

/// Why a purchase did not go through.
fn refusal(turn: &Turn<'_>, store: Store, item: &StoreItem) -> Option<String> {
    let player = &turn.state.player;
    if player.level < item.min_level {
        return Some(format!(
            "{} unlocks at {}. You are {}.",
            item.name, item.min_level, player.level
        ));
    }
    if let Some(limit) = item.limit.filter(|l| *l > 0) {
        let used = player
            .purchases
            .get(&counter_key(store, &item.id))
            .copied()
            .unwrap_or(0);
        if used >= limit {
            return Some(format!(
                "{} is limited to {limit} per career and you have used them all.",
                item.name
            ));
        }
    }
    match store {
        Store::Course if player.money < item.cost || player.energy < item.energy_cost => {
            Some(format!(
                "Not enough resources for {}: it needs {} money and {} energy.",
                item.name, item.cost, item.energy_cost
            ))
        }
        Store::Meal | Store::Shop if player.money < item.cost => Some(format!(
            "Not enough money for {} (costs {}).",
            item.name, item.cost
        )),
        _ => None,
    }
}

/// Buy `id` from `store`. A refusal carries the reason.
pub fn buy(turn: &mut Turn<'_>, store: Store, id: &str) -> Handled {
    let catalog = turn.catalog;
    let Some(item) = catalog.item(store, id) else {
        return Err(format!("The {} has nothing called {id}.", store_name(store)));
    };
    if let Some(reason) = refusal(turn, store, item) {
        debug!(store = store.key_prefix(), item = id, "purchase refused");
        return Err(reason);
    }

    let mut parts = Vec::new();
    let player = &mut turn.state.player;
    player.money = player.money.saturating_sub(item.cost);
    let key = counter_key(store, &item.id);
    let count = player.purchases.entry(key).or_insert(0);
    *count = count.saturating_add(1);

    let body = match (store, item.id.as_str()) {
        (Store::Shop, "gift") => gift(turn, item.cost),
        (Store::Shop, "gpu") => {
            let player = &mut turn.state.player;
            player.gear.gpu = player.gear.gpu.saturating_add(1);
            player.hard_skill = player.hard_skill.saturating_add(3);
            format!(
                "{} Hard skill +3, GPU level +1, money -{}.",
                item.desc, item.cost
            )
        }
        (Store::Shop, "monitor") => {
            let player = &mut turn.state.player;
            player.gear.monitor = player.gear.monitor.saturating_add(1);
            player.mood = pct_add(player.mood, 5);
            format!(
                "{} Mood +5, monitor level +1, money -{}.",
                item.desc, item.cost
            )
        }
        (Store::Shop, "chair") => {
            let player = &mut turn.state.player;
            player.gear.chair = player.gear.chair.saturating_add(1);
            player.max_energy = player.max_energy.saturating_add(10);
            player.energy = player.energy.saturating_add(10).min(player.max_energy);
            format!(
                "{} Max energy +10, energy +10, chair level +1, money -{}.",
                item.desc, item.cost
            )
        }
        _ => {
            apply_deltas(turn, item, &mut parts);
            if item.learning_rate_delta > 0.0 && turn.chance(item.learning_rate_chance) {
                let player = &mut turn.state.player;
                player.learning_rate = round2(player.learning_rate + item.learning_rate_delta);
                parts.push(format!("learning rate +{:.2}x", item.learning_rate_delta));
            }
            describe(item, &parts)
        }
    };
    clamp_player(&mut turn.state.player);
    debug!(store = store.key_prefix(), item = id, cost = item.cost, "purchase completed");
    Ok(body)
}

fn apply_deltas(turn: &mut Turn<'_>, item: &StoreItem, parts: &mut Vec<String>) {
    let player = &mut turn.state.player;
    if item.energy_cost != 0 {
        player.energy = player.energy.saturating_sub(item.energy_cost);
    }
    if item.energy != 0 {
        player.energy = player.energy.saturating_add(item.energy).min(player.max_energy);
        parts.push(format!("energy +{}", item.energy));
    }
    if item.mood != 0 {
        player.mood = pct_add(player.mood, item.mood);
        parts.push(format!("mood {:+}", item.mood));
    }
    if item.hard_skill != 0 {
        player.hard_skill = player.hard_skill.saturating_add(item.hard_skill);
        parts.push(format!("hard skill +{}", item.hard_skill));
    }
    if item.soft_skill != 0 {
        player.soft_skill = player.soft_skill.saturating_add(item.soft_skill);
        parts.push(format!("soft skill +{}", item.soft_skill));
    }
    if item.political_capital != 0 {
        player.political_capital = player
            .political_capital
            .saturating_add(item.political_capital)
            .max(0);
        parts.push(format!("political capital +{}", item.political_capital));
    }
    if item.energy_cost != 0 {
        parts.push(format!("energy -{}", item.energy_cost));
    }
    if item.cost != 0 {
        parts.push(format!("money -{}", item.cost));
    }
}

fn describe(item: &StoreItem, parts: &[String]) -> String {
    let base = if item.desc.is_empty() {
        format!("You buy {}.", item.name)
    } else {
        item.desc.clone()
    };
    if parts.is_empty() {
        base
    } else {
        format!("{base} {}.", parts.join(", "))
    }
}

/// Trust gained from a gift, before the DM bonus.
pub fn gift_trust(soft_skill: i64) -> i64 {
    trunc(5.0 + real(soft_skill) / 20.0).clamp(5, 15)
}

fn gift(turn: &mut Turn<'_>, cost: i64) -> String {
    let dm_target = turn
        .channel
        .direct_npc()
        .filter(|id| turn.state.npcs.get(*id).is_some_and(|n| n.is_employed()))
        .cloned();
    let target = match dm_target.clone() {
        Some(id) => Some(id),
        None => {
            let current = turn.state.player.current_project.clone();
            let colleagues: Vec<NpcId> = turn
                .state
                .npcs
                .values()
                .filter(|n| {
                    n.is_employed()
                        && (n.project == current
                            || n.project.as_str() == ProjectId::GENERAL
                            || n.project.as_str() == ProjectId::HR)
                })
                .map(|n| n.id.clone())
                .collect();
            turn.pick(&colleagues)
        }
    };
    let Some(target) = target else {
        return format!("You buy a limited-edition figure but find nobody to give it to. Money -{cost}.");
    };

    let mut trust_gain = gift_trust(turn.state.player.soft_skill);
    if dm_target.as_ref() == Some(&target) {
        trust_gain = trunc(real(trust_gain) * 1.2).min(18);
    }
    let Some(npc) = turn.state.npcs.get_mut(&target) else {
        return format!("You buy a limited-edition figure. Money -{cost}.");
    };
    npc.trust = pct_add(npc.trust, trust_gain);
    let name = npc.name.clone();
    let executive = org::is_executive(npc);
    org::mark_known(turn.state, &target);

    let mut line = format!("You give a limited-edition figure to {name}. Money -{cost}, trust +{trust_gain}.");
    if executive {
        let pc_gain = ceil(real(trust_gain) / 3.0).max(1);
        let player = &mut turn.state.player;
        player.political_capital = player.political_capital.saturating_add(pc_gain);
        line.push_str(&format!(" Political capital +{pc_gain}."));
    }
    line
}
