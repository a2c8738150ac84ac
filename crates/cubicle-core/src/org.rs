//! Org chart queries and the one-time relation seeding pass.

use std::collections::BTreeMap;

use cubicle_types::{GameState, Level, Npc, NpcId, ProjectId, RelationLabel};
use rand::Rng;
use rand::seq::IndexedRandom;

/// How many executives count as leadership for trust checks.
pub const TOP_EXECUTIVE_COUNT: usize = 5;

const EXECUTIVE_KEYWORDS: &[&str] = &[
    "总裁", "CTO", "创始人", "负责人", "Head", "Founder", "President", "Lead",
];
const LEAD_KEYWORDS: &[&str] = &["负责人", "Lead"];
const TOUGH_KEYWORDS: &[&str] = &["毒舌", "强硬", "零容忍", "harsh", "strict", "zero-tolerance"];

fn mentions_any(npc: &Npc, words: &[&str]) -> bool {
    words
        .iter()
        .any(|w| npc.name.contains(w) || npc.role.contains(w) || npc.traits.contains(w))
}

/// Executive rank or an executive title.
pub fn is_executive(npc: &Npc) -> bool {
    npc.level >= Level::P9 || mentions_any(npc, EXECUTIVE_KEYWORDS)
}

/// The five employed executives with the highest level, then trust.
pub fn top_executives(state: &GameState) -> Vec<NpcId> {
    let mut execs: Vec<&Npc> = state
        .npcs
        .values()
        .filter(|n| n.is_employed() && is_executive(n))
        .collect();
    execs.sort_by(|a, b| (b.level, b.trust).cmp(&(a.level, a.trust)));
    execs
        .into_iter()
        .take(TOP_EXECUTIVE_COUNT)
        .map(|n| n.id.clone())
        .collect()
}

/// Highest-ranked employed NPC on `project`, favoring titled leads.
pub fn project_leader(state: &GameState, project: &ProjectId) -> Option<NpcId> {
    state
        .npcs
        .values()
        .filter(|n| n.is_employed() && &n.project == project)
        .map(|n| {
            let mut score = i32::from(n.level.number());
            if mentions_any(n, LEAD_KEYWORDS) {
                score = score.saturating_add(2);
            }
            if n.level >= Level::P8 {
                score = score.saturating_add(1);
            }
            (score, &n.id)
        })
        .max()
        .map(|(_, id)| id.clone())
}

/// Best-fitting line manager on `project` for a player at `player_level`.
///
/// Prefers a mid-level NPC one rank above the player. Falls back to the
/// project leader.
pub fn direct_manager(
    state: &GameState,
    project: &ProjectId,
    player_level: Level,
) -> Option<NpcId> {
    let wanted = i32::from(player_level.number()).saturating_add(1);
    state
        .npcs
        .values()
        .filter(|n| n.is_employed() && &n.project == project)
        .map(|n| {
            let level = i32::from(n.level.number());
            let mut score = 0_i32.saturating_sub(level.saturating_sub(wanted).abs());
            if n.level >= Level::P9 {
                score = score.saturating_sub(3);
            }
            if mentions_any(n, LEAD_KEYWORDS) {
                score = score.saturating_sub(2);
            }
            if n.level < player_level {
                score = score.saturating_sub(2);
            }
            (score, &n.id)
        })
        .max()
        .map(|(_, id)| id.clone())
        .or_else(|| project_leader(state, project))
}

/// Flag an NPC as met. Unknown ids are ignored.
pub fn mark_known(state: &mut GameState, id: &NpcId) {
    let Some(npc) = state.npcs.get_mut(id) else {
        return;
    };
    npc.known = true;
    if !state.known_npcs.contains(id) {
        state.known_npcs.push(id.clone());
    }
}

/// Whether a pair should start out as rivals.
pub fn should_be_rivals(a: &Npc, b: &Npc) -> bool {
    let tough = mentions_tough(a) || mentions_tough(b);
    let same_project = a.project == b.project && a.project.as_str() != ProjectId::GENERAL;
    let cross_role = (a.role.contains("Dev") && b.role.contains("Product"))
        || (a.role.contains("Product") && b.role.contains("Dev"));
    let senior = a.level >= Level::P7 || b.level >= Level::P7;
    same_project && tough && (cross_role || senior)
}

fn mentions_tough(npc: &Npc) -> bool {
    let traits = npc.traits.to_lowercase();
    TOUGH_KEYWORDS.iter().any(|k| traits.contains(k))
}

/// Seed symmetric relations within each project group.
///
/// Groups of two or more draw `max(1, n / 4)` random pairs; pairs that
/// already exist are skipped.
pub fn seed_relations<R: Rng + ?Sized>(npcs: &mut BTreeMap<NpcId, Npc>, rng: &mut R) {
    let mut groups: BTreeMap<ProjectId, Vec<NpcId>> = BTreeMap::new();
    for npc in npcs.values() {
        groups.entry(npc.project.clone()).or_default().push(npc.id.clone());
    }

    for ids in groups.values() {
        if ids.len() < 2 {
            continue;
        }
        let draws = (ids.len() / 4).max(1);
        for _ in 0..draws {
            let mut pair = ids.choose_multiple(rng, 2);
            let (Some(a_id), Some(b_id)) = (pair.next(), pair.next()) else {
                continue;
            };
            link(npcs, a_id, b_id);
        }
    }
}

fn link(npcs: &mut BTreeMap<NpcId, Npc>, a_id: &NpcId, b_id: &NpcId) {
    let (Some(a), Some(b)) = (npcs.get(a_id), npcs.get(b_id)) else {
        return;
    };
    if a.relations.contains_key(b_id) {
        return;
    }
    let label = if should_be_rivals(a, b) {
        RelationLabel::Rival
    } else {
        RelationLabel::Ally
    };
    if let Some(a) = npcs.get_mut(a_id) {
        a.relations.insert(b_id.clone(), label);
    }
    if let Some(b) = npcs.get_mut(b_id) {
        b.relations.insert(a_id.clone(), label);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::catalog::Catalog;
    use crate::testkit;

    #[test]
    fn relations_are_symmetric_after_seeding() {
        let catalog = Catalog::builtin().unwrap();
        for seed in 0..20 {
            let mut npcs: BTreeMap<NpcId, Npc> = catalog
                .npcs
                .iter()
                .map(|t| (t.id.clone(), t.instantiate()))
                .collect();
            let mut rng = StdRng::seed_from_u64(seed);
            seed_relations(&mut npcs, &mut rng);
            assert!(npcs.values().any(|n| !n.relations.is_empty()));
            for npc in npcs.values() {
                for (other, label) in &npc.relations {
                    let back = npcs.get(other).unwrap().relations.get(&npc.id);
                    assert_eq!(back, Some(label), "{} -> {}", npc.id, other);
                }
            }
        }
    }

    #[test]
    fn tough_senior_pair_on_same_project_are_rivals() {
        let state = testkit::state();
        let lead = state.npcs.get(&NpcId::from("NPC_0010")).unwrap();
        let dev = state.npcs.get(&NpcId::from("NPC_0011")).unwrap();
        assert!(should_be_rivals(lead, dev));

        let ceo = state.npcs.get(&NpcId::from("NPC_0001")).unwrap();
        let cto = state.npcs.get(&NpcId::from("NPC_0002")).unwrap();
        assert!(!should_be_rivals(ceo, cto), "General is not a named project");
    }

    #[test]
    fn founders_top_the_executive_list() {
        let state = testkit::state();
        let execs = top_executives(&state);
        assert!(execs.len() <= TOP_EXECUTIVE_COUNT);
        assert_eq!(execs.first(), Some(&NpcId::from("NPC_0001")));
        assert!(execs.contains(&NpcId::from("NPC_0001")));
        assert!(execs.contains(&NpcId::from("NPC_0002")));
    }

    #[test]
    fn genshin_leader_and_manager() {
        let state = testkit::state();
        let genshin = ProjectId::from("Genshin");
        assert_eq!(project_leader(&state, &genshin), Some(NpcId::from("NPC_0010")));
        let manager = direct_manager(&state, &genshin, Level::P5).unwrap();
        let npc = state.npcs.get(&manager).unwrap();
        assert!(npc.level < Level::P9);
        assert_ne!(manager, NpcId::from("NPC_0010"));
    }

    #[test]
    fn mark_known_is_idempotent() {
        let mut state = testkit::state();
        state.known_npcs.clear();
        let id = NpcId::from("NPC_0012");
        mark_known(&mut state, &id);
        mark_known(&mut state, &id);
        mark_known(&mut state, &NpcId::from("NPC_9999"));
        assert_eq!(state.known_npcs, vec![id.clone()]);
        assert!(state.npcs.get(&id).unwrap().known);
    }
}
