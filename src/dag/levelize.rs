// src/dag/levelize.rs

//! Dependency leveling.
//!
//! Assigns every entity a level such that each entity sits strictly above
//! every (internal) dependency. Used to order compile units and to print the
//! dependency tree.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::dag::graph::DependencyGraph;
use crate::errors::{GogoError, Result};

pub type Levels = BTreeMap<String, usize>;

/// Level every key of `deps`.
///
/// All entities start at level 0. For each level `L`, the pool is the set of
/// entities at `L` when the pass starts; an entity in the pool that depends on
/// another pool member moves to `L + 1`. Passing over a level without any
/// promotion ends the process.
///
/// A direct two-way dependency is reported as soon as it is seen. Longer
/// cycles keep promoting forever, so once the level exceeds the number of
/// entities the offending component is extracted from the graph and
/// reported instead.
pub fn levelize(deps: &BTreeMap<String, Vec<String>>) -> Result<Levels> {
    let graph = DependencyGraph::from_deps(deps);
    let mut levels: Levels = deps.keys().map(|k| (k.clone(), 0)).collect();
    let limit = levels.len();

    let mut curr_level = 0;
    loop {
        let pool: BTreeSet<&str> = levels
            .iter()
            .filter(|(_, lvl)| **lvl == curr_level)
            .map(|(name, _)| name.as_str())
            .collect();
        debug!(level = curr_level, entities = ?pool, "leveling pass");

        if pool.is_empty() {
            if levels.values().any(|lvl| *lvl > curr_level) {
                return Err(GogoError::Internal(format!(
                    "empty level {curr_level} while higher levels remain: {levels:?}"
                )));
            }
            break;
        }

        if curr_level > limit {
            let members = graph.find_cycle().unwrap_or_else(|| {
                let mut members: Vec<String> = pool.iter().map(|s| s.to_string()).collect();
                members.sort();
                members
            });
            return Err(GogoError::DependencyCycle { members });
        }

        let mut promotions = Vec::new();
        for entity in &pool {
            let Some(blocker) = graph
                .dependencies_of(entity)
                .iter()
                .find(|dep| pool.contains(dep.as_str()))
            else {
                continue;
            };

            if graph.dependencies_of(blocker).iter().any(|d| d == entity) {
                return Err(GogoError::DependencyCycle {
                    members: vec![entity.to_string(), blocker.clone()],
                });
            }

            debug!(
                entity = %entity,
                level = curr_level + 1,
                because = %blocker,
                "elevating entity above its dependency"
            );
            promotions.push(entity.to_string());
        }

        if promotions.is_empty() {
            break;
        }
        for name in promotions {
            levels.insert(name, curr_level + 1);
        }
        curr_level += 1;
    }

    Ok(levels)
}

/// Entities grouped by level, lowest first. Names within a level are sorted.
pub fn group_by_level(levels: &Levels) -> Vec<Vec<String>> {
    let max = levels.values().copied().max();
    let mut groups = vec![Vec::new(); max.map_or(0, |m| m + 1)];
    for (name, lvl) in levels {
        groups[*lvl].push(name.clone());
    }
    groups
}

/// Entity names ordered so that dependencies come first.
pub fn sort_by_level(levels: &Levels) -> Vec<String> {
    group_by_level(levels).into_iter().flatten().collect()
}

/// One line per level: `  0 : a, b`.
pub fn format_levels(levels: &Levels) -> String {
    group_by_level(levels)
        .iter()
        .enumerate()
        .map(|(lvl, names)| format!("{lvl:3} : {}", names.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}
