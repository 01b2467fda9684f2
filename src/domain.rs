use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A building organizations reside in. `coordinates` carries a decimal
/// "lat,lon" pair as free text; it is parsed at query time by the geo filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: i64,
    pub address: String,
    pub coordinates: String,
}

/// An organization occupying exactly one building. Its practice memberships
/// live in the `PracticeMembership` pair set, not on the struct, so the join
/// table stays the single source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub phone_numbers: Vec<String>,
    pub building_id: i64,
}

/// A business-activity category node. `parent_id` links form a forest; roots
/// have `parent_id = None`. Children are found by scanning parent ids rather
/// than held as references, which keeps the tree an id-indexed arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Practice {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// One row of the organization↔practice join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PracticeMembership {
    pub organization_id: i64,
    pub practice_id: i64,
}

/// Distance from a practice to its root, walking `parent_id` links until
/// none remains. Roots are level 0. Relies on parent chains being finite
/// (the forest invariant); a dangling parent id ends the walk.
pub fn practice_level(practices_by_id: &HashMap<i64, Practice>, practice_id: i64) -> u32 {
    let mut level = 0;
    let mut current = practices_by_id.get(&practice_id).and_then(|p| p.parent_id);
    while let Some(parent_id) = current {
        level += 1;
        current = practices_by_id.get(&parent_id).and_then(|p| p.parent_id);
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(depth: u32) -> HashMap<i64, Practice> {
        // Practice 1 is the root; practice n has parent n-1.
        (1..=depth as i64 + 1)
            .map(|id| {
                (
                    id,
                    Practice {
                        id,
                        name: format!("practice {id}"),
                        parent_id: if id == 1 { None } else { Some(id - 1) },
                    },
                )
            })
            .collect()
    }

    #[test]
    fn root_practice_is_level_zero() {
        let practices = chain(0);
        assert_eq!(practice_level(&practices, 1), 0);
    }

    #[test]
    fn level_equals_chain_depth_up_to_ten() {
        let practices = chain(10);
        for depth in 0..=10 {
            assert_eq!(practice_level(&practices, depth as i64 + 1), depth);
        }
    }

    #[test]
    fn unknown_practice_is_level_zero() {
        let practices = chain(3);
        assert_eq!(practice_level(&practices, 99), 0);
    }
}
