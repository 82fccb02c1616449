//! Loot-filter generation: partitions item records by a configurable rule set
//! and serializes the resulting rules into the game's `ItemFilter` XML.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::item::{ItemRecord, RarityTier};

mod xml;

pub use xml::{XSI_NAMESPACE, write_filter, write_filter_file};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Hide,
    Highlight,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hide => "HIDE",
            Self::Highlight => "HIGHLIGHT",
        }
    }
}

/// Which items a rule applies to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    pub tiers: Vec<RarityTier>,
    /// When set, the item's drop flag must match.
    pub can_drop_randomly: Option<bool>,
}

impl Selection {
    pub fn matches(&self, item: &ItemRecord) -> bool {
        item.id.is_some()
            && item.rarity_tier.as_ref().is_some_and(|tier| self.tiers.contains(tier))
            && self
                .can_drop_randomly
                .is_none_or(|flag| flag == item.can_drop_randomly)
    }
}

/// Power-roll bounds of the rarity condition; `None` is written as nil.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerBounds {
    pub min_legendary_potential: Option<u8>,
    pub max_legendary_potential: Option<u8>,
    pub min_weavers_will: Option<u8>,
    pub max_weavers_will: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Display {
    pub color: u8,
    pub is_enabled: bool,
    pub level_dependent: bool,
    pub min_lvl: u8,
    pub max_lvl: u8,
    pub emphasized: bool,
    pub name_override: String,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            color: 0,
            is_enabled: true,
            level_dependent: false,
            min_lvl: 0,
            max_lvl: 0,
            emphasized: false,
            name_override: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub action: Action,
    pub select: Selection,
    #[serde(default = "RuleSpec::default_rarity")]
    pub rarity: String,
    #[serde(default)]
    pub bounds: Option<PowerBounds>,
    #[serde(default)]
    pub display: Display,
}

impl RuleSpec {
    fn default_rarity() -> String {
        "UNIQUE".to_owned()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<RuleSpec>,
}

impl Default for RuleSet {
    /// Hides low-tier uniques that drop randomly, highlights the top tiers.
    fn default() -> Self {
        Self {
            rules: vec![
                RuleSpec {
                    action: Action::Hide,
                    select: Selection {
                        tiers: vec![RarityTier::T4],
                        can_drop_randomly: Some(true),
                    },
                    rarity: RuleSpec::default_rarity(),
                    bounds: Some(PowerBounds {
                        max_legendary_potential: Some(0),
                        max_weavers_will: Some(15),
                        ..PowerBounds::default()
                    }),
                    display: Display {
                        color: 2,
                        name_override: "BAD UNIQUES".to_owned(),
                        ..Display::default()
                    },
                },
                RuleSpec {
                    action: Action::Highlight,
                    select: Selection {
                        tiers: vec![RarityTier::T0, RarityTier::T1],
                        can_drop_randomly: None,
                    },
                    rarity: RuleSpec::default_rarity(),
                    bounds: None,
                    display: Display {
                        color: 0,
                        emphasized: true,
                        name_override: "GOOD UNIQUES".to_owned(),
                        ..Display::default()
                    },
                },
            ],
        }
    }
}

impl RuleSet {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("malformed rule set in {}", path.display()))
    }
}

/// A rule with its id set resolved, ready to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub action: Action,
    pub rarity: String,
    pub bounds: Option<PowerBounds>,
    pub unique_ids: Vec<u16>,
    pub display: Display,
}

pub fn build_rules(items: &[ItemRecord], rule_set: &RuleSet) -> Vec<Rule> {
    rule_set
        .rules
        .iter()
        .map(|spec| {
            let unique_ids = items
                .iter()
                .filter(|item| spec.select.matches(item))
                .filter_map(|item| item.id)
                .collect::<Vec<_>>();

            tracing::info!(
                target: "filter",
                "rule {:?} ({}): {} uniques",
                spec.display.name_override,
                spec.action.as_str(),
                unique_ids.len(),
            );

            Rule {
                action: spec.action,
                rarity: spec.rarity.clone(),
                bounds: spec.bounds,
                unique_ids,
                display: spec.display.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: Option<u16>, tier: RarityTier, drop: bool) -> ItemRecord {
        ItemRecord {
            id,
            rarity_tier: Some(tier),
            can_drop_randomly: drop,
            ..ItemRecord::default()
        }
    }

    #[test]
    fn default_partition() {
        let items = [
            item(Some(1), RarityTier::T4, true),
            item(Some(2), RarityTier::T0, false),
            item(Some(3), RarityTier::T4, false),
            item(Some(4), RarityTier::T1, true),
            item(Some(5), RarityTier::T2, true),
            item(None, RarityTier::T4, true),
            item(None, RarityTier::T0, true),
            ItemRecord {
                id: Some(6),
                can_drop_randomly: true,
                ..ItemRecord::default()
            },
        ];
        let rules = build_rules(&items, &RuleSet::default());

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].action, Action::Hide);
        assert_eq!(rules[0].unique_ids, [1]);
        assert_eq!(rules[1].action, Action::Highlight);
        assert_eq!(rules[1].unique_ids, [2, 4]);
        assert!(
            rules[0]
                .unique_ids
                .iter()
                .all(|id| !rules[1].unique_ids.contains(id))
        );
    }

    #[test]
    fn default_bounds() {
        let rules = RuleSet::default();
        let bad = rules.rules[0].bounds.unwrap();
        assert_eq!(bad.min_legendary_potential, None);
        assert_eq!(bad.max_legendary_potential, Some(0));
        assert_eq!(bad.min_weavers_will, None);
        assert_eq!(bad.max_weavers_will, Some(15));
        assert_eq!(rules.rules[1].bounds, None);
    }

    #[test]
    fn empty_input() {
        let rules = build_rules(&[], &RuleSet::default());
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|rule| rule.unique_ids.is_empty()));
    }

    #[test]
    fn rule_set_from_json() {
        let rule_set: RuleSet = serde_json::from_str(
            r#"{"rules": [{
                "action": "HIDE",
                "select": {"tiers": ["T4", "T3"], "can_drop_randomly": true},
                "bounds": {"max_legendary_potential": 0, "max_weavers_will": 14},
                "display": {"color": 5, "name_override": "JUNK"}
            }]}"#,
        )
        .unwrap();

        let spec = &rule_set.rules[0];
        assert_eq!(spec.rarity, "UNIQUE");
        assert_eq!(spec.bounds.unwrap().max_weavers_will, Some(14));
        assert!(spec.display.is_enabled);
        assert!(!spec.display.emphasized);

        let items = [
            item(Some(10), RarityTier::T3, true),
            item(Some(11), RarityTier::T4, true),
            item(Some(12), RarityTier::T4, false),
        ];
        assert_eq!(build_rules(&items, &rule_set)[0].unique_ids, [10, 11]);
    }

    #[test]
    fn odd_records_are_not_selected() {
        let items: Vec<ItemRecord> = serde_json::from_str(
            r#"[
                {"id": 1, "rarityTier": "T4", "canDropRandomly": null},
                {"id": 2, "rarityTier": "T5", "canDropRandomly": true},
                {"id": 3, "rarityTier": "T4", "canDropRandomly": true},
                {"id": 4, "rarityTier": "T0"}
            ]"#,
        )
        .unwrap();
        let rules = build_rules(&items, &RuleSet::default());

        assert_eq!(rules[0].unique_ids, [3]);
        assert_eq!(rules[1].unique_ids, [4]);
    }

    #[test]
    fn rule_set_rejects_unknown_action() {
        let r = serde_json::from_str::<RuleSet>(
            r#"{"rules": [{"action": "RECOLOR", "select": {"tiers": ["T0"]}}]}"#,
        );
        assert!(r.is_err());
    }
}
