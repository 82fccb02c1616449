use anyhow::Context;
use hashbrown::HashMap;
use serde_json::Value;

use super::{Session, dedup_by_key};
use crate::item::ItemRecord;

pub const UNKNOWN_ITEM: &str = "Unknown Item";

const TABLE: &str = "#uniques-table";

/// Reads the in-memory item database of the catalog page. Serialized in the
/// page because the CDP evaluation hands back objects by reference.
const ITEM_DB_SCRIPT: &str = r"JSON.stringify(
    Object.values(window.itemDB.uniqueList.uniques).map((data) => ({
        id: data.uniqueId,
        displayNameKey: data.displayNameKey,
        rerollChance: data.rerollChance,
        rarityTier: data.rarityTier,
        canDropRandomly: data.canDropRandomly === true,
    }))
)";

pub type NameMap = HashMap<String, Value>;

/// Fills `name` from the localization map, falling back to [`UNKNOWN_ITEM`].
pub fn resolve_names(items: &mut [ItemRecord], names: &NameMap) {
    for item in items {
        let name = item
            .display_name_key
            .as_deref()
            .and_then(|key| names.get(key))
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_ITEM);
        item.name = Some(name.to_owned());
    }
}

impl Session {
    /// Script-extraction mode: item fields come straight from `window.itemDB`,
    /// display names from the localization file at `names_url`.
    pub fn scrape_items_data(&self, url: &str, names_url: &str) -> anyhow::Result<Vec<ItemRecord>> {
        tracing::info!(target: "scrape", "fetching name data JSON ...");
        let names = self.load_names(names_url)?;
        tracing::info!(target: "scrape", "retrieved name data with {} entries", names.len());

        self.navigate(url)?;
        self.dismiss_consent();

        tracing::info!(target: "scrape", "waiting for the page data to load ...");
        self.wait_for(TABLE)?;

        tracing::info!(target: "scrape", "extracting data from JavaScript objects ...");
        let json = self.evaluate_string(ITEM_DB_SCRIPT)?;
        let mut items: Vec<ItemRecord> =
            serde_json::from_str(&json).context("unexpected item database layout")?;
        tracing::info!(target: "scrape", "found {} unique items", items.len());

        dedup_by_key(&mut items, |item| item.id);
        resolve_names(&mut items, &names);
        Ok(items)
    }

    fn load_names(&self, names_url: &str) -> anyhow::Result<NameMap> {
        self.navigate(names_url)?;
        let text = self.wait_for("pre")?.get_inner_text()?;
        serde_json::from_str(&text).with_context(|| format!("malformed name data at {names_url}"))
    }
}
