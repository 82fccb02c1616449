use std::{
    fmt,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};

use crate::util::{ensure_parent_dir, escape_csv};

/// Tier tag of a unique. Tags outside `T0`..`T4` are kept verbatim in `Other`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RarityTier {
    T0,
    T1,
    T2,
    T3,
    T4,
    Other(String),
}

impl RarityTier {
    pub fn as_str(&self) -> &str {
        match self {
            Self::T0 => "T0",
            Self::T1 => "T1",
            Self::T2 => "T2",
            Self::T3 => "T3",
            Self::T4 => "T4",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for RarityTier {
    fn from(s: String) -> Self {
        match s.as_str() {
            "T0" => Self::T0,
            "T1" => Self::T1,
            "T2" => Self::T2,
            "T3" => Self::T3,
            "T4" => Self::T4,
            _ => Self::Other(s),
        }
    }
}

impl From<RarityTier> for String {
    fn from(tier: RarityTier) -> Self {
        match tier {
            RarityTier::Other(s) => s,
            tier => tier.as_str().to_owned(),
        }
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `null` counts as "not set", like a missing key.
fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Option::<bool>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A unique item as collected from the in-page item database.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u16>,
    #[serde(default)]
    pub display_name_key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rarity_tier: Option<RarityTier>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub can_drop_randomly: bool,
    #[serde(default)]
    pub reroll_chance: Option<f64>,
}

/// One row of the paginated catalog table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub name: String,
    pub item_id: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub class: Option<String>,
    pub level: Option<String>,
    pub legendary_potential_level: Option<String>,
    pub reroll_chance: Option<String>,
}

/// Flat, column-ordered view of a record for the CSV export.
pub trait CsvRecord {
    const HEADER: &'static [&'static str];

    fn fields(&self) -> Vec<Option<String>>;
}

impl CsvRecord for ItemRecord {
    const HEADER: &'static [&'static str] = &[
        "id",
        "displayNameKey",
        "rerollChance",
        "rarityTier",
        "canDropRandomly",
        "name",
    ];

    fn fields(&self) -> Vec<Option<String>> {
        vec![
            self.id.map(|x| x.to_string()),
            self.display_name_key.clone(),
            self.reroll_chance.map(|x| x.to_string()),
            self.rarity_tier.as_ref().map(ToString::to_string),
            Some(self.can_drop_randomly.to_string()),
            self.name.clone(),
        ]
    }
}

impl CsvRecord for CatalogRow {
    const HEADER: &'static [&'static str] = &[
        "name",
        "item_id",
        "url",
        "type",
        "class",
        "level",
        "legendary_potential_level",
        "reroll_chance",
    ];

    fn fields(&self) -> Vec<Option<String>> {
        vec![
            Some(self.name.clone()),
            self.item_id.clone(),
            self.url.clone(),
            self.item_type.clone(),
            self.class.clone(),
            self.level.clone(),
            self.legendary_potential_level.clone(),
            self.reroll_chance.clone(),
        ]
    }
}

pub fn load_items(path: &Path) -> anyhow::Result<Vec<ItemRecord>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let reader = BufReader::new(file);
    let items: Vec<ItemRecord> = serde_json::from_reader(reader)
        .with_context(|| format!("malformed item records in {}", path.display()))?;

    tracing::info!(target: "records", "loaded {} items from {}", items.len(), path.display());
    Ok(items)
}

pub fn save_json<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;

    tracing::info!(target: "records", "data saved to {}", path.display());
    Ok(())
}

pub fn save_csv<T: CsvRecord>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_csv(&mut writer, records)?;
    writer.flush()?;

    tracing::info!(target: "records", "data saved to {}", path.display());
    Ok(())
}

fn write_csv<W: Write, T: CsvRecord>(writer: &mut W, records: &[T]) -> std::io::Result<()> {
    writeln!(writer, "{}", T::HEADER.join(","))?;
    for record in records {
        let line = record
            .fields()
            .iter()
            .map(|field| field.as_deref().map(escape_csv).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{line}")?;
    }
    Ok(())
}
