use core::hash::Hash;

use hashbrown::HashSet;

mod puppeteer;
mod table;
mod uniques;

pub use puppeteer::{Session, SessionConfig};
pub use table::{parse_last_page, parse_rows};
pub use uniques::{NameMap, UNKNOWN_ITEM, resolve_names};

pub const CATALOG_URL: &str = "https://www.lastepochtools.com/db/items/unique";
pub const NAMES_URL: &str = "https://www.lastepochtools.com/data/version121/i18n/full/en.json";

/// Keeps the first record for every key; records without a key are kept.
pub fn dedup_by_key<T, K, F>(records: &mut Vec<T>, mut key: F)
where
    K: Hash + Eq,
    F: FnMut(&T) -> Option<K>,
{
    let mut seen = HashSet::new();
    let before = records.len();
    records.retain(|record| key(record).is_none_or(|k| seen.insert(k)));

    if records.len() < before {
        tracing::info!(target: "scrape", "dropped {} duplicate records", before - records.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first() {
        let mut records = vec![(Some(1), 'a'), (None, 'b'), (Some(2), 'c'), (Some(1), 'd'), (None, 'e')];
        dedup_by_key(&mut records, |r| r.0);
        assert_eq!(records, [(Some(1), 'a'), (None, 'b'), (Some(2), 'c'), (None, 'e')]);
    }
}
