use std::{sync::LazyLock, thread};

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{Session, dedup_by_key};
use crate::{item::CatalogRow, util::cell_value};

const TABLE: &str = "#uniques-table";
const PAGINATION: &str = ".dataTables_paginate";
const NEXT_BUTTON: &str = "#uniques-table_next";

static SEL_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody tr").unwrap());
static SEL_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static SEL_ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static SEL_PAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span a.paginate_button").unwrap());

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses the rows of the catalog table. `html` is the table markup, links
/// are resolved against `base`.
pub fn parse_rows(html: &str, base: &Url) -> Vec<CatalogRow> {
    let fragment = Html::parse_fragment(html);

    fragment
        .select(&SEL_ROW)
        .filter_map(|row| {
            let cells = row.select(&SEL_CELL).collect::<Vec<_>>();
            if cells.len() < 6 {
                tracing::warn!(target: "table", "skipping row with {} cells: {}", cells.len(), text_of(row));
                return None;
            }
            let Some(anchor) = cells[0].select(&SEL_ANCHOR).next() else {
                tracing::warn!(target: "table", "skipping row without item link: {}", text_of(row));
                return None;
            };

            Some(CatalogRow {
                name: text_of(anchor),
                item_id: anchor.attr("item-id").map(ToOwned::to_owned),
                url: anchor
                    .attr("href")
                    .and_then(|href| base.join(href).ok())
                    .map(String::from),
                item_type: cell_value(&text_of(cells[1])),
                class: cell_value(&text_of(cells[2])),
                level: cell_value(&text_of(cells[3])),
                legendary_potential_level: cell_value(&text_of(cells[4])),
                reroll_chance: cell_value(&text_of(cells[5])),
            })
        })
        .collect()
}

/// Page count shown by the pagination control, i.e. its last numbered button.
pub fn parse_last_page(html: &str) -> Option<u32> {
    let fragment = Html::parse_fragment(html);
    let last = fragment.select(&SEL_PAGE).last()?;
    text_of(last).parse().ok()
}

impl Session {
    /// Table-scraping mode: walks every page of the rendered catalog table.
    pub fn scrape_items_table(&self, url: &str) -> anyhow::Result<Vec<CatalogRow>> {
        let base = Url::parse(url)?;

        self.navigate(url)?;
        self.dismiss_consent();

        tracing::info!(target: "table", "waiting for the items table to load ...");
        self.wait_for(TABLE)?;

        let last_page = match self.outer_html(PAGINATION) {
            Ok(html) => parse_last_page(&html).unwrap_or(1),
            Err(e) => {
                tracing::warn!(target: "table", "no pagination control, assuming one page: {e}");
                1
            }
        };

        let mut rows = Vec::new();
        for page in 1..=last_page {
            tracing::info!(target: "table", "scraping page {page} of {last_page}");

            let table = self.wait_for(TABLE)?.get_content()?;
            let mut block = parse_rows(&table, &base);
            tracing::debug!(target: "table", "page {page}: {} rows", block.len());
            rows.append(&mut block);

            if page < last_page {
                self.click(NEXT_BUTTON)?;
                thread::sleep(self.config.page_delay);
            }
        }

        dedup_by_key(&mut rows, |row| row.item_id.clone());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<table id="uniques-table">
  <thead><tr><th>Name</th><th>Type</th><th>Class</th><th>Level</th><th>LP</th><th>Reroll</th></tr></thead>
  <tbody>
    <tr>
      <td><a href="/db/items/unique/bastion-of-honour" item-id="42">Bastion of Honour</a></td>
      <td>Shield</td>
      <td>–</td>
      <td>36</td>
      <td>–</td>
      <td>1</td>
    </tr>
    <tr>
      <td><a href="https://example.org/x" item-id="7"><span>Jelmir's</span> <span>Fall</span></a></td>
      <td>Sword</td>
      <td>Sentinel</td>
      <td>–</td>
      <td>10</td>
      <td>0.5</td>
    </tr>
    <tr><td colspan="6">No matching records</td></tr>
  </tbody>
</table>"#;

    fn base() -> Url {
        Url::parse("https://www.lastepochtools.com/db/items/unique").unwrap()
    }

    #[test]
    fn rows_parsed() {
        let rows = parse_rows(PAGE, &base());
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert_eq!(first.name, "Bastion of Honour");
        assert_eq!(first.item_id.as_deref(), Some("42"));
        assert_eq!(
            first.url.as_deref(),
            Some("https://www.lastepochtools.com/db/items/unique/bastion-of-honour")
        );
        assert_eq!(first.item_type.as_deref(), Some("Shield"));
        assert_eq!(first.level.as_deref(), Some("36"));
        assert_eq!(first.reroll_chance.as_deref(), Some("1"));

        assert_eq!(rows[1].name, "Jelmir's Fall");
        assert_eq!(rows[1].url.as_deref(), Some("https://example.org/x"));
        assert_eq!(rows[1].class.as_deref(), Some("Sentinel"));
    }

    #[test]
    fn dash_cells_are_absent() {
        let rows = parse_rows(PAGE, &base());
        assert_eq!(rows[0].class, None);
        assert_eq!(rows[0].legendary_potential_level, None);
        assert_eq!(rows[1].level, None);
    }

    #[test]
    fn last_page() {
        let html = r##"<div class="dataTables_paginate paging_simple_numbers">
            <a class="paginate_button previous disabled" id="uniques-table_previous">Previous</a>
            <span>
                <a class="paginate_button current">1</a>
                <a class="paginate_button">2</a>
                <span class="ellipsis">…</span>
                <a class="paginate_button">17</a>
            </span>
            <a class="paginate_button next" id="uniques-table_next">Next</a>
        </div>"##;
        assert_eq!(parse_last_page(html), Some(17));
        assert_eq!(parse_last_page("<div class=\"dataTables_paginate\"></div>"), None);
    }
}
