use std::{fs, io::Write, path::Path};

use anyhow::Context;
use quick_xml::{
    Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};

use super::{PowerBounds, Rule};
use crate::util::ensure_parent_dir;

pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

fn start<W: Write>(writer: &mut Writer<W>, name: &str) -> anyhow::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> anyhow::Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn text<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> anyhow::Result<()> {
    writer
        .create_element(name)
        .write_text_content(BytesText::new(value))?;
    Ok(())
}

fn condition<W: Write>(writer: &mut Writer<W>, kind: &str) -> anyhow::Result<()> {
    let element = BytesStart::new("Condition").with_attributes([("i:type", kind)]);
    writer.write_event(Event::Start(element))?;
    Ok(())
}

/// A numeric bound; unbounded values are written as `i:nil`.
fn bound<W: Write>(writer: &mut Writer<W>, name: &str, value: Option<u8>) -> anyhow::Result<()> {
    match value {
        Some(value) => text(writer, name, &value.to_string()),
        None => {
            writer
                .create_element(name)
                .with_attribute(("i:nil", "true"))
                .write_empty()?;
            Ok(())
        }
    }
}

fn write_bounds<W: Write>(writer: &mut Writer<W>, bounds: &PowerBounds) -> anyhow::Result<()> {
    bound(writer, "minLegendaryPotential", bounds.min_legendary_potential)?;
    bound(writer, "maxLegendaryPotential", bounds.max_legendary_potential)?;
    bound(writer, "minWeaversWill", bounds.min_weavers_will)?;
    bound(writer, "maxWeaversWill", bounds.max_weavers_will)
}

fn write_rule<W: Write>(writer: &mut Writer<W>, rule: &Rule) -> anyhow::Result<()> {
    start(writer, "Rule")?;
    text(writer, "type", rule.action.as_str())?;

    start(writer, "conditions")?;

    condition(writer, "RarityCondition")?;
    text(writer, "rarity", &rule.rarity)?;
    if let Some(bounds) = &rule.bounds {
        write_bounds(writer, bounds)?;
    }
    end(writer, "Condition")?;

    condition(writer, "UniquesCondition")?;
    if rule.unique_ids.is_empty() {
        writer.create_element("uniqueIds").write_empty()?;
    } else {
        start(writer, "uniqueIds")?;
        for id in &rule.unique_ids {
            text(writer, "unsignedShort", &id.to_string())?;
        }
        end(writer, "uniqueIds")?;
    }
    end(writer, "Condition")?;

    end(writer, "conditions")?;

    let display = &rule.display;
    text(writer, "color", &display.color.to_string())?;
    text(writer, "isEnabled", &display.is_enabled.to_string())?;
    text(writer, "levelDependent", &display.level_dependent.to_string())?;
    text(writer, "minLvl", &display.min_lvl.to_string())?;
    text(writer, "maxLvl", &display.max_lvl.to_string())?;
    text(writer, "emphasized", &display.emphasized.to_string())?;
    text(writer, "nameOverride", &display.name_override)?;

    end(writer, "Rule")
}

/// Serializes `rules` as an `ItemFilter` document, indented by two spaces and
/// without an XML declaration.
pub fn write_filter(rules: &[Rule]) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let root = BytesStart::new("ItemFilter").with_attributes([("xmlns:i", XSI_NAMESPACE)]);
    writer.write_event(Event::Start(root))?;
    start(&mut writer, "rules")?;
    for rule in rules {
        write_rule(&mut writer, rule)?;
    }
    end(&mut writer, "rules")?;
    end(&mut writer, "ItemFilter")?;

    let mut xml = String::from_utf8(writer.into_inner())?;
    xml.push('\n');
    Ok(xml)
}

pub fn write_filter_file(path: &Path, rules: &[Rule]) -> anyhow::Result<()> {
    let xml = write_filter(rules)?;
    ensure_parent_dir(path)?;
    fs::write(path, xml).with_context(|| format!("cannot write {}", path.display()))?;

    tracing::info!(target: "filter", "filter saved to {}", path.display());
    Ok(())
}
