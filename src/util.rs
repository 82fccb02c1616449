use std::{borrow::Cow, fs, path::Path};

use anyhow::Context;

/// Creates the directory that will hold `path`, if it has one.
pub fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("cannot create directory {}", dir.display())),
        _ => Ok(()),
    }
}

pub fn escape_csv(s: &str) -> Cow<'_, str> {
    if s.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

/// Text of a table cell, with the site's `–` placeholder mapped to `None`.
pub fn cell_value(text: &str) -> Option<String> {
    const PLACEHOLDER: &str = "\u{2013}";

    let text = text.trim();
    (text != PLACEHOLDER).then(|| text.to_owned())
}
