use std::fs;
use std::path::Path;

use crate::io::recovery::atomic_write;
use crate::io::store::StoreError;
use crate::model::config::BookConfig;

pub const CONFIG_FILE: &str = "book.toml";

/// Read book.toml, returning both the parsed config and the raw toml_edit
/// document for round-trip-safe editing.
pub fn read_config(book_dir: &Path) -> Result<(BookConfig, toml_edit::DocumentMut), StoreError> {
    let config_path = book_dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&config_path).map_err(|e| StoreError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    let config: BookConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse().map_err(|e: toml_edit::TomlError| {
        StoreError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    })?;
    Ok((config, doc))
}

/// Write the document back, preserving comments and layout.
pub fn write_config(book_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), StoreError> {
    atomic_write(&book_dir.join(CONFIG_FILE), doc.to_string().as_bytes())?;
    Ok(())
}

fn ensure_table(doc: &mut toml_edit::DocumentMut, name: &str) {
    if !doc.contains_key(name) {
        doc[name] = toml_edit::Item::Table(toml_edit::Table::new());
    }
}

/// Set `[dates] format`
pub fn set_date_format(doc: &mut toml_edit::DocumentMut, format: &str) {
    ensure_table(doc, "dates");
    doc["dates"]["format"] = toml_edit::value(format);
}

/// Set `[csv] header`
pub fn set_csv_header(doc: &mut toml_edit::DocumentMut, header: &str) {
    ensure_table(doc, "csv");
    doc["csv"]["header"] = toml_edit::value(header);
}
