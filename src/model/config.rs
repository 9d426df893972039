use serde::{Deserialize, Serialize};

/// Configuration from book.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookConfig {
    #[serde(default)]
    pub book: BookInfo,
    #[serde(default)]
    pub dates: DateConfig,
    #[serde(default)]
    pub csv: CsvConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookInfo {
    pub name: String,
}

impl Default for BookInfo {
    fn default() -> Self {
        BookInfo {
            name: "Postcards".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateConfig {
    /// chrono format string used when stamping today's date
    #[serde(default = "default_date_format")]
    pub format: String,
}

impl Default for DateConfig {
    fn default() -> Self {
        DateConfig {
            format: default_date_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvConfig {
    /// Header row written on export
    #[serde(default = "default_csv_header")]
    pub header: String,
    /// A first line containing any of these (lowercased) is treated as a header on import
    #[serde(default = "default_header_markers")]
    pub header_markers: Vec<String>,
}

impl Default for CsvConfig {
    fn default() -> Self {
        CsvConfig {
            header: default_csv_header(),
            header_markers: default_header_markers(),
        }
    }
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_csv_header() -> String {
    "postcard,friend,date".to_string()
}

fn default_header_markers() -> Vec<String> {
    vec!["postcard".to_string(), "明信片".to_string()]
}
