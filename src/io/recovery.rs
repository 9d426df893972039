use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

/// Entries older than this many days are removed by a default prune.
pub const PRUNE_AGE_DAYS: i64 = 30;

const FILE_HEADER: &str = "\
<!-- postbook recovery journal
     Data postbook could not save normally, data it could not read back,
     and everything removed by a delete or clear.
     View with: pb recovery
     Prune old entries: pb recovery prune -->

---
";

/// Category of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// Stored data that could not be parsed
    Parse,
    /// A write that failed
    Write,
    /// A friend or postcard removed on request
    Delete,
    /// The whole book cleared
    Clear,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecoveryCategory::Parse => "parse",
            RecoveryCategory::Write => "write",
            RecoveryCategory::Delete => "delete",
            RecoveryCategory::Clear => "clear",
        };
        f.write_str(s)
    }
}

impl RecoveryCategory {
    pub fn parse_category(s: &str) -> Option<Self> {
        match s {
            "parse" => Some(RecoveryCategory::Parse),
            "write" => Some(RecoveryCategory::Write),
            "delete" => Some(RecoveryCategory::Delete),
            "clear" => Some(RecoveryCategory::Clear),
            _ => None,
        }
    }
}

/// A single journal entry
#[derive(Debug, Clone)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

pub fn recovery_log_path(book_dir: &Path) -> PathBuf {
    book_dir.join(".recovery.log")
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl RecoveryEntry {
    fn header_line(&self) -> String {
        format!(
            "## {} [{}] {}",
            self.timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.category,
            self.description,
        )
    }

    /// Render as the markdown block stored in the journal.
    pub fn to_markdown(&self) -> String {
        let mut out = self.header_line();
        out.push_str("\n\n");
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        if !self.body.is_empty() {
            let fence = fence_for(&self.body);
            out.push_str(&format!("\n{}text\n", fence));
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&fence);
            out.push('\n');
        }
        out.push_str("\n---\n");
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "category": self.category.to_string(),
            "description": self.description,
            "fields": fields,
            "body": self.body,
        })
    }
}

/// A backtick fence longer than any backtick run inside `body`.
fn fence_for(body: &str) -> String {
    let longest = body
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

/// Append an entry to the journal. Failures are reported on stderr and
/// otherwise ignored, since the journal is the last resort.
pub fn log_recovery(book_dir: &Path, entry: RecoveryEntry) {
    if let Err(e) = append_entry(book_dir, &entry) {
        log::warn!("could not write to recovery log: {}", e);
        eprintln!("warning: could not write to recovery log: {}", e);
    }
}

fn append_entry(book_dir: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    let path = recovery_log_path(book_dir);
    let needs_header = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())
}

/// Journal data removed by a delete, so it can be re-entered by hand.
pub fn log_deletion(book_dir: &Path, what: &str, body: String) {
    log_recovery(
        book_dir,
        RecoveryEntry {
            timestamp: Utc::now(),
            category: RecoveryCategory::Delete,
            description: format!("{} deleted", what),
            fields: Vec::new(),
            body,
        },
    );
}

/// Read journal entries, newest first, keeping at most `limit`.
pub fn read_recovery_entries(book_dir: &Path, limit: Option<usize>) -> Vec<RecoveryEntry> {
    let content = match std::fs::read_to_string(recovery_log_path(book_dir)) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    let mut entries = parse_entries(&content);
    entries.reverse();
    if let Some(n) = limit {
        entries.truncate(n);
    }
    entries
}

fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    let mut entries = Vec::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let Some((timestamp, category, description)) =
            line.strip_prefix("## ").and_then(parse_entry_header)
        else {
            continue;
        };

        let mut fields = Vec::new();
        let mut body_lines: Vec<&str> = Vec::new();
        let mut fence: Option<&str> = None;
        for line in lines.by_ref() {
            if let Some(open) = fence {
                if line == open {
                    fence = None;
                } else {
                    body_lines.push(line);
                }
                continue;
            }
            if line == "---" {
                break;
            }
            if line.starts_with("```") {
                let ticks = line.len() - line.trim_start_matches('`').len();
                fence = Some(&line[..ticks]);
            } else if let Some((key, value)) = line.split_once(": ") {
                fields.push((key.to_string(), value.to_string()));
            }
        }

        entries.push(RecoveryEntry {
            timestamp,
            category,
            description,
            fields,
            body: body_lines.join("\n"),
        });
    }
    entries
}

/// Parse `<timestamp> [<category>] <description>`
fn parse_entry_header(header: &str) -> Option<(DateTime<Utc>, RecoveryCategory, String)> {
    let (ts, rest) = header.split_once(" [")?;
    let (category, description) = rest.split_once("] ")?;
    let timestamp = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
    let category = RecoveryCategory::parse_category(category)?;
    Some((timestamp, category, description.to_string()))
}

/// Remove entries older than `before` (default: [`PRUNE_AGE_DAYS`] ago), or
/// every entry when `all` is set. Returns the number removed.
pub fn prune_recovery(
    book_dir: &Path,
    before: Option<DateTime<Utc>>,
    all: bool,
) -> io::Result<usize> {
    let path = recovery_log_path(book_dir);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let entries = parse_entries(&content);
    let cutoff = before.unwrap_or_else(|| Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS));

    let mut out = FILE_HEADER.to_string();
    let mut kept = 0;
    if !all {
        for entry in entries.iter().filter(|e| e.timestamp >= cutoff) {
            out.push_str(&entry.to_markdown());
            kept += 1;
        }
    }
    atomic_write(&path, out.as_bytes())?;
    Ok(entries.len() - kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(days_ago: i64, category: RecoveryCategory, body: &str) -> RecoveryEntry {
        RecoveryEntry {
            timestamp: Utc::now() - chrono::Duration::days(days_ago),
            category,
            description: format!("entry from {} days ago", days_ago),
            fields: vec![("Target".into(), "records.json".into())],
            body: body.to_string(),
        }
    }

    #[test]
    fn append_and_read_newest_first() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), entry(2, RecoveryCategory::Write, "[\"Ann\"]"));
        log_recovery(tmp.path(), entry(1, RecoveryCategory::Delete, "Sunset,Ann,2025-01-01\nSunset,Bo,"));

        let entries = read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].category, RecoveryCategory::Delete);
        assert_eq!(entries[0].body, "Sunset,Ann,2025-01-01\nSunset,Bo,");
        assert_eq!(entries[1].fields, vec![("Target".to_string(), "records.json".to_string())]);

        let limited = read_recovery_entries(tmp.path(), Some(1));
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].category, RecoveryCategory::Delete);
    }

    #[test]
    fn body_with_backtick_lines_reads_back_whole() {
        let tmp = TempDir::new().unwrap();
        let body = "before\n```\n----\n````\nafter";
        log_recovery(tmp.path(), entry(1, RecoveryCategory::Delete, body));
        log_recovery(tmp.path(), entry(0, RecoveryCategory::Write, "next"));

        let entries = read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].body, "next");
        assert_eq!(entries[1].body, body);
        assert_eq!(fence_for(body), "`````");
        assert_eq!(fence_for("plain"), "```");
    }

    #[test]
    fn header_written_once() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), entry(0, RecoveryCategory::Clear, ""));
        log_recovery(tmp.path(), entry(0, RecoveryCategory::Clear, ""));
        let content = std::fs::read_to_string(recovery_log_path(tmp.path())).unwrap();
        assert_eq!(content.matches("postbook recovery journal").count(), 1);
    }

    #[test]
    fn missing_log_reads_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(read_recovery_entries(tmp.path(), None).is_empty());
        assert_eq!(prune_recovery(tmp.path(), None, false).unwrap(), 0);
    }

    #[test]
    fn prune_drops_old_entries() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), entry(45, RecoveryCategory::Write, "old"));
        log_recovery(tmp.path(), entry(3, RecoveryCategory::Write, "recent"));

        assert_eq!(prune_recovery(tmp.path(), None, false).unwrap(), 1);
        let entries = read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].body, "recent");

        assert_eq!(prune_recovery(tmp.path(), None, true).unwrap(), 1);
        assert!(read_recovery_entries(tmp.path(), None).is_empty());
    }

    #[test]
    fn atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("friends.json");
        atomic_write(&path, b"[]").unwrap();
        atomic_write(&path, b"[\"Ann\"]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[\"Ann\"]");
    }
}
