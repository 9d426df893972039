use std::fmt;

use indexmap::IndexSet;

use crate::model::book::Book;
use crate::model::config::CsvConfig;
use crate::model::record::SendRecord;
use crate::ops::export::BOM;

/// Columns accepted per row: postcard, friend, and an optional date.
const MIN_FIELDS: usize = 2;
const MAX_FIELDS: usize = 3;

/// Error type for CSV import
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("import needs an empty book; clear all data first")]
    EmptyData,
    #[error("line {line}: {problem}")]
    MalformedRow { line: usize, problem: RowProblem },
    #[error("no data rows found in import file")]
    NoRows,
}

/// Why a row was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowProblem {
    FieldCount(usize),
    EmptyPostcard,
    EmptyFriend,
}

impl fmt::Display for RowProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowProblem::FieldCount(n) => write!(
                f,
                "expected {} or {} columns (postcard,friend[,date]), found {}",
                MIN_FIELDS, MAX_FIELDS, n
            ),
            RowProblem::EmptyPostcard => write!(f, "postcard is empty"),
            RowProblem::EmptyFriend => write!(f, "friend is empty"),
        }
    }
}

/// Result of an import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    /// Friends registered by this import, in first-appearance order
    pub friends_added: Vec<String>,
    pub records_added: usize,
    /// Whether the first line was recognised as a header and skipped
    pub header_skipped: bool,
}

/// Parse CSV text and load it into an empty book.
///
/// Every row is validated before anything is applied, so a bad row leaves
/// the book exactly as it was.
pub fn import_csv(
    text: &str,
    book: &mut Book,
    csv: &CsvConfig,
    today: &str,
) -> Result<ImportResult, CsvError> {
    if !book.is_pristine() {
        return Err(CsvError::EmptyData);
    }

    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut rows = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line))
        .peekable();

    let header_skipped = match rows.peek() {
        Some((_, first)) if is_header(first, csv) => {
            rows.next();
            true
        }
        _ => false,
    };

    let mut friends: IndexSet<String> = IndexSet::new();
    let mut records = Vec::new();
    for (line, row) in rows {
        let record = parse_row(row, today).map_err(|problem| CsvError::MalformedRow { line, problem })?;
        for friend in &record.friends {
            if !book.friends.contains(friend) {
                friends.insert(friend.clone());
            }
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(CsvError::NoRows);
    }

    let records_added = records.len();
    for name in &friends {
        book.friends.push(name.clone());
    }
    book.ledger.records.extend(records);

    Ok(ImportResult {
        friends_added: friends.into_iter().collect(),
        records_added,
        header_skipped,
    })
}

/// The configured export header always counts, so a book's own export
/// re-imports cleanly whatever the header says.
fn is_header(line: &str, csv: &CsvConfig) -> bool {
    if line.trim() == csv.header.trim() {
        return true;
    }
    let lower = line.to_lowercase();
    csv.header_markers
        .iter()
        .any(|m| !m.is_empty() && lower.contains(&m.to_lowercase()))
}

fn parse_row(row: &str, today: &str) -> Result<SendRecord, RowProblem> {
    let fields: Vec<&str> = row.split(',').map(str::trim).collect();
    if !(MIN_FIELDS..=MAX_FIELDS).contains(&fields.len()) {
        return Err(RowProblem::FieldCount(fields.len()));
    }
    let (postcard, friend) = (fields[0], fields[1]);
    if postcard.is_empty() {
        return Err(RowProblem::EmptyPostcard);
    }
    if friend.is_empty() {
        return Err(RowProblem::EmptyFriend);
    }
    let date = match fields.get(2) {
        Some(d) if !d.is_empty() => *d,
        _ => today,
    };
    Ok(SendRecord::new(postcard, friend, date))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
