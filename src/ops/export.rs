use crate::model::record::Ledger;

/// Byte-order mark written at the start of every export so spreadsheet
/// tools pick UTF-8.
pub const BOM: char = '\u{feff}';

/// Default file name offered for exports
pub const DEFAULT_EXPORT_FILE: &str = "postcards.csv";

/// Serialize every (postcard, friend, date) triple as one CSV row.
///
/// Fields are written as-is, without quoting. A comma inside a postcard,
/// friend or date will shift the columns on re-import.
pub fn export_csv(ledger: &Ledger, header: &str) -> String {
    let mut out = String::new();
    out.push(BOM);
    out.push_str(header);
    out.push('\n');
    for (postcard, friend, date) in ledger.deliveries() {
        out.push_str(postcard);
        out.push(',');
        out.push_str(friend);
        out.push(',');
        out.push_str(date);
        out.push('\n');
    }
    out
}

/// Values that would not survive an export/import round trip, as
/// `(postcard, friend)` pairs.
pub fn unsafe_fields(ledger: &Ledger) -> Vec<(String, String)> {
    ledger
        .deliveries()
        .filter(|(p, f, d)| [p, f, d].iter().any(|v| v.contains(',') || v.contains('\n')))
        .map(|(p, f, _)| (p.to_string(), f.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::SendRecord;

    #[test]
    fn writes_bom_header_and_one_row_per_friend() {
        let ledger = Ledger::from_records(vec![
            SendRecord::new("Sunset", "Ann", "2025-01-01"),
            SendRecord {
                postcard: "Beach".into(),
                friends: vec!["Bo".into(), "Cy".into()],
                date: "2025-02-02".into(),
            },
        ]);
        let csv = export_csv(&ledger, "postcard,friend,date");
        insta::assert_snapshot!(csv.trim_start_matches(BOM).trim_end(), @r"
        postcard,friend,date
        Sunset,Ann,2025-01-01
        Beach,Bo,2025-02-02
        Beach,Cy,2025-02-02
        ");
        assert!(csv.starts_with(BOM));
        assert!(csv.ends_with("2025-02-02\n"));
    }

    #[test]
    fn empty_ledger_is_header_only() {
        let csv = export_csv(&Ledger::new(), "明信片,好友,寄出日期");
        assert_eq!(csv, "\u{feff}明信片,好友,寄出日期\n");
    }

    #[test]
    fn flags_values_containing_commas() {
        let ledger = Ledger::from_records(vec![
            SendRecord::new("Tokyo, Japan", "Ann", "d"),
            SendRecord::new("Paris", "Bo", "d"),
        ]);
        assert_eq!(
            unsafe_fields(&ledger),
            vec![("Tokyo, Japan".to_string(), "Ann".to_string())]
        );
    }
}
