use postbook::io::prompt::AssumeYes;
use postbook::io::store::{MemoryStore, RECORDS_KEY};
use postbook::model::config::BookConfig;
use postbook::service::Postbook;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

fn read_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Could not read fixture {}: {}", name, e))
}

fn empty_book(config: BookConfig) -> Postbook<MemoryStore> {
    Postbook::open(MemoryStore::new(), config)
        .unwrap()
        .with_today("2025-06-01")
}

/// Import a fixture into an empty book, export it again, and assert
/// byte-for-byte equality.
fn assert_csv_round_trip(fixture_name: &str, header: &str) {
    let source = read_fixture(fixture_name);
    let mut config = BookConfig::default();
    config.csv.header = header.to_string();

    let mut book = empty_book(config);
    let result = book.import_csv(&source).unwrap();
    assert!(result.header_skipped);

    assert_eq!(book.export_csv(), source, "Round-trip failed for fixture: {}", fixture_name);
}

#[test]
fn round_trip_basic() {
    assert_csv_round_trip("basic.csv", "postcard,friend,date");
}

#[test]
fn round_trip_chinese_header() {
    assert_csv_round_trip("zh_header.csv", "明信片,好友,寄出日期");
}

#[test]
fn headerless_import_normalizes_on_export() {
    let mut book = empty_book(BookConfig::default());
    let result = book.import_csv(&read_fixture("no_header.csv")).unwrap();

    assert!(!result.header_skipped);
    assert_eq!(result.friends_added, vec!["Ann", "Bo"]);
    assert_eq!(
        book.export_csv(),
        "\u{feff}postcard,friend,date\nSunset,Ann,2025-01-02\nBeach,Bo,2025-06-01\nLake,Ann,2025-06-01\n"
    );
}

#[test]
fn legacy_multi_friend_records_export_one_row_per_friend() {
    let store = MemoryStore::new().with_value(RECORDS_KEY, &read_fixture("legacy_records.json"));
    let book = Postbook::open(store, BookConfig::default()).unwrap();

    assert_eq!(
        book.export_csv(),
        "\u{feff}postcard,friend,date\nSunset,Ann,2024-12-24\nSunset,Bo,2024-12-24\nBeach,Bo,2025-01-03\n"
    );
}

#[test]
fn export_clear_import_restores_grouped_view() {
    let mut book = empty_book(BookConfig::default());
    book.import_csv(&read_fixture("basic.csv")).unwrap();
    let friends_before: Vec<String> = book.list_friends().iter().map(|s| s.to_string()).collect();
    let view_before = book.grouped_view();
    let exported = book.export_csv();

    assert!(book.clear_all(&mut AssumeYes).unwrap());
    assert!(book.book().is_pristine());

    book.import_csv(&exported).unwrap();
    assert_eq!(book.grouped_view(), view_before);
    assert_eq!(book.list_friends(), friends_before);
}
