use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A persisted fact: `postcard` was sent to `friends` on `date`.
///
/// New records always carry exactly one friend. Older books may hold one
/// record per postcard with several friends; those load and display unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRecord {
    pub postcard: String,
    pub friends: Vec<String>,
    /// Free-form date text, as stamped at save time or read from CSV
    pub date: String,
}

impl SendRecord {
    pub fn new(postcard: impl Into<String>, friend: impl Into<String>, date: impl Into<String>) -> Self {
        SendRecord {
            postcard: postcard.into(),
            friends: vec![friend.into()],
            date: date.into(),
        }
    }
}

/// One (friend, date) entry under a postcard in the grouped view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub friend: String,
    pub date: String,
}

/// All deliveries of one postcard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostcardGroup {
    pub postcard: String,
    pub deliveries: Vec<Delivery>,
}

/// The list of send records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    pub records: Vec<SendRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<SendRecord>) -> Self {
        Ledger { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_postcard(&self, postcard: &str) -> bool {
        self.records.iter().any(|r| r.postcard == postcard)
    }

    /// Distinct postcard names in first-appearance order. Callers sort.
    pub fn distinct_postcard_names(&self) -> IndexSet<&str> {
        self.records.iter().map(|r| r.postcard.as_str()).collect()
    }

    /// Every (postcard, friend, date) triple, in record-then-friend order.
    pub fn deliveries(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.records.iter().flat_map(|r| {
            r.friends
                .iter()
                .map(move |f| (r.postcard.as_str(), f.as_str(), r.date.as_str()))
        })
    }

    /// Friends of `postcard` mapped to the first date found for each.
    pub fn dates_for(&self, postcard: &str) -> IndexMap<String, String> {
        let mut dates = IndexMap::new();
        for (_, friend, date) in self.deliveries().filter(|(p, _, _)| *p == postcard) {
            dates
                .entry(friend.to_string())
                .or_insert_with(|| date.to_string());
        }
        dates
    }

    /// Postcards grouped by name, sorted lexicographically.
    pub fn grouped_view(&self) -> Vec<PostcardGroup> {
        let mut groups: IndexMap<&str, Vec<Delivery>> = IndexMap::new();
        for (postcard, friend, date) in self.deliveries() {
            groups.entry(postcard).or_default().push(Delivery {
                friend: friend.to_string(),
                date: date.to_string(),
            });
        }
        groups.sort_keys();
        groups
            .into_iter()
            .map(|(postcard, deliveries)| PostcardGroup {
                postcard: postcard.to_string(),
                deliveries,
            })
            .collect()
    }

    /// Replace every occurrence of `old` with `new` in every friend list.
    /// Returns how many occurrences changed.
    pub fn rename_friend(&mut self, old: &str, new: &str) -> usize {
        let mut changed = 0;
        for name in self.records.iter_mut().flat_map(|r| r.friends.iter_mut()) {
            if *name == old {
                *name = new.to_string();
                changed += 1;
            }
        }
        changed
    }

    /// Drop `name` from every friend list, then drop records left with no
    /// friends. Returns the number of records removed.
    pub fn remove_friend(&mut self, name: &str) -> usize {
        for record in &mut self.records {
            record.friends.retain(|f| f != name);
        }
        let before = self.records.len();
        self.records.retain(|r| !r.friends.is_empty());
        before - self.records.len()
    }

    /// Remove all records for `postcard`. Returns the removed records.
    pub fn remove_postcard(&mut self, postcard: &str) -> Vec<SendRecord> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| r.postcard == postcard);
        self.records = kept;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Ledger {
        Ledger::from_records(vec![
            SendRecord::new("Sunset", "Ann", "2025-01-02"),
            SendRecord::new("Beach", "Bo", "2025-01-03"),
            SendRecord {
                postcard: "Sunset".into(),
                friends: vec!["Bo".into(), "Ann".into()],
                date: "2025-01-04".into(),
            },
        ])
    }

    #[test]
    fn grouped_view_sorted_and_in_record_order() {
        let groups = sample().grouped_view();
        let keys: Vec<&str> = groups.iter().map(|g| g.postcard.as_str()).collect();
        assert_eq!(keys, vec!["Beach", "Sunset"]);

        let sunset: Vec<(&str, &str)> = groups[1]
            .deliveries
            .iter()
            .map(|d| (d.friend.as_str(), d.date.as_str()))
            .collect();
        assert_eq!(
            sunset,
            vec![
                ("Ann", "2025-01-02"),
                ("Bo", "2025-01-04"),
                ("Ann", "2025-01-04"),
            ]
        );
    }

    #[test]
    fn dates_for_keeps_first_occurrence() {
        let dates = sample().dates_for("Sunset");
        assert_eq!(dates.get("Ann").map(String::as_str), Some("2025-01-02"));
        assert_eq!(dates.get("Bo").map(String::as_str), Some("2025-01-04"));
        assert_eq!(dates.len(), 2);
    }

    #[test]
    fn rename_friend_preserves_order_and_multiplicity() {
        let mut ledger = sample();
        assert_eq!(ledger.rename_friend("Ann", "Cy"), 2);
        assert_eq!(ledger.records[0].friends, vec!["Cy"]);
        assert_eq!(ledger.records[2].friends, vec!["Bo", "Cy"]);
    }

    #[test]
    fn remove_friend_drops_emptied_records() {
        let mut ledger = sample();
        assert_eq!(ledger.remove_friend("Ann"), 1);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.deliveries().all(|(_, f, _)| f != "Ann"));
    }

    #[test]
    fn remove_postcard_returns_removed() {
        let mut ledger = sample();
        let removed = ledger.remove_postcard("Sunset");
        assert_eq!(removed.len(), 2);
        assert_eq!(ledger.distinct_postcard_names().len(), 1);
        assert!(!ledger.contains_postcard("Sunset"));
    }

    #[test]
    fn record_json_shape() {
        let json = serde_json::to_string(&SendRecord::new("P", "F", "D")).unwrap();
        assert_eq!(json, r#"{"postcard":"P","friends":["F"],"date":"D"}"#);
    }
}
