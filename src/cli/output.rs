use serde::Serialize;

use crate::model::record::PostcardGroup;
use crate::ops::friend_ops::{FriendRemoval, FriendRename};
use crate::ops::import::ImportResult;
use crate::ops::postcard_ops::PostcardSave;
use crate::ops::search::FriendHit;
use crate::util::unicode::{display_width, pad_to_width, truncate_to_width};

/// Postcard names wider than this are cut short in the table
const MAX_POSTCARD_WIDTH: usize = 30;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct FriendJson {
    /// 1-based position, usable as `#N` in rename/rm
    pub position: usize,
    pub name: String,
}

#[derive(Serialize)]
pub struct TableJson {
    pub postcards: Vec<PostcardGroup>,
}

#[derive(Serialize)]
pub struct SaveJson {
    pub postcard: String,
    pub stamped: Vec<String>,
    pub kept: Vec<String>,
    pub dropped: Vec<String>,
}

#[derive(Serialize)]
pub struct ImportJson {
    pub friends_added: Vec<String>,
    pub records_added: usize,
    pub header_skipped: bool,
}

#[derive(Serialize)]
pub struct RenameJson {
    pub old_name: String,
    pub new_name: String,
    pub ledger_updates: usize,
}

#[derive(Serialize)]
pub struct RemovalJson {
    pub name: String,
    pub records_dropped: usize,
}

pub fn friends_to_json(hits: &[FriendHit]) -> Vec<FriendJson> {
    hits.iter()
        .map(|h| FriendJson {
            position: h.index + 1,
            name: h.name.to_string(),
        })
        .collect()
}

pub fn save_to_json(save: &PostcardSave) -> SaveJson {
    SaveJson {
        postcard: save.postcard.clone(),
        stamped: save.stamped.clone(),
        kept: save.kept.clone(),
        dropped: save.dropped.clone(),
    }
}

pub fn import_to_json(result: &ImportResult) -> ImportJson {
    ImportJson {
        friends_added: result.friends_added.clone(),
        records_added: result.records_added,
        header_skipped: result.header_skipped,
    }
}

pub fn rename_to_json(rename: &FriendRename) -> RenameJson {
    RenameJson {
        old_name: rename.old_name.clone(),
        new_name: rename.new_name.clone(),
        ledger_updates: rename.ledger_updates,
    }
}

pub fn removal_to_json(removal: &FriendRemoval) -> RemovalJson {
    RemovalJson {
        name: removal.name.clone(),
        records_dropped: removal.records_dropped,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Format one delivery as shown under a postcard
pub fn format_delivery(friend: &str, date: &str) -> String {
    format!("【{}】 {}", friend, date)
}

/// Format the grouped table: postcard names in a left column padded to the
/// widest name, one delivery per line.
pub fn format_table(groups: &[PostcardGroup]) -> Vec<String> {
    let width = groups
        .iter()
        .map(|g| display_width(&g.postcard))
        .max()
        .unwrap_or(0)
        .min(MAX_POSTCARD_WIDTH);

    let mut lines = Vec::new();
    for group in groups {
        for (i, d) in group.deliveries.iter().enumerate() {
            let label = if i == 0 {
                truncate_to_width(&group.postcard, width)
            } else {
                String::new()
            };
            lines.push(format!(
                "{}  {}",
                pad_to_width(&label, width),
                format_delivery(&d.friend, &d.date)
            ));
        }
    }
    lines
}

/// Format the friend list with 1-based positions
pub fn format_friend_list(hits: &[FriendHit]) -> Vec<String> {
    let width = hits.last().map_or(1, |h| (h.index + 1).to_string().len());
    hits.iter()
        .map(|h| format!("#{:<width$}  {}", h.index + 1, h.name, width = width))
        .collect()
}

/// Summarize a save for the terminal
pub fn format_save(save: &PostcardSave) -> String {
    let mut parts = Vec::new();
    if !save.stamped.is_empty() {
        parts.push(format!("sent to {}", save.stamped.join(", ")));
    }
    if !save.kept.is_empty() {
        parts.push(format!("kept {}", save.kept.join(", ")));
    }
    if !save.dropped.is_empty() {
        parts.push(format!("removed {}", save.dropped.join(", ")));
    }
    format!("{}: {}", save.postcard, parts.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::Delivery;
    use pretty_assertions::assert_eq;

    fn group(postcard: &str, deliveries: &[(&str, &str)]) -> PostcardGroup {
        PostcardGroup {
            postcard: postcard.to_string(),
            deliveries: deliveries
                .iter()
                .map(|(f, d)| Delivery {
                    friend: f.to_string(),
                    date: d.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn table_aligns_on_widest_postcard() {
        let groups = vec![
            group("Beach", &[("Bo", "2025-01-03")]),
            group("Sunset", &[("Ann", "2025-01-02"), ("Bo", "2025-01-04")]),
        ];
        assert_eq!(
            format_table(&groups),
            vec![
                "Beach   【Bo】 2025-01-03",
                "Sunset  【Ann】 2025-01-02",
                "        【Bo】 2025-01-04",
            ]
        );
    }

    #[test]
    fn table_pads_by_display_width() {
        let groups = vec![
            group("花", &[("Ann", "d1")]),
            group("Moon", &[("Bo", "d2")]),
        ];
        assert_eq!(
            format_table(&groups),
            vec!["花    【Ann】 d1", "Moon  【Bo】 d2"]
        );
    }

    #[test]
    fn long_postcard_names_are_truncated() {
        let long = "x".repeat(40);
        let lines = format_table(&[group(&long, &[("Ann", "d1")])]);
        assert_eq!(lines[0], format!("{}\u{2026}  【Ann】 d1", "x".repeat(29)));
    }

    #[test]
    fn empty_table_has_no_lines() {
        assert!(format_table(&[]).is_empty());
    }

    #[test]
    fn friend_list_positions_are_one_based() {
        let hits = vec![
            FriendHit { index: 0, name: "Ann" },
            FriendHit { index: 9, name: "Jo" },
        ];
        insta::assert_snapshot!(format_friend_list(&hits).join("\n"), @r"
        #1   Ann
        #10  Jo
        ");
    }

    #[test]
    fn save_summary_lists_each_kind() {
        let save = PostcardSave {
            postcard: "Sunset".into(),
            stamped: vec!["Cy".into()],
            kept: vec!["Ann".into()],
            dropped: vec!["Bo".into()],
        };
        assert_eq!(format_save(&save), "Sunset: sent to Cy; kept Ann; removed Bo");
    }
}
