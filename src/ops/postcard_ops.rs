use indexmap::IndexSet;

use crate::model::record::{Ledger, SendRecord};

/// Error type for postcard operations
#[derive(Debug, thiserror::Error)]
pub enum PostcardError {
    #[error("postcard name cannot be empty")]
    EmptyPostcardName,
    #[error("select at least one friend")]
    NoFriendsSelected,
    #[error("postcard not found: {0}")]
    NotFound(String),
}

/// What a save did, per friend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostcardSave {
    pub postcard: String,
    /// Friends stamped with today's date
    pub stamped: Vec<String>,
    /// Friends whose earlier send date was carried over
    pub kept: Vec<String>,
    /// Friends that were on the edited postcard but are no longer selected
    pub dropped: Vec<String>,
}

/// Create or replace the send records of a postcard.
///
/// Without `edit_of` one record per selected friend is appended, each dated
/// `today`. With `edit_of` every record of that postcard is replaced: friends
/// that stay selected keep the first date they had under it, new friends get
/// `today`, and deselected friends lose their entries.
pub fn save_postcard(
    ledger: &mut Ledger,
    postcard: &str,
    selected: &[String],
    edit_of: Option<&str>,
    today: &str,
) -> Result<PostcardSave, PostcardError> {
    let postcard = postcard.trim();
    if postcard.is_empty() {
        return Err(PostcardError::EmptyPostcardName);
    }
    let selected: IndexSet<&str> = selected.iter().map(String::as_str).collect();
    if selected.is_empty() {
        return Err(PostcardError::NoFriendsSelected);
    }

    let mut result = PostcardSave {
        postcard: postcard.to_string(),
        ..Default::default()
    };

    let prior = match edit_of {
        Some(old) => {
            if !ledger.contains_postcard(old) {
                return Err(PostcardError::NotFound(old.to_string()));
            }
            let prior = ledger.dates_for(old);
            ledger.remove_postcard(old);
            result.dropped = prior
                .keys()
                .filter(|f| !selected.contains(f.as_str()))
                .cloned()
                .collect();
            prior
        }
        None => Default::default(),
    };

    for friend in selected {
        let date = match prior.get(friend) {
            Some(date) => {
                result.kept.push(friend.to_string());
                date.clone()
            }
            None => {
                result.stamped.push(friend.to_string());
                today.to_string()
            }
        };
        ledger.records.push(SendRecord::new(postcard, friend, date));
    }

    Ok(result)
}

/// Delete every record of `postcard`. Returns what was removed.
pub fn remove_postcard(ledger: &mut Ledger, postcard: &str) -> Result<Vec<SendRecord>, PostcardError> {
    let removed = ledger.remove_postcard(postcard);
    if removed.is_empty() {
        return Err(PostcardError::NotFound(postcard.to_string()));
    }
    Ok(removed)
}
