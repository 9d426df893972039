use crate::model::book::Book;
use crate::model::friend::{FriendId, FriendRegistry};

/// Error type for friend operations
#[derive(Debug, thiserror::Error)]
pub enum FriendError {
    #[error("friend name cannot be empty")]
    EmptyName,
    #[error("friend already exists: {0}")]
    DuplicateName(String),
    #[error("no friend \"{name}\" at position {index}; the list changed, reload and retry")]
    StaleIndex { index: usize, name: String },
    #[error("friend not found: {0}")]
    NotFound(String),
    #[error("that friend is no longer in the list; reload and retry")]
    Gone(FriendId),
}

/// Result of a rename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendRename {
    pub old_name: String,
    pub new_name: String,
    /// Number of friend-list entries rewritten in the ledger
    pub ledger_updates: usize,
}

/// Result of a removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendRemoval {
    pub name: String,
    /// Records dropped because this friend was their only recipient
    pub records_dropped: usize,
}

/// Translate a list position plus the name the caller saw there into a
/// stable id.
pub fn resolve_index(
    registry: &FriendRegistry,
    index: usize,
    name: &str,
) -> Result<FriendId, FriendError> {
    registry
        .id_at(index, name)
        .ok_or_else(|| FriendError::StaleIndex {
            index,
            name: name.to_string(),
        })
}

/// Append a new friend. Names are trimmed and must be unique (exact match).
pub fn add_friend(registry: &mut FriendRegistry, name: &str) -> Result<FriendId, FriendError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FriendError::EmptyName);
    }
    if registry.contains(name) {
        return Err(FriendError::DuplicateName(name.to_string()));
    }
    Ok(registry.push(name.to_string()))
}

/// Rename a friend in place and rewrite every ledger reference to it.
///
/// Renaming to the current name is a no-op that still succeeds.
pub fn rename_friend(
    book: &mut Book,
    id: FriendId,
    new_name: &str,
) -> Result<FriendRename, FriendError> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(FriendError::EmptyName);
    }
    let old_name = book
        .friends
        .get(id)
        .map(|f| f.name.clone())
        .ok_or(FriendError::Gone(id))?;

    if new_name == old_name {
        return Ok(FriendRename {
            new_name: old_name.clone(),
            old_name,
            ledger_updates: 0,
        });
    }
    if book.friends.contains(new_name) {
        return Err(FriendError::DuplicateName(new_name.to_string()));
    }

    book.friends.set_name(id, new_name.to_string());
    let ledger_updates = book.ledger.rename_friend(&old_name, new_name);

    Ok(FriendRename {
        old_name,
        new_name: new_name.to_string(),
        ledger_updates,
    })
}

/// Remove a friend and strip them from every record.
pub fn remove_friend(book: &mut Book, id: FriendId) -> Result<FriendRemoval, FriendError> {
    let friend = book
        .friends
        .remove(id)
        .ok_or(FriendError::Gone(id))?;
    let records_dropped = book.ledger.remove_friend(&friend.name);
    Ok(FriendRemoval {
        name: friend.name,
        records_dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::{Ledger, SendRecord};
    use pretty_assertions::assert_eq;

    fn sample_book() -> Book {
        Book::new(
            FriendRegistry::from_names(["Ann", "Bo", "Cy"]),
            Ledger::from_records(vec![
                SendRecord::new("Sunset", "Ann", "2025-03-01"),
                SendRecord::new("Sunset", "Bo", "2025-03-02"),
                SendRecord {
                    postcard: "Legacy".into(),
                    friends: vec!["Ann".into(), "Cy".into(), "Ann".into()],
                    date: "2024-12-24".into(),
                },
            ]),
        )
    }

    #[test]
    fn add_rejects_exact_duplicate() {
        let mut book = sample_book();
        let before = book.friends.clone();
        let err = add_friend(&mut book.friends, "Bo").unwrap_err();
        assert!(matches!(err, FriendError::DuplicateName(ref n) if n == "Bo"));
        assert_eq!(book.friends, before);
    }

    #[test]
    fn add_is_case_sensitive_and_trims() {
        let mut reg = FriendRegistry::from_names(["Bo"]);
        add_friend(&mut reg, "  bo ").unwrap();
        assert_eq!(reg.names(), vec!["Bo", "bo"]);
    }

    #[test]
    fn add_rejects_blank() {
        let mut reg = FriendRegistry::new();
        assert!(matches!(add_friend(&mut reg, "   "), Err(FriendError::EmptyName)));
    }

    #[test]
    fn rename_onto_existing_name_fails_untouched() {
        let mut book = sample_book();
        let before = book.clone();
        let id = resolve_index(&book.friends, 0, "Ann").unwrap();
        let err = rename_friend(&mut book, id, "Bo").unwrap_err();
        assert!(matches!(err, FriendError::DuplicateName(_)));
        assert_eq!(book, before);
    }

    #[test]
    fn rename_cascades_into_ledger() {
        let mut book = sample_book();
        let id = resolve_index(&book.friends, 0, "Ann").unwrap();
        let outcome = rename_friend(&mut book, id, "Dee").unwrap();

        assert_eq!(outcome.ledger_updates, 3);
        assert_eq!(book.friends.names(), vec!["Dee", "Bo", "Cy"]);
        assert_eq!(book.ledger.records[0].friends, vec!["Dee"]);
        assert_eq!(book.ledger.records[2].friends, vec!["Dee", "Cy", "Dee"]);
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let mut book = sample_book();
        let before = book.clone();
        let id = resolve_index(&book.friends, 1, "Bo").unwrap();
        let outcome = rename_friend(&mut book, id, "Bo").unwrap();
        assert_eq!(outcome.ledger_updates, 0);
        assert_eq!(book, before);
    }

    #[test]
    fn remove_cascades_and_drops_sole_recipient_records() {
        let mut book = sample_book();
        let id = resolve_index(&book.friends, 0, "Ann").unwrap();
        let outcome = remove_friend(&mut book, id).unwrap();

        assert_eq!(outcome.records_dropped, 1);
        assert_eq!(book.friends.names(), vec!["Bo", "Cy"]);
        assert!(book.ledger.deliveries().all(|(_, f, _)| f != "Ann"));
        assert_eq!(book.ledger.records[1].friends, vec!["Cy"]);
    }

    #[test]
    fn stale_index_is_reported() {
        let book = sample_book();
        let err = resolve_index(&book.friends, 2, "Bo").unwrap_err();
        assert!(matches!(err, FriendError::StaleIndex { index: 2, .. }));
    }

    #[test]
    fn vanished_id_reports_a_readable_error() {
        let mut book = sample_book();
        let id = book.friends.id_of("Ann").unwrap();
        remove_friend(&mut book, id).unwrap();

        let err = rename_friend(&mut book, id, "Annie").unwrap_err();
        assert!(matches!(err, FriendError::Gone(_)));
        assert_eq!(err.to_string(), "that friend is no longer in the list; reload and retry");
        assert!(matches!(remove_friend(&mut book, id), Err(FriendError::Gone(_))));
    }
}
