use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::io::config_io::CONFIG_FILE;
use crate::io::store::{FRIENDS_KEY, RECORDS_KEY, Storage, StoreError};
use crate::model::book::Book;
use crate::model::friend::FriendRegistry;
use crate::model::record::Ledger;

/// Name of the directory holding a book's files
pub const BOOK_DIR: &str = "postbook";

/// Which collections an operation changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Changed {
    pub friends: bool,
    pub records: bool,
}

impl Changed {
    pub const FRIENDS: Changed = Changed { friends: true, records: false };
    pub const RECORDS: Changed = Changed { friends: false, records: true };
    pub const BOTH: Changed = Changed { friends: true, records: true };
}

/// Walk up from `start` looking for a `postbook/` directory with a book.toml.
/// Returns the book directory itself.
pub fn discover_book(start: &Path) -> Result<PathBuf, StoreError> {
    let mut current = start.to_path_buf();
    loop {
        let book_dir = current.join(BOOK_DIR);
        if book_dir.is_dir() && book_dir.join(CONFIG_FILE).exists() {
            return Ok(book_dir);
        }
        if !current.pop() {
            return Err(StoreError::NotABook);
        }
    }
}

/// Load both collections. A missing key is an empty list; so is a key whose
/// content does not parse, after the store has been given the raw text to
/// keep.
pub fn load_book<S: Storage>(store: &mut S) -> Result<Book, StoreError> {
    let friends: FriendRegistry = load_key(store, FRIENDS_KEY)?;
    let ledger: Ledger = load_key(store, RECORDS_KEY)?;
    log::debug!("loaded {} friends, {} records", friends.len(), ledger.len());
    Ok(Book::new(friends, ledger))
}

fn load_key<S: Storage, T: DeserializeOwned + Default>(store: &mut S, key: &str) -> Result<T, StoreError> {
    let Some(raw) = store.load(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            log::warn!("stored {} could not be parsed ({}); starting empty", key, e);
            store.quarantine(key, &raw);
            Ok(T::default())
        }
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::StorageUnavailable {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Persist the collections flagged in `changed`, both or neither.
///
/// Friends are written first. If the records write then fails, the previous
/// friends value from `before` is written back before the error is returned.
pub fn persist<S: Storage>(
    store: &mut S,
    before: &Book,
    after: &Book,
    changed: Changed,
) -> Result<(), StoreError> {
    let friends = if changed.friends {
        Some(encode(FRIENDS_KEY, &after.friends)?)
    } else {
        None
    };
    let records = if changed.records {
        Some(encode(RECORDS_KEY, &after.ledger)?)
    } else {
        None
    };

    if let Some(friends) = &friends {
        store.save(FRIENDS_KEY, friends)?;
    }
    if let Some(records) = &records
        && let Err(e) = store.save(RECORDS_KEY, records)
    {
        if friends.is_some() {
            let previous = encode(FRIENDS_KEY, &before.friends)?;
            if let Err(undo) = store.save(FRIENDS_KEY, &previous) {
                log::error!("could not restore friends after failed records write: {}", undo);
            }
        }
        return Err(e);
    }
    Ok(())
}

/// Remove both keys from the store. If the friends key cannot be removed,
/// the records from `before` are written back.
pub fn clear_storage<S: Storage>(store: &mut S, before: &Book) -> Result<(), StoreError> {
    store.remove(RECORDS_KEY)?;
    if let Err(e) = store.remove(FRIENDS_KEY) {
        let previous = encode(RECORDS_KEY, &before.ledger)?;
        if let Err(undo) = store.save(RECORDS_KEY, &previous) {
            log::error!("could not restore records after failed clear: {}", undo);
        }
        return Err(e);
    }
    Ok(())
}
