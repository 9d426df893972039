use indexmap::IndexSet;

use crate::io::book_io::{self, Changed};
use crate::io::prompt::Confirm;
use crate::io::store::{Storage, StoreError};
use crate::model::book::Book;
use crate::model::config::BookConfig;
use crate::model::friend::FriendId;
use crate::model::record::{PostcardGroup, SendRecord};
use crate::ops::friend_ops::{self, FriendError, FriendRemoval, FriendRename};
use crate::ops::import::{self, CsvError, ImportResult};
use crate::ops::postcard_ops::{self, PostcardError, PostcardSave};
use crate::ops::export;
use crate::util::date::today_str;

/// Any failure a book operation can report
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    #[error(transparent)]
    Friend(#[from] FriendError),
    #[error(transparent)]
    Postcard(#[from] PostcardError),
    #[error(transparent)]
    Csv(#[from] CsvError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A loaded book bound to its store.
///
/// Every mutation runs against a copy of the book, is persisted, and only
/// then replaces the in-memory state. A failed write leaves memory as it was.
pub struct Postbook<S: Storage> {
    store: S,
    book: Book,
    config: BookConfig,
    fixed_today: Option<String>,
}

impl<S: Storage> Postbook<S> {
    /// Load both collections from `store`.
    pub fn open(mut store: S, config: BookConfig) -> Result<Self, BookError> {
        let book = book_io::load_book(&mut store)?;
        Ok(Postbook {
            store,
            book,
            config,
            fixed_today: None,
        })
    }

    /// Stamp new records with `today` instead of the clock.
    pub fn with_today(mut self, today: impl Into<String>) -> Self {
        self.fixed_today = Some(today.into());
        self
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn today(&self) -> String {
        match &self.fixed_today {
            Some(today) => today.clone(),
            None => today_str(&self.config.dates.format),
        }
    }

    fn apply<T, E>(
        &mut self,
        changed: Changed,
        op: impl FnOnce(&mut Book) -> Result<T, E>,
    ) -> Result<T, BookError>
    where
        BookError: From<E>,
    {
        let mut next = self.book.clone();
        let out = op(&mut next)?;
        book_io::persist(&mut self.store, &self.book, &next, changed)?;
        self.book = next;
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Friends
    // -----------------------------------------------------------------------

    pub fn contains_friend(&self, name: &str) -> bool {
        self.book.friends.contains(name)
    }

    pub fn list_friends(&self) -> Vec<&str> {
        self.book.friends.names()
    }

    pub fn add_friend(&mut self, name: &str) -> Result<FriendId, BookError> {
        let id = self.apply(Changed::FRIENDS, |book| {
            friend_ops::add_friend(&mut book.friends, name)
        })?;
        log::info!("added friend {:?}", name.trim());
        Ok(id)
    }

    /// Rename the friend shown at `index` as `old_name`.
    pub fn rename_friend(
        &mut self,
        index: usize,
        old_name: &str,
        new_name: &str,
    ) -> Result<FriendRename, BookError> {
        let id = friend_ops::resolve_index(&self.book.friends, index, old_name)?;
        let rename = self.apply(Changed::BOTH, |book| {
            friend_ops::rename_friend(book, id, new_name)
        })?;
        log::info!(
            "renamed friend {:?} to {:?} ({} record entries)",
            rename.old_name,
            rename.new_name,
            rename.ledger_updates
        );
        Ok(rename)
    }

    /// Remove the friend shown at `index` as `name`, after confirmation.
    /// `Ok(None)` means the confirmation was declined.
    pub fn remove_friend(
        &mut self,
        index: usize,
        name: &str,
        confirm: &mut dyn Confirm,
    ) -> Result<Option<FriendRemoval>, BookError> {
        let id = friend_ops::resolve_index(&self.book.friends, index, name)?;
        let question = format!(
            "Delete \"{}\"? They will also be removed from every postcard record.",
            name
        );
        if !confirm.confirm(&question) {
            return Ok(None);
        }
        let removal = self.apply(Changed::BOTH, |book| friend_ops::remove_friend(book, id))?;
        log::info!(
            "removed friend {:?} ({} records dropped)",
            removal.name,
            removal.records_dropped
        );
        Ok(Some(removal))
    }

    // -----------------------------------------------------------------------
    // Postcards
    // -----------------------------------------------------------------------

    /// Create a postcard, or with `edit_of` replace an existing one.
    pub fn save_postcard(
        &mut self,
        postcard: &str,
        selected: &[String],
        edit_of: Option<&str>,
    ) -> Result<PostcardSave, BookError> {
        let today = self.today();
        let save = self.apply(Changed::RECORDS, |book| {
            postcard_ops::save_postcard(&mut book.ledger, postcard, selected, edit_of, &today)
        })?;
        log::info!(
            "saved postcard {:?}: {} stamped, {} kept, {} dropped",
            save.postcard,
            save.stamped.len(),
            save.kept.len(),
            save.dropped.len()
        );
        Ok(save)
    }

    /// Remove every record of `postcard`, after confirmation.
    /// `Ok(None)` means the confirmation was declined.
    pub fn remove_postcard(
        &mut self,
        postcard: &str,
        confirm: &mut dyn Confirm,
    ) -> Result<Option<Vec<SendRecord>>, BookError> {
        if !self.book.ledger.contains_postcard(postcard) {
            return Err(PostcardError::NotFound(postcard.to_string()).into());
        }
        if !confirm.confirm(&format!("Delete \"{}\"?", postcard)) {
            return Ok(None);
        }
        let removed = self.apply(Changed::RECORDS, |book| {
            postcard_ops::remove_postcard(&mut book.ledger, postcard)
        })?;
        log::info!("removed postcard {:?} ({} records)", postcard, removed.len());
        Ok(Some(removed))
    }

    pub fn grouped_view(&self) -> Vec<PostcardGroup> {
        self.book.ledger.grouped_view()
    }

    pub fn distinct_postcard_names(&self) -> IndexSet<&str> {
        self.book.ledger.distinct_postcard_names()
    }

    // -----------------------------------------------------------------------
    // CSV and clearing
    // -----------------------------------------------------------------------

    pub fn export_csv(&self) -> String {
        export::export_csv(&self.book.ledger, &self.config.csv.header)
    }

    /// Import CSV text into an empty book.
    pub fn import_csv(&mut self, text: &str) -> Result<ImportResult, BookError> {
        let today = self.today();
        let csv = self.config.csv.clone();
        let result = self.apply(Changed::BOTH, |book| {
            import::import_csv(text, book, &csv, &today)
        })?;
        log::info!(
            "imported {} records, {} new friends",
            result.records_added,
            result.friends_added.len()
        );
        Ok(result)
    }

    /// Erase every friend and record. Asks twice; returns whether it ran.
    pub fn clear_all(&mut self, confirm: &mut dyn Confirm) -> Result<bool, BookError> {
        if !confirm.confirm("Clear all data? This cannot be undone.") {
            return Ok(false);
        }
        if !confirm.confirm("Really clear every friend and postcard?") {
            return Ok(false);
        }
        book_io::clear_storage(&mut self.store, &self.book)?;
        self.book = Book::default();
        log::info!("cleared all data");
        Ok(true)
    }
}
