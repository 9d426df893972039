use super::friend::FriendRegistry;
use super::record::Ledger;

/// Both collections of a book, as held in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Book {
    pub friends: FriendRegistry,
    pub ledger: Ledger,
}

impl Book {
    pub fn new(friends: FriendRegistry, ledger: Ledger) -> Self {
        Book { friends, ledger }
    }

    /// True when neither friends nor records exist
    pub fn is_pristine(&self) -> bool {
        self.friends.is_empty() && self.ledger.is_empty()
    }
}
