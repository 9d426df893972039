pub mod export;
pub mod friend_ops;
pub mod import;
pub mod postcard_ops;
pub mod search;
