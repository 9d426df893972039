pub mod book_io;
pub mod config_io;
pub mod lock;
pub mod prompt;
pub mod recovery;
pub mod store;
