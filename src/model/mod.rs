pub mod book;
pub mod config;
pub mod friend;
pub mod record;

pub use book::*;
pub use config::*;
pub use friend::*;
pub use record::*;
