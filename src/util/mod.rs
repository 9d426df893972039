pub mod date;
pub mod unicode;
