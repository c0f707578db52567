//! Loaders for historical tables.

pub mod csv;

pub use self::csv::load_history;
