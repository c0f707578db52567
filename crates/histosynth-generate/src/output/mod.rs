pub mod csv;

pub use self::csv::{write_full_view, write_history, write_synthesized, write_table};
