//! Core library for the embedded single-table B+ tree key-value store
//! (spec §1–§5): pager, node codec, tree search/insert, cursor and table
//! lifecycle. The shell (`bin/nanosqlite.rs`) is the only consumer of
//! this crate's public surface.

pub mod btree;
pub mod cursor;
pub mod error;
pub mod node;
pub mod pager;
pub mod row;
pub mod table;

pub use btree::{execute_insert, execute_select, print_tree, table_find, table_start};
pub use cursor::Cursor;
pub use error::Error;
pub use row::{prepare_insert, Row};
pub use table::Table;
