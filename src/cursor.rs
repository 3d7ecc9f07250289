//! Cursor: a logical `(page_num, cell_num)` position over a table (spec §4.6).
//!
//! `table_start`/`table_find` (which need tree-search logic) live in
//! `btree`; this module holds the cursor's shape and the operations that
//! only need the position itself — reading/writing the cell it points at,
//! and stepping forward in key order.

use crate::error::Error;
use crate::node;
use crate::row::{Row, ROW_SIZE};
use crate::table::Table;

pub struct Cursor<'a> {
    pub table: &'a mut Table,
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

impl<'a> Cursor<'a> {
    /// Reads the row stored at the cursor's current position.
    pub fn value(&mut self) -> Result<Row, Error> {
        let page = self.table.pager.get_page(self.page_num)?;
        let bytes: [u8; ROW_SIZE] = node::leaf_value(page, self.cell_num as usize)
            .try_into()
            .expect("leaf cell value is exactly ROW_SIZE bytes");
        Ok(Row::deserialize(&bytes))
    }

    /// Advances to the next cell in ascending key order (spec §4.4),
    /// following `next_leaf` across leaf boundaries and setting
    /// `end_of_table` once the last leaf is exhausted.
    pub fn advance(&mut self) -> Result<(), Error> {
        let page = self.table.pager.get_page(self.page_num)?;
        self.cell_num += 1;
        if self.cell_num >= node::leaf_num_cells(page) {
            let next = node::leaf_next_leaf(page);
            if next == 0 {
                self.end_of_table = true;
            } else {
                self.page_num = next;
                self.cell_num = 0;
            }
        }
        Ok(())
    }
}
