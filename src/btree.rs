//! B+ tree search, ordered scan, insertion, leaf splitting and root
//! promotion (spec §4.3–§4.5), built on top of the pager and node codec.

use tracing::{debug, warn};

use crate::cursor::Cursor;
use crate::error::Error;
use crate::node::{self, NodeType, LEAF_LEFT_COUNT, LEAF_MAX_CELLS, LEAF_RIGHT_COUNT};
use crate::pager::{Page, Pager};
use crate::row::Row;
use crate::table::Table;

/// Smallest leaf cell index `i` such that `key(i) >= key` (spec §4.3).
fn leaf_find_position(page: &Page, key: u32) -> u32 {
    let mut lo = 0u32;
    let mut hi = node::leaf_num_cells(page);
    while lo != hi {
        let mid = lo + (hi - lo) / 2;
        let k = node::leaf_key(page, mid as usize);
        if k == key {
            return mid;
        }
        if key < k {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Smallest internal child index `i` such that `key(i) >= key` (spec §4.3).
fn internal_find_child_index(page: &Page, key: u32) -> u32 {
    let mut lo = 0u32;
    let mut hi = node::internal_num_keys(page);
    while lo != hi {
        let mid = lo + (hi - lo) / 2;
        let k = node::internal_key(page, mid).expect("mid is within num_keys by construction");
        if key <= k {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// `table_find` (spec §4.3): descends from the root, returning a cursor on
/// the matching key or on the position it would be inserted at.
pub fn table_find<'a>(table: &'a mut Table, key: u32) -> Result<Cursor<'a>, Error> {
    let mut page_num = table.root_page_num;
    loop {
        let mut next_page_num = None;
        {
            let page = table.pager.get_page(page_num)?;
            match node::node_type(page)? {
                NodeType::Leaf => {
                    let cell_num = leaf_find_position(page, key);
                    return Ok(Cursor {
                        table,
                        page_num,
                        cell_num,
                        end_of_table: false,
                    });
                }
                NodeType::Internal => {
                    let child_index = internal_find_child_index(page, key);
                    next_page_num = Some(node::internal_child(page, child_index)?);
                }
            }
        }
        page_num = next_page_num.expect("internal branch always sets next_page_num");
    }
}

/// `table_start` (spec §4.4): a cursor on the minimum key, i.e. cell 0 of
/// the leftmost leaf.
pub fn table_start<'a>(table: &'a mut Table) -> Result<Cursor<'a>, Error> {
    let mut cursor = table_find(table, 0)?;
    let page = cursor.table.pager.get_page(cursor.page_num)?;
    cursor.end_of_table = node::leaf_num_cells(page) == 0;
    Ok(cursor)
}

/// `execute_insert` (spec §4.5, §6.2): rejects duplicate keys, otherwise
/// inserts the row, splitting the leaf (and promoting a new root, if the
/// leaf that split was the root) as needed.
pub fn execute_insert(table: &mut Table, row: &Row) -> Result<(), Error> {
    let mut cursor = table_find(table, row.id)?;

    {
        let page = cursor.table.pager.get_page(cursor.page_num)?;
        if cursor.cell_num < node::leaf_num_cells(page)
            && node::leaf_key(page, cursor.cell_num as usize) == row.id
        {
            return Err(Error::DuplicateKey(row.id));
        }
    }

    leaf_insert(&mut cursor, row.id, row)
}

/// `execute_select` (spec §4.4, §6.2): every row in ascending key order.
pub fn execute_select(table: &mut Table) -> Result<Vec<Row>, Error> {
    let mut cursor = table_start(table)?;
    let mut rows = Vec::new();
    while !cursor.end_of_table {
        rows.push(cursor.value()?);
        cursor.advance()?;
    }
    Ok(rows)
}

fn leaf_insert(cursor: &mut Cursor, key: u32, row: &Row) -> Result<(), Error> {
    let num_cells = {
        let page = cursor.table.pager.get_page(cursor.page_num)?;
        node::leaf_num_cells(page)
    };

    if (num_cells as usize) < LEAF_MAX_CELLS {
        let page = cursor.table.pager.get_page(cursor.page_num)?;
        let mut i = num_cells;
        while i > cursor.cell_num {
            node::shift_leaf_cell(page, (i - 1) as usize, i as usize);
            i -= 1;
        }
        node::set_leaf_key(page, cursor.cell_num as usize, key);
        node::leaf_value_mut(page, cursor.cell_num as usize).copy_from_slice(&row.serialize());
        node::set_leaf_num_cells(page, num_cells + 1);
        Ok(())
    } else {
        warn!(page_num = cursor.page_num, "leaf full, splitting");
        leaf_split_and_insert(cursor, key, row)
    }
}

/// `leaf_split_and_insert` (spec §4.5). Only the root-promotion path is
/// implemented: a non-root leaf filling raises `UnsupportedSplit` (spec
/// §9's documented open question, decided in DESIGN.md — tree height is
/// bounded at 2).
fn leaf_split_and_insert(cursor: &mut Cursor, key: u32, row: &Row) -> Result<(), Error> {
    let old_page_num = cursor.page_num;
    let was_root = node::is_root(cursor.table.pager.get_page(old_page_num)?);
    if !was_root {
        return Err(Error::UnsupportedSplit);
    }

    let new_page_num = cursor.table.pager.unused_page_num();
    {
        let new_page = cursor.table.pager.get_page(new_page_num)?;
        node::init_leaf(new_page);
    }

    let old_next_leaf = node::leaf_next_leaf(cursor.table.pager.get_page(old_page_num)?);
    node::set_leaf_next_leaf(cursor.table.pager.get_page(new_page_num)?, old_next_leaf);
    node::set_leaf_next_leaf(cursor.table.pager.get_page(old_page_num)?, new_page_num);

    // Snapshot the old page so the redistribution loop below can read
    // source cells independently of which buffer (old or new) it writes to.
    let old_snapshot: Page = *cursor.table.pager.get_page(old_page_num)?;
    let insert_at = cursor.cell_num as usize;

    for i in (0..=LEAF_MAX_CELLS).rev() {
        let goes_right = i >= LEAF_LEFT_COUNT;
        let dest_index = i % LEAF_LEFT_COUNT;
        let dest_page_num = if goes_right { new_page_num } else { old_page_num };
        let dest_page = cursor.table.pager.get_page(dest_page_num)?;

        if i == insert_at {
            node::set_leaf_key(dest_page, dest_index, key);
            node::leaf_value_mut(dest_page, dest_index).copy_from_slice(&row.serialize());
        } else {
            let src_index = if i > insert_at { i - 1 } else { i };
            node::copy_leaf_cell(dest_page, dest_index, &old_snapshot, src_index);
        }
    }

    node::set_leaf_num_cells(cursor.table.pager.get_page(old_page_num)?, LEAF_LEFT_COUNT as u32);
    node::set_leaf_num_cells(cursor.table.pager.get_page(new_page_num)?, LEAF_RIGHT_COUNT as u32);

    debug!(old_page_num, new_page_num, "split leaf, promoting new root");
    create_new_root(cursor.table, new_page_num)
}

/// Converts the root (a full leaf, just split into `{root, right}`) into an
/// internal node with two leaf children, while keeping the root's page
/// number at 0 (spec §4.5 step 5, §9 "root page invariance").
fn create_new_root(table: &mut Table, right_child_page_num: u32) -> Result<(), Error> {
    let left_page_num = table.pager.unused_page_num();
    let root_snapshot: Page = *table.pager.get_page(table.root_page_num)?;

    {
        let left_page = table.pager.get_page(left_page_num)?;
        *left_page = root_snapshot;
        node::set_is_root(left_page, false);
    }

    let left_max_key = node::max_key(table.pager.get_page(left_page_num)?)?;

    let root_page = table.pager.get_page(table.root_page_num)?;
    node::init_internal(root_page);
    node::set_is_root(root_page, true);
    node::set_internal_num_keys(root_page, 1);
    node::set_internal_child(root_page, 0, left_page_num);
    node::set_internal_key(root_page, 0, left_max_key);
    node::set_internal_right_child(root_page, right_child_page_num);

    debug!(left_page_num, right_child_page_num, "created new root");
    Ok(())
}

/// `print_tree` (spec §6.2): a diagnostic dump of the tree shape, used by
/// the `.btree` meta-command.
pub fn print_tree(pager: &mut Pager, page_num: u32) -> Result<String, Error> {
    let mut out = String::new();
    print_tree_rec(pager, page_num, 0, &mut out)?;
    Ok(out)
}

fn print_tree_rec(pager: &mut Pager, page_num: u32, indent: u32, out: &mut String) -> Result<(), Error> {
    enum Shape {
        Leaf { keys: Vec<u32> },
        Internal { children: Vec<u32>, keys: Vec<u32>, right_child: u32 },
    }

    let shape = {
        let page = pager.get_page(page_num)?;
        match node::node_type(page)? {
            NodeType::Leaf => {
                let n = node::leaf_num_cells(page);
                let keys = (0..n).map(|i| node::leaf_key(page, i as usize)).collect();
                Shape::Leaf { keys }
            }
            NodeType::Internal => {
                let n = node::internal_num_keys(page);
                let mut children = Vec::with_capacity(n as usize);
                let mut keys = Vec::with_capacity(n as usize);
                for i in 0..n {
                    children.push(node::internal_child(page, i)?);
                    keys.push(node::internal_key(page, i)?);
                }
                let right_child = node::internal_right_child(page);
                Shape::Internal {
                    children,
                    keys,
                    right_child,
                }
            }
        }
    };

    match shape {
        Shape::Leaf { keys } => {
            push_indent(out, indent);
            out.push_str(&format!("- leaf (size {})\n", keys.len()));
            for k in keys {
                push_indent(out, indent + 1);
                out.push_str(&format!("- {k}\n"));
            }
        }
        Shape::Internal {
            children,
            keys,
            right_child,
        } => {
            push_indent(out, indent);
            out.push_str(&format!("- internal (size {})\n", keys.len()));
            for (child, key) in children.into_iter().zip(keys.into_iter()) {
                print_tree_rec(pager, child, indent + 1, out)?;
                push_indent(out, indent + 1);
                out.push_str(&format!("- key {key}\n"));
            }
            print_tree_rec(pager, right_child, indent + 1, out)?;
        }
    }
    Ok(())
}

fn push_indent(out: &mut String, level: u32) {
    for _ in 0..level {
        out.push_str("  ");
    }
}
