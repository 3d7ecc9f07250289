//! B+ tree node codec (spec §3.3–§3.5, §4.2).
//!
//! Nodes live inside raw page buffers; every accessor here is a pure
//! function over a `&Page`/`&mut Page` slice. Per spec §9's design note,
//! there is deliberately no long-lived typed `Node` object that could
//! outlive the page it was read from — a page is materialized by the
//! pager, handed to these functions, and written back byte-for-byte.

use crate::error::Error;
use crate::pager::{Page, PAGE_SIZE};
use crate::row::ROW_SIZE;

// ---- Common header (spec §3.3) ----
// | node_type(1) | is_root(1) | parent_pointer(4) | [pad(1)] |
// Spec declares the common header as 7 bytes even though the three named
// fields only span 6; we reserve the seventh byte so every field offset
// named in spec.md (num_cells/num_keys at offset 7, etc.) lines up exactly.
const NODE_TYPE_OFFSET: usize = 0;
const IS_ROOT_OFFSET: usize = 1;
const PARENT_POINTER_OFFSET: usize = 2;
const PARENT_POINTER_SIZE: usize = 4;
pub const COMMON_NODE_HEADER_SIZE: usize = 7;

// ---- Leaf header (spec §3.4) ----
const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;
const LEAF_NODE_NEXT_LEAF_SIZE: usize = 4;
pub const LEAF_NODE_HEADER_SIZE: usize = LEAF_NODE_NEXT_LEAF_OFFSET + LEAF_NODE_NEXT_LEAF_SIZE;

const LEAF_NODE_KEY_SIZE: usize = 4;
const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;

/// Maximum cells a leaf can hold (13 with the spec's row layout).
pub const LEAF_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;
pub const LEAF_RIGHT_COUNT: usize = (LEAF_MAX_CELLS + 1) / 2;
pub const LEAF_LEFT_COUNT: usize = (LEAF_MAX_CELLS + 1) - LEAF_RIGHT_COUNT;

// ---- Internal header (spec §3.5) ----
const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    INTERNAL_NODE_RIGHT_CHILD_OFFSET + INTERNAL_NODE_RIGHT_CHILD_SIZE;

const INTERNAL_NODE_CHILD_SIZE: usize = 4;
const INTERNAL_NODE_KEY_SIZE: usize = 4;
const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;
const INTERNAL_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - INTERNAL_NODE_HEADER_SIZE;

/// Maximum (child, key) cells an internal node can hold. Only used to
/// detect the unsupported-split condition (spec §9) — this implementation
/// never actually fills an internal node since tree height is bounded at 2.
pub const INTERNAL_MAX_CELLS: usize = INTERNAL_NODE_SPACE_FOR_CELLS / INTERNAL_NODE_CELL_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal,
    Leaf,
}

fn u32_at(page: &Page, offset: usize) -> u32 {
    u32::from_le_bytes(page[offset..offset + 4].try_into().unwrap())
}

fn set_u32_at(page: &mut Page, offset: usize, value: u32) {
    page[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn node_type(page: &Page) -> Result<NodeType, Error> {
    match page[NODE_TYPE_OFFSET] {
        0 => Ok(NodeType::Internal),
        1 => Ok(NodeType::Leaf),
        other => Err(Error::CorruptFile(format!("invalid node type byte {other}"))),
    }
}

pub fn set_node_type(page: &mut Page, node_type: NodeType) {
    page[NODE_TYPE_OFFSET] = match node_type {
        NodeType::Internal => 0,
        NodeType::Leaf => 1,
    };
}

pub fn is_root(page: &Page) -> bool {
    page[IS_ROOT_OFFSET] == 1
}

pub fn set_is_root(page: &mut Page, value: bool) {
    page[IS_ROOT_OFFSET] = value as u8;
}

pub fn parent_pointer(page: &Page) -> u32 {
    u32_at(page, PARENT_POINTER_OFFSET)
}

pub fn set_parent_pointer(page: &mut Page, value: u32) {
    set_u32_at(page, PARENT_POINTER_OFFSET, value);
}

/// Last key of a leaf, or last key of an internal node (spec §4.2). This
/// implementation only ever calls `max_key` on leaves (tree height is
/// bounded at 2, see `btree::create_new_root`), but the internal-node
/// branch is implemented for completeness and symmetry with the spec.
pub fn max_key(page: &Page) -> Result<u32, Error> {
    match node_type(page)? {
        NodeType::Leaf => {
            let n = leaf_num_cells(page);
            if n == 0 {
                return Err(Error::CorruptFile("empty leaf has no max key".into()));
            }
            Ok(leaf_key(page, n - 1))
        }
        NodeType::Internal => {
            let n = internal_num_keys(page);
            if n == 0 {
                return Err(Error::CorruptFile("empty internal node has no max key".into()));
            }
            internal_key(page, n - 1)
        }
    }
}

// ---------- leaf accessors ----------

pub fn init_leaf(page: &mut Page) {
    *page = [0u8; PAGE_SIZE];
    set_node_type(page, NodeType::Leaf);
    set_is_root(page, false);
    set_leaf_num_cells(page, 0);
    set_leaf_next_leaf(page, 0);
}

pub fn leaf_num_cells(page: &Page) -> u32 {
    u32_at(page, LEAF_NODE_NUM_CELLS_OFFSET)
}

pub fn set_leaf_num_cells(page: &mut Page, n: u32) {
    set_u32_at(page, LEAF_NODE_NUM_CELLS_OFFSET, n);
}

pub fn leaf_next_leaf(page: &Page) -> u32 {
    u32_at(page, LEAF_NODE_NEXT_LEAF_OFFSET)
}

pub fn set_leaf_next_leaf(page: &mut Page, n: u32) {
    set_u32_at(page, LEAF_NODE_NEXT_LEAF_OFFSET, n);
}

fn leaf_cell_offset(cell_num: usize) -> usize {
    LEAF_NODE_HEADER_SIZE + cell_num * LEAF_NODE_CELL_SIZE
}

pub fn leaf_key(page: &Page, cell_num: usize) -> u32 {
    let offset = leaf_cell_offset(cell_num);
    u32_at(page, offset)
}

pub fn set_leaf_key(page: &mut Page, cell_num: usize, key: u32) {
    let offset = leaf_cell_offset(cell_num);
    set_u32_at(page, offset, key);
}

pub fn leaf_value(page: &Page, cell_num: usize) -> &[u8] {
    let offset = leaf_cell_offset(cell_num) + LEAF_NODE_KEY_SIZE;
    &page[offset..offset + LEAF_NODE_VALUE_SIZE]
}

pub fn leaf_value_mut(page: &mut Page, cell_num: usize) -> &mut [u8] {
    let offset = leaf_cell_offset(cell_num) + LEAF_NODE_KEY_SIZE;
    &mut page[offset..offset + LEAF_NODE_VALUE_SIZE]
}

/// Copies cell `src` of `src_page` into cell `dst` of `dst_page` (key and
/// value together). Used by `leaf_split_and_insert` to redistribute cells
/// between two distinct page buffers.
pub fn copy_leaf_cell(dst_page: &mut Page, dst: usize, src_page: &Page, src: usize) {
    let dst_off = leaf_cell_offset(dst);
    let src_off = leaf_cell_offset(src);
    let bytes: [u8; LEAF_NODE_CELL_SIZE] = src_page[src_off..src_off + LEAF_NODE_CELL_SIZE]
        .try_into()
        .unwrap();
    dst_page[dst_off..dst_off + LEAF_NODE_CELL_SIZE].copy_from_slice(&bytes);
}

/// Shifts cell `from` to cell slot `to` within a single page (used when
/// making room for an insert that does not require a split).
pub fn shift_leaf_cell(page: &mut Page, from: usize, to: usize) {
    let from_off = leaf_cell_offset(from);
    let to_off = leaf_cell_offset(to);
    let bytes: [u8; LEAF_NODE_CELL_SIZE] = page[from_off..from_off + LEAF_NODE_CELL_SIZE]
        .try_into()
        .unwrap();
    page[to_off..to_off + LEAF_NODE_CELL_SIZE].copy_from_slice(&bytes);
}

// ---------- internal accessors ----------

pub fn init_internal(page: &mut Page) {
    *page = [0u8; PAGE_SIZE];
    set_node_type(page, NodeType::Internal);
    set_is_root(page, false);
    set_internal_num_keys(page, 0);
    set_internal_right_child(page, 0);
}

pub fn internal_num_keys(page: &Page) -> u32 {
    u32_at(page, INTERNAL_NODE_NUM_KEYS_OFFSET)
}

pub fn set_internal_num_keys(page: &mut Page, n: u32) {
    set_u32_at(page, INTERNAL_NODE_NUM_KEYS_OFFSET, n);
}

pub fn internal_right_child(page: &Page) -> u32 {
    u32_at(page, INTERNAL_NODE_RIGHT_CHILD_OFFSET)
}

pub fn set_internal_right_child(page: &mut Page, child: u32) {
    set_u32_at(page, INTERNAL_NODE_RIGHT_CHILD_OFFSET, child);
}

fn internal_cell_offset(cell_num: usize) -> usize {
    INTERNAL_NODE_HEADER_SIZE + cell_num * INTERNAL_NODE_CELL_SIZE
}

/// Child pointer at `child_num` (spec §4.2): `right_child` when
/// `child_num == num_keys`, the matching cell's child slot when
/// `child_num < num_keys`, `BadChildIndex` otherwise.
pub fn internal_child(page: &Page, child_num: u32) -> Result<u32, Error> {
    let num_keys = internal_num_keys(page);
    if child_num == num_keys {
        Ok(internal_right_child(page))
    } else if child_num < num_keys {
        let offset = internal_cell_offset(child_num as usize);
        Ok(u32_at(page, offset))
    } else {
        Err(Error::BadChildIndex {
            index: child_num,
            num_keys,
        })
    }
}

pub fn set_internal_child(page: &mut Page, child_num: u32, child: u32) {
    let offset = internal_cell_offset(child_num as usize);
    set_u32_at(page, offset, child);
}

pub fn internal_key(page: &Page, key_num: u32) -> Result<u32, Error> {
    let num_keys = internal_num_keys(page);
    if key_num >= num_keys {
        return Err(Error::BadChildIndex {
            index: key_num,
            num_keys,
        });
    }
    let offset = internal_cell_offset(key_num as usize) + INTERNAL_NODE_CHILD_SIZE;
    Ok(u32_at(page, offset))
}

pub fn set_internal_key(page: &mut Page, key_num: u32, key: u32) {
    let offset = internal_cell_offset(key_num as usize) + INTERNAL_NODE_CHILD_SIZE;
    set_u32_at(page, offset, key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_max_cells_matches_spec() {
        assert_eq!(LEAF_MAX_CELLS, 13);
        assert_eq!(LEAF_RIGHT_COUNT, 7);
        assert_eq!(LEAF_LEFT_COUNT, 7);
    }

    #[test]
    fn leaf_header_round_trip() {
        let mut page = [0u8; PAGE_SIZE];
        init_leaf(&mut page);
        assert_eq!(node_type(&page).unwrap(), NodeType::Leaf);
        assert!(!is_root(&page));
        assert_eq!(leaf_num_cells(&page), 0);
        assert_eq!(leaf_next_leaf(&page), 0);

        set_is_root(&mut page, true);
        set_leaf_num_cells(&mut page, 3);
        set_leaf_next_leaf(&mut page, 9);
        assert!(is_root(&page));
        assert_eq!(leaf_num_cells(&page), 3);
        assert_eq!(leaf_next_leaf(&page), 9);
    }

    #[test]
    fn leaf_cell_round_trip() {
        let mut page = [0u8; PAGE_SIZE];
        init_leaf(&mut page);
        set_leaf_num_cells(&mut page, 1);
        set_leaf_key(&mut page, 0, 42);
        let value = [7u8; ROW_SIZE];
        leaf_value_mut(&mut page, 0).copy_from_slice(&value);

        assert_eq!(leaf_key(&page, 0), 42);
        assert_eq!(leaf_value(&page, 0), &value[..]);
        assert_eq!(max_key(&page).unwrap(), 42);
    }

    #[test]
    fn internal_header_and_children() {
        let mut page = [0u8; PAGE_SIZE];
        init_internal(&mut page);
        assert_eq!(node_type(&page).unwrap(), NodeType::Internal);
        set_internal_num_keys(&mut page, 1);
        set_internal_child(&mut page, 0, 5);
        set_internal_key(&mut page, 0, 100);
        set_internal_right_child(&mut page, 6);

        assert_eq!(internal_child(&page, 0).unwrap(), 5);
        assert_eq!(internal_child(&page, 1).unwrap(), 6);
        assert_eq!(internal_key(&page, 0).unwrap(), 100);
        assert_eq!(max_key(&page).unwrap(), 100);
        assert!(matches!(
            internal_child(&page, 2),
            Err(Error::BadChildIndex {
                index: 2,
                num_keys: 1
            })
        ));
    }
}
