//! End-to-end scenarios against the public API (spec §8.3).

use nanosqlite::{execute_insert, execute_select, prepare_insert, print_tree, Error, Table};
use tempfile::NamedTempFile;

#[test]
fn validation_errors_do_not_mutate_the_table() {
    let file = NamedTempFile::new().unwrap();
    let mut table = Table::open(file.path()).unwrap();

    assert!(matches!(prepare_insert(-5, "bob", "bob@x"), Err(Error::NegativeId(-5))));

    let long_username = "a".repeat(33);
    assert!(matches!(
        prepare_insert(1, &long_username, "bob@x"),
        Err(Error::StringTooLong { field: "username", .. })
    ));

    assert_eq!(execute_select(&mut table).unwrap(), vec![]);
}

#[test]
fn duplicate_insert_does_not_change_row_count() {
    let file = NamedTempFile::new().unwrap();
    let mut table = Table::open(file.path()).unwrap();

    let row = prepare_insert(1, "bob", "bob@x").unwrap();
    execute_insert(&mut table, &row).unwrap();

    let dup = prepare_insert(1, "someone-else", "other@x").unwrap();
    assert!(matches!(execute_insert(&mut table, &dup), Err(Error::DuplicateKey(1))));

    let rows = execute_select(&mut table).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].username_str(), "bob");
}

#[test]
fn a_table_that_never_splits_survives_a_close_and_reopen_cycle() {
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_path_buf();

    {
        let mut table = Table::open(&path).unwrap();
        for (id, name) in [(3, "carol"), (1, "alice"), (2, "bob")] {
            let row = prepare_insert(id, name, &format!("{name}@example.com")).unwrap();
            execute_insert(&mut table, &row).unwrap();
        }
        table.close().unwrap();
    }

    let mut table = Table::open(&path).unwrap();
    let rows = execute_select(&mut table).unwrap();
    let names: Vec<String> = rows.iter().map(|r| r.username_str()).collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);
}

#[test]
fn filling_the_root_leaf_promotes_a_two_level_tree_that_survives_reopen() {
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_path_buf();

    {
        let mut table = Table::open(&path).unwrap();
        for id in 1..=14 {
            let row = prepare_insert(id, "u", "e@x").unwrap();
            execute_insert(&mut table, &row).unwrap();
        }
        table.close().unwrap();
    }

    let mut table = Table::open(&path).unwrap();
    let rows = execute_select(&mut table).unwrap();
    let ids: Vec<u32> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=14).collect::<Vec<_>>());

    let dump = print_tree(&mut table.pager, table.root_page_num).unwrap();
    assert!(dump.starts_with("- internal (size 1)\n"));
}
