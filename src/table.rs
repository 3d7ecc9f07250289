//! Table lifecycle: open-on-path, close-with-flush (spec §3.6, §6.2).

use std::path::Path;

use tracing::info;

use crate::error::Error;
use crate::node;
use crate::pager::Pager;

/// Thin binding of `{pager, root_page_num}`. The root page number is
/// always 0 for the lifetime of the table (spec §3.2): on split, the
/// root's bytes are copied to a freshly allocated page rather than the
/// root page number ever changing.
pub struct Table {
    pub pager: Pager,
    pub root_page_num: u32,
}

impl Table {
    /// Opens (or creates) the database file at `path`. A brand-new file
    /// gets page 0 initialized as an empty, rooted leaf.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let mut pager = Pager::open(path)?;

        if pager.num_pages() == 0 {
            let root = pager.get_page(0)?;
            node::init_leaf(root);
            node::set_is_root(root, true);
            info!("initialized fresh table at page 0");
        }

        Ok(Table {
            pager,
            root_page_num: 0,
        })
    }

    /// Flushes every materialized page to disk. This is the table's only
    /// durability boundary (spec §5) — a crash before `close` loses
    /// whatever was only ever written to a cached page.
    pub fn close(&mut self) -> Result<(), Error> {
        let flushed = self.pager.flush_all()?;
        info!(flushed, "closed table");
        Ok(())
    }
}
