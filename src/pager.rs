//! The pager (spec §4.1): owns the file descriptor, the file length, the
//! page count, and a bounded cache of page buffers. No eviction — once a
//! page is materialized it stays resident until `Table::close`, which is
//! what makes the references `get_page` hands back stable for the life of
//! the table (spec §9, "cache stability requirement").

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::error::Error;

pub const PAGE_SIZE: usize = 4096;
pub const TABLE_MAX_PAGES: usize = 100;

pub type Page = [u8; PAGE_SIZE];

pub struct Pager {
    file: File,
    file_length: u64,
    num_pages: u32,
    /// Direct-mapped slot array: slot `n` holds page `n` once materialized.
    /// A plain array (rather than a growable container) gives the address
    /// stability spec §9 asks for without any extra bookkeeping.
    slots: heapless::Vec<Option<Box<Page>>, TABLE_MAX_PAGES>,
}

impl Pager {
    /// Opens (creating if absent) the page store at `path`. Fails with
    /// `CorruptFile` if the file length is not a whole multiple of
    /// `PAGE_SIZE` (spec §4.1).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|e| Error::OpenFailed(format!("{}: {e}", path.display())))?;

        let file_length = file
            .metadata()
            .map_err(|e| Error::OpenFailed(format!("{}: {e}", path.display())))?
            .len();

        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(Error::CorruptFile(format!(
                "file length {file_length} is not a multiple of page size {PAGE_SIZE}"
            )));
        }
        let num_pages = (file_length / PAGE_SIZE as u64) as u32;

        let mut slots = heapless::Vec::new();
        for _ in 0..TABLE_MAX_PAGES {
            // capacity is TABLE_MAX_PAGES, so this can never fail
            let _ = slots.push(None);
        }

        debug!(path = %path.display(), num_pages, "opened page store");
        Ok(Pager {
            file,
            file_length,
            num_pages,
            slots,
        })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Materializes page `n` on demand and returns a stable mutable
    /// reference to it. Fails with `PageOutOfBounds` if `n >=
    /// TABLE_MAX_PAGES` (spec §9's `>=` correction over the original's
    /// off-by-one `>`).
    pub fn get_page(&mut self, n: u32) -> Result<&mut Page, Error> {
        if n as usize >= TABLE_MAX_PAGES {
            return Err(Error::PageOutOfBounds {
                page_num: n,
                max: TABLE_MAX_PAGES as u32,
            });
        }

        if self.slots[n as usize].is_none() {
            let mut buf: Box<Page> = Box::new([0u8; PAGE_SIZE]);
            if n < self.num_pages {
                self.file.seek(SeekFrom::Start(n as u64 * PAGE_SIZE as u64))?;
                self.file.read_exact(buf.as_mut())?;
                trace!(page_num = n, "read page from disk");
            } else {
                trace!(page_num = n, "materialized new zeroed page");
            }
            self.slots[n as usize] = Some(buf);
            if n >= self.num_pages {
                self.num_pages = n + 1;
            }
        }

        Ok(self.slots[n as usize].as_mut().unwrap())
    }

    /// Writes page `n`'s cached buffer back to the file at its offset.
    /// The slot must already be materialized — flushing an uncached page
    /// is a logic error, not a recoverable condition.
    pub fn flush(&mut self, n: u32) -> Result<(), Error> {
        let Some(page) = self.slots[n as usize].as_ref() else {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("cannot flush unmaterialized page {n}"),
            )));
        };
        self.file.seek(SeekFrom::Start(n as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(page.as_ref())?;
        self.file_length = self.file_length.max((n as u64 + 1) * PAGE_SIZE as u64);
        trace!(page_num = n, "flushed page");
        Ok(())
    }

    /// The next never-yet-allocated page number (spec §4.1). The caller
    /// typically calls `get_page` on the returned number right after, which
    /// materializes and extends `num_pages` to match.
    pub fn unused_page_num(&self) -> u32 {
        self.num_pages
    }

    /// Flushes every materialized page and reports how many pages were
    /// written, for the caller to log.
    pub fn flush_all(&mut self) -> Result<u32, Error> {
        let mut flushed = 0;
        for n in 0..self.num_pages {
            if self.slots[n as usize].is_some() {
                self.flush(n)?;
                flushed += 1;
            }
        }
        Ok(flushed)
    }

    pub fn file_length(&self) -> u64 {
        self.file_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn fresh_file_has_zero_pages() {
        let file = NamedTempFile::new().unwrap();
        let pager = Pager::open(file.path()).unwrap();
        assert_eq!(pager.num_pages(), 0);
    }

    #[test]
    fn get_page_extends_num_pages_and_zeroes_new_pages() {
        let file = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(file.path()).unwrap();
        let page = pager.get_page(0).unwrap();
        assert_eq!(page, &[0u8; PAGE_SIZE]);
        assert_eq!(pager.num_pages(), 1);
    }

    #[test]
    fn out_of_bounds_page_is_rejected() {
        let file = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(file.path()).unwrap();
        assert!(matches!(
            pager.get_page(TABLE_MAX_PAGES as u32),
            Err(Error::PageOutOfBounds { .. })
        ));
    }

    #[test]
    fn flush_then_reopen_round_trips_bytes() {
        let file = NamedTempFile::new().unwrap();
        {
            let mut pager = Pager::open(file.path()).unwrap();
            let page = pager.get_page(0).unwrap();
            page[10] = 0xAB;
            pager.flush(0).unwrap();
        }
        let mut pager = Pager::open(file.path()).unwrap();
        assert_eq!(pager.num_pages(), 1);
        let page = pager.get_page(0).unwrap();
        assert_eq!(page[10], 0xAB);
    }

    #[test]
    fn truncated_file_is_corrupt() {
        use std::io::Write as _;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 100]).unwrap();
        file.flush().unwrap();
        assert!(matches!(
            Pager::open(file.path()),
            Err(Error::CorruptFile(_))
        ));
    }
}
