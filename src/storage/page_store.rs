//! Page Store - file I/O for the metadata page and node pages.
//!
//! The [`PageStore`] handles all direct file operations:
//! - Creating the file and its metadata page
//! - Allocating node pages
//! - Reading and writing whole nodes
//! - Reading and writing the root pointer

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::common::config::{META_PAGE_INDEX, PAGE_SIZE};
use crate::common::{Error, NodeId, Result};
use crate::index::btree::Node;
use crate::storage::page::{decode_node, encode_node, Page};

/// Owns the backing file of one index.
///
/// # File Layout
/// ```text
/// ┌──────────┬──────────┬──────────┬─────────┬────────────┐
/// │ Page 0   │ Page 1   │ Page 2   │  ...    │ Page N+1   │
/// │ (meta)   │ Node 0   │ Node 1   │         │ Node N     │
/// └──────────┴──────────┴──────────┴─────────┴────────────┘
/// Offset:  0     4096      8192      ...    (N+1)×4096
/// ```
///
/// The metadata page holds the root node id in its first 4 bytes
/// (`u32::MAX` while no root exists) and zeros elsewhere.
///
/// # Thread Safety
/// `PageStore` is **single-threaded**. It is owned exclusively by one tree
/// handle and the file is closed when the handle is dropped.
///
/// # Durability
/// Every write is followed by `fsync()`. Structural changes spanning several
/// pages are not atomic.
pub struct PageStore {
    file: File,
    /// Number of pages in the file, metadata page included.
    page_count: u64,
}

impl PageStore {
    /// Open an index file, creating and initializing it if needed.
    ///
    /// A new (or zero-length) file gets a metadata page whose root pointer
    /// is the "no root" sentinel.
    ///
    /// # Errors
    /// - I/O errors if the file cannot be created or opened read/write
    /// - `Error::Corruption` if the file is too short to hold the metadata page
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size == 0 {
            let mut store = Self {
                file,
                page_count: 0,
            };
            store.init_meta_page()?;
            debug!(path = %path.as_ref().display(), "created index file");
            return Ok(store);
        }

        if file_size < PAGE_SIZE as u64 {
            return Err(Error::corruption(format!(
                "index file is {file_size} bytes, shorter than the metadata page"
            )));
        }

        let page_count = file_size / PAGE_SIZE as u64;
        Ok(Self { file, page_count })
    }

    fn init_meta_page(&mut self) -> Result<()> {
        let mut page = Page::new();
        page.write_u32(0, NodeId::INVALID.0);

        self.file.seek(SeekFrom::Start(META_PAGE_INDEX))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?;

        self.page_count = 1;
        Ok(())
    }

    /// Read the root node id from the metadata page.
    ///
    /// Returns `None` if no root has been recorded yet.
    pub fn read_root_id(&mut self) -> Result<Option<NodeId>> {
        self.file.seek(SeekFrom::Start(META_PAGE_INDEX))?;

        let mut bytes = [0u8; 4];
        self.file.read_exact(&mut bytes).map_err(short_read)?;

        Ok(NodeId::from_raw(u32::from_le_bytes(bytes)))
    }

    /// Persist a new root node id.
    pub fn write_root_id(&mut self, root: NodeId) -> Result<()> {
        self.file.seek(SeekFrom::Start(META_PAGE_INDEX))?;
        self.file.write_all(&root.0.to_le_bytes())?;
        self.file.sync_all()?;

        trace!(%root, "wrote root pointer");
        Ok(())
    }

    /// Allocate a page for a new node.
    ///
    /// Extends the file by one zeroed page. Identifiers are never reused:
    /// pages of nodes dropped by merges stay orphaned in the file.
    pub fn allocate_node(&mut self) -> Result<NodeId> {
        let page_index = self.page_count;
        let node_id = u32::try_from(page_index - 1)
            .ok()
            .map(NodeId::new)
            .filter(NodeId::is_valid)
            .ok_or_else(|| Error::corruption("node id space exhausted"))?;

        let offset = page_index * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;

        let zeros = [0u8; PAGE_SIZE];
        self.file.write_all(&zeros)?;
        self.file.sync_all()?;

        self.page_count += 1;
        trace!(node = %node_id, "allocated node page");
        Ok(node_id)
    }

    /// Write a whole node to its page.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the node's page hasn't been allocated
    /// - `Error::NodeOverflow` if the node does not fit in a page
    pub fn write_node(&mut self, node: &Node) -> Result<()> {
        let node_id = node.id();
        if !self.is_allocated(node_id) {
            return Err(Error::PageNotFound(node_id));
        }

        let page = encode_node(node)?;

        self.file
            .seek(SeekFrom::Start(node_id.page_index() * PAGE_SIZE as u64))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?;

        trace!(node = %node_id, keys = node.len(), "wrote node page");
        Ok(())
    }

    /// Read the node stored in `node_id`'s page.
    ///
    /// # Errors
    /// Returns `Error::Corruption` if the page lies beyond the end of the file
    /// or its contents are not a valid node.
    pub fn read_node(&mut self, node_id: NodeId) -> Result<Node> {
        if !self.is_allocated(node_id) {
            return Err(Error::corruption(format!(
                "{node_id} lies beyond the end of the index file"
            )));
        }

        self.file
            .seek(SeekFrom::Start(node_id.page_index() * PAGE_SIZE as u64))?;

        let mut page = Page::new();
        self.file
            .read_exact(page.as_mut_slice())
            .map_err(short_read)?;

        decode_node(node_id, &page)
    }

    fn is_allocated(&self, node_id: NodeId) -> bool {
        node_id.is_valid() && node_id.page_index() < self.page_count
    }

    /// Number of node pages ever allocated (orphans included).
    #[inline]
    pub fn node_count(&self) -> u64 {
        self.page_count.saturating_sub(1)
    }
}

fn short_read(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::corruption("short page read")
    } else {
        Error::Io(err)
    }
}
