use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tessera_lib_core::value::Timestamp;
use tessera_lib_core::{Error, Result, Value};

use crate::context::ExecTx;
use crate::locator::CellId;

pub mod memory;

/// How an iterator or operator intends to drive the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenMode {
    Read,
    Search,
    Update,
    Batch,
}

/// Plan-side description of one logical-file attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAccessNode {
    pub name: String,
    pub mode: OpenMode,
}

/// The seam to a physical index.
///
/// The kernel drives every file through this interface and never learns
/// whether the other side is inverted, bitmap, B-tree, KD-tree or
/// record-based. Lifecycle verbs default to no-ops because most drivers only
/// care about a few of them.
pub trait FileAccess: Send {
    fn open(&mut self, tx: &ExecTx, mode: OpenMode) -> Result<()>;
    fn close(&mut self);

    /// Position the cursor on the records matching a fetch key.
    fn fetch(&mut self, key: &[Value]) -> Result<()>;

    /// Read the next positioned record; false when the cursor is exhausted.
    fn get_data(&mut self, tuple: &mut Vec<Value>) -> Result<bool>;

    /// Resolve a fetch key to a large-object cell.
    fn get_locator(&mut self, key: &[Value]) -> Result<Option<CellId>>;

    fn insert(&mut self, tuple: &[Value]) -> Result<()>;
    fn update(&mut self, key: &[Value], tuple: &[Value]) -> Result<()>;
    fn expunge(&mut self, key: &[Value]) -> Result<()>;

    fn mark(&mut self);
    fn rewind(&mut self) -> Result<()>;
    fn reset(&mut self);

    fn create(&mut self) -> Result<()> {
        Ok(())
    }
    fn destroy(&mut self) -> Result<()> {
        Ok(())
    }
    fn mount(&mut self) -> Result<()> {
        Ok(())
    }
    fn unmount(&mut self) -> Result<()> {
        Ok(())
    }
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
    fn recover(&mut self, _point: Timestamp) -> Result<()> {
        Ok(())
    }
    fn restore(&mut self, _point: Timestamp) -> Result<()> {
        Ok(())
    }
    fn verify(&mut self) -> Result<()> {
        Ok(())
    }
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
    fn move_to(&mut self, _area: &str) -> Result<()> {
        Ok(())
    }

    fn lob_length(&mut self, _cell: CellId) -> Result<usize> {
        Err(Error::NotSupported("locator"))
    }
    fn lob_get(&mut self, _cell: CellId, _start: usize, _length: usize) -> Result<Value> {
        Err(Error::NotSupported("locator"))
    }
    fn lob_append(&mut self, _cell: CellId, _value: &Value) -> Result<()> {
        Err(Error::NotSupported("locator"))
    }
    fn lob_truncate(&mut self, _cell: CellId, _length: usize) -> Result<()> {
        Err(Error::NotSupported("locator"))
    }
    fn lob_replace(
        &mut self,
        _cell: CellId,
        _start: usize,
        _length: usize,
        _value: &Value,
    ) -> Result<()> {
        Err(Error::NotSupported("locator"))
    }
}

/// An opened file plus its latch. The latch is held only for the duration of
/// one call.
pub type FileHandle = Arc<Mutex<Box<dyn FileAccess>>>;

/// Binds plan-side file descriptions to live driver instances.
pub trait FileDriver {
    fn instantiate(&self, node: &FileAccessNode) -> Result<Box<dyn FileAccess>>;
}

/// Driver with no files, for plans that never touch storage.
pub struct NoFiles;

impl FileDriver for NoFiles {
    fn instantiate(&self, node: &FileAccessNode) -> Result<Box<dyn FileAccess>> {
        Err(Error::BadArgument(format!(
            "plan references file '{}' but no file driver is configured",
            node.name
        )))
    }
}
