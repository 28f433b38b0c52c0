use std::sync::{Mutex, Weak};

use serde::{Deserialize, Serialize};
use tessera_lib_core::{Error, Result, Value};

use crate::file::FileAccess;

/// Identity of one large-object cell inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId(pub u32);

/// Cursor to a large-object cell.
///
/// Holds a weak back-reference to the owning file handle; every operation
/// takes the file latch for just that call, so a locator can be kept across
/// tuples without pinning the file.
pub struct Locator {
    file: Weak<Mutex<Box<dyn FileAccess>>>,
    cell: CellId,
}

impl Locator {
    pub fn new(file: Weak<Mutex<Box<dyn FileAccess>>>, cell: CellId) -> Locator {
        Locator { file, cell }
    }

    pub fn cell(&self) -> CellId {
        self.cell
    }

    fn with_file<T>(
        &self,
        f: impl FnOnce(&mut Box<dyn FileAccess>) -> Result<T>,
    ) -> Result<T> {
        let file = self
            .file
            .upgrade()
            .ok_or_else(|| Error::unexpected("locator outlived its file access"))?;
        let mut guard = file.lock().unwrap();
        f(&mut guard)
    }

    pub fn length(&self) -> Result<usize> {
        self.with_file(|file| file.lob_length(self.cell))
    }

    pub fn get(&self, start: usize, length: usize) -> Result<Value> {
        self.with_file(|file| file.lob_get(self.cell, start, length))
    }

    pub fn append(&self, value: &Value) -> Result<()> {
        self.with_file(|file| file.lob_append(self.cell, value))
    }

    pub fn truncate(&self, length: usize) -> Result<()> {
        self.with_file(|file| file.lob_truncate(self.cell, length))
    }

    pub fn replace(&self, start: usize, length: usize, value: &Value) -> Result<()> {
        self.with_file(|file| file.lob_replace(self.cell, start, length, value))
    }
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator").field("cell", &self.cell).finish()
    }
}
