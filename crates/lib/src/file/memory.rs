use std::collections::BTreeMap;

use ahash::AHashMap;
use tessera_lib_core::value::Scalar;
use tessera_lib_core::{Error, Result, Value};

use crate::context::ExecTx;
use crate::file::{FileAccess, FileAccessNode, FileDriver, OpenMode};
use crate::locator::CellId;

/// In-memory stand-in for a logical file, keyed by rowid.
///
/// Tuples are stored with the rowid as their first column. Backs the test
/// suites and small local pipelines; each instantiation gets its own copy of
/// the registered contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    rows: BTreeMap<u32, Vec<Value>>,
    lobs: AHashMap<u32, Value>,
    next_rowid: u32,
    opened: Option<OpenMode>,
    cursor: Vec<u32>,
    position: usize,
    marked: usize,
}

impl MemoryFile {
    pub fn new() -> MemoryFile {
        MemoryFile::default()
    }

    pub fn with_row(mut self, rowid: u32, columns: Vec<Value>) -> MemoryFile {
        let mut tuple = vec![Value::from(rowid)];
        tuple.extend(columns);
        self.rows.insert(rowid, tuple);
        self.next_rowid = self.next_rowid.max(rowid + 1);
        self
    }

    pub fn with_lob(mut self, rowid: u32, value: Value) -> MemoryFile {
        self.lobs.insert(rowid, value);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn key_rowid(key: &[Value]) -> Result<u32> {
        let first = key.first().ok_or_else(|| {
            Error::BadArgument("empty fetch key".into())
        })?;
        match *first.body() {
            Scalar::Unsigned(rowid) => Ok(rowid),
            Scalar::Integer(rowid) if rowid >= 0 => Ok(rowid as u32),
            _ => Err(Error::UnexpectedType {
                context: "fetch key",
                found: first.type_code(),
            }),
        }
    }

    fn rewind_all(&mut self) {
        self.cursor = self.rows.keys().copied().collect();
        self.position = 0;
        self.marked = 0;
    }
}

impl FileAccess for MemoryFile {
    fn open(&mut self, _tx: &ExecTx, mode: OpenMode) -> Result<()> {
        self.opened = Some(mode);
        self.rewind_all();
        Ok(())
    }

    fn close(&mut self) {
        self.opened = None;
    }

    fn fetch(&mut self, key: &[Value]) -> Result<()> {
        if key.first().is_some_and(Value::is_null) {
            self.cursor.clear();
            self.position = 0;
            return Ok(());
        }
        let rowid = MemoryFile::key_rowid(key)?;
        self.cursor = if self.rows.contains_key(&rowid) {
            vec![rowid]
        } else {
            Vec::new()
        };
        self.position = 0;
        Ok(())
    }

    fn get_data(&mut self, tuple: &mut Vec<Value>) -> Result<bool> {
        while self.position < self.cursor.len() {
            let rowid = self.cursor[self.position];
            self.position += 1;
            if let Some(row) = self.rows.get(&rowid) {
                tuple.clear();
                tuple.extend(row.iter().cloned());
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get_locator(&mut self, key: &[Value]) -> Result<Option<CellId>> {
        let rowid = MemoryFile::key_rowid(key)?;
        Ok(self.lobs.contains_key(&rowid).then_some(CellId(rowid)))
    }

    fn insert(&mut self, tuple: &[Value]) -> Result<()> {
        let (rowid, columns) = match tuple.split_first() {
            Some((head, rest)) if matches!(head.body(), Scalar::Unsigned(_)) => {
                let &Scalar::Unsigned(rowid) = head.body() else {
                    unreachable!()
                };
                (rowid, rest)
            }
            _ => {
                let rowid = self.next_rowid;
                self.next_rowid += 1;
                (rowid, tuple)
            }
        };
        let mut stored = vec![Value::from(rowid)];
        stored.extend(columns.iter().cloned());
        self.rows.insert(rowid, stored);
        self.next_rowid = self.next_rowid.max(rowid + 1);
        Ok(())
    }

    fn update(&mut self, key: &[Value], tuple: &[Value]) -> Result<()> {
        let rowid = MemoryFile::key_rowid(key)?;
        let row = self
            .rows
            .get_mut(&rowid)
            .ok_or_else(|| Error::BadArgument(format!("no row {rowid}")))?;
        let mut stored = vec![Value::from(rowid)];
        stored.extend(tuple.iter().cloned());
        *row = stored;
        Ok(())
    }

    fn expunge(&mut self, key: &[Value]) -> Result<()> {
        let rowid = MemoryFile::key_rowid(key)?;
        self.rows.remove(&rowid);
        Ok(())
    }

    fn mark(&mut self) {
        self.marked = self.position;
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = self.marked;
        Ok(())
    }

    fn reset(&mut self) {
        self.rewind_all();
    }

    fn lob_length(&mut self, cell: CellId) -> Result<usize> {
        match self.lobs.get(&cell.0).map(Value::body) {
            Some(Scalar::String(s)) => Ok(s.chars().count()),
            Some(Scalar::Binary(b)) => Ok(b.len()),
            _ => Err(Error::BadArgument(format!("no lob cell {}", cell.0))),
        }
    }

    fn lob_get(&mut self, cell: CellId, start: usize, length: usize) -> Result<Value> {
        match self.lobs.get(&cell.0).map(Value::body) {
            Some(Scalar::String(s)) => {
                Ok(Value::from(
                    s.chars().skip(start).take(length).collect::<String>(),
                ))
            }
            Some(Scalar::Binary(b)) => {
                let end = (start + length).min(b.len());
                let start = start.min(b.len());
                Ok(Value::new(Scalar::Binary(b[start..end].to_vec())))
            }
            _ => Err(Error::BadArgument(format!("no lob cell {}", cell.0))),
        }
    }

    fn lob_append(&mut self, cell: CellId, value: &Value) -> Result<()> {
        let lob = self
            .lobs
            .get_mut(&cell.0)
            .ok_or_else(|| Error::BadArgument(format!("no lob cell {}", cell.0)))?;
        match (lob.body().clone(), value.body()) {
            (Scalar::String(mut s), Scalar::String(tail)) => {
                s.push_str(tail);
                *lob = Value::from(s);
                Ok(())
            }
            (Scalar::Binary(mut b), Scalar::Binary(tail)) => {
                b.extend_from_slice(tail);
                *lob = Value::new(Scalar::Binary(b));
                Ok(())
            }
            _ => Err(Error::NotCompatible {
                expected: lob.type_code(),
                found: value.type_code(),
            }),
        }
    }

    fn lob_truncate(&mut self, cell: CellId, length: usize) -> Result<()> {
        let lob = self
            .lobs
            .get_mut(&cell.0)
            .ok_or_else(|| Error::BadArgument(format!("no lob cell {}", cell.0)))?;
        match lob.body().clone() {
            Scalar::String(s) => {
                *lob = Value::from(s.chars().take(length).collect::<String>());
                Ok(())
            }
            Scalar::Binary(mut b) => {
                b.truncate(length);
                *lob = Value::new(Scalar::Binary(b));
                Ok(())
            }
            _ => Err(Error::BadArgument(format!("no lob cell {}", cell.0))),
        }
    }

    fn lob_replace(
        &mut self,
        cell: CellId,
        start: usize,
        length: usize,
        value: &Value,
    ) -> Result<()> {
        let lob = self
            .lobs
            .get_mut(&cell.0)
            .ok_or_else(|| Error::BadArgument(format!("no lob cell {}", cell.0)))?;
        match (lob.body().clone(), value.body()) {
            (Scalar::String(s), Scalar::String(patch)) => {
                let mut chars: Vec<char> = s.chars().collect();
                let end = (start + length).min(chars.len());
                let start = start.min(chars.len());
                chars.splice(start..end, patch.chars());
                *lob = Value::from(chars.into_iter().collect::<String>());
                Ok(())
            }
            (Scalar::Binary(mut b), Scalar::Binary(patch)) => {
                let end = (start + length).min(b.len());
                let start = start.min(b.len());
                b.splice(start..end, patch.iter().copied());
                *lob = Value::new(Scalar::Binary(b));
                Ok(())
            }
            _ => Err(Error::NotCompatible {
                expected: lob.type_code(),
                found: value.type_code(),
            }),
        }
    }
}

/// Registry of named [`MemoryFile`] contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    files: AHashMap<String, MemoryFile>,
}

impl MemoryDriver {
    pub fn new() -> MemoryDriver {
        MemoryDriver::default()
    }

    pub fn register(&mut self, name: impl Into<String>, file: MemoryFile) {
        self.files.insert(name.into(), file);
    }
}

impl FileDriver for MemoryDriver {
    fn instantiate(&self, node: &FileAccessNode) -> Result<Box<dyn FileAccess>> {
        self.files
            .get(&node.name)
            .cloned()
            .map(|file| Box::new(file) as Box<dyn FileAccess>)
            .ok_or_else(|| Error::FileNotFound(node.name.clone().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_positions_on_single_row() {
        let mut file = MemoryFile::new()
            .with_row(1, vec![Value::from("a")])
            .with_row(2, vec![Value::from("b")]);
        let tx = ExecTx::default();
        file.open(&tx, OpenMode::Read).unwrap();

        file.fetch(&[Value::from(2u32)]).unwrap();
        let mut tuple = Vec::new();
        assert!(file.get_data(&mut tuple).unwrap());
        assert_eq!(tuple[1], Value::from("b"));
        assert!(!file.get_data(&mut tuple).unwrap());
    }

    #[test]
    fn null_fetch_key_yields_nothing() {
        let mut file = MemoryFile::new().with_row(1, vec![Value::from("a")]);
        let tx = ExecTx::default();
        file.open(&tx, OpenMode::Read).unwrap();

        file.fetch(&[Value::null()]).unwrap();
        let mut tuple = Vec::new();
        assert!(!file.get_data(&mut tuple).unwrap());
    }

    #[test]
    fn lob_roundtrip() {
        let mut file = MemoryFile::new().with_lob(7, Value::from("hello world"));
        assert_eq!(file.lob_length(CellId(7)).unwrap(), 11);
        assert_eq!(
            file.lob_get(CellId(7), 6, 5).unwrap(),
            Value::from("world")
        );
        file.lob_replace(CellId(7), 0, 5, &Value::from("HELLO")).unwrap();
        file.lob_append(CellId(7), &Value::from("!")).unwrap();
        file.lob_truncate(CellId(7), 6).unwrap();
        assert_eq!(file.lob_get(CellId(7), 0, 100).unwrap(), Value::from("HELLO "));
    }
}
