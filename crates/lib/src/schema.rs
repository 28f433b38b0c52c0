use std::sync::{Arc, Mutex};

use ahash::AHashMap;
use tessera_lib_core::{Error, Result};

/// Sequence generator owned by the schema catalog.
///
/// `persist` is called from iterator finish so that the durable next-value
/// catches up with what this statement handed out.
pub trait Sequence: Send {
    /// Hand out the next value and advance.
    fn next(&mut self) -> Result<i64>;

    /// Cooperatively raise the next value to at least `value + 1`.
    fn raise_to(&mut self, value: i64) -> Result<()>;

    /// Reassert a previously persisted value during log replay.
    fn reassert(&mut self, value: i64) -> Result<()>;

    fn persist(&mut self) -> Result<()>;
}

/// Resolves sequence names for generator operators.
pub trait Catalog {
    fn sequence(&self, name: &str) -> Result<Box<dyn Sequence>>;
}

/// Catalog with no sequences, for plans without generators.
pub struct NoCatalog;

impl Catalog for NoCatalog {
    fn sequence(&self, name: &str) -> Result<Box<dyn Sequence>> {
        Err(Error::BadArgument(format!(
            "plan references sequence '{name}' but no catalog is configured"
        )))
    }
}

#[derive(Debug, Default)]
struct SequenceState {
    next: i64,
    persisted: i64,
}

/// Shared in-memory sequence; every handle resolved from one
/// [`MemoryCatalog`] sees the same state, like generators against one
/// schema object.
#[derive(Debug, Clone)]
pub struct MemorySequence {
    state: Arc<Mutex<SequenceState>>,
}

impl MemorySequence {
    pub fn starting_at(value: i64) -> MemorySequence {
        MemorySequence {
            state: Arc::new(Mutex::new(SequenceState {
                next: value,
                persisted: value,
            })),
        }
    }

    pub fn persisted(&self) -> i64 {
        self.state.lock().unwrap().persisted
    }
}

impl Sequence for MemorySequence {
    fn next(&mut self) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        let value = state.next;
        state.next += 1;
        Ok(value)
    }

    fn raise_to(&mut self, value: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.next = state.next.max(value.saturating_add(1));
        Ok(())
    }

    fn reassert(&mut self, value: i64) -> Result<()> {
        self.raise_to(value)
    }

    fn persist(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.persisted = state.next;
        Ok(())
    }
}

/// Name → shared sequence registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    sequences: AHashMap<String, MemorySequence>,
}

impl MemoryCatalog {
    pub fn new() -> MemoryCatalog {
        MemoryCatalog::default()
    }

    pub fn register(&mut self, name: impl Into<String>, sequence: MemorySequence) {
        self.sequences.insert(name.into(), sequence);
    }

    pub fn get(&self, name: &str) -> Option<&MemorySequence> {
        self.sequences.get(name)
    }
}

impl Catalog for MemoryCatalog {
    fn sequence(&self, name: &str) -> Result<Box<dyn Sequence>> {
        self.sequences
            .get(name)
            .cloned()
            .map(|sequence| Box::new(sequence) as Box<dyn Sequence>)
            .ok_or_else(|| Error::BadArgument(format!("unknown sequence '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_share_state() {
        let mut catalog = MemoryCatalog::new();
        catalog.register("t.rowid", MemorySequence::starting_at(10));

        let mut a = catalog.sequence("t.rowid").unwrap();
        let mut b = catalog.sequence("t.rowid").unwrap();
        assert_eq!(a.next().unwrap(), 10);
        assert_eq!(b.next().unwrap(), 11);

        b.raise_to(100).unwrap();
        assert_eq!(a.next().unwrap(), 101);
    }
}
