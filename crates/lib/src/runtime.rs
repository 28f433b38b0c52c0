use std::sync::{Arc, Mutex};

use ahash::{AHashMap, AHashSet};
use tessera_lib_core::bitset::BitSet;
use tessera_lib_core::{Result, Value};

use crate::context::ExecTx;
use crate::file::{FileDriver, FileHandle};
use crate::ids::{
    CollectionId, DataId, FileAccessId, FunctionId, IteratorId, LocatorSlot, OperatorId,
    PredicateId,
};
use crate::iterator::IterKindRt;
use crate::locator::Locator;
use crate::operator::OperatorNode;
use crate::program::Program;
use crate::schema::{Catalog, Sequence};

/// Per-iterator mutable state.
#[derive(Debug)]
pub struct IterRt {
    pub started: bool,
    pub has_next: bool,
    pub has_data: bool,
    pub was_last: bool,
    pub kind: IterKindRt,
}

impl IterRt {
    fn new(kind: IterKindRt) -> IterRt {
        IterRt {
            started: false,
            has_next: true,
            has_data: false,
            was_last: false,
            kind,
        }
    }
}

/// Per-predicate mutable state (FileCheck materialization).
#[derive(Debug, Clone, Default)]
pub struct PredRt {
    pub materialized: bool,
    pub never_true: bool,
    pub bitset: BitSet,
    pub map: AHashMap<u32, Vec<Value>>,
}

/// Per-collection mutable state.
#[derive(Debug, Clone, Default)]
pub struct CollectionRt {
    pub rows: Vec<Vec<Value>>,
    pub position: usize,
    pub seen: AHashSet<Vec<Value>>,
    pub count: u64,
}

/// Live state of one program execution: variable values, node state
/// machines, the tick epoch, open files and locator slots.
///
/// The plan itself stays immutable; splitting the mutable half out is what
/// lets a node borrow its own description and the runtime at once.
pub struct Runtime {
    values: Vec<Value>,
    epoch: u64,
    iters: Vec<IterRt>,
    op_epochs: Vec<u64>,
    fn_epochs: Vec<u64>,
    preds: Vec<PredRt>,
    collections: Vec<CollectionRt>,
    files: Vec<FileHandle>,
    locators: Vec<Option<Locator>>,
    sequences: AHashMap<OperatorId, Box<dyn Sequence>>,
}

impl Runtime {
    /// Bind a program to live collaborators.
    pub fn new(
        program: &Program,
        driver: &dyn FileDriver,
        catalog: &dyn Catalog,
    ) -> Result<Runtime> {
        let files = program
            .file_accesses()
            .iter()
            .map(|node| {
                driver
                    .instantiate(node)
                    .map(|file| Arc::new(Mutex::new(file)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut sequences: AHashMap<OperatorId, Box<dyn Sequence>> = AHashMap::new();
        for (index, node) in program.operators().iter().enumerate() {
            if let OperatorNode::Generator(generator) = node {
                let id = OperatorId(index as u32);
                sequences.insert(id, catalog.sequence(&generator.sequence)?);
            }
        }

        Ok(Runtime {
            values: program.variables().to_vec(),
            epoch: 0,
            iters: program
                .iterators()
                .iter()
                .map(|node| IterRt::new(IterKindRt::for_node(node)))
                .collect(),
            op_epochs: vec![0; program.operators().len()],
            fn_epochs: vec![0; program.functions().len()],
            preds: vec![PredRt::default(); program.predicates().len()],
            collections: vec![CollectionRt::default(); program.collections().len()],
            files,
            locators: (0..program.locator_slot_count()).map(|_| None).collect(),
            sequences,
        })
    }

    pub fn value(&self, id: DataId) -> &Value {
        &self.values[id.index()]
    }

    pub fn value_mut(&mut self, id: DataId) -> &mut Value {
        &mut self.values[id.index()]
    }

    pub fn set_value(&mut self, id: DataId, value: Value) {
        self.values[id.index()] = value;
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Start a new driver tick; every done latch is implicitly cleared
    /// because it compares against the new epoch.
    pub fn begin_tick(&mut self) {
        self.epoch += 1;
    }

    pub fn operator_done(&self, id: OperatorId) -> bool {
        self.op_epochs[id.index()] == self.epoch
    }

    pub fn mark_operator_done(&mut self, id: OperatorId) {
        self.op_epochs[id.index()] = self.epoch;
    }

    pub fn function_done(&self, id: FunctionId) -> bool {
        self.fn_epochs[id.index()] == self.epoch
    }

    pub fn mark_function_done(&mut self, id: FunctionId) {
        self.fn_epochs[id.index()] = self.epoch;
    }

    pub fn iter(&self, id: IteratorId) -> &IterRt {
        &self.iters[id.index()]
    }

    pub fn iter_mut(&mut self, id: IteratorId) -> &mut IterRt {
        &mut self.iters[id.index()]
    }

    pub fn predicate_state(&self, id: PredicateId) -> &PredRt {
        &self.preds[id.index()]
    }

    pub fn predicate_state_mut(&mut self, id: PredicateId) -> &mut PredRt {
        &mut self.preds[id.index()]
    }

    pub fn collection(&self, id: CollectionId) -> &CollectionRt {
        &self.collections[id.index()]
    }

    pub fn collection_mut(&mut self, id: CollectionId) -> &mut CollectionRt {
        &mut self.collections[id.index()]
    }

    pub fn file(&self, id: FileAccessId) -> FileHandle {
        Arc::clone(&self.files[id.index()])
    }

    pub fn locator(&self, slot: LocatorSlot) -> Option<&Locator> {
        self.locators[slot.index()].as_ref()
    }

    pub fn set_locator(&mut self, slot: LocatorSlot, locator: Option<Locator>) {
        self.locators[slot.index()] = locator;
    }

    pub fn sequence_mut(&mut self, id: OperatorId) -> Option<&mut Box<dyn Sequence>> {
        self.sequences.get_mut(&id)
    }
}

/// Everything a node needs while evaluating: the immutable plan, the mutable
/// runtime, and the enclosing transaction.
pub struct Cx<'a> {
    pub program: &'a Program,
    pub rt: &'a mut Runtime,
    pub tx: &'a ExecTx,
}

impl<'a> Cx<'a> {
    pub fn new(program: &'a Program, rt: &'a mut Runtime, tx: &'a ExecTx) -> Cx<'a> {
        Cx { program, rt, tx }
    }

    pub fn value(&self, id: DataId) -> &Value {
        self.rt.value(id)
    }

    pub fn value_mut(&mut self, id: DataId) -> &mut Value {
        self.rt.value_mut(id)
    }

    pub fn set_value(&mut self, id: DataId, value: Value) {
        self.rt.set_value(id, value);
    }

    pub fn check_canceled(&self) -> Result<()> {
        self.tx.check_canceled()
    }

    /// Snapshot the named row out of the live variable table.
    pub fn snapshot_row(&self, row: &[DataId]) -> Vec<Value> {
        row.iter().map(|&id| self.rt.value(id).clone()).collect()
    }

    /// Write a previously snapshotted row back into its variables.
    pub fn restore_row(&mut self, row: &[DataId], values: &[Value]) {
        for (&id, value) in row.iter().zip(values) {
            self.rt.set_value(id, value.clone());
        }
    }
}
