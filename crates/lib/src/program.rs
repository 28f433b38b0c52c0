use serde::{Deserialize, Serialize};
use tessera_lib_core::{Error, Result, Value};

use crate::collection::CollectionNode;
use crate::explain::Explain;
use crate::file::FileAccessNode;
use crate::function::FunctionNode;
use crate::ids::{
    CollectionId, DataId, FileAccessId, FunctionId, IteratorId, LocatorSlot, OperatorId,
    PredicateId,
};
use crate::iterator::{self, IteratorNode};
use crate::operator::OperatorNode;
use crate::predicate::PredicateNode;

/// A compiled, reusable execution plan.
///
/// The program owns every node and variable slot and hands out stable ids;
/// nodes refer to each other exclusively through those ids, which is also
/// what lets shared sub-expressions (one predicate hanging off two
/// iterators) serialize without cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    variables: Vec<Value>,
    iterators: Vec<IteratorNode>,
    operators: Vec<OperatorNode>,
    predicates: Vec<PredicateNode>,
    functions: Vec<FunctionNode>,
    collections: Vec<CollectionNode>,
    file_accesses: Vec<FileAccessNode>,
    locator_slots: u32,
    root: Option<IteratorId>,
}

impl Program {
    pub fn new() -> Program {
        Program::default()
    }

    pub fn add_variable(&mut self) -> DataId {
        self.add_variable_with(Value::null())
    }

    pub fn add_variable_with(&mut self, value: Value) -> DataId {
        let id = DataId(self.variables.len() as u32);
        self.variables.push(value);
        id
    }

    pub fn variable(&self, id: DataId) -> &Value {
        &self.variables[id.index()]
    }

    pub fn variables(&self) -> &[Value] {
        &self.variables
    }

    /// Whether a slot holds an array value, for runtime fan-out selection.
    pub fn is_array(&self, id: DataId) -> bool {
        self.variables[id.index()].is_array()
    }

    pub fn register_iterator(&mut self, node: impl Into<IteratorNode>) -> IteratorId {
        let id = IteratorId(self.iterators.len() as u32);
        self.iterators.push(node.into());
        id
    }

    pub fn register_operator(&mut self, node: impl Into<OperatorNode>) -> OperatorId {
        let id = OperatorId(self.operators.len() as u32);
        self.operators.push(node.into());
        id
    }

    pub fn register_predicate(&mut self, node: impl Into<PredicateNode>) -> PredicateId {
        let id = PredicateId(self.predicates.len() as u32);
        self.predicates.push(node.into());
        id
    }

    pub fn register_function(&mut self, node: impl Into<FunctionNode>) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(node.into());
        id
    }

    pub fn register_collection(&mut self, node: CollectionNode) -> CollectionId {
        let id = CollectionId(self.collections.len() as u32);
        self.collections.push(node);
        id
    }

    pub fn register_file_access(&mut self, node: FileAccessNode) -> FileAccessId {
        let id = FileAccessId(self.file_accesses.len() as u32);
        self.file_accesses.push(node);
        id
    }

    pub fn allocate_locator_slot(&mut self) -> LocatorSlot {
        let slot = LocatorSlot(self.locator_slots);
        self.locator_slots += 1;
        slot
    }

    pub fn iterator(&self, id: IteratorId) -> &IteratorNode {
        &self.iterators[id.index()]
    }

    pub fn operator(&self, id: OperatorId) -> &OperatorNode {
        &self.operators[id.index()]
    }

    pub fn predicate(&self, id: PredicateId) -> &PredicateNode {
        &self.predicates[id.index()]
    }

    pub fn function(&self, id: FunctionId) -> &FunctionNode {
        &self.functions[id.index()]
    }

    pub fn collection(&self, id: CollectionId) -> &CollectionNode {
        &self.collections[id.index()]
    }

    pub fn file_access(&self, id: FileAccessId) -> &FileAccessNode {
        &self.file_accesses[id.index()]
    }

    pub fn iterators(&self) -> &[IteratorNode] {
        &self.iterators
    }

    pub fn operators(&self) -> &[OperatorNode] {
        &self.operators
    }

    pub fn predicates(&self) -> &[PredicateNode] {
        &self.predicates
    }

    pub fn functions(&self) -> &[FunctionNode] {
        &self.functions
    }

    pub fn collections(&self) -> &[CollectionNode] {
        &self.collections
    }

    pub fn file_accesses(&self) -> &[FileAccessNode] {
        &self.file_accesses
    }

    pub fn locator_slot_count(&self) -> u32 {
        self.locator_slots
    }

    pub fn set_root(&mut self, root: IteratorId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<IteratorId> {
        self.root
    }

    pub fn explain_variable(&self, id: DataId, explain: &mut Explain) {
        explain.put(&format!("%{}", id.0));
        if explain.is_data_on() {
            explain.put(&format!("(={})", self.variable(id)));
        }
    }

    /// Render the plan rooted at `root` into an explain sink.
    pub fn explain(&self, explain: &mut Explain) {
        if let Some(root) = self.root {
            iterator::explain(self, root, explain);
        }
    }

    /// Binary plan image. The enum tags of the node tables are the stable
    /// class discriminators.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::BadArgument(format!("plan image: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Program> {
        bincode::deserialize(bytes).map_err(|e| Error::BadArgument(format!("plan image: {e}")))
    }
}
