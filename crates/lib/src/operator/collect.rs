use serde::{Deserialize, Serialize};
use tessera_lib_core::Result;

use crate::action::Status;
use crate::explain::Explain;
use crate::ids::{CollectionId, OperatorId};
use crate::operator::OperatorExec;
use crate::program::Program;
use crate::runtime::Cx;

/// Appends the collection's row snapshot to its store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collect {
    pub store: CollectionId,
}

impl Collect {
    pub fn new(store: CollectionId) -> Collect {
        Collect { store }
    }
}

impl OperatorExec for Collect {
    fn run(&self, cx: &mut Cx<'_>, _id: OperatorId) -> Result<Status> {
        let row = cx.program.collection(self.store).row().to_vec();
        let tuple = cx.snapshot_row(&row);
        cx.rt.collection_mut(self.store).rows.push(tuple);
        Ok(Status::Success)
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.put("collect into ");
        explain.put(program.collection(self.store).kind_name());
    }
}

/// Suppresses tuples whose row snapshot has been seen before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distinct {
    pub store: CollectionId,
}

impl Distinct {
    pub fn new(store: CollectionId) -> Distinct {
        Distinct { store }
    }
}

impl OperatorExec for Distinct {
    fn run(&self, cx: &mut Cx<'_>, _id: OperatorId) -> Result<Status> {
        let row = cx.program.collection(self.store).row().to_vec();
        let tuple = cx.snapshot_row(&row);
        if cx.rt.collection_mut(self.store).seen.insert(tuple) {
            Ok(Status::Success)
        } else {
            Ok(Status::Continue)
        }
    }

    fn explain_node(&self, _program: &Program, explain: &mut Explain) {
        explain.put("distinct");
    }
}
