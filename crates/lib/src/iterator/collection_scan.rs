use serde::{Deserialize, Serialize};
use tessera_lib_core::Result;

use crate::explain::Explain;
use crate::ids::{CollectionId, IteratorId};
use crate::iterator::{IteratorBase, IteratorExec};
use crate::program::Program;
use crate::runtime::Cx;

/// Replays the rows stored in an array collection, restoring each into its
/// row variables. The rows get there through a collect operator upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionScan {
    pub base: IteratorBase,
    pub store: CollectionId,
}

impl CollectionScan {
    pub fn new(store: CollectionId) -> CollectionScan {
        CollectionScan {
            base: IteratorBase::default(),
            store,
        }
    }
}

impl IteratorExec for CollectionScan {
    fn base(&self) -> &IteratorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut IteratorBase {
        &mut self.base
    }

    fn advance(&self, cx: &mut Cx<'_>, _id: IteratorId) -> Result<bool> {
        let row = cx.program.collection(self.store).row().to_vec();
        let store = cx.rt.collection_mut(self.store);
        if store.position >= store.rows.len() {
            return Ok(false);
        }
        let tuple = store.rows[store.position].clone();
        store.position += 1;
        cx.restore_row(&row, &tuple);
        Ok(true)
    }

    fn rewind(&self, cx: &mut Cx<'_>, _id: IteratorId) -> Result<()> {
        cx.rt.collection_mut(self.store).position = 0;
        Ok(())
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.put(program.collection(self.store).kind_name());
        explain.put(" scan");
    }
}
