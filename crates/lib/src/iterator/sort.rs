use serde::{Deserialize, Serialize};
use tessera_lib_core::{Error, Result};

use crate::collection::CollectionNode;
use crate::explain::Explain;
use crate::ids::{CollectionId, IteratorId};
use crate::iterator::{self, IterKindRt, IteratorBase, IteratorExec};
use crate::program::Program;
use crate::runtime::Cx;

/// Materializes its input into a sort-buffer collection, then replays the
/// rows in key order. The sort is stable, so equal keys keep arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub base: IteratorBase,
    pub input: IteratorId,
    pub buffer: CollectionId,
}

impl Sort {
    pub fn new(input: IteratorId, buffer: CollectionId) -> Sort {
        Sort {
            base: IteratorBase::default(),
            input,
            buffer,
        }
    }

    fn fill(&self, cx: &mut Cx<'_>, keys: &[crate::collection::SortKey]) -> Result<()> {
        let row = match cx.program.collection(self.buffer) {
            CollectionNode::Sort { row, .. } => row.clone(),
            other => {
                return Err(Error::unexpected(format!(
                    "sort iterator wired to a {} collection",
                    other.kind_name()
                )));
            }
        };

        while iterator::next(cx, self.input)? {
            cx.check_canceled()?;
            if !iterator::has_data(cx, self.input) {
                continue;
            }
            let tuple = cx.snapshot_row(&row);
            cx.rt.collection_mut(self.buffer).rows.push(tuple);
        }

        let store = cx.rt.collection_mut(self.buffer);
        store.rows.sort_by(|a, b| {
            let mut ordering = std::cmp::Ordering::Equal;
            for key in keys {
                ordering = a[key.position].compare_to(&b[key.position]);
                if key.descending {
                    ordering = ordering.reverse();
                }
                if ordering != std::cmp::Ordering::Equal {
                    break;
                }
            }
            ordering
        });
        store.position = 0;
        Ok(())
    }
}

impl IteratorExec for Sort {
    fn base(&self) -> &IteratorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut IteratorBase {
        &mut self.base
    }

    fn advance(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<bool> {
        if let IterKindRt::Sort { filled: false } = cx.rt.iter(id).kind {
            let keys = match cx.program.collection(self.buffer) {
                CollectionNode::Sort { keys, .. } => keys.clone(),
                _ => Vec::new(),
            };
            self.fill(cx, &keys)?;
            if let IterKindRt::Sort { filled } = &mut cx.rt.iter_mut(id).kind {
                *filled = true;
            }
        }

        let row = cx.program.collection(self.buffer).row().to_vec();
        let store = cx.rt.collection_mut(self.buffer);
        if store.position >= store.rows.len() {
            return Ok(false);
        }
        let tuple = store.rows[store.position].clone();
        store.position += 1;
        cx.restore_row(&row, &tuple);
        Ok(true)
    }

    fn rewind(&self, cx: &mut Cx<'_>, _id: IteratorId) -> Result<()> {
        cx.rt.collection_mut(self.buffer).position = 0;
        Ok(())
    }

    fn finish_kind(&self, cx: &mut Cx<'_>, _id: IteratorId) -> Result<()> {
        iterator::finish(cx, self.input)
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.put("sort");
        explain.indent();
        explain.newline();
        iterator::explain(program, self.input, explain);
        explain.unindent();
    }
}
