use serde::{Deserialize, Serialize};
use tessera_lib_core::Result;

use crate::explain::Explain;
use crate::ids::{DataId, IteratorId};
use crate::iterator::{self, IterKindRt, IteratorBase, IteratorExec};
use crate::program::Program;
use crate::runtime::Cx;

/// Grouping over key-sorted input: yields the first tuple of every run of
/// equal grouping keys. Aggregation hangs off the per-tuple action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub base: IteratorBase,
    pub input: IteratorId,
    pub keys: Vec<DataId>,
}

impl Group {
    pub fn new(input: IteratorId, keys: Vec<DataId>) -> Group {
        Group {
            base: IteratorBase::default(),
            input,
            keys,
        }
    }
}

impl IteratorExec for Group {
    fn base(&self) -> &IteratorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut IteratorBase {
        &mut self.base
    }

    fn advance(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<bool> {
        loop {
            cx.check_canceled()?;
            if !iterator::next(cx, self.input)? {
                return Ok(false);
            }
            if !iterator::has_data(cx, self.input) {
                continue;
            }

            let key = cx.snapshot_row(&self.keys);
            let changed = match &cx.rt.iter(id).kind {
                IterKindRt::Group { previous } => previous.as_ref() != Some(&key),
                _ => true,
            };
            if changed {
                if let IterKindRt::Group { previous } = &mut cx.rt.iter_mut(id).kind {
                    *previous = Some(key);
                }
                return Ok(true);
            }
        }
    }

    fn rewind(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<()> {
        if let IterKindRt::Group { previous } = &mut cx.rt.iter_mut(id).kind {
            *previous = None;
        }
        iterator::reset(cx, self.input)
    }

    fn finish_kind(&self, cx: &mut Cx<'_>, _id: IteratorId) -> Result<()> {
        iterator::finish(cx, self.input)
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        explain.put("group by ");
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                explain.put(", ");
            }
            program.explain_variable(*key, explain);
        }
        explain.pop_no_newline();
        explain.indent();
        explain.newline();
        iterator::explain(program, self.input, explain);
        explain.unindent();
    }
}
