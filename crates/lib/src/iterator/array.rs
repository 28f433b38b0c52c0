use serde::{Deserialize, Serialize};
use tessera_lib_core::{Error, Result};

use crate::explain::Explain;
use crate::ids::{DataId, IteratorId};
use crate::iterator::{IterKindRt, IteratorBase, IteratorExec};
use crate::program::Program;
use crate::runtime::Cx;

/// Walks an array-valued variable element by element into an out variable.
///
/// A null input is an empty stream; a non-array input is a plan bug and
/// fails with an unexpected-type error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayScan {
    pub base: IteratorBase,
    pub input: DataId,
    pub out: DataId,
}

impl ArrayScan {
    pub fn new(input: DataId, out: DataId) -> ArrayScan {
        ArrayScan {
            base: IteratorBase::with_out(out),
            input,
            out,
        }
    }
}

impl IteratorExec for ArrayScan {
    fn base(&self) -> &IteratorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut IteratorBase {
        &mut self.base
    }

    fn advance(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<bool> {
        let input = cx.value(self.input);
        if input.is_null() {
            return Ok(false);
        }
        let Some(elements) = input.as_array() else {
            return Err(Error::UnexpectedType {
                context: "array scan input",
                found: input.type_code(),
            });
        };

        let IterKindRt::Array { position } = cx.rt.iter(id).kind else {
            return Err(Error::unexpected("array scan state mismatch"));
        };
        if position >= elements.len() {
            return Ok(false);
        }
        let element = elements[position].clone();

        cx.set_value(self.out, element);
        let IterKindRt::Array { position } = &mut cx.rt.iter_mut(id).kind else {
            return Err(Error::unexpected("array scan state mismatch"));
        };
        *position += 1;
        Ok(true)
    }

    fn rewind(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<()> {
        if let IterKindRt::Array { position } = &mut cx.rt.iter_mut(id).kind {
            *position = 0;
        }
        Ok(())
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        explain.put("array scan ");
        program.explain_variable(self.input, explain);
        explain.pop_no_newline();
    }
}
