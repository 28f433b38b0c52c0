use serde::{Deserialize, Serialize};
use tessera_lib_core::{Result, Value};

use crate::action::Status;
use crate::explain::Explain;
use crate::ids::{DataId, OperatorId};
use crate::operator::OperatorExec;
use crate::program::Program;
use crate::runtime::Cx;

/// Resets a variable to null; the array variant empties the array instead,
/// leaving an array value with no elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clear {
    pub target: DataId,
    pub array: bool,
}

impl Clear {
    pub fn new(target: DataId) -> Clear {
        Clear {
            target,
            array: false,
        }
    }

    pub fn array(target: DataId) -> Clear {
        Clear {
            target,
            array: true,
        }
    }
}

impl OperatorExec for Clear {
    fn run(&self, cx: &mut Cx<'_>, _id: OperatorId) -> Result<Status> {
        if self.array {
            match cx.value_mut(self.target).as_array_mut() {
                Some(elements) => elements.clear(),
                None => cx.set_value(self.target, Value::array(Vec::new())),
            }
        } else {
            cx.value_mut(self.target).set_null();
        }
        Ok(Status::Success)
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        explain.put("clear ");
        program.explain_variable(self.target, explain);
        explain.pop_no_newline();
    }
}
