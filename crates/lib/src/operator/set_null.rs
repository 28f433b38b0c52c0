use serde::{Deserialize, Serialize};
use tessera_lib_core::{Error, Result};

use crate::action::Status;
use crate::explain::Explain;
use crate::ids::{DataId, OperatorId};
use crate::operator::OperatorExec;
use crate::program::Program;
use crate::runtime::Cx;

/// Sets every element of an array variable to null, keeping the element
/// count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetNull {
    pub target: DataId,
}

impl SetNull {
    pub fn new(target: DataId) -> SetNull {
        SetNull { target }
    }
}

impl OperatorExec for SetNull {
    fn run(&self, cx: &mut Cx<'_>, _id: OperatorId) -> Result<Status> {
        let found = cx.value(self.target).type_code();
        let Some(elements) = cx.value_mut(self.target).as_array_mut() else {
            return Err(Error::UnexpectedType {
                context: "set-null target",
                found,
            });
        };
        for element in elements {
            element.set_null();
        }
        Ok(Status::Success)
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        explain.put("set null ");
        program.explain_variable(self.target, explain);
        explain.pop_no_newline();
    }
}
