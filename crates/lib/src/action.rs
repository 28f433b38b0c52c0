use serde::{Deserialize, Serialize};
use tessera_lib_core::{Result, Truth};

use crate::ids::{FunctionId, OperatorId, PredicateId};
use crate::runtime::Cx;
use crate::{function, operator, predicate};

/// Outcome of one action step inside a driver tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Proceed to the next action in the list.
    Success,
    /// Abort the stream.
    Break,
    /// Drop the current tuple and ask the driver for the next one.
    Continue,
}

/// One entry of an iterator's action list.
///
/// Predicates act as filters: a non-true outcome suppresses the tuple, and a
/// predicate that has proven it can never match ends the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionEntry {
    Operator(OperatorId),
    Function(FunctionId),
    Filter(PredicateId),
}

pub type ActionList = Vec<ActionEntry>;

/// Run an action list in plan order.
pub fn execute_list(cx: &mut Cx<'_>, list: &[ActionEntry]) -> Result<Status> {
    for entry in list {
        match *entry {
            ActionEntry::Operator(id) => match operator::execute(cx, id)? {
                Status::Success => {}
                interrupted => return Ok(interrupted),
            },
            ActionEntry::Function(id) => function::execute(cx, id)?,
            ActionEntry::Filter(id) => {
                let outcome = predicate::evaluate(cx, id)?;
                if cx.rt.predicate_state(id).never_true {
                    return Ok(Status::Break);
                }
                if outcome != Truth::True {
                    return Ok(Status::Continue);
                }
            }
        }
    }
    Ok(Status::Success)
}

/// Run the finish hooks of every action in the list.
pub fn finish_list(cx: &mut Cx<'_>, list: &[ActionEntry]) -> Result<()> {
    for entry in list {
        if let ActionEntry::Operator(id) = *entry {
            operator::finish(cx, id)?;
        }
    }
    Ok(())
}
