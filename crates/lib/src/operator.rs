use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use tessera_lib_core::Result;

use crate::action::Status;
use crate::explain::Explain;
use crate::ids::OperatorId;
use crate::program::Program;
use crate::runtime::Cx;

pub mod clear;
pub mod collect;
pub mod file_fetch;
pub mod generator;
pub mod set_null;

pub use clear::Clear;
pub use collect::{Collect, Distinct};
pub use file_fetch::{FetchMode, FileFetch};
pub use generator::{Generator, GeneratorKind};
pub use set_null::SetNull;

#[enum_dispatch]
pub trait OperatorExec {
    /// Perform the side effect for the current tuple.
    fn run(&self, cx: &mut Cx<'_>, id: OperatorId) -> Result<Status>;

    /// End-of-stream hook (generators persist their sequences here).
    fn finish_op(&self, _cx: &mut Cx<'_>, _id: OperatorId) -> Result<()> {
        Ok(())
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain);
}

#[enum_dispatch(OperatorExec)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperatorNode {
    Clear(Clear),
    SetNull(SetNull),
    FileFetch(FileFetch),
    Generator(Generator),
    Collect(Collect),
    Distinct(Distinct),
}

/// Execute an operator at most once per driver tick.
///
/// The runtime records the epoch of the last execution; a second reference
/// to the same operator inside one tick is a no-op returning success, which
/// makes shared sub-expressions idempotent by construction.
pub fn execute(cx: &mut Cx<'_>, id: OperatorId) -> Result<Status> {
    if cx.rt.operator_done(id) {
        return Ok(Status::Success);
    }
    let node = cx.program.operator(id);
    let status = node.run(cx, id)?;
    cx.rt.mark_operator_done(id);
    Ok(status)
}

pub fn finish(cx: &mut Cx<'_>, id: OperatorId) -> Result<()> {
    let node = cx.program.operator(id);
    node.finish_op(cx, id)
}

pub fn explain(program: &Program, id: OperatorId, explain: &mut Explain) {
    program.operator(id).explain_node(program, explain);
}
