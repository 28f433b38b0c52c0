use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use tessera_lib_core::Result;

use crate::explain::Explain;
use crate::ids::FunctionId;
use crate::program::Program;
use crate::runtime::Cx;

pub mod char_join;

pub use char_join::CharJoin;

#[enum_dispatch]
pub trait FunctionExec {
    /// Compute the result variable from the input variables. Pure: no
    /// effect beyond the output slot.
    fn run(&self, cx: &mut Cx<'_>) -> Result<()>;

    fn explain_node(&self, program: &Program, explain: &mut Explain);
}

#[enum_dispatch(FunctionExec)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionNode {
    CharJoin(CharJoin),
}

/// Evaluate a function at most once per driver tick.
pub fn execute(cx: &mut Cx<'_>, id: FunctionId) -> Result<()> {
    if cx.rt.function_done(id) {
        return Ok(());
    }
    let node = cx.program.function(id);
    node.run(cx)?;
    cx.rt.mark_function_done(id);
    Ok(())
}

pub fn explain(program: &Program, id: FunctionId, explain: &mut Explain) {
    program.function(id).explain_node(program, explain);
}
