use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use tessera_lib_core::{Result, Truth};

use crate::explain::Explain;
use crate::ids::PredicateId;
use crate::program::Program;
use crate::runtime::Cx;

pub mod array_check;
pub mod between;
pub mod combinator;
pub mod comparison;
pub mod file_check;
pub mod in_list;

pub use array_check::{ArrayCheck, CheckMode, ElementCheck};
pub use between::Between;
pub use combinator::{Combinator, CombinatorKind};
pub use comparison::{Comparison, RowComparison};
pub use file_check::{FileCheck, FileCheckMode};
pub use in_list::InList;

#[enum_dispatch]
pub trait PredicateExec {
    /// Three-valued outcome for the current tuple.
    fn evaluate(&self, cx: &mut Cx<'_>, id: PredicateId) -> Result<Truth>;

    fn explain_node(&self, program: &Program, explain: &mut Explain);
}

#[enum_dispatch(PredicateExec)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PredicateNode {
    Comparison(Comparison),
    RowComparison(RowComparison),
    Between(Between),
    InList(InList),
    ArrayCheck(ArrayCheck),
    FileCheck(FileCheck),
    Combinator(Combinator),
}

pub fn evaluate(cx: &mut Cx<'_>, id: PredicateId) -> Result<Truth> {
    let node = cx.program.predicate(id);
    node.evaluate(cx, id)
}

pub fn explain(program: &Program, id: PredicateId, explain: &mut Explain) {
    program.predicate(id).explain_node(program, explain);
}
