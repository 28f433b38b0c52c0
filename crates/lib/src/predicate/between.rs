use serde::{Deserialize, Serialize};
use tessera_lib_core::{CompareKind, Result, Truth};

use crate::explain::Explain;
use crate::ids::{DataId, PredicateId};
use crate::predicate::PredicateExec;
use crate::predicate::comparison::compare_values;
use crate::program::Program;
use crate::runtime::Cx;

/// `x BETWEEN low AND high` as `(x >= low) AND (x <= high)` under Kleene
/// conjunction; any null operand makes the outcome unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Between {
    pub operand: DataId,
    pub lower: DataId,
    pub upper: DataId,
    pub negate: bool,
}

impl Between {
    pub fn new(operand: DataId, lower: DataId, upper: DataId) -> Between {
        Between {
            operand,
            lower,
            upper,
            negate: false,
        }
    }

    pub fn negated(operand: DataId, lower: DataId, upper: DataId) -> Between {
        Between {
            operand,
            lower,
            upper,
            negate: true,
        }
    }
}

impl PredicateExec for Between {
    fn evaluate(&self, cx: &mut Cx<'_>, _id: PredicateId) -> Result<Truth> {
        let operand = cx.value(self.operand);
        let above = compare_values(CompareKind::GreaterEquals, operand, cx.value(self.lower));
        let below = compare_values(CompareKind::LessEquals, operand, cx.value(self.upper));
        let result = above.and(below);
        Ok(if self.negate { result.negate() } else { result })
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        explain.put("check ");
        program.explain_variable(self.operand, explain);
        if self.negate {
            explain.put(" not between ");
        } else {
            explain.put(" between ");
        }
        program.explain_variable(self.lower, explain);
        explain.put(" and ");
        program.explain_variable(self.upper, explain);
        explain.pop_no_newline();
    }
}
