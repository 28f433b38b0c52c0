use serde::{Deserialize, Serialize};
use tessera_lib_core::{CompareKind, Result, Truth, Value};

use crate::explain::Explain;
use crate::ids::{DataId, PredicateId};
use crate::predicate::PredicateExec;
use crate::program::Program;
use crate::runtime::Cx;

/// Dyadic (`a OP b`) and monadic (`a is [not] null`) comparison, plus the
/// NULL-aware `is distinct` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub kind: CompareKind,
    pub left: DataId,
    pub right: Option<DataId>,
}

impl Comparison {
    pub fn dyadic(kind: CompareKind, left: DataId, right: DataId) -> Comparison {
        Comparison {
            kind,
            left,
            right: Some(right),
        }
    }

    pub fn monadic(kind: CompareKind, operand: DataId) -> Comparison {
        Comparison {
            kind,
            left: operand,
            right: None,
        }
    }

    pub fn distinct(left: DataId, right: DataId) -> Comparison {
        Comparison::dyadic(CompareKind::IsDistinct, left, right)
    }
}

/// Table-driven comparison of two values under a kind; unknown when either
/// side is null, except for `is distinct` which never is.
pub(crate) fn compare_values(kind: CompareKind, left: &Value, right: &Value) -> Truth {
    if kind == CompareKind::IsDistinct {
        return Truth::from(left.distinct(right));
    }
    if left.is_null() || right.is_null() {
        return Truth::Unknown;
    }
    kind.of_ordering(left.compare_to(right))
}

impl PredicateExec for Comparison {
    fn evaluate(&self, cx: &mut Cx<'_>, _id: PredicateId) -> Result<Truth> {
        match self.right {
            None => Ok(self.kind.of_nullness(cx.value(self.left).is_null())),
            Some(right) => Ok(compare_values(
                self.kind,
                cx.value(self.left),
                cx.value(right),
            )),
        }
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        explain.put("check ");
        program.explain_variable(self.left, explain);
        explain.put(" ");
        explain.put(self.kind.as_ref());
        if let Some(right) = self.right {
            explain.put(" ");
            program.explain_variable(right, explain);
        }
        explain.pop_no_newline();
    }
}

/// Lexicographic row comparison `(a1,…,an) OP (b1,…,bn)`.
///
/// Scans element-wise while the pair compares equal, then decides on the
/// first non-equal pair; a fully equal row behaves as equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowComparison {
    pub kind: CompareKind,
    pub left: Vec<DataId>,
    pub right: Vec<DataId>,
}

impl RowComparison {
    pub fn new(kind: CompareKind, left: Vec<DataId>, right: Vec<DataId>) -> RowComparison {
        RowComparison { kind, left, right }
    }
}

impl PredicateExec for RowComparison {
    fn evaluate(&self, cx: &mut Cx<'_>, _id: PredicateId) -> Result<Truth> {
        debug_assert_eq!(self.left.len(), self.right.len());

        for (&left, &right) in self.left.iter().zip(&self.right) {
            let equal = compare_values(CompareKind::Equals, cx.value(left), cx.value(right));
            if equal != Truth::True {
                return Ok(compare_values(self.kind, cx.value(left), cx.value(right)));
            }
        }
        Ok(self.kind.of_ordering(std::cmp::Ordering::Equal))
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        explain.put("check row ");
        explain.put(self.kind.as_ref());
        if explain.is_data_on() {
            explain.put(" (");
            for (i, &left) in self.left.iter().enumerate() {
                if i > 0 {
                    explain.put(", ");
                }
                program.explain_variable(left, explain);
            }
            explain.put(")");
        }
        explain.pop_no_newline();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_of_two_nulls_is_false() {
        assert_eq!(
            compare_values(CompareKind::IsDistinct, &Value::null(), &Value::null()),
            Truth::False
        );
        assert_eq!(
            compare_values(CompareKind::IsDistinct, &Value::null(), &Value::from(1)),
            Truth::True
        );
    }

    #[test]
    fn null_operand_is_unknown_for_ordinary_kinds() {
        assert_eq!(
            compare_values(CompareKind::Equals, &Value::null(), &Value::from(1)),
            Truth::Unknown
        );
        assert_eq!(
            compare_values(CompareKind::Less, &Value::from(1), &Value::null()),
            Truth::Unknown
        );
    }
}
