use serde::{Deserialize, Serialize};
use tessera_lib_core::{Result, Truth, Value};

use crate::explain::Explain;
use crate::ids::{DataId, PredicateId};
use crate::predicate::PredicateExec;
use crate::program::Program;
use crate::runtime::Cx;

/// Linear-scan membership over an array operand.
///
/// True on the first equal element; unknown when the probe, the whole list,
/// or some scanned element is null and no definite match exists; false
/// otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InList {
    pub probe: DataId,
    pub list: DataId,
    pub negate: bool,
}

impl InList {
    pub fn new(probe: DataId, list: DataId) -> InList {
        InList {
            probe,
            list,
            negate: false,
        }
    }

    pub fn negated(probe: DataId, list: DataId) -> InList {
        InList {
            probe,
            list,
            negate: true,
        }
    }
}

/// Shared scan used by the predicate form and the array-cascading form.
pub(crate) fn scan(probe: &Value, list: &Value) -> Truth {
    if probe.is_null() || list.is_null() {
        return Truth::Unknown;
    }
    let Some(elements) = list.as_array() else {
        // Degenerate one-element list.
        return Truth::from(probe.equals(list));
    };

    let mut saw_null = false;
    for element in elements {
        if element.is_null() {
            saw_null = true;
        } else if probe.equals(element) {
            return Truth::True;
        }
    }
    if saw_null { Truth::Unknown } else { Truth::False }
}

impl PredicateExec for InList {
    fn evaluate(&self, cx: &mut Cx<'_>, _id: PredicateId) -> Result<Truth> {
        let result = scan(cx.value(self.probe), cx.value(self.list));
        Ok(if self.negate { result.negate() } else { result })
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        explain.put("check ");
        program.explain_variable(self.probe, explain);
        if self.negate {
            explain.put(" not in ");
        } else {
            explain.put(" in ");
        }
        program.explain_variable(self.list, explain);
        explain.pop_no_newline();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins() {
        let list = Value::array(vec![Value::from(1), Value::from(2)]);
        assert_eq!(scan(&Value::from(2), &list), Truth::True);
        assert_eq!(scan(&Value::from(3), &list), Truth::False);
    }

    #[test]
    fn null_element_without_match_is_unknown() {
        let list = Value::array(vec![Value::from(1), Value::null()]);
        assert_eq!(scan(&Value::from(1), &list), Truth::True);
        assert_eq!(scan(&Value::from(9), &list), Truth::Unknown);
        assert_eq!(scan(&Value::null(), &list), Truth::Unknown);
    }
}
