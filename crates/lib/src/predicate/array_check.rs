use serde::{Deserialize, Serialize};
use tessera_lib_core::{CompareKind, Error, Result, Truth, Value};

use crate::explain::Explain;
use crate::ids::{DataId, PredicateId};
use crate::predicate::PredicateExec;
use crate::predicate::comparison::compare_values;
use crate::predicate::in_list;
use crate::program::Program;
use crate::runtime::Cx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckMode {
    /// True as soon as one element checks true; otherwise false, even when
    /// every element came back unknown.
    Any,
    /// True only if every element checks true; the first non-true element
    /// decides false.
    All,
}

/// Per-element test applied by an [`ArrayCheck`].
///
/// This is the composition seam replacing the deep any/all-element class
/// hierarchies: each predicate family contributes its element check and the
/// wrapper supplies the iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementCheck {
    /// Monadic when `operand` is absent, dyadic against it otherwise.
    Compare {
        kind: CompareKind,
        operand: Option<DataId>,
    },
    Between {
        lower: DataId,
        upper: DataId,
        negate: bool,
    },
    In {
        list: DataId,
        negate: bool,
    },
}

impl ElementCheck {
    fn check(&self, cx: &Cx<'_>, element: &Value) -> Truth {
        match self {
            ElementCheck::Compare { kind, operand: None } => {
                kind.of_nullness(element.is_null())
            }
            ElementCheck::Compare {
                kind,
                operand: Some(operand),
            } => compare_values(*kind, element, cx.value(*operand)),
            ElementCheck::Between {
                lower,
                upper,
                negate,
            } => {
                let above =
                    compare_values(CompareKind::GreaterEquals, element, cx.value(*lower));
                let below = compare_values(CompareKind::LessEquals, element, cx.value(*upper));
                let result = above.and(below);
                if *negate { result.negate() } else { result }
            }
            ElementCheck::In { list, negate } => {
                let result = in_list::scan(element, cx.value(*list));
                if *negate { result.negate() } else { result }
            }
        }
    }

    fn explain_into(&self, program: &Program, explain: &mut Explain) {
        match self {
            ElementCheck::Compare { kind, operand } => {
                explain.put(kind.as_ref());
                if let Some(operand) = operand {
                    explain.put(" ");
                    program.explain_variable(*operand, explain);
                }
            }
            ElementCheck::Between {
                lower,
                upper,
                negate,
            } => {
                explain.put(if *negate { "not between " } else { "between " });
                program.explain_variable(*lower, explain);
                explain.put(" and ");
                program.explain_variable(*upper, explain);
            }
            ElementCheck::In { list, negate } => {
                explain.put(if *negate { "not in " } else { "in " });
                program.explain_variable(*list, explain);
            }
        }
    }
}

/// Applies an element check across an array variable.
///
/// A null or empty array is the only unknown outcome; the element results
/// themselves never bubble an unknown out of the wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayCheck {
    pub array: DataId,
    pub mode: CheckMode,
    pub check: ElementCheck,
}

impl ArrayCheck {
    pub fn any(array: DataId, check: ElementCheck) -> ArrayCheck {
        ArrayCheck {
            array,
            mode: CheckMode::Any,
            check,
        }
    }

    pub fn all(array: DataId, check: ElementCheck) -> ArrayCheck {
        ArrayCheck {
            array,
            mode: CheckMode::All,
            check,
        }
    }
}

impl PredicateExec for ArrayCheck {
    fn evaluate(&self, cx: &mut Cx<'_>, _id: PredicateId) -> Result<Truth> {
        let value = cx.value(self.array);
        if value.is_null() {
            return Ok(Truth::Unknown);
        }
        let Some(elements) = value.as_array() else {
            return Err(Error::UnexpectedType {
                context: "array check input",
                found: value.type_code(),
            });
        };
        if elements.is_empty() {
            return Ok(Truth::Unknown);
        }

        let elements = elements.to_vec();
        match self.mode {
            CheckMode::Any => {
                for element in &elements {
                    if self.check.check(cx, element) == Truth::True {
                        return Ok(Truth::True);
                    }
                }
                Ok(Truth::False)
            }
            CheckMode::All => {
                for element in &elements {
                    if self.check.check(cx, element) != Truth::True {
                        return Ok(Truth::False);
                    }
                }
                Ok(Truth::True)
            }
        }
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        explain.put(match self.mode {
            CheckMode::Any => "check any element of ",
            CheckMode::All => "check all elements of ",
        });
        program.explain_variable(self.array, explain);
        explain.put(" ");
        self.check.explain_into(program, explain);
        explain.pop_no_newline();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecTx;
    use crate::program::Program;
    use crate::runtime::Runtime;
    use crate::schema::NoCatalog;

    fn evaluate_on(array: Value, mode: CheckMode, check: ElementCheck) -> Truth {
        let mut program = Program::new();
        let data = program.add_variable_with(array);
        let id = program.register_predicate(ArrayCheck {
            array: data,
            mode,
            check,
        });
        let mut rt = Runtime::new(&program, &crate::file::NoFiles, &NoCatalog).unwrap();
        let tx = ExecTx::default();
        let mut cx = Cx::new(&program, &mut rt, &tx);
        crate::predicate::evaluate(&mut cx, id).unwrap()
    }

    fn is_null_check() -> ElementCheck {
        ElementCheck::Compare {
            kind: CompareKind::IsNull,
            operand: None,
        }
    }

    #[test]
    fn any_element_finds_a_null() {
        let array = Value::array(vec![Value::from(1), Value::null(), Value::from(3)]);
        assert_eq!(evaluate_on(array, CheckMode::Any, is_null_check()), Truth::True);
    }

    #[test]
    fn empty_or_null_array_is_unknown() {
        assert_eq!(
            evaluate_on(Value::array(vec![]), CheckMode::Any, is_null_check()),
            Truth::Unknown
        );
        assert_eq!(
            evaluate_on(Value::null(), CheckMode::All, is_null_check()),
            Truth::Unknown
        );
    }

    #[test]
    fn all_elements_must_check_true() {
        let all_null = Value::array(vec![Value::null(), Value::null()]);
        let mixed = Value::array(vec![Value::null(), Value::from(2)]);
        assert_eq!(
            evaluate_on(all_null, CheckMode::All, is_null_check()),
            Truth::True
        );
        assert_eq!(
            evaluate_on(mixed, CheckMode::All, is_null_check()),
            Truth::False
        );
    }
}
