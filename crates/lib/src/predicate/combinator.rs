use serde::{Deserialize, Serialize};
use tessera_lib_core::{Result, Truth};

use crate::explain::Explain;
use crate::ids::PredicateId;
use crate::predicate::{self, PredicateExec};
use crate::program::Program;
use crate::runtime::Cx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombinatorKind {
    And,
    Or,
    Not,
}

/// Kleene conjunction, disjunction and negation over child predicates.
///
/// `And` short-circuits on a false child, `Or` on a true one; unknown never
/// short-circuits, so every child that can decide the outcome still runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combinator {
    pub kind: CombinatorKind,
    pub children: Vec<PredicateId>,
}

impl Combinator {
    pub fn and(children: Vec<PredicateId>) -> Combinator {
        Combinator {
            kind: CombinatorKind::And,
            children,
        }
    }

    pub fn or(children: Vec<PredicateId>) -> Combinator {
        Combinator {
            kind: CombinatorKind::Or,
            children,
        }
    }

    pub fn not(child: PredicateId) -> Combinator {
        Combinator {
            kind: CombinatorKind::Not,
            children: vec![child],
        }
    }
}

impl PredicateExec for Combinator {
    fn evaluate(&self, cx: &mut Cx<'_>, _id: PredicateId) -> Result<Truth> {
        match self.kind {
            CombinatorKind::And => {
                let mut result = Truth::True;
                for &child in &self.children {
                    result = result.and(predicate::evaluate(cx, child)?);
                    if result == Truth::False {
                        break;
                    }
                }
                Ok(result)
            }
            CombinatorKind::Or => {
                let mut result = Truth::False;
                for &child in &self.children {
                    result = result.or(predicate::evaluate(cx, child)?);
                    if result == Truth::True {
                        break;
                    }
                }
                Ok(result)
            }
            CombinatorKind::Not => {
                let child = self.children.first().copied().ok_or_else(|| {
                    tessera_lib_core::Error::unexpected("negation without a child predicate")
                })?;
                Ok(predicate::evaluate(cx, child)?.negate())
            }
        }
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        let name = match self.kind {
            CombinatorKind::And => "and",
            CombinatorKind::Or => "or",
            CombinatorKind::Not => "not",
        };
        explain.put(name);
        explain.indent();
        for &child in &self.children {
            explain.newline();
            predicate::explain(program, child, explain);
        }
        explain.unindent();
    }
}
