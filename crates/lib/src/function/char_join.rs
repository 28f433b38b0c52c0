use serde::{Deserialize, Serialize};
use tessera_lib_core::{Error, Result, Value};

use crate::explain::Explain;
use crate::function::FunctionExec;
use crate::ids::DataId;
use crate::program::Program;
use crate::runtime::Cx;

/// Concatenates string or array-of-string inputs with a separator.
///
/// Array inputs are joined recursively with the same separator; null inputs
/// and null elements are skipped; any other type fails not-compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharJoin {
    pub inputs: Vec<DataId>,
    pub separator: DataId,
    pub out: DataId,
}

impl CharJoin {
    pub fn new(inputs: Vec<DataId>, separator: DataId, out: DataId) -> CharJoin {
        CharJoin {
            inputs,
            separator,
            out,
        }
    }

    fn join_value(value: &Value, separator: &str, parts: &mut Vec<String>) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        if let Some(text) = value.as_str() {
            parts.push(text.to_owned());
            return Ok(());
        }
        if let Some(elements) = value.as_array() {
            let mut inner = Vec::with_capacity(elements.len());
            for element in elements {
                CharJoin::join_value(element, separator, &mut inner)?;
            }
            parts.push(inner.join(separator));
            return Ok(());
        }
        Err(Error::NotCompatible {
            expected: tessera_lib_core::TypeCode::String,
            found: value.type_code(),
        })
    }
}

impl FunctionExec for CharJoin {
    fn run(&self, cx: &mut Cx<'_>) -> Result<()> {
        if cx.value(self.separator).is_null() {
            cx.value_mut(self.out).set_null();
            return Ok(());
        }
        let Some(separator) = cx.value(self.separator).as_str().map(str::to_owned) else {
            return Err(Error::NotCompatible {
                expected: tessera_lib_core::TypeCode::String,
                found: cx.value(self.separator).type_code(),
            });
        };

        let mut parts = Vec::with_capacity(self.inputs.len());
        for &input in &self.inputs {
            CharJoin::join_value(cx.value(input), &separator, &mut parts)?;
        }
        cx.set_value(self.out, Value::from(parts.join(&separator)));
        Ok(())
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        explain.put("char join(");
        for (i, &input) in self.inputs.iter().enumerate() {
            if i > 0 {
                explain.put(", ");
            }
            program.explain_variable(input, explain);
        }
        explain.put(")");
        explain.pop_no_newline();
    }
}
