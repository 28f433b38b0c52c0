use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;
use tessera_lib_core::{Error, Result, Value};

use crate::action::Status;
use crate::explain::Explain;
use crate::ids::{DataId, OperatorId};
use crate::operator::OperatorExec;
use crate::program::Program;
use crate::runtime::Cx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum GeneratorKind {
    /// Fresh rowid from the table's tuple sequence.
    RowId,
    /// Fresh identity-column value.
    Identity,
    /// Identity honoring a caller-supplied value.
    IdentityByInput,
    /// Reassert a logged rowid during replay.
    RecoveryRowId,
    /// Reassert a logged identity value during replay.
    RecoveryIdentity,
}

/// Assigns sequence values and persists the sequence when the stream
/// finishes.
///
/// `IdentityByInput` uses a non-null, non-default input as-is; when the
/// column is declared take-max it also raises the sequence so later
/// generated values stay above the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub kind: GeneratorKind,
    pub sequence: String,
    pub out: DataId,
    pub input: Option<DataId>,
    pub get_max: bool,
}

impl Generator {
    pub fn row_id(sequence: impl Into<String>, out: DataId) -> Generator {
        Generator {
            kind: GeneratorKind::RowId,
            sequence: sequence.into(),
            out,
            input: None,
            get_max: false,
        }
    }

    pub fn identity(sequence: impl Into<String>, out: DataId) -> Generator {
        Generator {
            kind: GeneratorKind::Identity,
            sequence: sequence.into(),
            out,
            input: None,
            get_max: false,
        }
    }

    pub fn identity_by_input(
        sequence: impl Into<String>,
        out: DataId,
        input: DataId,
        get_max: bool,
    ) -> Generator {
        Generator {
            kind: GeneratorKind::IdentityByInput,
            sequence: sequence.into(),
            out,
            input: Some(input),
            get_max,
        }
    }

    pub fn recovery(kind: GeneratorKind, sequence: impl Into<String>, out: DataId, input: DataId) -> Generator {
        Generator {
            kind,
            sequence: sequence.into(),
            out,
            input: Some(input),
            get_max: false,
        }
    }

    fn input_value(&self, cx: &Cx<'_>) -> Result<Value> {
        let input = self.input.ok_or_else(|| {
            Error::unexpected(format!("{} generator without input", self.kind.as_ref()))
        })?;
        Ok(cx.value(input).clone())
    }

    fn next_value(&self, cx: &mut Cx<'_>, id: OperatorId) -> Result<i64> {
        let sequence = cx
            .rt
            .sequence_mut(id)
            .ok_or_else(|| Error::unexpected("generator without a bound sequence"))?;
        sequence.next()
    }

    fn emit(&self, cx: &mut Cx<'_>, value: i64) -> Result<()> {
        let out = match self.kind {
            GeneratorKind::RowId | GeneratorKind::RecoveryRowId => {
                let rowid = u32::try_from(value).map_err(|_| {
                    Error::unexpected(format!("rowid sequence yielded {value}"))
                })?;
                Value::from(rowid)
            }
            _ => Value::from(value),
        };
        cx.set_value(self.out, out);
        Ok(())
    }
}

impl OperatorExec for Generator {
    fn run(&self, cx: &mut Cx<'_>, id: OperatorId) -> Result<Status> {
        match self.kind {
            GeneratorKind::RowId | GeneratorKind::Identity => {
                let value = self.next_value(cx, id)?;
                self.emit(cx, value)?;
            }
            GeneratorKind::IdentityByInput => {
                let input = self.input_value(cx)?;
                match input.to_long() {
                    Some(value) if !input.is_default() => {
                        if self.get_max {
                            let sequence = cx.rt.sequence_mut(id).ok_or_else(|| {
                                Error::unexpected("generator without a bound sequence")
                            })?;
                            sequence.raise_to(value)?;
                        }
                        self.emit(cx, value)?;
                    }
                    _ => {
                        let value = self.next_value(cx, id)?;
                        self.emit(cx, value)?;
                    }
                }
            }
            GeneratorKind::RecoveryRowId | GeneratorKind::RecoveryIdentity => {
                let input = self.input_value(cx)?;
                let value = input.to_long().ok_or_else(|| Error::UnexpectedType {
                    context: "recovery generator input",
                    found: input.type_code(),
                })?;
                let sequence = cx.rt.sequence_mut(id).ok_or_else(|| {
                    Error::unexpected("generator without a bound sequence")
                })?;
                sequence.reassert(value)?;
                self.emit(cx, value)?;
            }
        }
        Ok(Status::Success)
    }

    fn finish_op(&self, cx: &mut Cx<'_>, id: OperatorId) -> Result<()> {
        match cx.rt.sequence_mut(id) {
            Some(sequence) => sequence.persist(),
            None => Ok(()),
        }
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        explain.put("generate ");
        explain.put(self.kind.as_ref());
        explain.put(" -> ");
        program.explain_variable(self.out, explain);
        explain.pop_no_newline();
    }
}
