use serde::{Deserialize, Serialize};
use tessera_lib_core::bitset::BitSet;
use tessera_lib_core::value::Scalar;
use tessera_lib_core::{Result, Truth, Value};

use crate::explain::Explain;
use crate::ids::{DataId, FileAccessId, PredicateId};
use crate::predicate::PredicateExec;
use crate::program::Program;
use crate::runtime::Cx;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FileCheckMode {
    /// Materialize matching rowids into a bitset; optionally intersect with
    /// a previous stage's bitset and publish the result into a variable.
    ByBitSet {
        prev: Option<DataId>,
        result: Option<DataId>,
    },
    /// Materialize matching tuples into a rowid-keyed map; a hit also
    /// restores the tuple columns into the output variables.
    ByCollection { outputs: Vec<DataId> },
}

/// Runs its file access once, then answers per-tuple rowid membership.
///
/// When the materialized bitset comes up empty the predicate records a
/// never-true verdict so the driver can short-circuit the rest of the
/// query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCheck {
    pub file: FileAccessId,
    pub rowid: DataId,
    pub mode: FileCheckMode,
}

impl FileCheck {
    pub fn by_bitset(file: FileAccessId, rowid: DataId) -> FileCheck {
        FileCheck {
            file,
            rowid,
            mode: FileCheckMode::ByBitSet {
                prev: None,
                result: None,
            },
        }
    }

    pub fn by_collection(file: FileAccessId, rowid: DataId, outputs: Vec<DataId>) -> FileCheck {
        FileCheck {
            file,
            rowid,
            mode: FileCheckMode::ByCollection { outputs },
        }
    }

    fn rowid_of(value: &Value) -> Option<u32> {
        if value.is_null() {
            return None;
        }
        match *value.body() {
            Scalar::Unsigned(rowid) => Some(rowid),
            Scalar::Integer(rowid) if rowid >= 0 => Some(rowid as u32),
            _ => None,
        }
    }

    fn materialize(&self, cx: &mut Cx<'_>, id: PredicateId) -> Result<()> {
        let handle = cx.rt.file(self.file);
        let mut bitset = BitSet::new();
        let mut map = ahash::AHashMap::new();

        let mut tuple = Vec::new();
        loop {
            cx.check_canceled()?;
            let produced = handle.lock().unwrap().get_data(&mut tuple)?;
            if !produced {
                break;
            }
            let Some(rowid) = tuple.first().and_then(FileCheck::rowid_of) else {
                continue;
            };
            match &self.mode {
                FileCheckMode::ByBitSet { .. } => bitset.set(rowid as usize),
                FileCheckMode::ByCollection { .. } => {
                    map.insert(rowid, tuple.clone());
                }
            }
        }

        if let FileCheckMode::ByBitSet { prev, result } = &self.mode {
            if let Some(prev) = prev {
                if let Some(previous) = cx.value(*prev).as_bitset() {
                    bitset.and_with(previous);
                }
            }
            if let Some(result) = result {
                cx.set_value(*result, Value::from(bitset.clone()));
            }
        }

        let state = cx.rt.predicate_state_mut(id);
        state.materialized = true;
        state.never_true = matches!(self.mode, FileCheckMode::ByBitSet { .. }) && bitset.is_empty();
        state.bitset = bitset;
        state.map = map;
        Ok(())
    }
}

impl PredicateExec for FileCheck {
    fn evaluate(&self, cx: &mut Cx<'_>, id: PredicateId) -> Result<Truth> {
        if !cx.rt.predicate_state(id).materialized {
            self.materialize(cx, id)?;
        }
        if cx.rt.predicate_state(id).never_true {
            return Ok(Truth::False);
        }

        let Some(rowid) = FileCheck::rowid_of(cx.value(self.rowid)) else {
            return Ok(Truth::Unknown);
        };

        match &self.mode {
            FileCheckMode::ByBitSet { .. } => {
                Ok(Truth::from(cx.rt.predicate_state(id).bitset.test(rowid as usize)))
            }
            FileCheckMode::ByCollection { outputs } => {
                let Some(tuple) = cx.rt.predicate_state(id).map.get(&rowid).cloned() else {
                    return Ok(Truth::False);
                };
                for (index, &out) in outputs.iter().enumerate() {
                    match tuple.get(index) {
                        Some(column) => cx.set_value(out, column.clone()),
                        None => cx.value_mut(out).set_null(),
                    }
                }
                Ok(Truth::True)
            }
        }
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        match self.mode {
            FileCheckMode::ByBitSet { .. } => explain.put("check(bitset) "),
            FileCheckMode::ByCollection { .. } => explain.put("check(collection) "),
        }
        explain.put(&program.file_access(self.file).name);
        explain.put(" for ");
        program.explain_variable(self.rowid, explain);
        explain.pop_no_newline();
    }
}
