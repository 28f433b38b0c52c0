use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_lib_core::{Result, Value};

use crate::action::Status;
use crate::explain::Explain;
use crate::ids::{DataId, FileAccessId, LocatorSlot, OperatorId};
use crate::locator::Locator;
use crate::operator::OperatorExec;
use crate::program::Program;
use crate::runtime::Cx;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchMode {
    /// Materialize the fetched tuple into the output variables.
    Normal,
    /// Resolve the key to a locator handle instead of reading the tuple.
    GetLocator { slot: LocatorSlot },
}

/// Keyed single-tuple read against a file access.
///
/// A null fetch key reads nothing: the normal form nulls every output, the
/// locator form leaves its slot alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFetch {
    pub file: FileAccessId,
    pub key: DataId,
    pub outputs: Vec<DataId>,
    pub mode: FetchMode,
}

impl FileFetch {
    pub fn new(file: FileAccessId, key: DataId, outputs: Vec<DataId>) -> FileFetch {
        FileFetch {
            file,
            key,
            outputs,
            mode: FetchMode::Normal,
        }
    }

    pub fn get_locator(file: FileAccessId, key: DataId, slot: LocatorSlot) -> FileFetch {
        FileFetch {
            file,
            key,
            outputs: Vec::new(),
            mode: FetchMode::GetLocator { slot },
        }
    }

    fn key_values(cx: &Cx<'_>, key: DataId) -> Option<Vec<Value>> {
        let value = cx.value(key);
        if value.is_null() {
            return None;
        }
        Some(match value.as_array() {
            Some(elements) => elements.to_vec(),
            None => vec![value.clone()],
        })
    }

    fn null_outputs(&self, cx: &mut Cx<'_>) {
        for &out in &self.outputs {
            cx.value_mut(out).set_null();
        }
    }
}

impl OperatorExec for FileFetch {
    fn run(&self, cx: &mut Cx<'_>, _id: OperatorId) -> Result<Status> {
        let key = FileFetch::key_values(cx, self.key);

        match &self.mode {
            FetchMode::Normal => {
                let Some(key) = key else {
                    self.null_outputs(cx);
                    return Ok(Status::Success);
                };
                let handle = cx.rt.file(self.file);
                let mut tuple = Vec::new();
                let found = {
                    let mut file = handle.lock().unwrap();
                    file.fetch(&key)?;
                    file.get_data(&mut tuple)?
                };
                if !found {
                    self.null_outputs(cx);
                    return Ok(Status::Success);
                }
                for (index, &out) in self.outputs.iter().enumerate() {
                    match tuple.get(index) {
                        Some(column) => cx.set_value(out, column.clone()),
                        None => cx.value_mut(out).set_null(),
                    }
                }
                Ok(Status::Success)
            }
            FetchMode::GetLocator { slot } => {
                let Some(key) = key else {
                    return Ok(Status::Success);
                };
                let handle = cx.rt.file(self.file);
                let cell = handle.lock().unwrap().get_locator(&key)?;
                let locator = cell.map(|cell| Locator::new(Arc::downgrade(&handle), cell));
                cx.rt.set_locator(*slot, locator);
                Ok(Status::Success)
            }
        }
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        match self.mode {
            FetchMode::Normal => explain.put("fetch "),
            FetchMode::GetLocator { .. } => explain.put("fetch locator "),
        }
        explain.put(&program.file_access(self.file).name);
        explain.put(" by ");
        program.explain_variable(self.key, explain);
        explain.pop_no_newline();
    }
}
