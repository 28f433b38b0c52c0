use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_lib_core::{Result, Value};

use crate::explain::Explain;
use crate::ids::{DataId, FileAccessId, IteratorId, LocatorSlot};
use crate::iterator::{IterKindRt, IteratorBase, IteratorExec};
use crate::locator::Locator;
use crate::program::Program;
use crate::runtime::Cx;

/// How the iterator positions the file cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FileReadMode {
    /// Sequential scan over everything the file yields.
    Scan,
    /// Position by the fetch-key variable, then read the matches.
    Fetch { key: DataId },
    /// Resolve the fetch key to a locator handle; yields one tuple.
    GetLocator { key: DataId, slot: LocatorSlot },
}

/// Tuple producer over a logical file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRead {
    pub base: IteratorBase,
    pub file: FileAccessId,
    pub mode: FileReadMode,
    /// Receives each tuple as an array value.
    pub out: DataId,
}

impl FileRead {
    pub fn new(file: FileAccessId, mode: FileReadMode, out: DataId) -> FileRead {
        FileRead {
            base: IteratorBase::with_out(out),
            file,
            mode,
            out,
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
}

impl IteratorExec for FileRead {
    fn base(&self) -> &IteratorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut IteratorBase {
        &mut self.base
    }

    fn advance(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<bool> {
        let handle = cx.rt.file(self.file);

        let positioned = matches!(cx.rt.iter(id).kind, IterKindRt::File { positioned: true });
        if !positioned {
            if let IterKindRt::File { positioned } = &mut cx.rt.iter_mut(id).kind {
                *positioned = true;
            }
            match &self.mode {
                FileReadMode::Scan => {}
                FileReadMode::Fetch { key } => {
                    let Some(key) = FileRead::key_values(cx, *key) else {
                        return Ok(false);
                    };
                    handle.lock().unwrap().fetch(&key)?;
                }
                FileReadMode::GetLocator { key, slot } => {
                    let Some(key) = FileRead::key_values(cx, *key) else {
                        return Ok(false);
                    };
                    let cell = handle.lock().unwrap().get_locator(&key)?;
                    return match cell {
                        Some(cell) => {
                            let locator = Locator::new(Arc::downgrade(&handle), cell);
                            cx.rt.set_locator(*slot, Some(locator));
                            cx.set_value(self.out, Value::from(cell.0));
                            Ok(true)
                        }
                        None => Ok(false),
                    };
                }
            }
        } else if matches!(self.mode, FileReadMode::GetLocator { .. }) {
            return Ok(false);
        }

        let mut tuple = Vec::new();
        let produced = handle.lock().unwrap().get_data(&mut tuple)?;
        if produced {
            cx.set_value(self.out, Value::array(tuple));
        }
        Ok(produced)
    }

    fn rewind(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<()> {
        if let IterKindRt::File { positioned } = &mut cx.rt.iter_mut(id).kind {
            *positioned = false;
        }
        cx.rt.file(self.file).lock().unwrap().reset();
        Ok(())
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        match &self.mode {
            FileReadMode::Scan => explain.put("file scan "),
            FileReadMode::Fetch { key } => {
                explain.put("file fetch by ");
                program.explain_variable(*key, explain);
                explain.put(" ");
            }
            FileReadMode::GetLocator { key, .. } => {
                explain.put("file locator by ");
                program.explain_variable(*key, explain);
                explain.put(" ");
            }
        }
        explain.put(&program.file_access(self.file).name);
        explain.pop_no_newline();
    }
}
