use serde::{Deserialize, Serialize};
use tessera_lib_core::Result;

use crate::explain::Explain;
use crate::ids::IteratorId;
use crate::iterator::{self, IteratorBase, IteratorExec};
use crate::program::Program;
use crate::runtime::Cx;

/// Drives side effects until a child action ends the stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopForever {
    pub base: IteratorBase,
}

impl LoopForever {
    pub fn new() -> LoopForever {
        LoopForever::default()
    }
}

impl IteratorExec for LoopForever {
    fn base(&self) -> &IteratorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut IteratorBase {
        &mut self.base
    }

    fn advance(&self, _cx: &mut Cx<'_>, _id: IteratorId) -> Result<bool> {
        Ok(true)
    }

    fn explain_node(&self, _program: &Program, explain: &mut Explain) {
        explain.put("loop");
    }
}

/// Yields exactly one tuple, then marks it as the last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopOnce {
    pub base: IteratorBase,
}

impl LoopOnce {
    pub fn new() -> LoopOnce {
        LoopOnce::default()
    }
}

impl IteratorExec for LoopOnce {
    fn base(&self) -> &IteratorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut IteratorBase {
        &mut self.base
    }

    fn advance(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<bool> {
        iterator::set_was_last(cx, id);
        Ok(true)
    }

    fn explain_node(&self, _program: &Program, explain: &mut Explain) {
        explain.put("loop once");
    }
}
