use serde::{Deserialize, Serialize};
use tessera_lib_core::Result;

use crate::explain::Explain;
use crate::ids::IteratorId;
use crate::iterator::{self, IterKindRt, IteratorBase, IteratorExec};
use crate::program::Program;
use crate::runtime::Cx;

/// Nested-loop join driver: for every outer tuple, replays the inner
/// iterator from the top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedLoop {
    pub base: IteratorBase,
    pub outer: IteratorId,
    pub inner: IteratorId,
}

impl NestedLoop {
    pub fn new(outer: IteratorId, inner: IteratorId) -> NestedLoop {
        NestedLoop {
            base: IteratorBase::default(),
            outer,
            inner,
        }
    }

    fn inner_active(cx: &Cx<'_>, id: IteratorId) -> bool {
        matches!(
            cx.rt.iter(id).kind,
            IterKindRt::NestedLoop { inner_active: true }
        )
    }

    fn set_inner_active(cx: &mut Cx<'_>, id: IteratorId, active: bool) {
        if let IterKindRt::NestedLoop { inner_active } = &mut cx.rt.iter_mut(id).kind {
            *inner_active = active;
        }
    }
}

impl IteratorExec for NestedLoop {
    fn base(&self) -> &IteratorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut IteratorBase {
        &mut self.base
    }

    fn advance(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<bool> {
        loop {
            cx.check_canceled()?;

            if !NestedLoop::inner_active(cx, id) {
                if !iterator::next(cx, self.outer)? {
                    return Ok(false);
                }
                if !iterator::has_data(cx, self.outer) {
                    continue;
                }
                iterator::reset(cx, self.inner)?;
                NestedLoop::set_inner_active(cx, id, true);
            }

            if iterator::next(cx, self.inner)? {
                if iterator::has_data(cx, self.inner) {
                    return Ok(true);
                }
                continue;
            }
            NestedLoop::set_inner_active(cx, id, false);
        }
    }

    fn rewind(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<()> {
        NestedLoop::set_inner_active(cx, id, false);
        iterator::reset(cx, self.outer)?;
        iterator::reset(cx, self.inner)
    }

    fn finish_kind(&self, cx: &mut Cx<'_>, _id: IteratorId) -> Result<()> {
        iterator::finish(cx, self.outer)?;
        iterator::finish(cx, self.inner)
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.put("nested loop");
        explain.indent();
        explain.newline();
        iterator::explain(program, self.outer, explain);
        explain.newline();
        iterator::explain(program, self.inner, explain);
        explain.unindent();
    }
}
