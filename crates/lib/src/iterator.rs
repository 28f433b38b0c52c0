use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use tessera_lib_core::{Result, Value};

use crate::action::{self, ActionEntry, ActionList, Status};
use crate::explain::Explain;
use crate::ids::{DataId, IteratorId};
use crate::program::Program;
use crate::runtime::Cx;

pub mod array;
pub mod collection_scan;
pub mod file;
pub mod group;
pub mod limit;
pub mod loops;
pub mod nested_loop;
pub mod sort;

pub use array::ArrayScan;
pub use collection_scan::CollectionScan;
pub use file::{FileRead, FileReadMode};
pub use group::Group;
pub use limit::Limit;
pub use loops::{LoopForever, LoopOnce};
pub use nested_loop::NestedLoop;
pub use sort::Sort;

/// Plumbing every iterator carries: the tuple variable it exposes, actions
/// run once before the first tuple, and actions run on every tuple.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IteratorBase {
    pub out_data: Option<DataId>,
    pub startup: ActionList,
    pub actions: ActionList,
}

impl IteratorBase {
    pub fn with_out(out_data: DataId) -> IteratorBase {
        IteratorBase {
            out_data: Some(out_data),
            ..IteratorBase::default()
        }
    }

    pub fn add_startup(&mut self, entry: ActionEntry) {
        self.startup.push(entry);
    }

    pub fn add_action(&mut self, entry: ActionEntry) {
        self.actions.push(entry);
    }
}

/// Kind-specific runtime state of an iterator.
#[derive(Debug, Clone)]
pub enum IterKindRt {
    Simple,
    Array {
        position: usize,
    },
    File {
        positioned: bool,
    },
    NestedLoop {
        inner_active: bool,
    },
    Sort {
        filled: bool,
    },
    Limit {
        resolved: bool,
        limit: u64,
        skipped: u64,
    },
    Group {
        previous: Option<Vec<Value>>,
    },
}

impl IterKindRt {
    pub fn for_node(node: &IteratorNode) -> IterKindRt {
        match node {
            IteratorNode::ArrayScan(_) => IterKindRt::Array { position: 0 },
            IteratorNode::LoopForever(_) | IteratorNode::LoopOnce(_) => IterKindRt::Simple,
            IteratorNode::FileRead(_) => IterKindRt::File { positioned: false },
            IteratorNode::NestedLoop(_) => IterKindRt::NestedLoop {
                inner_active: false,
            },
            IteratorNode::Sort(_) => IterKindRt::Sort { filled: false },
            IteratorNode::Limit(_) => IterKindRt::Limit {
                resolved: false,
                limit: 0,
                skipped: 0,
            },
            IteratorNode::Group(_) => IterKindRt::Group { previous: None },
            IteratorNode::CollectionScan(_) => IterKindRt::Simple,
        }
    }
}

#[enum_dispatch]
pub trait IteratorExec {
    fn base(&self) -> &IteratorBase;
    fn base_mut(&mut self) -> &mut IteratorBase;

    /// Produce the next tuple into the out variables. `false` ends the
    /// stream.
    fn advance(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<bool>;

    /// Reset kind-specific state so the stream can replay.
    fn rewind(&self, _cx: &mut Cx<'_>, _id: IteratorId) -> Result<()> {
        Ok(())
    }

    /// Kind-specific finish work (delegated to children where any exist).
    fn finish_kind(&self, _cx: &mut Cx<'_>, _id: IteratorId) -> Result<()> {
        Ok(())
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain);
}

#[enum_dispatch(IteratorExec)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IteratorNode {
    ArrayScan(ArrayScan),
    LoopForever(LoopForever),
    LoopOnce(LoopOnce),
    FileRead(FileRead),
    NestedLoop(NestedLoop),
    Sort(Sort),
    Limit(Limit),
    Group(Group),
    CollectionScan(CollectionScan),
}

/// Run an iterator's one-shot startup actions if they have not run yet.
pub fn start(cx: &mut Cx<'_>, id: IteratorId) -> Result<()> {
    if cx.rt.iter(id).started {
        return Ok(());
    }
    cx.rt.iter_mut(id).started = true;
    let node = cx.program.iterator(id);
    if action::execute_list(cx, &node.base().startup)? == Status::Break {
        cx.rt.iter_mut(id).has_next = false;
    }
    Ok(())
}

/// Advance an iterator one tuple.
///
/// Returns false when the stream is exhausted. `has_data` tells whether the
/// tuple survived the per-tuple action list; a suppressed tuple still
/// returns true so the driver keeps pulling.
pub fn next(cx: &mut Cx<'_>, id: IteratorId) -> Result<bool> {
    start(cx, id)?;
    {
        let st = cx.rt.iter_mut(id);
        if st.was_last {
            st.has_next = false;
        }
        if !st.has_next {
            st.has_data = false;
            return Ok(false);
        }
    }

    let node = cx.program.iterator(id);
    if !node.advance(cx, id)? {
        let st = cx.rt.iter_mut(id);
        st.has_next = false;
        st.has_data = false;
        return Ok(false);
    }
    cx.rt.iter_mut(id).has_data = true;

    match action::execute_list(cx, &node.base().actions)? {
        Status::Success => Ok(true),
        Status::Break => {
            let st = cx.rt.iter_mut(id);
            st.has_next = false;
            st.has_data = false;
            Ok(false)
        }
        Status::Continue => {
            cx.rt.iter_mut(id).has_data = false;
            Ok(true)
        }
    }
}

/// Whether the latest `next` produced a surviving tuple.
pub fn has_data(cx: &Cx<'_>, id: IteratorId) -> bool {
    cx.rt.iter(id).has_data
}

/// Whether the stream is still alive.
pub fn has_next(cx: &Cx<'_>, id: IteratorId) -> bool {
    cx.rt.iter(id).has_next
}

/// Mark the current tuple as the last one; the following `next` ends the
/// stream.
pub fn set_was_last(cx: &mut Cx<'_>, id: IteratorId) {
    cx.rt.iter_mut(id).was_last = true;
}

/// Rewind an iterator so it can replay its stream. Startup actions do not
/// run again.
pub fn reset(cx: &mut Cx<'_>, id: IteratorId) -> Result<()> {
    {
        let st = cx.rt.iter_mut(id);
        st.has_next = true;
        st.has_data = false;
        st.was_last = false;
    }
    let node = cx.program.iterator(id);
    node.rewind(cx, id)
}

/// Run finish hooks down the iterator tree (generators persist here).
pub fn finish(cx: &mut Cx<'_>, id: IteratorId) -> Result<()> {
    let node = cx.program.iterator(id);
    action::finish_list(cx, &node.base().startup)?;
    action::finish_list(cx, &node.base().actions)?;
    node.finish_kind(cx, id)
}

/// Render an iterator subtree into an explain sink.
pub fn explain(program: &Program, id: IteratorId, explain: &mut Explain) {
    program.iterator(id).explain_node(program, explain);
}
