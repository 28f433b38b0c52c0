use serde::{Deserialize, Serialize};
use tessera_lib_core::{Error, Result};

use crate::explain::Explain;
use crate::ids::{CollectionId, DataId, IteratorId};
use crate::iterator::{self, IterKindRt, IteratorBase, IteratorExec};
use crate::program::Program;
use crate::runtime::Cx;

/// Passes at most `limit` tuples after skipping `offset`, counting through
/// a limit-counter collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    pub base: IteratorBase,
    pub input: IteratorId,
    pub counter: CollectionId,
    pub limit: DataId,
    pub offset: Option<DataId>,
}

impl Limit {
    pub fn new(input: IteratorId, counter: CollectionId, limit: DataId) -> Limit {
        Limit {
            base: IteratorBase::default(),
            input,
            counter,
            limit,
            offset: None,
        }
    }

    fn bound(cx: &Cx<'_>, data: DataId, what: &str) -> Result<u64> {
        let value = cx.value(data);
        value
            .to_long()
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| Error::BadArgument(format!("{what} must be a non-negative integer")))
    }
}

impl IteratorExec for Limit {
    fn base(&self) -> &IteratorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut IteratorBase {
        &mut self.base
    }

    fn advance(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<bool> {
        if let IterKindRt::Limit {
            resolved: false, ..
        } = cx.rt.iter(id).kind
        {
            let limit = Limit::bound(cx, self.limit, "limit")?;
            let offset = match self.offset {
                Some(offset) => Limit::bound(cx, offset, "offset")?,
                None => 0,
            };
            if let IterKindRt::Limit {
                resolved,
                limit: bound,
                skipped,
            } = &mut cx.rt.iter_mut(id).kind
            {
                *resolved = true;
                *bound = limit;
                *skipped = offset;
            }
        }

        let IterKindRt::Limit { limit, .. } = cx.rt.iter(id).kind else {
            return Err(Error::unexpected("limit state mismatch"));
        };

        loop {
            if cx.rt.collection(self.counter).count >= limit {
                return Ok(false);
            }
            if !iterator::next(cx, self.input)? {
                return Ok(false);
            }
            if !iterator::has_data(cx, self.input) {
                continue;
            }
            if let IterKindRt::Limit { skipped, .. } = &mut cx.rt.iter_mut(id).kind {
                if *skipped > 0 {
                    *skipped -= 1;
                    continue;
                }
            }
            cx.rt.collection_mut(self.counter).count += 1;
            return Ok(true);
        }
    }

    fn rewind(&self, cx: &mut Cx<'_>, id: IteratorId) -> Result<()> {
        if let IterKindRt::Limit {
            resolved, skipped, ..
        } = &mut cx.rt.iter_mut(id).kind
        {
            *resolved = false;
            *skipped = 0;
        }
        cx.rt.collection_mut(self.counter).count = 0;
        iterator::reset(cx, self.input)
    }

    fn finish_kind(&self, cx: &mut Cx<'_>, _id: IteratorId) -> Result<()> {
        iterator::finish(cx, self.input)
    }

    fn explain_node(&self, program: &Program, explain: &mut Explain) {
        explain.push_no_newline();
        explain.put("limit ");
        program.explain_variable(self.limit, explain);
        explain.pop_no_newline();
        explain.indent();
        explain.newline();
        iterator::explain(program, self.input, explain);
        explain.unindent();
    }
}
