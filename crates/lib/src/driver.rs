use tessera_lib_core::{Error, Result, Value};
use tracing::debug_span;

use crate::context::ExecTx;
use crate::ids::FileAccessId;
use crate::iterator;
use crate::iterator::IteratorExec;
use crate::program::Program;
use crate::runtime::{Cx, Runtime};

/// Pull every tuple out of a program's root iterator.
///
/// One call per statement execution: opens the plan's file accesses, bumps
/// the epoch per tick (which clears every done latch at once), polls
/// cancellation at the loop header, and runs finish hooks before returning.
pub fn run(
    program: &Program,
    rt: &mut Runtime,
    tx: &ExecTx,
    mut emit: impl FnMut(&[Value]) -> Result<()>,
) -> Result<()> {
    let root = program
        .root()
        .ok_or_else(|| Error::BadArgument("program has no root iterator".into()))?;

    let _guard = tessera_helpers::enter_panic(format!("executing plan rooted at {root}"));
    let span = debug_span!("run", session = tx.session_id, root = root.0);
    let _entered = span.enter();

    for index in 0..program.file_accesses().len() {
        let id = FileAccessId(index as u32);
        let node = program.file_access(id);
        rt.file(id).lock().unwrap().open(tx, node.mode)?;
    }

    let out_data = program.iterator(root).base().out_data;
    let result = (|| {
        let mut cx = Cx::new(program, rt, tx);
        loop {
            cx.check_canceled()?;
            cx.rt.begin_tick();

            if !iterator::next(&mut cx, root)? {
                break;
            }
            if !iterator::has_data(&cx, root) {
                continue;
            }
            if let Some(out) = out_data {
                let value = cx.value(out).clone();
                match value.as_array() {
                    Some(elements) => emit(elements)?,
                    None => emit(std::slice::from_ref(&value))?,
                }
            }
        }
        iterator::finish(&mut cx, root)
    })();

    for handle in (0..program.file_accesses().len()).map(|i| rt.file(FileAccessId(i as u32))) {
        handle.lock().unwrap().close();
    }

    result
}

/// Run and collect the emitted tuples; test and tooling convenience.
pub fn run_collect(program: &Program, rt: &mut Runtime, tx: &ExecTx) -> Result<Vec<Vec<Value>>> {
    let mut rows = Vec::new();
    run(program, rt, tx, |tuple| {
        rows.push(tuple.to_vec());
        Ok(())
    })?;
    Ok(rows)
}
