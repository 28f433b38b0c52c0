use pretty_assertions::assert_eq;
use tessera_lib::action::ActionEntry;
use tessera_lib::collection::{CollectionNode, SortKey};
use tessera_lib::context::ExecTx;
use tessera_lib::driver;
use tessera_lib::file::memory::{MemoryDriver, MemoryFile};
use tessera_lib::file::{FileAccessNode, NoFiles, OpenMode};
use tessera_lib::iterator::{ArrayScan, FileRead, FileReadMode, Limit, LoopOnce, Sort};
use tessera_lib::operator::{FileFetch, Generator};
use tessera_lib::predicate::{ArrayCheck, CheckMode, Comparison, ElementCheck, FileCheck};
use tessera_lib::program::Program;
use tessera_lib::runtime::Runtime;
use tessera_lib::schema::{Catalog, MemoryCatalog, MemorySequence, NoCatalog};
use tessera_lib_core::{CompareKind, Value};

fn runtime(program: &Program) -> Runtime {
    Runtime::new(program, &NoFiles, &NoCatalog).unwrap()
}

#[test]
fn array_scan_with_null_filter() {
    let mut program = Program::new();
    let input = program.add_variable_with(Value::array(vec![
        Value::from(1),
        Value::null(),
        Value::from(3),
    ]));
    let out = program.add_variable();

    let mut scan = ArrayScan::new(input, out);
    let not_null = program.register_predicate(Comparison::monadic(CompareKind::IsNotNull, out));
    scan.base.add_action(ActionEntry::Filter(not_null));
    let root = program.register_iterator(scan);
    program.set_root(root);

    let mut rt = runtime(&program);
    let rows = driver::run_collect(&program, &mut rt, &ExecTx::default()).unwrap();
    assert_eq!(rows, vec![vec![Value::from(1)], vec![Value::from(3)]]);
}

#[test]
fn array_scan_of_null_input_emits_nothing() {
    let mut program = Program::new();
    let input = program.add_variable_with(Value::null());
    let out = program.add_variable();
    let root = program.register_iterator(ArrayScan::new(input, out));
    program.set_root(root);

    let mut rt = runtime(&program);
    let rows = driver::run_collect(&program, &mut rt, &ExecTx::default()).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn array_scan_of_scalar_input_fails() {
    let mut program = Program::new();
    let input = program.add_variable_with(Value::from(42));
    let out = program.add_variable();
    let root = program.register_iterator(ArrayScan::new(input, out));
    program.set_root(root);

    let mut rt = runtime(&program);
    let result = driver::run_collect(&program, &mut rt, &ExecTx::default());
    assert!(matches!(
        result,
        Err(tessera_lib_core::Error::UnexpectedType { .. })
    ));
}

#[test]
fn operator_runs_once_per_tick_even_when_referenced_twice() {
    let mut program = Program::new();
    let out = program.add_variable();

    let generator = program.register_operator(Generator::identity("t.id", out));
    let mut root = LoopOnce::new();
    root.base.out_data = Some(out);
    // The same operator id appears twice in the tuple's action list.
    root.base.add_action(ActionEntry::Operator(generator));
    root.base.add_action(ActionEntry::Operator(generator));
    let root = program.register_iterator(root);
    program.set_root(root);

    let mut catalog = MemoryCatalog::new();
    catalog.register("t.id", MemorySequence::starting_at(7));

    let mut rt = Runtime::new(&program, &NoFiles, &catalog).unwrap();
    let rows = driver::run_collect(&program, &mut rt, &ExecTx::default()).unwrap();

    // One tuple, one draw from the sequence.
    assert_eq!(rows, vec![vec![Value::from(7i64)]]);
    assert_eq!(catalog.get("t.id").unwrap().persisted(), 8);
}

#[test]
fn sort_replays_in_key_order() {
    let mut program = Program::new();
    let input = program.add_variable_with(Value::array(vec![
        Value::from(3),
        Value::from(1),
        Value::from(2),
    ]));
    let out = program.add_variable();

    let scan = program.register_iterator(ArrayScan::new(input, out));
    let buffer = program.register_collection(CollectionNode::Sort {
        row: vec![out],
        keys: vec![SortKey {
            position: 0,
            descending: false,
        }],
    });
    let mut sort = Sort::new(scan, buffer);
    sort.base.out_data = Some(out);
    let root = program.register_iterator(sort);
    program.set_root(root);

    let mut rt = runtime(&program);
    let rows = driver::run_collect(&program, &mut rt, &ExecTx::default()).unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Value::from(1)],
            vec![Value::from(2)],
            vec![Value::from(3)],
        ]
    );
}

#[test]
fn limit_with_offset_bounds_the_stream() {
    let mut program = Program::new();
    let input = program.add_variable_with(Value::array(vec![
        Value::from(10),
        Value::from(20),
        Value::from(30),
        Value::from(40),
    ]));
    let out = program.add_variable();
    let limit = program.add_variable_with(Value::from(2i64));
    let offset = program.add_variable_with(Value::from(1i64));

    let scan = program.register_iterator(ArrayScan::new(input, out));
    let counter = program.register_collection(CollectionNode::LimitCounter);
    let mut node = Limit::new(scan, counter, limit);
    node.offset = Some(offset);
    node.base.out_data = Some(out);
    let root = program.register_iterator(node);
    program.set_root(root);

    let mut rt = runtime(&program);
    let rows = driver::run_collect(&program, &mut rt, &ExecTx::default()).unwrap();
    assert_eq!(rows, vec![vec![Value::from(20)], vec![Value::from(30)]]);
}

#[test]
fn file_scan_yields_stored_tuples() {
    let mut program = Program::new();
    let out = program.add_variable();
    let file = program.register_file_access(FileAccessNode {
        name: "t".into(),
        mode: OpenMode::Read,
    });
    let root = program.register_iterator(FileRead::new(file, FileReadMode::Scan, out));
    program.set_root(root);

    let mut files = MemoryDriver::new();
    files.register(
        "t",
        MemoryFile::new()
            .with_row(1, vec![Value::from("a")])
            .with_row(2, vec![Value::from("b")]),
    );

    let mut rt = Runtime::new(&program, &files, &NoCatalog).unwrap();
    let rows = driver::run_collect(&program, &mut rt, &ExecTx::default()).unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Value::from(1u32), Value::from("a")],
            vec![Value::from(2u32), Value::from("b")],
        ]
    );
}

#[test]
fn file_check_by_bitset_filters_rowids() {
    let mut program = Program::new();
    let input = program.add_variable_with(Value::array(vec![
        Value::from(1u32),
        Value::from(2u32),
        Value::from(3u32),
    ]));
    let rowid = program.add_variable();
    let check_file = program.register_file_access(FileAccessNode {
        name: "idx".into(),
        mode: OpenMode::Search,
    });

    let mut scan = ArrayScan::new(input, rowid);
    let check = program.register_predicate(FileCheck::by_bitset(check_file, rowid));
    scan.base.add_action(ActionEntry::Filter(check));
    let root = program.register_iterator(scan);
    program.set_root(root);

    let mut files = MemoryDriver::new();
    files.register("idx", MemoryFile::new().with_row(2, vec![]));

    let mut rt = Runtime::new(&program, &files, &NoCatalog).unwrap();
    let rows = driver::run_collect(&program, &mut rt, &ExecTx::default()).unwrap();
    assert_eq!(rows, vec![vec![Value::from(2u32)]]);
}

#[test]
fn empty_file_check_short_circuits_the_stream() {
    let mut program = Program::new();
    let input = program.add_variable_with(Value::array(vec![
        Value::from(1u32),
        Value::from(2u32),
    ]));
    let rowid = program.add_variable();
    let check_file = program.register_file_access(FileAccessNode {
        name: "idx".into(),
        mode: OpenMode::Search,
    });

    let mut scan = ArrayScan::new(input, rowid);
    let check = program.register_predicate(FileCheck::by_bitset(check_file, rowid));
    scan.base.add_action(ActionEntry::Filter(check));
    let root = program.register_iterator(scan);
    program.set_root(root);

    let mut files = MemoryDriver::new();
    files.register("idx", MemoryFile::new());

    let mut rt = Runtime::new(&program, &files, &NoCatalog).unwrap();
    let rows = driver::run_collect(&program, &mut rt, &ExecTx::default()).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn file_fetch_nulls_outputs_on_null_key() {
    let mut program = Program::new();
    let key = program.add_variable_with(Value::null());
    let name = program.add_variable_with(Value::from("stale"));
    let out = program.add_variable();
    let file = program.register_file_access(FileAccessNode {
        name: "t".into(),
        mode: OpenMode::Read,
    });

    let fetch = program.register_operator(FileFetch::new(file, key, vec![out, name]));
    let mut root = LoopOnce::new();
    root.base.out_data = Some(name);
    root.base.add_action(ActionEntry::Operator(fetch));
    let root = program.register_iterator(root);
    program.set_root(root);

    let mut files = MemoryDriver::new();
    files.register("t", MemoryFile::new().with_row(1, vec![Value::from("live")]));

    let mut rt = Runtime::new(&program, &files, &NoCatalog).unwrap();
    let rows = driver::run_collect(&program, &mut rt, &ExecTx::default()).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0][0].is_null());
}

#[test]
fn identity_by_input_honors_take_max() {
    let mut program = Program::new();
    let input = program.add_variable_with(Value::from(50i64));
    let out = program.add_variable();

    let generator = program.register_operator(Generator::identity_by_input(
        "t.serial", out, input, true,
    ));
    let mut root = LoopOnce::new();
    root.base.out_data = Some(out);
    root.base.add_action(ActionEntry::Operator(generator));
    let root = program.register_iterator(root);
    program.set_root(root);

    let mut catalog = MemoryCatalog::new();
    catalog.register("t.serial", MemorySequence::starting_at(10));

    let mut rt = Runtime::new(&program, &NoFiles, &catalog).unwrap();
    let rows = driver::run_collect(&program, &mut rt, &ExecTx::default()).unwrap();
    assert_eq!(rows, vec![vec![Value::from(50i64)]]);

    // The sequence was raised past the explicit input.
    let mut next = catalog.sequence("t.serial").unwrap();
    assert_eq!(next.next().unwrap(), 51);
}

#[test]
fn cancellation_unwinds_the_run() {
    let mut program = Program::new();
    let input = program.add_variable_with(Value::array(vec![Value::from(1)]));
    let out = program.add_variable();
    let root = program.register_iterator(ArrayScan::new(input, out));
    program.set_root(root);

    let tx = ExecTx::default();
    tx.cancel_token().cancel();

    let mut rt = runtime(&program);
    let result = driver::run_collect(&program, &mut rt, &tx);
    assert!(matches!(result, Err(tessera_lib_core::Error::Canceled)));
}

#[test]
fn any_element_check_drives_a_filter() {
    let mut program = Program::new();
    let arrays = program.add_variable_with(Value::array(vec![
        Value::array(vec![Value::from(1), Value::null()]),
        Value::array(vec![Value::from(2), Value::from(3)]),
    ]));
    let row = program.add_variable();

    let mut scan = ArrayScan::new(arrays, row);
    let has_null = program.register_predicate(ArrayCheck {
        array: row,
        mode: CheckMode::Any,
        check: ElementCheck::Compare {
            kind: CompareKind::IsNull,
            operand: None,
        },
    });
    scan.base.add_action(ActionEntry::Filter(has_null));
    let root = program.register_iterator(scan);
    program.set_root(root);

    let mut rt = runtime(&program);
    let rows = driver::run_collect(&program, &mut rt, &ExecTx::default()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], Value::from(1));
}
