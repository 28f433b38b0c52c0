use expect_test::expect;
use tessera_lib::action::ActionEntry;
use tessera_lib::collection::{CollectionNode, SortKey};
use tessera_lib::context::ExecTx;
use tessera_lib::driver;
use tessera_lib::explain::Explain;
use tessera_lib::file::NoFiles;
use tessera_lib::function::CharJoin;
use tessera_lib::iterator::{ArrayScan, Limit, Sort};
use tessera_lib::predicate::{Between, Combinator, InList};
use tessera_lib::program::Program;
use tessera_lib::runtime::Runtime;
use tessera_lib::schema::NoCatalog;
use tessera_lib_core::Value;

/// One plan touching most node kinds: scan, filters, function, sort, limit.
fn build_plan() -> Program {
    let mut program = Program::new();
    let input = program.add_variable_with(Value::array(vec![
        Value::from(9),
        Value::from(2),
        Value::from(7),
        Value::from(4),
        Value::from(5),
        Value::from(11),
    ]));
    let out = program.add_variable();
    let lower = program.add_variable_with(Value::from(3));
    let upper = program.add_variable_with(Value::from(10));
    let excluded = program.add_variable_with(Value::array(vec![Value::from(5)]));
    let separator = program.add_variable_with(Value::from("-"));
    let prefix = program.add_variable_with(Value::from("row"));
    let label = program.add_variable();
    let limit = program.add_variable_with(Value::from(2i64));

    let mut scan = ArrayScan::new(input, out);
    let in_range = program.register_predicate(Between::new(out, lower, upper));
    let not_excluded = program.register_predicate(InList::negated(out, excluded));
    let keep = program.register_predicate(Combinator::and(vec![in_range, not_excluded]));
    scan.base.add_action(ActionEntry::Filter(keep));
    let labelled = program.register_function(CharJoin::new(vec![prefix], separator, label));
    scan.base.add_action(ActionEntry::Function(labelled));
    let scan = program.register_iterator(scan);

    let buffer = program.register_collection(CollectionNode::Sort {
        row: vec![out, label],
        keys: vec![SortKey {
            position: 0,
            descending: false,
        }],
    });
    let sort = program.register_iterator(Sort::new(scan, buffer));

    let counter = program.register_collection(CollectionNode::LimitCounter);
    let mut limited = Limit::new(sort, counter, limit);
    limited.base.out_data = Some(out);
    let root = program.register_iterator(limited);
    program.set_root(root);
    program
}

fn run(program: &Program) -> Vec<Vec<Value>> {
    let mut rt = Runtime::new(program, &NoFiles, &NoCatalog).unwrap();
    driver::run_collect(program, &mut rt, &ExecTx::default()).unwrap()
}

#[test]
fn deserialized_program_is_identical() {
    let program = build_plan();
    let bytes = program.to_bytes().unwrap();
    let restored = Program::from_bytes(&bytes).unwrap();
    assert_eq!(program, restored);
}

#[test]
fn deserialized_program_executes_identically() {
    let program = build_plan();
    let restored = Program::from_bytes(&program.to_bytes().unwrap()).unwrap();

    let expected = vec![vec![Value::from(4)], vec![Value::from(7)]];
    assert_eq!(run(&program), expected);
    assert_eq!(run(&restored), expected);
}

#[test]
fn image_survives_a_second_generation() {
    let program = build_plan();
    let once = Program::from_bytes(&program.to_bytes().unwrap()).unwrap();
    let twice = Program::from_bytes(&once.to_bytes().unwrap()).unwrap();
    assert_eq!(program, twice);
}

#[test]
fn malformed_image_is_rejected() {
    let mut bytes = build_plan().to_bytes().unwrap();
    bytes.truncate(bytes.len() / 2);
    assert!(Program::from_bytes(&bytes).is_err());
}

#[test]
fn explain_renders_the_tree() {
    let program = build_plan();
    let mut sink = Explain::new();
    program.explain(&mut sink);

    expect![[r#"
        limit %8
          sort
            array scan %0"#]]
    .assert_eq(&sink.finish());
}
