//! Plan construction, structural invariants and lineage identity.

use std::path::PathBuf;

use piglet::expr::{ArithmeticExpr, CmpOp, Literal, Predicate};
use piglet::fs::StaticFs;
use piglet::plan::{DataflowPlan, OperatorNode, PigOperator, PlanEnv};
use piglet::schema::{Field, PigType, TupleType};

fn load(file: &str, out: &str) -> OperatorNode {
    OperatorNode::new(
        PigOperator::Load {
            file: PathBuf::from(file),
            declared_schema: Some(TupleType::new(vec![
                Field::new("x", PigType::Int),
                Field::new("y", PigType::Int),
            ])),
            loader: None,
            last_modified: -1,
        },
        out,
        &[],
    )
}

fn filter_x_gt(v: i32, out: &str, input: &str) -> OperatorNode {
    OperatorNode::new(
        PigOperator::Filter {
            predicate: Predicate::cmp(
                CmpOp::Gt,
                ArithmeticExpr::field("x"),
                ArithmeticExpr::Const(Literal::Int(v)),
            ),
        },
        out,
        &[input],
    )
}

fn store(input: &str) -> OperatorNode {
    OperatorNode::new(
        PigOperator::Store {
            file: PathBuf::from("result"),
            storer: None,
        },
        "",
        &[input],
    )
}

#[test]
fn test_every_input_resolves_to_a_live_producer() {
    let plan = DataflowPlan::new(vec![
        load("f", "a"),
        filter_x_gt(0, "b", "a"),
        store("b"),
    ])
    .unwrap();

    for id in plan.ids() {
        let node = plan.node(id).unwrap();
        for input in &node.inputs {
            let pipe = plan.pipe(input).expect("input pipe exists");
            assert!(
                plan.node(pipe.producer).is_some(),
                "pipe '{input}' has a live producer"
            );
        }
    }
    assert!(plan.check_connectivity().is_ok());
    assert!(plan.check_schema_conformance().is_ok());
}

#[test]
fn test_common_prefix_shares_lineage_signatures() {
    // Two independent plans with the prefix LOAD 'f'; FILTER x > 0
    let p1 = DataflowPlan::new(vec![
        load("f", "a"),
        filter_x_gt(0, "b", "a"),
        store("b"),
    ])
    .unwrap();
    let p2 = DataflowPlan::new(vec![
        load("f", "a"),
        filter_x_gt(0, "b", "a"),
        OperatorNode::new(PigOperator::Distinct, "c", &["b"]),
        store("c"),
    ])
    .unwrap();

    let f1 = p1.find_operator_for_alias("b").unwrap();
    let f2 = p2.find_operator_for_alias("b").unwrap();
    assert_eq!(
        p1.lineage_signature(f1),
        p2.lineage_signature(f2),
        "structural copies of a sub-plan share signatures"
    );
}

#[test]
fn test_lineage_is_a_function_of_tag_literals_and_inputs() {
    let p = DataflowPlan::new(vec![
        load("f", "a"),
        filter_x_gt(0, "b", "a"),
        filter_x_gt(7, "c", "a"),
        store("b"),
        OperatorNode::new(PigOperator::Dump, "", &["c"]),
    ])
    .unwrap();
    let b = p.find_operator_for_alias("b").unwrap();
    let c = p.find_operator_for_alias("c").unwrap();
    assert_ne!(
        p.lineage_signature(b),
        p.lineage_signature(c),
        "distinct literal parameters produce distinct signatures"
    );
}

#[test]
fn test_load_mtime_invalidates_lineage_when_profiling() {
    let ops = || vec![load("f", "a"), filter_x_gt(0, "b", "a"), store("b")];

    let fs_then = StaticFs { mtime: 1_000 };
    let p1 = DataflowPlan::construct(
        ops(),
        &PlanEnv {
            profiling: true,
            fs: &fs_then,
        },
    )
    .unwrap();
    let p2 = DataflowPlan::construct(
        ops(),
        &PlanEnv {
            profiling: true,
            fs: &fs_then,
        },
    )
    .unwrap();

    let sig = |p: &DataflowPlan| {
        let id = p.find_operator_for_alias("b").unwrap();
        p.lineage_signature(id)
    };
    assert_eq!(sig(&p1), sig(&p2), "unchanged file keeps the signature");

    // touch f
    let fs_later = StaticFs { mtime: 2_000 };
    let p3 = DataflowPlan::construct(
        ops(),
        &PlanEnv {
            profiling: true,
            fs: &fs_later,
        },
    )
    .unwrap();
    assert_ne!(sig(&p1), sig(&p3), "file edit changes the signature");

    // profiling off encodes -1 regardless of the filesystem
    let p4 = DataflowPlan::construct(
        ops(),
        &PlanEnv {
            profiling: false,
            fs: &fs_later,
        },
    )
    .unwrap();
    let p5 = DataflowPlan::new(ops()).unwrap();
    assert_eq!(sig(&p4), sig(&p5));
}

#[test]
fn test_serialized_lineage_reassembles_identically() {
    let build = || {
        DataflowPlan::new(vec![
            load("f", "a"),
            filter_x_gt(0, "b", "a"),
            OperatorNode::new(
                PigOperator::Grouping {
                    keys: vec![ArithmeticExpr::field("x")],
                },
                "g",
                &["b"],
            ),
            store("g"),
        ])
        .unwrap()
    };
    let p1 = build();
    let p2 = build();
    let strings1: Vec<String> = p1.ids().iter().map(|id| p1.lineage_string(*id)).collect();
    let strings2: Vec<String> = p2.ids().iter().map(|id| p2.lineage_string(*id)).collect();
    assert_eq!(strings1, strings2);
    let sigs1: Vec<String> = p1
        .ids()
        .iter()
        .map(|id| p1.lineage_signature(*id))
        .collect();
    let sigs2: Vec<String> = p2
        .ids()
        .iter()
        .map(|id| p2.lineage_signature(*id))
        .collect();
    assert_eq!(sigs1, sigs2);
}

#[test]
fn test_group_all_schema_has_literal_all_key() {
    let plan = DataflowPlan::new(vec![
        load("f", "a"),
        OperatorNode::new(PigOperator::Grouping { keys: vec![] }, "g", &["a"]),
        store("g"),
    ])
    .unwrap();
    let g = plan.find_operator_for_alias("g").unwrap();
    let schema = plan.schema_of(g).unwrap();
    assert_eq!(schema.field("group").unwrap().1.ftype, PigType::CharArray);
    assert!(matches!(
        schema.field("a").unwrap().1.ftype,
        PigType::Bag(_)
    ));
}

#[test]
fn test_split_produces_many_pipes() {
    let branches = vec![
        (
            "pos".to_string(),
            Predicate::cmp(
                CmpOp::Gt,
                ArithmeticExpr::field("x"),
                ArithmeticExpr::Const(Literal::Int(0)),
            ),
        ),
        (
            "neg".to_string(),
            Predicate::cmp(
                CmpOp::Leq,
                ArithmeticExpr::field("x"),
                ArithmeticExpr::Const(Literal::Int(0)),
            ),
        ),
    ];
    let plan = DataflowPlan::new(vec![
        load("f", "a"),
        OperatorNode::with_outputs(
            PigOperator::SplitInto { branches },
            &["pos", "neg"],
            &["a"],
        ),
        store("pos"),
        OperatorNode::new(PigOperator::Dump, "", &["neg"]),
    ])
    .unwrap();
    assert!(plan.pipe("pos").is_some());
    assert!(plan.pipe("neg").is_some());
    assert_eq!(plan.sink_nodes().len(), 2);
}

#[test]
fn test_insert_between_preserves_join_argument_order() {
    let two_loads = vec![
        load("f", "l"),
        load("g", "r"),
        OperatorNode::new(
            PigOperator::Join {
                keys: vec![
                    vec![ArithmeticExpr::field("x")],
                    vec![ArithmeticExpr::field("x")],
                ],
            },
            "j",
            &["l", "r"],
        ),
        store("j"),
    ];
    let mut plan = DataflowPlan::new(two_loads).unwrap();
    let join = plan.find_operator_for_alias("j").unwrap();
    let right_load = plan.find_operator_for_alias("r").unwrap();

    let filter = OperatorNode::new(
        PigOperator::Filter {
            predicate: Predicate::cmp(
                CmpOp::Gt,
                ArithmeticExpr::field("x"),
                ArithmeticExpr::Const(Literal::Int(0)),
            ),
        },
        "r_f",
        &[],
    );
    plan.insert_between(right_load, join, filter).unwrap();
    plan.refresh_schemas().unwrap();

    let join_node = plan.node(join).unwrap();
    assert_eq!(
        join_node.inputs,
        vec!["l".to_string(), "r_f".to_string()],
        "the edited edge keeps its position in the input list"
    );
}

#[test]
fn test_nested_foreach_constructs_subplan() {
    use piglet::expr::RefExpr;
    use piglet::plan::{Generator, GeneratorExpr};

    // GROUP ALL names its bag field after its in pipe ("in"); the nested
    // ConstructBag dereferences that field out of the parent tuple
    let nested_ops = vec![
        OperatorNode::new(
            PigOperator::ConstructBag {
                reference: RefExpr::named("in"),
                parent_schema: None,
            },
            "t",
            &[],
        ),
        OperatorNode::new(PigOperator::Distinct, "d", &["t"]),
        OperatorNode::new(
            PigOperator::Generate {
                exprs: vec![GeneratorExpr::plain(ArithmeticExpr::field("in"))],
            },
            "",
            &["d"],
        ),
    ];
    let plan = DataflowPlan::new(vec![
        load("f", "in"),
        OperatorNode::new(PigOperator::Grouping { keys: vec![] }, "a", &["in"]),
        OperatorNode::new(
            PigOperator::Foreach {
                generator: Generator::Plan {
                    ops: nested_ops,
                    plan: None,
                },
            },
            "out",
            &["a"],
        ),
        store("out"),
    ]);
    let plan = plan.unwrap();
    let foreach = plan.find_operator_for_alias("out").unwrap();
    if let PigOperator::Foreach {
        generator: Generator::Plan { plan: sub, .. },
    } = &plan.node(foreach).unwrap().op
    {
        let sub = sub.as_ref().expect("sub-plan constructed");
        assert_eq!(sub.len(), 3);
    } else {
        panic!("expected nested foreach");
    }
}
