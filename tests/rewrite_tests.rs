//! Rewrite engine behavior on whole plans.

use std::path::PathBuf;

use piglet::backend::BackendManager;
use piglet::expr::{ArithmeticExpr, CmpOp, Literal, Predicate};
use piglet::plan::{
    DataflowPlan, Generator, GeneratorExpr, OperatorNode, PigOperator, WindowDef, WindowUnit,
};
use piglet::rewrite::{rewrite_plan, RuleRegistry};
use piglet::schema::{Field, PigType, TupleType};

fn load(out: &str) -> OperatorNode {
    OperatorNode::new(
        PigOperator::Load {
            file: PathBuf::from("f"),
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

fn cmp(op: CmpOp, field: &str, v: i32) -> Predicate {
    Predicate::cmp(
        op,
        ArithmeticExpr::field(field),
        ArithmeticExpr::Const(Literal::Int(v)),
    )
}

fn store(input: &str) -> OperatorNode {
    OperatorNode::new(
        PigOperator::Store {
            file: PathBuf::from("out"),
            storer: None,
        },
        "",
        &[input],
    )
}

/// `A = LOAD 'f' AS (x:int, y:int); B = FILTER A BY x>0; C = FILTER B BY y<5;`
/// rewrites to exactly one filter with predicate `(x>0) AND (y<5)`.
#[test]
fn test_two_filters_become_one_conjunction() {
    let mut plan = DataflowPlan::new(vec![
        load("a"),
        OperatorNode::new(
            PigOperator::Filter {
                predicate: cmp(CmpOp::Gt, "x", 0),
            },
            "b",
            &["a"],
        ),
        OperatorNode::new(
            PigOperator::Filter {
                predicate: cmp(CmpOp::Lt, "y", 5),
            },
            "c",
            &["b"],
        ),
        store("c"),
    ])
    .unwrap();

    rewrite_plan(&mut plan, &RuleRegistry::standard()).unwrap();

    let filters: Vec<_> = plan
        .ids()
        .into_iter()
        .filter_map(|id| match &plan.node(id).unwrap().op {
            PigOperator::Filter { predicate } => Some(predicate.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(filters, vec!["(x>0 AND y<5)".to_string()]);
    assert!(plan.check_connectivity().is_ok());
}

#[test]
fn test_three_filters_collapse() {
    let mut plan = DataflowPlan::new(vec![
        load("a"),
        OperatorNode::new(
            PigOperator::Filter {
                predicate: cmp(CmpOp::Gt, "x", 0),
            },
            "b",
            &["a"],
        ),
        OperatorNode::new(
            PigOperator::Filter {
                predicate: cmp(CmpOp::Lt, "y", 5),
            },
            "c",
            &["b"],
        ),
        OperatorNode::new(
            PigOperator::Filter {
                predicate: cmp(CmpOp::Neq, "x", 3),
            },
            "d",
            &["c"],
        ),
        store("d"),
    ])
    .unwrap();

    rewrite_plan(&mut plan, &RuleRegistry::standard()).unwrap();
    let filter_count = plan
        .ids()
        .into_iter()
        .filter(|id| matches!(plan.node(*id).unwrap().op, PigOperator::Filter { .. }))
        .count();
    assert_eq!(filter_count, 1);
    assert_eq!(plan.len(), 3, "load, filter, store");
}

#[test]
fn test_rewrite_fixpoint_is_idempotent() {
    let build = || {
        DataflowPlan::new(vec![
            load("a"),
            OperatorNode::new(
                PigOperator::Foreach {
                    generator: Generator::List(vec![
                        GeneratorExpr::plain(ArithmeticExpr::field("x")),
                        GeneratorExpr::plain(ArithmeticExpr::field("y")),
                    ]),
                },
                "p",
                &["a"],
            ),
            OperatorNode::new(
                PigOperator::Filter {
                    predicate: cmp(CmpOp::Gt, "x", 0),
                },
                "b",
                &["p"],
            ),
            OperatorNode::new(
                PigOperator::Filter {
                    predicate: cmp(CmpOp::Lt, "y", 5),
                },
                "c",
                &["b"],
            ),
            store("c"),
        ])
        .unwrap()
    };

    let registry = RuleRegistry::standard();
    let mut once = build();
    rewrite_plan(&mut once, &registry).unwrap();
    let snapshot = once.describe();

    let applied = rewrite_plan(&mut once, &registry).unwrap();
    assert_eq!(applied, 0, "second run applies nothing");
    assert_eq!(once.describe(), snapshot);
}

#[test]
fn test_flinks_backend_rewrites_windows() {
    let window = OperatorNode::new(
        PigOperator::Window {
            range: WindowDef {
                size: 30,
                unit: WindowUnit::Seconds,
            },
            slide: Some(WindowDef {
                size: 10,
                unit: WindowUnit::Seconds,
            }),
        },
        "w",
        &["a"],
    );
    let grouping = OperatorNode::new(
        PigOperator::Grouping {
            keys: vec![ArithmeticExpr::field("x")],
        },
        "g",
        &["w"],
    );
    let mut plan =
        DataflowPlan::new(vec![load("a"), window, grouping, store("g")]).unwrap();

    let registry = BackendManager::new("flinks").unwrap().rule_registry();
    rewrite_plan(&mut plan, &registry).unwrap();

    let g = plan.find_operator_for_alias("g").unwrap();
    assert!(matches!(
        plan.node(g).unwrap().op,
        PigOperator::WindowApply { .. }
    ));
    assert!(plan.find_operator_for_alias("w").is_none());

    // the batch backend leaves the window alone
    let window2 = OperatorNode::new(
        PigOperator::Window {
            range: WindowDef {
                size: 30,
                unit: WindowUnit::Seconds,
            },
            slide: None,
        },
        "w",
        &["a"],
    );
    let mut spark_plan = DataflowPlan::new(vec![
        load("a"),
        window2,
        OperatorNode::new(PigOperator::Distinct, "d", &["w"]),
        store("d"),
    ])
    .unwrap();
    let spark_registry = BackendManager::new("spark").unwrap().rule_registry();
    rewrite_plan(&mut spark_plan, &spark_registry).unwrap();
    assert!(spark_plan.find_operator_for_alias("w").is_some());
}

#[test]
fn test_schema_error_aborts_rewrite() {
    // predicate references a field the load does not declare
    let plan = DataflowPlan::new(vec![
        load("a"),
        OperatorNode::new(
            PigOperator::Filter {
                predicate: cmp(CmpOp::Gt, "nope", 0),
            },
            "b",
            &["a"],
        ),
        store("b"),
    ])
    .unwrap();
    assert!(plan.check_schema_conformance().is_err());
}
