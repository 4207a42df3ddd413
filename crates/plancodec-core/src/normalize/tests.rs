use super::*;
use crate::{
    flat::flatten,
    obs::with_metrics_sink,
    plan::{
        ColumnRef, Expr, PlanId, PlanIdAllocator, ProjectionItem, TableRef, TableScan,
        operator::Operator,
    },
    test_fixtures::{self, CaptureSink},
};

// Normalize through both surfaces and insist they agree.
fn both(plan: &PhysicalPlan) -> NormalizedPlan {
    let from_tree = normalize_tree(Some(plan));
    let from_flat = normalize_flat(&flatten(Some(plan), true));
    assert_eq!(from_tree, from_flat);

    from_tree
}

fn digest(plan: &PhysicalPlan) -> PlanDigest {
    both(plan).digest.expect("available plan has a digest")
}

#[test]
fn filtered_scan_normalizes_to_ordinals_and_placeholders() {
    let alloc = PlanIdAllocator::new();
    let normalized = both(&test_fixtures::filtered_scan(&alloc, "lt", 5));

    assert_eq!(
        normalized.text,
        "0\tTableReader_0\troot\tdata:Selection_1\n\
         1\tSelection_1\tcop[row]\tlt(test.t1.a, ?)\n\
         2\tTableFullScan_2\tcop[row]\ttable:test.t1, keep order:false"
    );
    assert_eq!(
        normalized.digest,
        Some(PlanDigest::of_text(&normalized.text))
    );
}

#[test]
fn literals_do_not_change_the_digest() {
    let a = PlanIdAllocator::new();
    let b = PlanIdAllocator::new();

    assert_eq!(
        digest(&test_fixtures::filtered_scan(&a, "lt", 5)),
        digest(&test_fixtures::filtered_scan(&b, "lt", 9_000))
    );
    assert_eq!(
        digest(&test_fixtures::point_get(&a, 1)),
        digest(&test_fixtures::point_get(&b, 42))
    );
    assert_eq!(
        digest(&test_fixtures::top_n(&a, 0, 10)),
        digest(&test_fixtures::top_n(&b, 20, 500))
    );
    assert_eq!(
        digest(&test_fixtures::index_lookup(&a, 5)),
        digest(&test_fixtures::index_lookup(&b, -3))
    );
    assert_eq!(
        digest(&test_fixtures::delete(&a, 1)),
        digest(&test_fixtures::delete(&b, 2))
    );
}

#[test]
fn in_lists_of_any_length_share_a_digest() {
    let a = PlanIdAllocator::new();
    let b = PlanIdAllocator::new();

    let short = both(&test_fixtures::in_list(&a, &[1]));
    let long = both(&test_fixtures::in_list(&b, &[1, 2, 3, 4, 5, 6, 7]));

    assert_eq!(short, long);
    assert!(short.text.contains("in(test.t1.a, ...)"));
}

#[test]
fn structure_changes_the_digest() {
    let a = PlanIdAllocator::new();
    let b = PlanIdAllocator::new();

    assert_ne!(
        digest(&test_fixtures::filtered_scan(&a, "lt", 5)),
        digest(&test_fixtures::filtered_scan(&b, "eq", 5))
    );

    a.reset();
    b.reset();
    assert_ne!(
        digest(&test_fixtures::join(&a, "merge", 1)),
        digest(&test_fixtures::join(&b, "index", 1))
    );

    a.reset();
    b.reset();
    assert_ne!(
        digest(&test_fixtures::join(&a, "hash", 1)),
        digest(&test_fixtures::join(&b, "merge", 1))
    );
}

#[test]
fn table_identity_changes_the_digest() {
    let alloc = PlanIdAllocator::new();
    let plan = test_fixtures::filtered_scan(&alloc, "lt", 5);

    let renamed = {
        let mut plan = plan.clone();
        let scan = &mut plan.root.children[0].children[0];
        if let Operator::TableFullScan(inner) = &mut scan.op {
            inner.table = test_fixtures::table("t2");
        }
        plan
    };

    assert_ne!(digest(&plan), digest(&renamed));
}

#[test]
fn pruned_partition_is_transparent() {
    let a = PlanIdAllocator::new();
    let b = PlanIdAllocator::new();

    assert_eq!(
        digest(&test_fixtures::partitioned_scan(&a, 1)),
        digest(&test_fixtures::partitioned_scan(&b, 20))
    );
}

#[test]
fn identity_assignment_does_not_change_the_digest() {
    let fresh = PlanIdAllocator::new();
    let shifted = PlanIdAllocator::starting_at(1_000);

    assert_eq!(
        both(&test_fixtures::join(&fresh, "index", 1)),
        both(&test_fixtures::join(&shifted, "index", 1))
    );
    assert_eq!(
        both(&test_fixtures::shuffle_window(&fresh, 4)),
        both(&test_fixtures::shuffle_window(&shifted, 4))
    );
}

#[test]
fn generated_columns_are_renumbered_by_definition_site() {
    let a = PlanIdAllocator::new();
    let b = PlanIdAllocator::starting_at(9);

    let low = both(&test_fixtures::two_phase_agg(&a, 3));
    let high = both(&test_fixtures::two_phase_agg(&b, 17));

    assert_eq!(low, high);
    assert!(low.text.contains("count(Column#3.0)->Column#1.0"));
    assert!(!high.text.contains("Column#17"));
}

#[test]
fn recursive_cte_normalizes_headers_and_references() {
    let alloc = PlanIdAllocator::new();
    let normalized = both(&test_fixtures::recursive_cte(&alloc, 0, 10));

    assert_eq!(
        normalized.text,
        "0\tCTEFullScan_0\troot\tCTE:cte, data:CTE_0\n\
         0\tCTE_0\troot\tRecursive CTE\n\
         1\tProjection_2(Seed Part)\troot\t?->Column#2.0\n\
         2\tTableDual_3\troot\trows:?\n\
         1\tProjection_4(Recursive Part)\troot\tplus(Column#2.0, ?)->Column#4.0\n\
         2\tSelection_5\troot\tlt(Column#2.0, ?)\n\
         3\tCTETable_6\troot\tScan on CTE_0"
    );

    let other = PlanIdAllocator::starting_at(50);
    assert_eq!(
        normalized,
        both(&test_fixtures::recursive_cte(&other, 8, 1_000))
    );
}

#[test]
fn runtime_stats_never_reach_normalized_text() {
    let a = PlanIdAllocator::new();
    let b = PlanIdAllocator::new();

    assert_eq!(
        both(&test_fixtures::with_stats(test_fixtures::join(&a, "hash", 1))),
        both(&test_fixtures::join(&b, "hash", 1))
    );
}

#[test]
fn unavailable_plan_has_no_digest() {
    let from_tree = normalize_tree(None);
    let from_flat = normalize_flat(&flatten(None, false));

    assert!(from_tree.is_unavailable());
    assert_eq!(from_tree.text, "");
    assert_eq!(from_tree, from_flat);
}

#[test]
#[should_panic(expected = "appears more than once")]
fn duplicate_plan_ids_panic() {
    let leaf = PlanNode::new(PlanId(1), Operator::TableDual { rows: 1 });
    let root = PlanNode::new(PlanId(1), Operator::Limit { offset: 0, count: 1 }).child(leaf);

    let _ = normalize_tree(Some(&PhysicalPlan::new(root)));
}

#[test]
fn normalization_reports_node_counts_per_surface() {
    let alloc = PlanIdAllocator::new();
    let plan = test_fixtures::recursive_cte(&alloc, 0, 10);
    let capture = CaptureSink::default();

    with_metrics_sink(&capture, || {
        let _ = normalize_tree(Some(&plan));
        let _ = normalize_flat(&flatten(Some(&plan), false));
        let _ = normalize_tree(None);
    });

    assert_eq!(
        capture.events(),
        vec![
            MetricsEvent::PlanNormalized {
                surface: Surface::Tree,
                nodes: 7,
            },
            MetricsEvent::PlanNormalized {
                surface: Surface::Flat,
                nodes: 7,
            },
            MetricsEvent::PlanUnavailable {
                surface: Surface::Tree,
            },
        ]
    );
}

// Projection over a leaf whose output schema lists generated columns 9 and 10.
fn projection_over_leaf(first_id: u64, refs: &[u64], leaf_schema: bool) -> PhysicalPlan {
    let alloc = PlanIdAllocator::starting_at(first_id);
    let mut leaf = PlanNode::new(alloc.next_id(), Operator::TableDual { rows: 1 });
    if leaf_schema {
        leaf = leaf.with_schema(vec![ColumnRef::Generated(9), ColumnRef::Generated(10)]);
    }
    let items = refs
        .iter()
        .map(|id| ProjectionItem::pass(Expr::generated(*id)))
        .collect();

    PhysicalPlan::new(
        PlanNode::new(alloc.next_id(), Operator::Projection { items }).child(leaf),
    )
}

#[test]
fn schema_columns_are_numbered_at_the_producing_node() {
    let forward = both(&projection_over_leaf(0, &[9, 10], true));
    let swapped = both(&projection_over_leaf(0, &[10, 9], true));
    let repeated = both(&projection_over_leaf(0, &[9, 9], true));

    assert!(forward.text.contains("Column#1.0, Column#1.1"));
    assert!(swapped.text.contains("Column#1.1, Column#1.0"));
    assert_ne!(forward.digest, swapped.digest);
    assert_ne!(forward.digest, repeated.digest);
    assert_eq!(forward, both(&projection_over_leaf(40, &[9, 10], true)));
}

#[test]
fn pass_through_schemas_defer_to_the_deepest_node() {
    let alloc = PlanIdAllocator::new();
    let schema = vec![ColumnRef::Generated(3)];
    let leaf = PlanNode::new(alloc.next_id(), Operator::TableDual { rows: 1 })
        .with_schema(schema.clone());
    let limit = PlanNode::new(alloc.next_id(), Operator::Limit { offset: 0, count: 1 })
        .with_schema(schema.clone())
        .child(leaf);
    let root = PlanNode::new(
        alloc.next_id(),
        Operator::Selection {
            conditions: vec![Expr::func("isnull", vec![Expr::generated(3)])],
        },
    )
    .with_schema(schema)
    .child(limit);

    let normalized = both(&PhysicalPlan::new(root));
    assert!(normalized.text.contains("isnull(Column#2.0)"));
}

#[test]
fn unproduced_columns_are_numbered_by_first_appearance() {
    let distinct = both(&projection_over_leaf(0, &[9, 10], false));
    let repeated = both(&projection_over_leaf(0, &[9, 9], false));
    let renamed = both(&projection_over_leaf(0, &[31, 12], false));

    assert!(distinct.text.contains("Column#u0, Column#u1"));
    assert!(repeated.text.contains("Column#u0, Column#u0"));
    assert_ne!(distinct.digest, repeated.digest);
    assert_eq!(distinct, renamed);
}

#[test]
fn cte_scan_outputs_are_traceable() {
    let alloc = PlanIdAllocator::new();
    let mut plan = test_fixtures::recursive_cte(&alloc, 0, 10);
    let scan = std::mem::replace(
        &mut plan.root,
        PlanNode::new(PlanId(0), Operator::TableDual { rows: 0 }),
    );
    plan.root = PlanNode::new(
        alloc.next_id(),
        Operator::Projection {
            items: vec![ProjectionItem::pass(Expr::generated(77))],
        },
    )
    .child(scan.with_schema(vec![ColumnRef::Generated(77)]));

    let normalized = both(&plan);
    assert!(normalized.text.contains("\tColumn#1.0\n"));
    assert!(!normalized.text.contains("Column#u"));
}

#[test]
fn schemas_of_same_named_tables_stay_distinct() {
    let scan = |schema: &str| {
        let alloc = PlanIdAllocator::new();
        PhysicalPlan::new(PlanNode::new(
            alloc.next_id(),
            Operator::TableFullScan(TableScan::new(TableRef::new(schema, "t"))),
        ))
    };

    assert_ne!(digest(&scan("db1")), digest(&scan("db2")));
}

#[test]
fn odd_identifiers_cannot_inject_lines() {
    let scan = |name: &str| {
        let alloc = PlanIdAllocator::new();
        PhysicalPlan::new(PlanNode::new(
            alloc.next_id(),
            Operator::TableFullScan(TableScan::new(TableRef::new("test", name))),
        ))
    };

    let injected = both(&scan("t, keep order:false\n1\tTableDual_1\troot\trows:?"));
    assert_eq!(injected.text.lines().count(), 1);
    assert_ne!(injected.digest, both(&scan("t")).digest);
}
