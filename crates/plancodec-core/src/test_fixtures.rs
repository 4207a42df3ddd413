//! Scenario plans shared by unit tests.
//!
//! Each builder takes the identity allocator and the literal values that a
//! compiled query would carry, so tests can vary literals and identities
//! independently of structure.

use crate::plan::{
    AggFunc, AggMode, Aggregation, BuildSide, ByItem, ColumnRef, CteDefinition, CteId, CteRef,
    Expr, IndexRef, IndexScan, Join, JoinType, Literal, PhysicalPlan, PlanIdAllocator, PlanNode,
    PlanRef, PointGet, ProjectionItem, RuntimeStats, ScanRange, Shuffle, TableRef, TableScan,
    Window, WindowFunc, operator::Operator, stats::RuntimeStatsColl,
};
use crate::obs::{MetricsEvent, MetricsSink};
use std::{cell::RefCell, time::Duration};

/// Sink that keeps every event recorded while it is installed.
#[derive(Default)]
pub(crate) struct CaptureSink(RefCell<Vec<MetricsEvent>>);

impl CaptureSink {
    pub(crate) fn events(&self) -> Vec<MetricsEvent> {
        self.0.borrow().clone()
    }
}

impl MetricsSink for CaptureSink {
    fn record(&self, event: MetricsEvent) {
        self.0.borrow_mut().push(event);
    }
}

pub(crate) fn table(name: &str) -> TableRef {
    TableRef::new("test", name)
}

pub(crate) fn col(table: &str, column: &str) -> Expr {
    Expr::col("test", table, column)
}

fn node(alloc: &PlanIdAllocator, op: Operator) -> PlanNode {
    PlanNode::new(alloc.next_id(), op)
}

fn full_scan(alloc: &PlanIdAllocator, name: &str) -> PlanNode {
    node(alloc, Operator::TableFullScan(TableScan::new(table(name))))
        .rows(10_000.0)
        .cop()
}

fn filtered_reader(alloc: &PlanIdAllocator, name: &str, cond: Expr) -> PlanNode {
    let scan = full_scan(alloc, name);
    let selection = node(
        alloc,
        Operator::Selection {
            conditions: vec![cond],
        },
    )
    .rows(3_323.33)
    .cop()
    .child(scan);

    node(alloc, Operator::TableReader).rows(3_323.33).child(selection)
}

/// `select * from t1 where a <func> <value>`
pub(crate) fn filtered_scan(alloc: &PlanIdAllocator, func: &str, value: i64) -> PhysicalPlan {
    let cond = Expr::func(func, vec![col("t1", "a"), Expr::int(value)]);
    PhysicalPlan::new(filtered_reader(alloc, "t1", cond))
}

/// `select * from t1 where a in (<values>)`
pub(crate) fn in_list(alloc: &PlanIdAllocator, values: &[i64]) -> PhysicalPlan {
    let mut args = vec![col("t1", "a")];
    args.extend(values.iter().copied().map(Expr::int));
    PhysicalPlan::new(filtered_reader(alloc, "t1", Expr::func("in", args)))
}

/// `select * from t1 where id = <handle>` served by a point lookup.
pub(crate) fn point_get(alloc: &PlanIdAllocator, handle: i64) -> PhysicalPlan {
    PhysicalPlan::new(
        node(
            alloc,
            Operator::PointGet(PointGet::by_handle(table("t1"), Literal::Int(handle))),
        )
        .rows(1.0),
    )
}

/// `select * from t1 where b < <bound>` through a secondary index.
pub(crate) fn index_lookup(alloc: &PlanIdAllocator, bound: i64) -> PhysicalPlan {
    let index = node(
        alloc,
        Operator::IndexRangeScan(
            IndexScan::new(table("t1"), IndexRef::new("b", &["b"]))
                .with_ranges(vec![ScanRange::less_than(Literal::Int(bound))]),
        ),
    )
    .rows(3_323.33)
    .cop();
    let rows = node(
        alloc,
        Operator::TableRowIdScan(TableScan::new(table("t1"))),
    )
    .rows(3_323.33)
    .cop();

    PhysicalPlan::new(
        node(alloc, Operator::IndexLookUp)
            .rows(3_323.33)
            .child(index)
            .child(rows),
    )
}

/// `select * from t1 partition-pruned by a = <value>`; the pruned partition
/// is a consequence of the literal.
pub(crate) fn partitioned_scan(alloc: &PlanIdAllocator, value: i64) -> PhysicalPlan {
    let partition = if value < 10 { "p0" } else { "p1" };
    let scan = node(
        alloc,
        Operator::TableFullScan(TableScan::new(table("t3")).with_partition(partition)),
    )
    .rows(10_000.0)
    .cop();
    let selection = node(
        alloc,
        Operator::Selection {
            conditions: vec![Expr::func("eq", vec![col("t3", "a"), Expr::int(value)])],
        },
    )
    .rows(10.0)
    .cop()
    .child(scan);

    PhysicalPlan::new(node(alloc, Operator::TableReader).rows(10.0).child(selection))
}

/// Join of t1 and t2 on `a`, filtered by `t1.b > <value>`, with the given
/// algorithm.
pub(crate) fn join(alloc: &PlanIdAllocator, algorithm: &str, value: i64) -> PhysicalPlan {
    let outer = filtered_reader(
        alloc,
        "t1",
        Expr::func("gt", vec![col("t1", "b"), Expr::int(value)]),
    );
    let inner = node(alloc, Operator::TableReader)
        .rows(10_000.0)
        .child(full_scan(alloc, "t2"));

    let join = Join::new(JoinType::Inner, BuildSide::Left).on(col("t1", "a"), col("t2", "a"));
    let op = match algorithm {
        "merge" => Operator::MergeJoin(join),
        "index" => Operator::IndexJoin(join),
        _ => Operator::HashJoin(join),
    };

    PhysicalPlan::new(node(alloc, op).rows(4_154.17).child(outer).child(inner))
}

/// `select b, count(*) from t1 group by b` split into partial and final
/// phases; `column` is the generated output id of the final phase.
pub(crate) fn two_phase_agg(alloc: &PlanIdAllocator, column: u64) -> PhysicalPlan {
    let partial = node(
        alloc,
        Operator::HashAgg(Aggregation {
            group_by: vec![col("t1", "b")],
            funcs: vec![AggFunc::new(
                "count",
                vec![Expr::int(1)],
                ColumnRef::Generated(column + 1),
            )],
            mode: AggMode::Partial,
        }),
    )
    .rows(8_000.0)
    .cop()
    .child(full_scan(alloc, "t1"));
    let reader = node(alloc, Operator::TableReader).rows(8_000.0).child(partial);
    let last = node(
        alloc,
        Operator::HashAgg(Aggregation {
            group_by: vec![col("t1", "b")],
            funcs: vec![AggFunc::new(
                "count",
                vec![Expr::generated(column + 1)],
                ColumnRef::Generated(column),
            )],
            mode: AggMode::Final,
        }),
    )
    .rows(8_000.0)
    .child(reader);
    let projection = node(
        alloc,
        Operator::Projection {
            items: vec![
                ProjectionItem::pass(col("t1", "b")),
                ProjectionItem::pass(Expr::generated(column)),
            ],
        },
    )
    .rows(8_000.0)
    .child(last);

    PhysicalPlan::new(projection)
}

/// `select * from t1 order by a limit <offset>, <count>`
pub(crate) fn top_n(alloc: &PlanIdAllocator, offset: u64, count: u64) -> PhysicalPlan {
    let top = node(
        alloc,
        Operator::TopN {
            by_items: vec![ByItem::asc(col("t1", "a"))],
            offset,
            count,
        },
    )
    .rows(count as f64)
    .child(
        node(alloc, Operator::TableReader)
            .rows(10_000.0)
            .child(full_scan(alloc, "t1")),
    );

    PhysicalPlan::new(top)
}

/// `with recursive cte(a) as (select 1 union select a+1 from cte where a < <limit>)
///  select * from cte`
pub(crate) fn recursive_cte(alloc: &PlanIdAllocator, cte: u64, limit: i64) -> PhysicalPlan {
    let anchor = node(
        alloc,
        Operator::CteFullScan(CteRef {
            cte: CteId(cte),
            name: "cte".to_string(),
        }),
    )
    .rows(2.0);

    let seed = node(
        alloc,
        Operator::Projection {
            items: vec![ProjectionItem::to_column(Expr::int(1), cte * 10 + 1)],
        },
    )
    .rows(1.0)
    .child(node(alloc, Operator::TableDual { rows: 1 }).rows(1.0));

    let recursive = node(
        alloc,
        Operator::Projection {
            items: vec![ProjectionItem::to_column(
                Expr::func("plus", vec![Expr::generated(cte * 10 + 1), Expr::int(1)]),
                cte * 10 + 2,
            )],
        },
    )
    .rows(0.8)
    .child(
        node(
            alloc,
            Operator::Selection {
                conditions: vec![Expr::func(
                    "lt",
                    vec![Expr::generated(cte * 10 + 1), Expr::int(limit)],
                )],
            },
        )
        .rows(0.8)
        .child(node(alloc, Operator::CteTable { cte: CteId(cte) }).rows(1.0)),
    );

    PhysicalPlan::new(anchor).with_cte(
        CteDefinition::new(CteId(cte), seed)
            .with_recursive(recursive)
            .rows(2.0),
    )
}

/// Window function evaluated in parallel behind a shuffle.
pub(crate) fn shuffle_window(alloc: &PlanIdAllocator, concurrency: u32) -> PhysicalPlan {
    let reader = node(alloc, Operator::TableReader)
        .rows(10_000.0)
        .child(full_scan(alloc, "t1"));
    let sort = node(
        alloc,
        Operator::Sort {
            by_items: vec![ByItem::asc(col("t1", "b"))],
        },
    )
    .rows(10_000.0)
    .child(node(alloc, Operator::ShuffleReceiver).rows(10_000.0));
    let window = node(
        alloc,
        Operator::Window(Window {
            funcs: vec![WindowFunc {
                name: "row_number".to_string(),
                args: Vec::new(),
                output: ColumnRef::Generated(7),
            }],
            partition_by: vec![col("t1", "b")],
            order_by: Vec::new(),
            frame: None,
        }),
    )
    .rows(10_000.0)
    .child(sort);
    let shuffle = node(
        alloc,
        Operator::Shuffle(Shuffle {
            concurrency,
            split_by: vec![col("t1", "b")],
            data_sources: vec![PlanRef {
                name: reader.name(),
                id: reader.id,
            }],
        }),
    )
    .rows(10_000.0)
    .child(window);

    PhysicalPlan::new(shuffle.child(reader))
}

/// `delete from t1 where a = <value>`
pub(crate) fn delete(alloc: &PlanIdAllocator, value: i64) -> PhysicalPlan {
    let reader = filtered_reader(
        alloc,
        "t1",
        Expr::func("eq", vec![col("t1", "a"), Expr::int(value)]),
    );

    PhysicalPlan::new(
        node(
            alloc,
            Operator::Delete {
                table: table("t1"),
            },
        )
        .child(reader),
    )
}

/// Attach deterministic runtime statistics to every node and CTE.
pub(crate) fn with_stats(plan: PhysicalPlan) -> PhysicalPlan {
    fn record(node: &PlanNode, coll: &mut RuntimeStatsColl) {
        let stats = RuntimeStats::new(Duration::from_micros(node.id.0 * 150 + 3), 1, node.id.0);
        let stats = if node.id.0 % 2 == 0 {
            stats.with_memory(node.id.0 * 1_024)
        } else {
            stats
        };
        coll.record_plan(node.id, stats);
        for child in &node.children {
            record(child, coll);
        }
    }

    let mut coll = RuntimeStatsColl::new();
    record(&plan.root, &mut coll);
    for cte in plan.referenced_ctes() {
        coll.record_cte(cte.id, RuntimeStats::new(Duration::from_millis(2), 3, 4).with_disk(0));
        for (part, _) in cte.parts() {
            record(part, &mut coll);
        }
    }

    plan.with_runtime_stats(coll)
}
