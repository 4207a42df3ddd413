//! Module: explain
//! Responsibility: operator info text, shared by display encoding and normalization.
//! Does not own: line layout, tree prefixes, or identity relabelling.
//! Boundary: a single writer parameterized by an [`InfoStyle`].

mod expr;


use crate::plan::{
    AggFunc, Aggregation, ColumnRef, CteId, DriverSide, Escaped, ExchangeType, FrameBound,
    IndexScan, Join, PlanId, PlanNode, PointGet, ScanRange, Shuffle, TableRef, TableScan, Window,
    operator::Operator,
};
use std::fmt::Write;

pub(crate) use expr::{write_by_items, write_expr, write_exprs, write_joined, write_literal};

///
/// InfoStyle
///
/// Rendering policy for the parts of operator info that differ between the
/// display form and the normalized form.
///

pub(crate) trait InfoStyle {
    /// Erase literal payloads, partition selections, and runtime-only knobs.
    const NORMALIZED: bool;

    fn column(&self, out: &mut String, column: &ColumnRef);

    fn plan_ref(&self, out: &mut String, name: &str, id: PlanId);

    fn cte(&self, out: &mut String, id: CteId);
}

///
/// DisplayStyle
///

pub(crate) struct DisplayStyle;

impl InfoStyle for DisplayStyle {
    const NORMALIZED: bool = false;

    fn column(&self, out: &mut String, column: &ColumnRef) {
        let _ = write!(out, "{column}");
    }

    fn plan_ref(&self, out: &mut String, name: &str, id: PlanId) {
        let _ = write!(out, "{name}_{id}");
    }

    fn cte(&self, out: &mut String, id: CteId) {
        let _ = write!(out, "CTE_{id}");
    }
}

/// Append the info column of `node`.
pub(crate) fn write_info<S: InfoStyle>(out: &mut String, node: &PlanNode, style: &S) {
    match &node.op {
        Operator::TableFullScan(scan)
        | Operator::TableRangeScan(scan)
        | Operator::TableRowIdScan(scan) => write_table_scan(out, scan, style),
        Operator::IndexFullScan(scan) | Operator::IndexRangeScan(scan) => {
            write_index_scan(out, scan, style);
        }
        Operator::TableReader | Operator::IndexReader => {
            if let Some(child) = node.children.first() {
                out.push_str("data:");
                style.plan_ref(out, child.name(), child.id);
            }
        }
        Operator::PointGet(get) => write_point_get(out, get, false, style),
        Operator::BatchPointGet(get) => write_point_get(out, get, true, style),
        Operator::TableDual { rows } => {
            if S::NORMALIZED {
                out.push_str("rows:?");
            } else {
                let _ = write!(out, "rows:{rows}");
            }
        }
        Operator::Selection { conditions } => write_exprs(out, conditions, style),
        Operator::Projection { items } => write_joined(out, items, ", ", |out, item| {
            write_expr(out, &item.expr, style);
            if let Some(output) = &item.output {
                out.push_str("->");
                style.column(out, output);
            }
        }),
        Operator::Sort { by_items } => write_by_items(out, by_items, style),
        Operator::TopN {
            by_items,
            offset,
            count,
        } => {
            write_by_items(out, by_items, style);
            out.push_str(", ");
            write_offset_count(out, *offset, *count, style);
        }
        Operator::Limit { offset, count } => write_offset_count(out, *offset, *count, style),
        Operator::StreamAgg(agg) | Operator::HashAgg(agg) => write_aggregation(out, agg, style),
        Operator::Window(window) => write_window(out, window, style),
        Operator::HashJoin(join) | Operator::Apply(join) => write_hash_join(out, join, style),
        Operator::MergeJoin(join) => write_merge_join(out, join, style),
        Operator::IndexJoin(join) => write_index_join(out, node, join, style),
        Operator::Shuffle(shuffle) => write_shuffle(out, shuffle, style),
        Operator::ExchangeSender { exchange } => write_exchange(out, exchange, style),
        Operator::Insert { table } | Operator::Update { table } | Operator::Delete { table } => {
            write_table::<S>(out, table);
        }
        Operator::CteFullScan(cte_ref) => {
            let _ = write!(out, "CTE:{}, data:", Escaped::name(&cte_ref.name));
            style.cte(out, cte_ref.cte);
        }
        Operator::CteTable { cte } => {
            out.push_str("Scan on ");
            style.cte(out, *cte);
        }
        Operator::IndexLookUp
        | Operator::Union
        | Operator::PartitionUnion
        | Operator::ShuffleReceiver
        | Operator::ExchangeReceiver => {}
    }
}

// Display names the table alone; normalized text qualifies it with the
// schema so same-named tables in different schemas stay distinct.
fn write_table<S: InfoStyle>(out: &mut String, table: &TableRef) {
    if S::NORMALIZED {
        let _ = write!(out, "table:{table}");
    } else {
        let _ = write!(out, "table:{}", Escaped::name(&table.name));
    }
}

fn write_partition<S: InfoStyle>(out: &mut String, partition: Option<&String>) {
    if S::NORMALIZED {
        return;
    }
    if let Some(partition) = partition {
        let _ = write!(out, ", partition:{}", Escaped::name(partition));
    }
}

fn write_ranges<S: InfoStyle>(out: &mut String, ranges: &[ScanRange]) {
    if ranges.is_empty() {
        return;
    }
    if S::NORMALIZED {
        // Range count follows the literal count, so it is erased too.
        out.push_str(", range:[?,?]");
        return;
    }

    out.push_str(", range:");
    for (i, range) in ranges.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{range}");
    }
}

fn write_order_flags(out: &mut String, keep_order: bool, desc: bool) {
    let _ = write!(out, ", keep order:{keep_order}");
    if desc {
        out.push_str(", desc");
    }
}

fn write_table_scan<S: InfoStyle>(out: &mut String, scan: &TableScan, _style: &S) {
    write_table::<S>(out, &scan.table);
    write_partition::<S>(out, scan.partition.as_ref());
    write_ranges::<S>(out, &scan.ranges);
    write_order_flags(out, scan.keep_order, scan.desc);
}

fn write_index_scan<S: InfoStyle>(out: &mut String, scan: &IndexScan, _style: &S) {
    write_table::<S>(out, &scan.table);
    write_partition::<S>(out, scan.partition.as_ref());
    let _ = write!(out, ", index:{}", scan.index);
    write_ranges::<S>(out, &scan.ranges);
    write_order_flags(out, scan.keep_order, scan.desc);
}

fn write_point_get<S: InfoStyle>(out: &mut String, get: &PointGet, batch: bool, style: &S) {
    write_table::<S>(out, &get.table);
    write_partition::<S>(out, get.partition.as_ref());
    if let Some(index) = &get.index {
        let _ = write!(out, ", index:{index}");
    }

    out.push_str(", handle:");
    if S::NORMALIZED {
        out.push('?');
    } else if batch {
        out.push('[');
        write_joined(out, &get.handles, " ", |out, handle| {
            write_literal(out, handle, style);
        });
        out.push(']');
    } else {
        write_joined(out, &get.handles, " ", |out, handle| {
            write_literal(out, handle, style);
        });
    }

    if get.lock {
        out.push_str(", lock");
    }
}

fn write_offset_count<S: InfoStyle>(out: &mut String, offset: u64, count: u64, _style: &S) {
    if S::NORMALIZED {
        out.push_str("offset:?, count:?");
    } else {
        let _ = write!(out, "offset:{offset}, count:{count}");
    }
}

fn write_agg_func<S: InfoStyle>(out: &mut String, func: &AggFunc, style: &S) {
    let _ = write!(out, "{}", Escaped::name(&func.name));
    out.push('(');
    if func.distinct {
        out.push_str("distinct ");
    }
    write_exprs(out, &func.args, style);
    out.push_str(")->");
    style.column(out, &func.output);
}

fn write_aggregation<S: InfoStyle>(out: &mut String, agg: &Aggregation, style: &S) {
    if !agg.group_by.is_empty() {
        out.push_str("group by:");
        write_exprs(out, &agg.group_by, style);
        out.push_str(", ");
    }
    out.push_str("funcs:");
    write_joined(out, &agg.funcs, ", ", |out, func| {
        write_agg_func(out, func, style);
    });
    let _ = write!(out, ", mode:{}", agg.mode.as_str());
}

fn write_frame_bound<S: InfoStyle>(out: &mut String, bound: &FrameBound, style: &S) {
    match bound {
        FrameBound::UnboundedPreceding => out.push_str("unbounded preceding"),
        FrameBound::Preceding(offset) => {
            write_literal(out, offset, style);
            out.push_str(" preceding");
        }
        FrameBound::CurrentRow => out.push_str("current row"),
        FrameBound::Following(offset) => {
            write_literal(out, offset, style);
            out.push_str(" following");
        }
        FrameBound::UnboundedFollowing => out.push_str("unbounded following"),
    }
}

fn write_window<S: InfoStyle>(out: &mut String, window: &Window, style: &S) {
    write_joined(out, &window.funcs, ", ", |out, func| {
        let _ = write!(out, "{}", Escaped::name(&func.name));
        out.push('(');
        write_exprs(out, &func.args, style);
        out.push_str(")->");
        style.column(out, &func.output);
    });

    out.push_str(" over(");
    let mut clauses = 0;
    if !window.partition_by.is_empty() {
        out.push_str("partition by ");
        write_exprs(out, &window.partition_by, style);
        clauses += 1;
    }
    if !window.order_by.is_empty() {
        if clauses > 0 {
            out.push(' ');
        }
        out.push_str("order by ");
        write_by_items(out, &window.order_by, style);
        clauses += 1;
    }
    if let Some(frame) = &window.frame {
        if clauses > 0 {
            out.push(' ');
        }
        out.push_str(if frame.rows { "rows" } else { "range" });
        out.push_str(" between ");
        write_frame_bound(out, &frame.start, style);
        out.push_str(" and ");
        write_frame_bound(out, &frame.end, style);
    }
    out.push(')');
}

fn write_equal_conds<S: InfoStyle>(out: &mut String, join: &Join, style: &S) {
    write_joined(out, &join.equal, " ", |out, (left, right)| {
        out.push_str("eq(");
        write_expr(out, left, style);
        out.push_str(", ");
        write_expr(out, right, style);
        out.push(')');
    });
}

fn write_other_conds<S: InfoStyle>(out: &mut String, join: &Join, style: &S) {
    if !join.other.is_empty() {
        out.push_str(", other cond:");
        write_exprs(out, &join.other, style);
    }
}

fn write_hash_join<S: InfoStyle>(out: &mut String, join: &Join, style: &S) {
    out.push_str(join.join_type.as_str());
    if !join.equal.is_empty() {
        out.push_str(", equal:[");
        write_equal_conds(out, join, style);
        out.push(']');
    }
    write_other_conds(out, join, style);
}

fn write_merge_join<S: InfoStyle>(out: &mut String, join: &Join, style: &S) {
    out.push_str(join.join_type.as_str());
    out.push_str(", left key:");
    write_joined(out, &join.equal, ", ", |out, (left, _)| {
        write_expr(out, left, style);
    });
    out.push_str(", right key:");
    write_joined(out, &join.equal, ", ", |out, (_, right)| {
        write_expr(out, right, style);
    });
    write_other_conds(out, join, style);
}

fn write_index_join<S: InfoStyle>(out: &mut String, node: &PlanNode, join: &Join, style: &S) {
    out.push_str(join.join_type.as_str());

    // The probe child is the inner side driven by outer keys.
    let inner = node
        .children
        .iter()
        .enumerate()
        .find(|(index, _)| node.op.child_label(*index) == DriverSide::Probe);
    if let Some((_, inner)) = inner {
        out.push_str(", inner:");
        style.plan_ref(out, inner.name(), inner.id);
    }

    out.push_str(", outer key:");
    write_joined(out, &join.equal, ", ", |out, (left, _)| {
        write_expr(out, left, style);
    });
    out.push_str(", inner key:");
    write_joined(out, &join.equal, ", ", |out, (_, right)| {
        write_expr(out, right, style);
    });
    if !join.equal.is_empty() {
        out.push_str(", equal cond:");
        write_equal_conds(out, join, style);
    }
    write_other_conds(out, join, style);
}

fn write_shuffle<S: InfoStyle>(out: &mut String, shuffle: &Shuffle, style: &S) {
    out.push_str("execution info: ");
    if !S::NORMALIZED {
        let _ = write!(out, "concurrency:{}, ", shuffle.concurrency);
    }
    out.push_str("data sources:[");
    write_joined(out, &shuffle.data_sources, ", ", |out, source| {
        style.plan_ref(out, source.name, source.id);
    });
    out.push(']');
    if !shuffle.split_by.is_empty() {
        out.push_str(", split by:");
        write_exprs(out, &shuffle.split_by, style);
    }
}

fn write_exchange<S: InfoStyle>(out: &mut String, exchange: &ExchangeType, style: &S) {
    match exchange {
        ExchangeType::PassThrough => out.push_str("ExchangeType: PassThrough"),
        ExchangeType::Broadcast => out.push_str("ExchangeType: Broadcast"),
        ExchangeType::HashPartition(keys) => {
            out.push_str("ExchangeType: HashPartition, Hash Cols: ");
            write_exprs(out, keys, style);
        }
    }
}
