//! Volatile identity relabelling.
//!
//! Node ids, generated column ids, and CTE ids are assigned in compilation
//! order and differ between otherwise identical plans. The relabel table
//! maps each of them to a position in visitation order before any line is
//! rendered, so forward references (a parent naming a child, a consumer
//! naming a CTE) resolve the same way from the tree and from the flat form.
//!
//! A generated column is numbered at the node that produces it: the operator
//! that computes it when there is one, otherwise the deepest node whose
//! output schema lists it. Columns with no producer in the plan are numbered
//! by first appearance in rendered text.

use crate::{
    explain::InfoStyle,
    plan::{ColumnRef, CteId, PlanId, PlanNode},
};
use std::{cell::RefCell, collections::HashMap, fmt::Write};

///
/// Relabel
///

#[derive(Debug, Default)]
pub(crate) struct Relabel {
    plans: HashMap<PlanId, usize>,
    columns: HashMap<u64, (usize, usize)>,
    outputs: HashMap<u64, (usize, usize)>,
    unbound: RefCell<HashMap<u64, usize>>,
    ctes: HashMap<CteId, usize>,
    next_ordinal: usize,
}

impl Relabel {
    /// Register a node at the next ordinal.
    ///
    /// A plan with two nodes sharing an id is an upstream contract violation;
    /// digesting it would silently conflate distinct nodes.
    pub(crate) fn register_node(&mut self, node: &PlanNode) {
        let ordinal = self.take_ordinal();
        assert!(
            self.plans.insert(node.id, ordinal).is_none(),
            "plan id {} appears more than once in one plan",
            node.id
        );

        for (position, column) in node.op.defined_columns() {
            self.columns.entry(column).or_insert((ordinal, position));
        }
        // Nodes register parent first, so the last schema listing wins.
        for (position, column) in node.schema_columns() {
            self.outputs.insert(column, (ordinal, position));
        }
    }

    /// Register a CTE definition header at the next ordinal.
    pub(crate) fn register_cte(&mut self, id: CteId) {
        self.take_ordinal();
        let index = self.ctes.len();
        self.ctes.entry(id).or_insert(index);
    }

    pub(crate) fn plan_ordinal(&self, id: PlanId) -> Option<usize> {
        self.plans.get(&id).copied()
    }

    pub(crate) fn cte_index(&self, id: CteId) -> Option<usize> {
        self.ctes.get(&id).copied()
    }

    pub(crate) const fn len(&self) -> usize {
        self.next_ordinal
    }

    const fn take_ordinal(&mut self) -> usize {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        ordinal
    }
}

impl InfoStyle for Relabel {
    const NORMALIZED: bool = true;

    fn column(&self, out: &mut String, column: &ColumnRef) {
        match column {
            ColumnRef::Named { .. } => {
                let _ = write!(out, "{column}");
            }
            ColumnRef::Generated(id) => {
                match self.columns.get(id).or_else(|| self.outputs.get(id)) {
                    Some((ordinal, position)) => {
                        let _ = write!(out, "Column#{ordinal}.{position}");
                    }
                    None => {
                        let mut unbound = self.unbound.borrow_mut();
                        let next = unbound.len();
                        let index = *unbound.entry(*id).or_insert(next);
                        let _ = write!(out, "Column#u{index}");
                    }
                }
            }
        }
    }

    fn plan_ref(&self, out: &mut String, name: &str, id: PlanId) {
        match self.plan_ordinal(id) {
            Some(ordinal) => {
                let _ = write!(out, "{name}_{ordinal}");
            }
            None => {
                let _ = write!(out, "{name}_?");
            }
        }
    }

    fn cte(&self, out: &mut String, id: CteId) {
        match self.cte_index(id) {
            Some(index) => {
                let _ = write!(out, "CTE_{index}");
            }
            None => out.push_str("CTE_?"),
        }
    }
}
