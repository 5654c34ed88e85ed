//! Dependees graph and row extender.
//!
//! The dependees CSR has one row per atomic `J`; the row lists product
//! `J`'s that include this atomic `J` as one of their factors. Given a
//! sparse row of `J`'s, [`RowExtender::extend`] computes the transitive
//! closure under this DAG: whenever every factor of a product is present,
//! the product itself becomes present too.
//!
//! By construction atomic `J`'s are strictly smaller than the product
//! `J`'s that contain them, so the graph is a DAG with
//! strict topological order `parent < child`. [`Dependees::add_edges`]
//! and [`Dependees::remove_and_renumber`] are the only two places that
//! graph shape is established; both assert the order invariant in debug
//! builds.

use crate::csr::CsrMatrix;
use lre_concurrency::Renumbering;
use lre_core::J;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::collections::VecDeque;

/// One new `(parent, child, child_arity)` edge to register.
#[derive(Debug, Clone, Copy)]
pub struct DependeeEdge {
    /// Atomic feature J that participates in `child`.
    pub parent: J,
    /// Product feature J that contains `parent` as one of its factors.
    pub child: J,
    /// Number of atomic factors in `child`'s `JProduct`.
    pub child_arity: u32,
}

/// The dependees DAG: `parent atomic J -> [child product J, ...]`, plus
/// each child's arity (needed by the row extender to know when all of a
/// product's factors have been observed).
#[derive(Debug, Clone, Default)]
pub struct Dependees {
    csr: CsrMatrix,
    arity: FxHashMap<J, u32>,
}

impl Dependees {
    /// An empty dependees graph with `row_count` atomic rows (all empty).
    pub fn new(row_count: u32) -> Self {
        let mut csr = CsrMatrix::with_row_capacity(row_count as usize);
        for _ in 0..row_count {
            csr.append_row(&[]).expect("empty row never exceeds limits");
        }
        Self {
            csr,
            arity: FxHashMap::default(),
        }
    }

    /// Rebuild the CSR from a sorted COO of `(parent, child)` pairs plus
    /// each child's arity, replacing the current graph wholesale.
    pub fn replace_from_coo(
        &mut self,
        coo: &crate::coo::CooMatrix,
        row_count: u32,
        arities: FxHashMap<J, u32>,
    ) {
        debug_assert!(coo.is_sorted(), "dependees COO must be sorted before replace");
        for &(parent, child) in coo.entries() {
            debug_assert!(
                parent < child,
                "dependees DAG invariant violated: parent {parent} >= child {child}"
            );
        }
        self.csr = coo
            .to_csr(row_count)
            .expect("dependees COO must already be sorted");
        self.arity = arities;
    }

    /// Register new `(parent, child, child_arity)` edges by sorting them
    /// into the COO form and replacing the CSR wholesale.
    /// Merges the existing graph's edges with `edges`, grows the row axis
    /// to `new_row_count` if larger, and rebuilds the CSR wholesale —
    /// `Dependees` has no incremental append, only whole-graph replace.
    pub fn add_edges(&mut self, edges: &[DependeeEdge], new_row_count: u32) {
        let row_count = new_row_count.max(self.csr.row_count());
        let mut coo = self.to_coo();
        let mut arities = self.arity.clone();
        for edge in edges {
            debug_assert!(
                edge.parent < edge.child,
                "dependees DAG invariant violated: parent {} >= child {}",
                edge.parent,
                edge.child
            );
            coo.push(edge.parent, edge.child);
            arities.insert(edge.child, edge.child_arity);
        }
        coo.sort();
        self.replace_from_coo(&coo, row_count, arities);
    }

    /// Grow the row axis to cover `new_row_count` J's without adding any
    /// new edges — used when new atomic features are interned by
    /// `read_data` so later `RowExtender::extend` calls can address them
    /// as parents before exploration ever registers a product over them.
    pub fn grow_rows(&mut self, new_row_count: u32) {
        if new_row_count > self.csr.row_count() {
            self.add_edges(&[], new_row_count);
        }
    }

    /// The current graph as a sorted COO, the assembly format exploration
    /// uses to splice in new edges before a wholesale replace.
    pub fn to_coo(&self) -> crate::coo::CooMatrix {
        self.csr.to_coo()
    }

    /// Children (product J's) of one atomic J.
    pub fn children_of(&self, parent: J) -> &[J] {
        if parent >= self.csr.row_count() {
            return &[];
        }
        self.csr.row(parent)
    }

    /// Number of atomic factors of a child product J, if known.
    pub fn arity(&self, child: J) -> Option<u32> {
        self.arity.get(&child).copied()
    }

    /// Number of atomic rows.
    pub fn row_count(&self) -> u32 {
        self.csr.row_count()
    }

    /// Apply a renumbering to both axes: the row index (atomic J) via
    /// `remove_and_renumber_rows`, and the row contents (child product
    /// J's) via `remove_and_renumber_js` — mirroring how pruning must
    /// renumber the dependees graph from both sides.
    pub fn remove_and_renumber(&mut self, renumbering: &Renumbering) {
        self.csr.remove_and_renumber_rows(renumbering);
        self.csr.remove_and_renumber_js(renumbering);
        let mut new_arity = FxHashMap::default();
        for (&child, &arity) in &self.arity {
            let new_child = renumbering.get(child);
            if new_child != lre_core::INVALID_J {
                new_arity.insert(new_child, arity);
            }
        }
        self.arity = new_arity;
    }
}

thread_local! {
    static SCRATCH: RefCell<(FxHashSet<J>, FxHashMap<J, u32>, VecDeque<J>)> =
        RefCell::new((FxHashSet::default(), FxHashMap::default(), VecDeque::new()));
}

/// Computes the transitive closure of a sparse row under a [`Dependees`]
/// DAG, reusing a thread-local scratch buffer across calls so each worker
/// thread pays for the buffer once instead of per row.
pub struct RowExtender;

impl RowExtender {
    /// Extend `row` (assumed sorted, duplicate-free) with every product
    /// feature whose factors are all present, returning a new sorted,
    /// duplicate-free row.
    pub fn extend(row: &[J], dependees: &Dependees) -> Vec<J> {
        SCRATCH.with(|scratch| {
            let (present, counts, queue) = &mut *scratch.borrow_mut();
            present.clear();
            counts.clear();
            queue.clear();

            let mut result = row.to_vec();
            present.extend(row.iter().copied());
            queue.extend(row.iter().copied());

            while let Some(j) = queue.pop_front() {
                for &child in dependees.children_of(j) {
                    let arity = dependees.arity(child).unwrap_or(u32::MAX);
                    let count = counts.entry(child).or_insert(0);
                    *count += 1;
                    if *count >= arity && !present.contains(&child) {
                        present.insert(child);
                        result.push(child);
                        queue.push_back(child);
                    }
                }
            }

            result.sort_unstable();
            result
        })
    }
}
