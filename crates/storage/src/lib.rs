//! Sparse row storage: CSR/COO matrices, the dependees DAG and row
//! extender, shard sets, and per-J co-occurrence statistics.

#![warn(missing_docs)]

pub mod coo;
pub mod csr;
pub mod dependees;
pub mod error;
pub mod shard;
pub mod shard_set;
pub mod stats;

pub use coo::CooMatrix;
pub use csr::CsrMatrix;
pub use dependees::{Dependees, DependeeEdge, RowExtender};
pub use error::{Error, Result};
pub use shard::Shard;
pub use shard_set::ShardSet;
pub use stats::{recalc_stats, Contingency, Stats};
