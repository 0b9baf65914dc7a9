//! # Cadence Graph
//!
//! Structural view of one utterance: segments as nodes, discourse links as
//! edges.
//!
//! ## Features
//!
//! - **Validation** - duplicate segment ids and links to unknown segments are rejected
//! - **Cycle detection** - explicit-stack DFS returning the offending path
//! - **Root selection** - the main-point segment, else the first one
//! - **Discourse classification** - coarse shape of the request for diagnostics and UI copy
//!
//! ## Architecture
//!
//! ```text
//! Segment[] + DiscourseLink[]
//!     │
//!     ├──> RelationGraphBuilder
//!     │      ├─ Index segments by id (petgraph arena)
//!     │      ├─ Add one edge per link
//!     │      ├─ Reject cycles (alternation edges excluded)
//!     │      └─ Pick root, classify discourse
//!     │
//!     └──> RelationGraph
//!            ├─ Nodes: segments in utterance order
//!            └─ Edges: relations with their link index
//! ```

mod builder;
mod classify;
mod cycles;
mod error;
mod types;

pub use builder::RelationGraphBuilder;
pub use classify::{DiscourseClassifier, DiscourseType};
pub use cycles::{find_cycle, find_cycle_by};
pub use error::{GraphError, Result};
pub use types::{LinkEdge, RelationGraph, SegmentNode};
