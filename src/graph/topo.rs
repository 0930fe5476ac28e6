//! Topological sort: reverse DFS postorder with Back-edge cycle rejection.

use tracing::debug;

use crate::error::{GravaError, Result};
use crate::types::{EdgeMode, VertexId};

use super::{DfsHooks, DfsState, EdgeKind, Graph};

/// Byte count of the scratch buffer [`topo_sort`] needs for `graph` (one
/// [`DfsState`]).
pub fn topo_sort_buffer_size(graph: &Graph<'_>) -> Result<usize> {
    DfsState::compute_buffer_size(graph)
}

struct TopoHooks<'a> {
    out: &'a mut [VertexId],
    cursor: usize,
    cyclic: bool,
}

impl DfsHooks for TopoHooks<'_> {
    fn on_edge(&mut self, _graph: &Graph<'_>, state: &DfsState<'_>, from: VertexId, to: VertexId) {
        if let Ok(EdgeKind::Back) = state.classify_edge(from, to) {
            self.cyclic = true;
        }
    }

    fn on_vertex_late(&mut self, _graph: &Graph<'_>, _state: &DfsState<'_>, v: VertexId) {
        // Decreasing finish-time order is a valid topological order.
        self.cursor -= 1;
        self.out[self.cursor] = v;
    }
}

/// Writes the live vertices of a directed acyclic graph into `out` so that
/// every edge's source precedes its destination.
///
/// `out` must be exactly `vertex_count` long. A shared [`DfsState`] built in
/// `scratch` is run from every not-yet-processed vertex; a Back edge proves
/// a cycle and the sort fails after the traversal completes, leaving `out`
/// unspecified. Undirected graphs are rejected outright.
pub fn topo_sort(graph: &Graph<'_>, out: &mut [VertexId], scratch: &mut [u8]) -> Result<()> {
    if graph.mode() == EdgeMode::Undirected {
        return Err(GravaError::Failed(
            "topological sort requires a directed graph",
        ));
    }
    if out.len() != graph.vertex_count() {
        return Err(GravaError::Invalid(
            "output length does not match vertex count",
        ));
    }
    let cursor = out.len();
    let mut state = DfsState::create(graph, scratch)?;
    let mut hooks = TopoHooks {
        out,
        cursor,
        cyclic: false,
    };
    for root in graph.vertices() {
        if !state.is_processed(root)? {
            state.dfs(graph, root, &mut hooks)?;
        }
    }
    if hooks.cyclic {
        debug!("topological sort rejected a cyclic graph");
        return Err(GravaError::Invalid("graph contains a cycle"));
    }
    debug_assert_eq!(hooks.cursor, 0);
    Ok(())
}
