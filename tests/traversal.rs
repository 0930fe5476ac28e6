use grava::{
    BfsHooks, BfsState, Datum, DfsHooks, DfsState, EdgeKind, Graph, GraphConfig, GravaError,
    VertexId,
};

fn graph_buf(config: GraphConfig) -> Vec<u8> {
    vec![0u8; Graph::compute_buffer_size(config).unwrap()]
}

fn add_vertices(g: &mut Graph<'_>, n: usize) -> Vec<VertexId> {
    (0..n)
        .map(|i| g.add_vertex(Datum::from_int(i as i32)).unwrap())
        .collect()
}

/// Records every callback in firing order.
#[derive(Default)]
struct Recorder {
    early: Vec<i32>,
    edges: Vec<(i32, i32)>,
    late: Vec<i32>,
}

impl BfsHooks for Recorder {
    fn on_vertex_early(&mut self, _g: &Graph<'_>, _s: &BfsState<'_>, v: VertexId) {
        self.early.push(v.0);
    }
    fn on_edge(&mut self, _g: &Graph<'_>, _s: &BfsState<'_>, from: VertexId, to: VertexId) {
        self.edges.push((from.0, to.0));
    }
    fn on_vertex_late(&mut self, _g: &Graph<'_>, _s: &BfsState<'_>, v: VertexId) {
        self.late.push(v.0);
    }
}

impl DfsHooks for Recorder {
    fn on_vertex_early(&mut self, _g: &Graph<'_>, _s: &DfsState<'_>, v: VertexId) {
        self.early.push(v.0);
    }
    fn on_edge(&mut self, _g: &Graph<'_>, _s: &DfsState<'_>, from: VertexId, to: VertexId) {
        self.edges.push((from.0, to.0));
    }
    fn on_vertex_late(&mut self, _g: &Graph<'_>, _s: &DfsState<'_>, v: VertexId) {
        self.late.push(v.0);
    }
}

/// The five-vertex undirected graph A-B, A-C, B-D, C-D, D-E.
fn diamond_with_tail(g: &mut Graph<'_>) -> Vec<VertexId> {
    let v = add_vertices(g, 5);
    g.add_edge(v[0], v[1]).unwrap(); // A-B
    g.add_edge(v[0], v[2]).unwrap(); // A-C
    g.add_edge(v[1], v[3]).unwrap(); // B-D
    g.add_edge(v[2], v[3]).unwrap(); // C-D
    g.add_edge(v[3], v[4]).unwrap(); // D-E
    v
}

#[test]
fn bfs_parent_tree_on_undirected_diamond() {
    let config = GraphConfig::undirected(5, 8);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = diamond_with_tail(&mut g);

    let mut state_buf = vec![0u8; BfsState::compute_buffer_size(&g).unwrap()];
    let mut state = BfsState::create(&g, &mut state_buf).unwrap();
    let mut rec = Recorder::default();
    state.bfs(&g, v[0], &mut rec).unwrap();

    assert_eq!(state.parent(v[0]).unwrap(), None);
    assert_eq!(state.parent(v[1]).unwrap(), Some(v[0]));
    assert_eq!(state.parent(v[2]).unwrap(), Some(v[0]));
    // A's adjacency list is last-inserted-first, so C is dequeued before B
    // and claims D.
    assert_eq!(state.parent(v[3]).unwrap(), Some(v[2]));
    assert_eq!(state.parent(v[4]).unwrap(), Some(v[3]));

    // Early/late fire once per reachable vertex, on_edge once per logical
    // edge.
    assert_eq!(rec.early.len(), 5);
    assert_eq!(rec.late.len(), 5);
    assert_eq!(rec.edges.len(), 5);
    let mut seen = rec.early.clone();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    assert_eq!(rec.early[0], v[0].0);
}

#[test]
fn bfs_callback_interleaving() {
    // Every on_edge for a vertex fires between its early and late hooks.
    let config = GraphConfig::undirected(5, 8);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = diamond_with_tail(&mut g);

    struct Interleave {
        open: Option<i32>,
        violations: usize,
    }
    impl BfsHooks for Interleave {
        fn on_vertex_early(&mut self, _g: &Graph<'_>, _s: &BfsState<'_>, v: VertexId) {
            if self.open.is_some() {
                self.violations += 1;
            }
            self.open = Some(v.0);
        }
        fn on_edge(&mut self, _g: &Graph<'_>, _s: &BfsState<'_>, from: VertexId, _to: VertexId) {
            if self.open != Some(from.0) {
                self.violations += 1;
            }
        }
        fn on_vertex_late(&mut self, _g: &Graph<'_>, _s: &BfsState<'_>, v: VertexId) {
            if self.open.take() != Some(v.0) {
                self.violations += 1;
            }
        }
    }

    let mut state_buf = vec![0u8; BfsState::compute_buffer_size(&g).unwrap()];
    let mut state = BfsState::create(&g, &mut state_buf).unwrap();
    let mut hooks = Interleave {
        open: None,
        violations: 0,
    };
    state.bfs(&g, v[0], &mut hooks).unwrap();
    assert_eq!(hooks.violations, 0);
}

#[test]
fn bfs_directed_reports_every_arc() {
    let config = GraphConfig::directed(4, 6);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = add_vertices(&mut g, 4);
    g.add_edge(v[0], v[1]).unwrap();
    g.add_edge(v[0], v[2]).unwrap();
    g.add_edge(v[1], v[3]).unwrap();
    g.add_edge(v[2], v[3]).unwrap();
    g.add_edge(v[3], v[0]).unwrap();

    let mut state_buf = vec![0u8; BfsState::compute_buffer_size(&g).unwrap()];
    let mut state = BfsState::create(&g, &mut state_buf).unwrap();
    let mut rec = Recorder::default();
    state.bfs(&g, v[0], &mut rec).unwrap();
    // Directed mode reports arcs to processed vertices too.
    assert_eq!(rec.edges.len(), 5);
    assert!(rec.edges.contains(&(v[3].0, v[0].0)));
}

#[test]
fn bfs_leaves_unreached_vertices_untouched() {
    let config = GraphConfig::directed(4, 2);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = add_vertices(&mut g, 4);
    g.add_edge(v[0], v[1]).unwrap();
    g.add_edge(v[2], v[3]).unwrap();

    let mut state_buf = vec![0u8; BfsState::compute_buffer_size(&g).unwrap()];
    let mut state = BfsState::create(&g, &mut state_buf).unwrap();
    state.bfs(&g, v[0], &mut ()).unwrap();
    assert!(state.is_processed(v[1]).unwrap());
    assert!(!state.is_discovered(v[2]).unwrap());
    assert_eq!(state.parent(v[3]).unwrap(), None);

    // A second call resumes into the unvisited component.
    state.bfs(&g, v[2], &mut ()).unwrap();
    assert_eq!(state.parent(v[3]).unwrap(), Some(v[2]));
    // The first root is the one recorded.
    assert_eq!(state.root(), Some(v[0]));
}

#[test]
fn bfs_rejects_stale_state_after_mutation() {
    let config = GraphConfig::directed(4, 2);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = add_vertices(&mut g, 2);
    let mut state_buf = vec![0u8; BfsState::compute_buffer_size(&g).unwrap()];
    let mut state = BfsState::create(&g, &mut state_buf).unwrap();
    g.add_edge(v[0], v[1]).unwrap();
    assert!(matches!(
        state.bfs(&g, v[0], &mut ()),
        Err(GravaError::Invalid(_))
    ));
    // Payload writes are not structural; a fresh state survives them.
    let mut state_buf = vec![0u8; BfsState::compute_buffer_size(&g).unwrap()];
    let mut state = BfsState::create(&g, &mut state_buf).unwrap();
    g.set_vertex_data(v[0], Datum::from_int(9)).unwrap();
    state.bfs(&g, v[0], &mut ()).unwrap();
}

#[test]
fn bfs_rejects_dead_root() {
    let config = GraphConfig::directed(2, 1);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = add_vertices(&mut g, 1);
    let mut state_buf = vec![0u8; BfsState::compute_buffer_size(&g).unwrap()];
    let mut state = BfsState::create(&g, &mut state_buf).unwrap();
    assert!(matches!(
        state.bfs(&g, VertexId(v[0].0 + 1), &mut ()),
        Err(GravaError::Invalid(_))
    ));
}

#[test]
fn dfs_times_nest_and_parents_follow_the_walk() {
    let config = GraphConfig::undirected(5, 8);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = diamond_with_tail(&mut g);

    let mut state_buf = vec![0u8; DfsState::compute_buffer_size(&g).unwrap()];
    let mut state = DfsState::create(&g, &mut state_buf).unwrap();
    let mut rec = Recorder::default();
    state.dfs(&g, v[0], &mut rec).unwrap();

    // One early, one late per vertex; one on_edge per logical edge.
    assert_eq!(rec.early.len(), 5);
    assert_eq!(rec.late.len(), 5);
    assert_eq!(rec.edges.len(), 5);

    // Entry/exit intervals nest: a child's interval sits inside its
    // parent's.
    for &u in &v {
        let entry = state.entry_time(u).unwrap();
        let exit = state.exit_time(u).unwrap();
        assert!(entry < exit);
        if let Some(p) = state.parent(u).unwrap() {
            assert!(state.entry_time(p).unwrap() < entry);
            assert!(exit < state.exit_time(p).unwrap());
        }
    }
    // Ten ticks total for five vertices.
    let max_exit = v.iter().map(|&u| state.exit_time(u).unwrap()).max();
    assert_eq!(max_exit, Some(10));
    assert_eq!(state.parent(v[0]).unwrap(), None);
}

#[test]
fn dfs_classifies_back_edges() {
    let config = GraphConfig::directed(2, 2);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = add_vertices(&mut g, 2);
    g.add_edge(v[0], v[1]).unwrap();
    g.add_edge(v[1], v[0]).unwrap();

    struct Classify {
        kinds: Vec<EdgeKind>,
    }
    impl DfsHooks for Classify {
        fn on_edge(&mut self, _g: &Graph<'_>, s: &DfsState<'_>, from: VertexId, to: VertexId) {
            self.kinds.push(s.classify_edge(from, to).unwrap());
        }
    }

    let mut state_buf = vec![0u8; DfsState::compute_buffer_size(&g).unwrap()];
    let mut state = DfsState::create(&g, &mut state_buf).unwrap();
    let mut hooks = Classify { kinds: Vec::new() };
    state.dfs(&g, v[0], &mut hooks).unwrap();
    assert_eq!(hooks.kinds, vec![EdgeKind::Tree, EdgeKind::Back]);
}

#[test]
fn dfs_classifies_forward_and_cross_edges() {
    struct Classify {
        kinds: Vec<(i32, i32, EdgeKind)>,
    }
    impl DfsHooks for Classify {
        fn on_edge(&mut self, _g: &Graph<'_>, s: &DfsState<'_>, from: VertexId, to: VertexId) {
            self.kinds
                .push((from.0, to.0, s.classify_edge(from, to).unwrap()));
        }
    }

    // Forward: a->c examined after the a->b->c chain finishes c.
    let config = GraphConfig::directed(3, 3);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = add_vertices(&mut g, 3);
    g.add_edge(v[0], v[2]).unwrap();
    g.add_edge(v[0], v[1]).unwrap(); // examined first: lists are LIFO
    g.add_edge(v[1], v[2]).unwrap();
    let mut state_buf = vec![0u8; DfsState::compute_buffer_size(&g).unwrap()];
    let mut state = DfsState::create(&g, &mut state_buf).unwrap();
    let mut hooks = Classify { kinds: Vec::new() };
    state.dfs(&g, v[0], &mut hooks).unwrap();
    assert!(hooks.kinds.contains(&(v[0].0, v[2].0, EdgeKind::Forward)));

    // Cross: c finished in an earlier subtree, then b->c examined.
    let config = GraphConfig::directed(3, 3);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = add_vertices(&mut g, 3);
    g.add_edge(v[0], v[1]).unwrap();
    g.add_edge(v[0], v[2]).unwrap(); // examined first
    g.add_edge(v[1], v[2]).unwrap();
    let mut state_buf = vec![0u8; DfsState::compute_buffer_size(&g).unwrap()];
    let mut state = DfsState::create(&g, &mut state_buf).unwrap();
    let mut hooks = Classify { kinds: Vec::new() };
    state.dfs(&g, v[0], &mut hooks).unwrap();
    assert!(hooks.kinds.contains(&(v[1].0, v[2].0, EdgeKind::Cross)));
}

#[test]
fn dfs_suppresses_undirected_parent_and_finished_edges() {
    let config = GraphConfig::undirected(3, 3);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = add_vertices(&mut g, 3);
    g.add_edge(v[0], v[1]).unwrap();
    g.add_edge(v[1], v[2]).unwrap();
    g.add_edge(v[2], v[0]).unwrap();

    let mut state_buf = vec![0u8; DfsState::compute_buffer_size(&g).unwrap()];
    let mut state = DfsState::create(&g, &mut state_buf).unwrap();
    let mut rec = Recorder::default();
    state.dfs(&g, v[0], &mut rec).unwrap();
    // Three logical edges in the triangle: each reported exactly once.
    assert_eq!(rec.edges.len(), 3);
}

#[test]
fn dfs_rejects_stale_state_after_mutation() {
    let config = GraphConfig::directed(3, 3);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = add_vertices(&mut g, 2);
    let mut state_buf = vec![0u8; DfsState::compute_buffer_size(&g).unwrap()];
    let mut state = DfsState::create(&g, &mut state_buf).unwrap();
    g.remove_vertex(v[1]).unwrap();
    assert!(matches!(
        state.dfs(&g, v[0], &mut ()),
        Err(GravaError::Invalid(_))
    ));
}

#[test]
fn dfs_resumes_across_components() {
    let config = GraphConfig::directed(4, 2);
    let mut buf = graph_buf(config);
    let mut g = Graph::create(config, &mut buf).unwrap();
    let v = add_vertices(&mut g, 4);
    g.add_edge(v[0], v[1]).unwrap();
    g.add_edge(v[2], v[3]).unwrap();

    let mut state_buf = vec![0u8; DfsState::compute_buffer_size(&g).unwrap()];
    let mut state = DfsState::create(&g, &mut state_buf).unwrap();
    state.dfs(&g, v[0], &mut ()).unwrap();
    assert!(!state.is_discovered(v[2]).unwrap());
    state.dfs(&g, v[2], &mut ()).unwrap();
    assert!(state.is_processed(v[3]).unwrap());
    // Re-running a finished root is a no-op.
    state.dfs(&g, v[0], &mut ()).unwrap();
    // The clock keeps advancing across components: eight ticks for four
    // vertices.
    let max_exit = v.iter().map(|&u| state.exit_time(u).unwrap()).max();
    assert_eq!(max_exit, Some(8));
}
