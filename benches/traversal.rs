use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use grava::{
    topo_sort, topo_sort_buffer_size, BfsState, Datum, Graph, GraphConfig, IntAscending, MinHeap,
    VertexId,
};

const CHAIN: usize = 1024;

fn chain_graph_buffer() -> Vec<u8> {
    let config = GraphConfig::directed(CHAIN, CHAIN);
    let mut buf = vec![0u8; Graph::compute_buffer_size(config).unwrap()];
    {
        let mut g = Graph::create(config, &mut buf).unwrap();
        let v: Vec<VertexId> = (0..CHAIN)
            .map(|i| g.add_vertex(Datum::from_int(i as i32)).unwrap())
            .collect();
        for w in v.windows(2) {
            g.add_edge(w[0], w[1]).unwrap();
        }
    }
    buf
}

fn bench_bfs_chain(c: &mut Criterion) {
    let mut buf = chain_graph_buffer();
    let state_size = {
        let g = Graph::attach(&mut buf).unwrap();
        BfsState::compute_buffer_size(&g).unwrap()
    };
    let mut state_buf = vec![0u8; state_size];

    let mut group = c.benchmark_group("traversal");
    group.throughput(Throughput::Elements(CHAIN as u64));
    group.bench_function("bfs_chain", |b| {
        b.iter(|| {
            let g = Graph::attach(&mut buf).unwrap();
            let root = g.vertices().next().unwrap();
            let mut state = BfsState::create(&g, &mut state_buf).unwrap();
            state.bfs(&g, root, &mut ()).unwrap();
            black_box(state.parent(VertexId(CHAIN as i32 - 1)).unwrap())
        })
    });
    group.finish();
}

fn bench_topo_chain(c: &mut Criterion) {
    let mut buf = chain_graph_buffer();
    let (scratch_size, count) = {
        let g = Graph::attach(&mut buf).unwrap();
        (topo_sort_buffer_size(&g).unwrap(), g.vertex_count())
    };
    let mut scratch = vec![0u8; scratch_size];
    let mut out = vec![VertexId(-1); count];

    let mut group = c.benchmark_group("traversal");
    group.throughput(Throughput::Elements(CHAIN as u64));
    group.bench_function("topo_chain", |b| {
        b.iter(|| {
            let g = Graph::attach(&mut buf).unwrap();
            topo_sort(&g, &mut out, &mut scratch).unwrap();
            black_box(out[0])
        })
    });
    group.finish();
}

fn bench_heap_churn(c: &mut Criterion) {
    const CAP: usize = 1024;
    let mut buf = vec![0u8; grava::heap::compute_buffer_size(CAP).unwrap()];

    let mut group = c.benchmark_group("heap");
    group.throughput(Throughput::Elements(CAP as u64));
    group.bench_function("insert_pop_churn", |b| {
        b.iter(|| {
            let mut heap = MinHeap::create(CAP, IntAscending, &mut buf).unwrap();
            for i in 0..CAP as i32 {
                heap.insert(Datum::from_int((i * 31) % 97), Datum::from_int(i))
                    .unwrap();
            }
            let mut last = i32::MIN;
            while let Ok((k, _)) = heap.pop() {
                last = k.as_int();
            }
            black_box(last)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_bfs_chain, bench_topo_chain, bench_heap_churn);
criterion_main!(benches);
