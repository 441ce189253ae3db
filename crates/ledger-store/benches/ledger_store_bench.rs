use criterion::{Criterion, criterion_group, criterion_main};
use ledger_store::{
    AggregateId, InMemoryLedgerStore, LedgerStore, StreamAppend, Transaction, Version,
};

fn make_append(stream_id: AggregateId, expected: i64, count: usize) -> StreamAppend {
    let mut append = StreamAppend::new(stream_id, "Product", Version::new(expected));
    for _ in 0..count {
        append
            .push(
                "OwnershipTransferred",
                &serde_json::json!({
                    "from": "0xA11CE",
                    "to": "0xB0B"
                }),
            )
            .unwrap();
    }
    append
}

fn single(append: StreamAppend) -> Transaction {
    let mut tx = Transaction::new();
    tx.add(append);
    tx
}

fn bench_commit_single_stream(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("ledger_store/commit_single_stream", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryLedgerStore::new();
                store
                    .commit(single(make_append(AggregateId::new(), 0, 1)))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_commit_three_streams(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("ledger_store/commit_three_streams", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryLedgerStore::new();
                let mut tx = Transaction::new();
                for _ in 0..3 {
                    tx.add(make_append(AggregateId::new(), 0, 2));
                }
                store.commit(tx).await.unwrap();
            });
        });
    });
}

fn bench_read_stream(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryLedgerStore::new();
    let stream = AggregateId::new();

    rt.block_on(async {
        store
            .commit(single(make_append(stream, 0, 100)))
            .await
            .unwrap();
    });

    c.bench_function("ledger_store/read_stream_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.read_stream(stream).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_commit_single_stream,
    bench_commit_three_streams,
    bench_read_stream,
);
criterion_main!(benches);
