//! Benchmark – `jsonrows::QueryResult` over a chunked byte stream
#![allow(missing_docs)]

use std::{io, time::Duration};

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use futures::{TryStreamExt, executor::block_on, stream};
use jsonrows::{
    JsonStreamReader, QueryResult, ReaderOptions, SerdeDecoder, TypeDecoder, ValueDecoder,
    chunk_utils::produce_chunks,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct Beer {
    name: String,
    abv: f64,
    brewery: String,
    updated_unix_millis: u64,
}

/// A query response with `rows` results and metadata on both sides.
fn make_query_payload(rows: usize) -> String {
    let mut s = String::from(
        r#"{"requestID": "5c1a2b3c-0000-4000-8000-000000000000", "signature": {"*": "*"}, "results": ["#,
    );
    for i in 0..rows {
        if i > 0 {
            s.push(',');
        }
        s.push_str(&format!(
            r#"{{"name": "beer {i}", "abv": {}.5, "brewery": "brewery {}", "updatedUnixMillis": {}}}"#,
            i % 12,
            i / 10,
            1_302_739_470_000u64 + i as u64
        ));
    }
    let size = s.len();
    s.push_str(&format!(
        r#"], "status": "success", "metrics": {{"elapsedTime": "12.1ms", "executionTime": "12.0ms", "resultCount": {rows}, "resultSize": {size}}}}}"#
    ));
    s
}

/// Streams `payload` in `parts` chunks through a [`QueryResult`] and returns
/// the number of rows read.
fn run_query_result<D: TypeDecoder>(payload: &str, parts: usize, decoder: D) -> usize {
    let chunks = produce_chunks(payload.as_bytes(), parts);
    let source = stream::iter(chunks.into_iter().map(Ok::<_, io::Error>)).into_async_read();
    let mut reader = JsonStreamReader::with_decoder(source, decoder, ReaderOptions::default());
    let mut result = QueryResult::<_, Beer, D>::new(&mut reader);
    block_on(async {
        result.initialize().await?;
        let mut rows = result.rows()?;
        let mut count = 0;
        while let Some(row) = rows.next().await? {
            black_box(row);
            count += 1;
        }
        Ok::<_, jsonrows::ResultError>(count)
    })
    .unwrap()
}

fn bench_streaming_rows(c: &mut Criterion) {
    let payload = make_query_payload(5_000);

    let mut group = c.benchmark_group("query_result_split");

    for &parts in &[1usize, 100, 10_000] {
        group.bench_with_input(BenchmarkId::new("serde", parts), &parts, |b, &parts| {
            b.iter(|| black_box(run_query_result(black_box(&payload), parts, SerdeDecoder)));
        });
        group.bench_with_input(BenchmarkId::new("value", parts), &parts, |b, &parts| {
            b.iter(|| black_box(run_query_result(black_box(&payload), parts, ValueDecoder)));
        });
    }
    group.finish();
}

fn criterion() -> Criterion {
    let mut c = Criterion::default();
    if cfg!(feature = "bench-fast") {
        c = c
            .warm_up_time(Duration::from_millis(10))
            .measurement_time(Duration::from_millis(100))
            .sample_size(10);
    } else {
        c = c
            .warm_up_time(Duration::from_secs(3))
            .measurement_time(Duration::from_secs(10));
    }
    c
}

criterion_group! { name = benches; config = criterion(); targets = bench_streaming_rows }
criterion_main!(benches);
