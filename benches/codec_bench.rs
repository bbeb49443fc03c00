//! Benchmarks for the stream codecs.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use codementor_relay::codec::{classify_line, LineBuffer, LineKind, RelayedEvent};

/// 2,000 NDJSON lines of the shape Ollama emits, with some multi-byte text.
fn ndjson_body() -> Vec<u8> {
    (0..2_000)
        .map(|i| {
            format!(
                "{{\"model\":\"llama3.2\",\"message\":{{\"role\":\"assistant\",\"content\":\"tok{i} ünï \"}},\"done\":false}}\n"
            )
        })
        .collect::<String>()
        .into_bytes()
}

fn bench_upstream_decode(c: &mut Criterion) {
    let body = ndjson_body();

    // 61 is deliberately not aligned to line or character boundaries.
    c.bench_function("ndjson_to_frames_61b_reads", |b| {
        b.iter(|| {
            let mut lines = LineBuffer::new();
            let mut out = 0usize;
            for read in body.chunks(61) {
                for line in lines.push(black_box(read)) {
                    if let LineKind::Chunk(chunk) = classify_line(&line) {
                        out += RelayedEvent::new(chunk.into_content()).to_frame().len();
                    }
                }
            }
            black_box(out);
        })
    });
}

criterion_group!(benches, bench_upstream_decode);
criterion_main!(benches);
