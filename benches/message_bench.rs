use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use package_indexer::core::codec::LineCodec;
use package_indexer::Request;
use tokio_util::codec::Decoder;

fn bench_request_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse");
    let lines = [
        "QUERY|zlib|\n",
        "INDEX|nginx|pcre,zlib,openssl\n",
        "INDEX||\n",
    ];

    for line in lines {
        group.bench_function(line.trim_end(), |b| {
            b.iter(|| {
                let _ = Request::parse(black_box(line));
            })
        });
    }

    let many_deps = format!(
        "INDEX|big|{}\n",
        (0..256).map(|i| format!("dep-{i}")).collect::<Vec<_>>().join(",")
    );
    group.bench_function("256_deps", |b| {
        b.iter(|| {
            let _ = Request::parse(black_box(&many_deps));
        })
    });

    group.finish();
}

fn bench_line_codec(c: &mut Criterion) {
    let stream = "INDEX|nginx|pcre,zlib\n".repeat(1024);

    c.bench_function("line_codec_decode_1024", |b| {
        b.iter(|| {
            let mut codec = LineCodec::new();
            let mut buf = BytesMut::from(stream.as_str());
            let mut count = 0usize;
            while let Ok(Some(_)) = codec.decode(&mut buf) {
                count += 1;
            }
            black_box(count)
        })
    });
}

criterion_group!(benches, bench_request_parse, bench_line_codec);
criterion_main!(benches);
