//! Benchmarks: definition parse throughput and record read throughput.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use binary_reader::error::ErrorCollection;
use binary_reader::{FileParser, MemorySource};

const DEFINITION: &str = r#"
type Point {
  int16 x;
  int16 y;
}

type Header {
  uint32(little) length;
  uint16 version;
  byte flags;
}

type Packet {
  Header head;
  Point origin;
  Point extent;
  uint64 checksum;
}
"#;

fn packet_bytes() -> Vec<u8> {
    // Header (7) + two Points (8) + checksum (8).
    (0u8..23).collect()
}

fn bench_parse_definition(c: &mut Criterion) {
    c.bench_function("parse_definition", |b| {
        b.iter(|| {
            let mut errors = ErrorCollection::new();
            let parser =
                FileParser::from_definition(black_box(DEFINITION), "bench.def", &mut errors);
            assert!(parser.is_some());
        })
    });
}

fn bench_read_packet(c: &mut Criterion) {
    let mut errors = ErrorCollection::new();
    let parser = FileParser::from_definition(DEFINITION, "bench.def", &mut errors)
        .expect("definition parses");
    let bytes = packet_bytes();

    let record = parser
        .parse_source(
            Box::new(MemorySource::new(bytes)),
            Some("Packet"),
            &mut errors,
        )
        .expect("packet parses");

    c.bench_function("read_packet_all_fields", |b| {
        b.iter(|| {
            record.clear_cache();
            for name in record.field_names() {
                black_box(record.value_of(&name).expect("field reads"));
            }
        })
    });
}

criterion_group!(benches, bench_parse_definition, bench_read_packet);
criterion_main!(benches);
