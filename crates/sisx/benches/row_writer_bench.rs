//! 🏎️ RowWriter throughput: how fast do Oracle-shaped rows become delimited lines?
//!
//! Run with `cargo bench -p sisx`. Writes into a `Vec<u8>` so the numbers are
//! serialization only, no gzip, no disk.

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use sisx::common::{CellValue, Row};
use sisx::serializer::{OutputFormat, RowWriter, TimestampPolicy};

const ROWS: usize = 10_000;

// 🧪 An enrollment-ish row: ids, a name with a stray tab, a null, two timestamps.
fn enrollment_rows() -> Vec<Row> {
    let stamp = NaiveDate::from_ymd_opt(2024, 11, 3)
        .and_then(|d| d.and_hms_opt(1, 30, 0))
        .unwrap();
    (0..ROWS)
        .map(|i| {
            Row::new(vec![
                CellValue::Number("2248".to_string()),
                CellValue::Integer(i as i64),
                CellValue::text(format!("Student\t{i}, \"Jr.\"")),
                CellValue::Null,
                CellValue::Float(3.7),
                CellValue::Timestamp(stamp),
                CellValue::Timestamp(stamp),
            ])
        })
        .collect()
}

fn columns() -> Vec<String> {
    ["term_id", "ldap_uid", "name", "grade", "units", "enroll_date", "last_updated"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn bench_row_writer(c: &mut Criterion) {
    let rows = enrollment_rows();
    let columns = columns();
    let policy = TimestampPolicy::new(vec!["last_updated".into()], chrono_tz::America::Los_Angeles);

    let mut group = c.benchmark_group("row_writer");
    group.throughput(Throughput::Elements(ROWS as u64));
    for format in [OutputFormat::Tsv, OutputFormat::Csv] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{format:?}")), &format, |b, &format| {
            b.iter(|| {
                let mut writer = RowWriter::new(Vec::with_capacity(1 << 20), format, policy.clone());
                let mask = writer.local_mask(&columns);
                for row in &rows {
                    writer.write_row(&mask, row).unwrap();
                }
                black_box(writer.into_inner().unwrap().len())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_row_writer);
criterion_main!(benches);
