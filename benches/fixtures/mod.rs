//! Synthetic interval tables shared by the benchmarks.
//!
//! Intervals are derived from a fixed hash of the row index, so every run
//! benchmarks the same data.

#![allow(dead_code)]

use tabular_intervals::{MemTable, Row, Value};

/// Deterministic pseudo-random value for row `i`.
fn mix(i: u64) -> u64 {
    let mut x = i.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Facet name for index `i`: "chr1", "chr2", ...
pub fn facet_name(i: usize) -> String {
    format!("chr{}", i + 1)
}

/// A `chrom, start, stop, name` table of `rows` intervals spread over
/// `facets` facets and coordinates `[0, span)`.
pub fn intervals(rows: usize, facets: usize, span: u64, max_len: u64) -> MemTable {
    let data: Vec<Row> = (0..rows as u64)
        .map(|i| {
            let h = mix(i);
            let start = h % span;
            let len = 1 + (h >> 32) % max_len;
            vec![
                Value::from(facet_name((h % facets as u64) as usize)),
                Value::from(start as i64),
                Value::from((start + len) as i64),
                Value::from(format!("feature{i}")),
            ]
        })
        .collect();
    MemTable::new(["chrom", "start", "stop", "name"], data)
}

/// Query points spread evenly over `[0, span)`.
pub fn points(count: usize, span: u64) -> Vec<i64> {
    (0..count as u64).map(|i| (mix(i + 1_000_003) % span) as i64).collect()
}
