//! Ratio buckets: the ordered, colored ranges voxels are counted into.
//!
//! A table is persisted as a plain JSON list of records:
//!
//! ```json
//! [
//!   { "label": "0%", "color": "#52d726", "ratio": { "min": 0, "max": 0 }, "quantity": 12 },
//!   { "label": "0% - 25%", "color": "#ffaf00", "ratio": { "min": 0, "max": 25 }, "quantity": 3 }
//! ]
//! ```
//!
//! Loading revalidates the table; `quantity` may be omitted and is
//! recomputed by the next classification pass anyway. Only this layout
//! loads: bucket 0 must be the `0..0` range. Lists whose first record
//! spans a range such as `0..25` are rejected with
//! [`VoxelError::InvalidBucketTable`] and have to be regenerated with
//! [`BucketTable::even`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::{palette_color, Color};
use crate::error::{Result, VoxelError};

/// Lower and upper ratio bound of a bucket, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioRange {
    /// Exclusive lower bound (inclusive for the zero bucket).
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
}

/// One named, colored ratio range and its running voxel count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Display label, e.g. `"25% - 50%"`.
    pub label: String,
    /// Color given to voxels in this bucket.
    pub color: Color,
    /// Ratio bounds.
    pub ratio: RatioRange,
    /// Voxels counted by the last classification pass.
    #[serde(default)]
    pub quantity: usize,
}

impl Bucket {
    /// Bucket with a generated `"{min}% - {max}%"` label.
    pub fn new(min: f64, max: f64, color: Color) -> Self {
        Self {
            label: format!("{min}% - {max}%"),
            color,
            ratio: RatioRange { min, max },
            quantity: 0,
        }
    }

    /// The bucket holding voxels with no reinforcement at all.
    pub fn zero(color: Color) -> Self {
        Self {
            label: "0%".into(),
            color,
            ratio: RatioRange { min: 0.0, max: 0.0 },
            quantity: 0,
        }
    }
}

/// A validated, ordered sequence of buckets.
///
/// Index 0 holds ratio exactly 0, the last index is open-ended and catches
/// every ratio no interior bucket claims, and interior buckets match
/// `min < ratio <= max` with the first match winning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Bucket>", into = "Vec<Bucket>")]
pub struct BucketTable {
    buckets: Vec<Bucket>,
}

impl BucketTable {
    /// Validate and wrap an ordered list of buckets.
    ///
    /// Rejects tables with fewer than two buckets, non-finite or inverted
    /// bounds, a zero bucket other than `0..0`, gaps between consecutive
    /// ranges, decreasing upper bounds, and tables that stop short of 100.
    pub fn new(buckets: Vec<Bucket>) -> Result<Self> {
        let invalid = |msg: String| -> Result<Self> { Err(VoxelError::InvalidBucketTable(msg)) };

        if buckets.len() < 2 {
            return invalid(format!(
                "need at least 2 buckets, got {}",
                buckets.len()
            ));
        }
        for (i, b) in buckets.iter().enumerate() {
            let RatioRange { min, max } = b.ratio;
            if !(min.is_finite() && max.is_finite()) || min > max {
                return invalid(format!("bucket {i} has bounds {min}..{max}"));
            }
        }
        let zero = buckets[0].ratio;
        if zero.min != 0.0 || zero.max != 0.0 {
            return invalid(format!(
                "bucket 0 holds ratio 0 only and must span 0..0, spans {}..{}",
                zero.min, zero.max
            ));
        }
        // Bucket 0 only ever holds exactly 0, so the first range after it
        // has to reach down to 0 to cover small positive ratios.
        if buckets.len() >= 3 && buckets[1].ratio.min > 0.0 {
            return invalid(format!(
                "gap between 0 and {} before bucket 1",
                buckets[1].ratio.min
            ));
        }
        for i in 1..buckets.len() {
            let prev = buckets[i - 1].ratio;
            let cur = buckets[i].ratio;
            if cur.min > prev.max {
                return invalid(format!(
                    "gap between {} and {} before bucket {i}",
                    prev.max, cur.min
                ));
            }
            if cur.max < prev.max {
                return invalid(format!(
                    "bucket {i} ends at {} before bucket {} ends at {}",
                    cur.max,
                    i - 1,
                    prev.max
                ));
            }
        }
        let top = buckets[buckets.len() - 1].ratio.max;
        if top < 100.0 {
            return invalid(format!("last bucket ends at {top}, short of 100"));
        }

        Ok(Self { buckets })
    }

    /// Even table of `n` buckets.
    ///
    /// Bucket 0 is the zero bucket, interior bucket `i` covers
    /// `((i-1)*100/n, i*100/n]` and the last bucket runs from
    /// `(n-2)*100/n` to 100. Boundaries are rounded to whole percents.
    pub fn even(n: usize) -> Result<Self> {
        if n < 2 {
            return Err(VoxelError::InvalidBucketTable(format!(
                "need at least 2 buckets, got {n}"
            )));
        }
        Self::new(even_buckets(n))
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Always false; a valid table has at least two buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Buckets in table order.
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Bucket at `index`.
    pub fn get(&self, index: usize) -> Option<&Bucket> {
        self.buckets.get(index)
    }

    /// Index of the bucket a ratio belongs to.
    pub fn classify_ratio(&self, ratio: f64) -> usize {
        if ratio == 0.0 {
            return 0;
        }
        let last = self.buckets.len() - 1;
        self.buckets[1..last]
            .iter()
            .position(|b| ratio > b.ratio.min && ratio <= b.ratio.max)
            .map_or(last, |i| i + 1)
    }

    /// Index of the first bucket with `color`.
    pub fn index_of_color(&self, color: Color) -> Option<usize> {
        self.buckets.iter().position(|b| b.color == color)
    }

    /// Zero every quantity.
    pub fn reset_quantities(&mut self) {
        for b in &mut self.buckets {
            b.quantity = 0;
        }
    }

    /// Overwrite quantities with per-bucket counts.
    pub(crate) fn set_quantities(&mut self, counts: &[usize]) {
        for (b, &count) in self.buckets.iter_mut().zip(counts) {
            b.quantity = count;
        }
    }

    /// Sum of all quantities.
    pub fn total_quantity(&self) -> usize {
        self.buckets.iter().map(|b| b.quantity).sum()
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a JSON bucket list.
    pub fn from_json(s: &str) -> Result<Self> {
        let buckets: Vec<Bucket> = serde_json::from_str(s)?;
        Self::new(buckets)
    }

    /// Write the table to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

impl Default for BucketTable {
    fn default() -> Self {
        Self {
            buckets: even_buckets(crate::settings::DEFAULT_BUCKET_COUNT),
        }
    }
}

fn even_buckets(n: usize) -> Vec<Bucket> {
    let boundary = |i: usize| (100.0 / n as f64 * i as f64).round();

    let mut buckets = Vec::with_capacity(n);
    buckets.push(Bucket::zero(palette_color(0)));
    for i in 1..n - 1 {
        buckets.push(Bucket::new(boundary(i - 1), boundary(i), palette_color(i)));
    }
    buckets.push(Bucket::new(boundary(n - 2), 100.0, palette_color(usize::MAX)));
    buckets
}

impl TryFrom<Vec<Bucket>> for BucketTable {
    type Error = VoxelError;

    fn try_from(buckets: Vec<Bucket>) -> Result<Self> {
        Self::new(buckets)
    }
}

impl From<BucketTable> for Vec<Bucket> {
    fn from(table: BucketTable) -> Self {
        table.buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::PALETTE;
    use approx::assert_relative_eq;

    fn bucket(min: f64, max: f64) -> Bucket {
        Bucket::new(min, max, PALETTE[1])
    }

    #[test]
    fn test_even_four_layout() {
        let table = BucketTable::even(4).unwrap();
        let ranges: Vec<(f64, f64)> = table
            .buckets()
            .iter()
            .map(|b| (b.ratio.min, b.ratio.max))
            .collect();
        assert_eq!(
            ranges,
            vec![(0.0, 0.0), (0.0, 25.0), (25.0, 50.0), (50.0, 100.0)]
        );
        assert_eq!(table.buckets()[0].label, "0%");
        assert_eq!(table.buckets()[2].label, "25% - 50%");
        assert_eq!(table.buckets()[0].color.to_hex(), "#52d726");
        assert_eq!(table.buckets()[3].color.to_hex(), "#dd1b1b");
    }

    #[test]
    fn test_boundary_ratio_goes_to_lower_bucket() {
        let table = BucketTable::even(4).unwrap();
        assert_eq!(table.classify_ratio(0.0), 0);
        assert_eq!(table.classify_ratio(1e-6), 1);
        assert_eq!(table.classify_ratio(25.0), 1);
        assert_eq!(table.classify_ratio(25.000001), 2);
        assert_eq!(table.classify_ratio(50.0), 2);
        assert_eq!(table.classify_ratio(75.0), 3);
        assert_eq!(table.classify_ratio(100.0), 3);
        assert_eq!(table.classify_ratio(250.0), 3);
    }

    #[test]
    fn test_even_tables_cover_all_ratios() {
        for n in 2..=10 {
            let table = BucketTable::even(n).unwrap();
            assert_eq!(table.len(), n);
            for step in 0..=1000 {
                let r = step as f64 / 10.0;
                let i = table.classify_ratio(r);
                assert!(i < n);
                if r == 0.0 {
                    assert_eq!(i, 0);
                } else {
                    assert_ne!(i, 0, "ratio {r} fell into the zero bucket for n = {n}");
                }
            }
        }
    }

    #[test]
    fn test_even_boundaries_round_to_percent() {
        let table = BucketTable::even(3).unwrap();
        assert_relative_eq!(table.buckets()[1].ratio.max, 33.0);
        assert_relative_eq!(table.buckets()[2].ratio.min, 33.0);
        assert_eq!(table.buckets()[1].label, "0% - 33%");
    }

    #[test]
    fn test_even_rejects_tiny_tables() {
        assert!(matches!(
            BucketTable::even(1),
            Err(VoxelError::InvalidBucketTable(_))
        ));
        assert!(BucketTable::new(vec![]).is_err());
    }

    #[test]
    fn test_default_matches_even_four() {
        assert_eq!(BucketTable::default(), BucketTable::even(4).unwrap());
    }

    #[test]
    fn test_rejects_gap() {
        let buckets = vec![
            Bucket::zero(PALETTE[0]),
            bucket(0.0, 20.0),
            bucket(30.0, 60.0),
            bucket(60.0, 100.0),
        ];
        assert!(matches!(
            BucketTable::new(buckets),
            Err(VoxelError::InvalidBucketTable(_))
        ));
    }

    #[test]
    fn test_rejects_uncovered_low_end() {
        let buckets = vec![
            Bucket::new(0.0, 25.0, PALETTE[0]),
            bucket(25.0, 50.0),
            bucket(50.0, 100.0),
        ];
        assert!(BucketTable::new(buckets).is_err());
    }

    #[test]
    fn test_rejects_table_with_ranged_zero_bucket() {
        let json = r##"[
            { "label": "0% - 25%", "color": "#52d726", "ratio": { "min": 0, "max": 25 } },
            { "label": "25% - 50%", "color": "#ffaf00", "ratio": { "min": 25, "max": 50 } },
            { "label": "50% - 75%", "color": "#ff7300", "ratio": { "min": 50, "max": 75 } },
            { "label": "75% - 100%", "color": "#dd1b1b", "ratio": { "min": 75, "max": 100 } }
        ]"##;
        match BucketTable::from_json(json) {
            Err(VoxelError::InvalidBucketTable(msg)) => assert!(msg.contains("bucket 0")),
            other => panic!("expected InvalidBucketTable, got {other:?}"),
        }

        let two = vec![Bucket::new(0.0, 25.0, PALETTE[0]), bucket(25.0, 100.0)];
        assert!(BucketTable::new(two).is_err());
    }

    #[test]
    fn test_save_and_load_through_a_file() {
        let mut path = std::env::temp_dir();
        path.push(format!("voxcrete-buckets-{}.json", std::process::id()));

        let mut table = BucketTable::even(5).unwrap();
        table.set_quantities(&[3, 0, 1, 0, 2]);
        table.save(&path).unwrap();
        let loaded = BucketTable::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, table);
        assert!(matches!(BucketTable::load(&path), Err(VoxelError::Io(_))));
    }

    #[test]
    fn test_rejects_short_top_and_inverted_range() {
        let short = vec![Bucket::zero(PALETTE[0]), bucket(0.0, 90.0)];
        assert!(BucketTable::new(short).is_err());
        let inverted = vec![Bucket::zero(PALETTE[0]), bucket(0.0, 50.0), bucket(100.0, 60.0)];
        assert!(BucketTable::new(inverted).is_err());
        let nan = vec![Bucket::zero(PALETTE[0]), bucket(0.0, f64::NAN)];
        assert!(BucketTable::new(nan).is_err());
    }

    #[test]
    fn test_overlap_first_match_wins() {
        let table = BucketTable::new(vec![
            Bucket::zero(PALETTE[0]),
            bucket(0.0, 60.0),
            bucket(40.0, 80.0),
            bucket(80.0, 100.0),
        ])
        .unwrap();
        assert_eq!(table.classify_ratio(50.0), 1);
        assert_eq!(table.classify_ratio(70.0), 2);
    }

    #[test]
    fn test_json_round_trip_keeps_ranges() {
        let mut table = BucketTable::even(5).unwrap();
        table.set_quantities(&[3, 0, 1, 0, 2]);
        let json = table.to_json().unwrap();
        assert!(json.contains("\"quantity\": 3"));
        let back = BucketTable::from_json(&json).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.total_quantity(), 6);
    }

    #[test]
    fn test_load_without_quantities() {
        let json = r##"[
            { "label": "0%", "color": "#52d726", "ratio": { "min": 0, "max": 0 } },
            { "label": "rest", "color": "#dd1b1b", "ratio": { "min": 0, "max": 100 } }
        ]"##;
        let table = BucketTable::from_json(json).unwrap();
        assert_eq!(table.total_quantity(), 0);
        assert_eq!(table.buckets()[1].label, "rest");
        assert_eq!(table.index_of_color("#dd1b1b".parse().unwrap()), Some(1));
    }

    #[test]
    fn test_serde_validates_on_load() {
        let json = r##"[{ "label": "0%", "color": "#52d726", "ratio": { "min": 0, "max": 0 } }]"##;
        assert!(serde_json::from_str::<BucketTable>(json).is_err());
        assert!(matches!(
            BucketTable::from_json(json),
            Err(VoxelError::InvalidBucketTable(_))
        ));
    }

    #[test]
    fn test_reset_quantities() {
        let mut table = BucketTable::even(4).unwrap();
        table.set_quantities(&[1, 2, 3, 4]);
        assert_eq!(table.total_quantity(), 10);
        table.reset_quantities();
        assert_eq!(table.total_quantity(), 0);
    }
}
