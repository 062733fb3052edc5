//! Fixed-size batching of parsed records.

use foodpoi_core::PoiRecord;

/// A run of records cut from the stream, tagged with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Zero-based position of the batch in stream order.
    pub sequence: u64,
    /// Records in arrival order.
    pub records: Vec<PoiRecord>,
}

/// Collects records and cuts a [`Batch`] every `batch_size` records.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use foodpoi_core::PoiRecord;
/// use foodpoi_data::ingest::BatchAccumulator;
///
/// let poi = PoiRecord::new("a", 1, "Imbiss", Coord { x: 8.4, y: 49.0 }).unwrap();
/// let mut accumulator = BatchAccumulator::new(2);
/// assert!(accumulator.push(poi.clone()).is_none());
/// let batch = accumulator.push(poi).expect("second record fills the batch");
/// assert_eq!(batch.records.len(), 2);
/// assert!(accumulator.finish().is_none());
/// ```
#[derive(Debug)]
pub struct BatchAccumulator {
    batch_size: usize,
    pending: Vec<PoiRecord>,
    next_sequence: u64,
}

impl BatchAccumulator {
    /// Create an accumulator cutting batches of `batch_size` records.
    ///
    /// A `batch_size` of zero is treated as one; callers validate options
    /// before constructing the accumulator.
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            pending: Vec::with_capacity(batch_size),
            next_sequence: 0,
        }
    }

    /// Add a record, returning a full batch once the threshold is reached.
    pub fn push(&mut self, record: PoiRecord) -> Option<Batch> {
        self.pending.push(record);
        (self.pending.len() >= self.batch_size).then(|| self.cut())
    }

    /// Flush the remainder as a final short batch, if any records are left.
    pub fn finish(&mut self) -> Option<Batch> {
        (!self.pending.is_empty()).then(|| self.cut())
    }

    /// Number of batches cut so far.
    pub const fn batches_cut(&self) -> u64 {
        self.next_sequence
    }

    fn cut(&mut self) -> Batch {
        let records = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Batch { sequence, records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::rstest;

    fn poi(index: usize) -> PoiRecord {
        PoiRecord::new(index.to_string(), 1, "x", Coord { x: 0.0, y: 0.0 })
            .expect("valid test coordinate")
    }

    fn sizes(batch_size: usize, records: usize) -> Vec<usize> {
        let mut accumulator = BatchAccumulator::new(batch_size);
        let mut cut: Vec<Batch> = (0..records)
            .filter_map(|index| accumulator.push(poi(index)))
            .collect();
        cut.extend(accumulator.finish());
        cut.iter().map(|batch| batch.records.len()).collect()
    }

    #[rstest]
    #[case(1000, 1000, vec![1000])]
    #[case(1000, 1001, vec![1000, 1])]
    #[case(1000, 999, vec![999])]
    #[case(3, 0, vec![])]
    #[case(3, 7, vec![3, 3, 1])]
    fn cuts_batches_at_threshold(
        #[case] batch_size: usize,
        #[case] records: usize,
        #[case] expected: Vec<usize>,
    ) {
        assert_eq!(sizes(batch_size, records), expected);
    }

    #[rstest]
    fn sequences_follow_stream_order() {
        let mut accumulator = BatchAccumulator::new(2);
        let first = (0..2).find_map(|index| accumulator.push(poi(index)));
        let second = (2..4).find_map(|index| accumulator.push(poi(index)));
        let ids = |batch: &Batch| -> Vec<String> {
            batch.records.iter().map(|record| record.id().to_owned()).collect()
        };

        let first = first.expect("first batch");
        let second = second.expect("second batch");
        assert_eq!((first.sequence, second.sequence), (0, 1));
        assert_eq!(ids(&first), vec!["0", "1"]);
        assert_eq!(ids(&second), vec!["2", "3"]);
        assert_eq!(accumulator.batches_cut(), 2);
    }

    #[rstest]
    fn zero_batch_size_behaves_as_one() {
        assert_eq!(sizes(0, 2), vec![1, 1]);
    }
}
