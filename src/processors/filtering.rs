//! Ground/object partition and the removed-ID set.

use std::collections::BTreeSet;

use crate::core::loaders::{Sample, SortedSamples};

/// Split of the elevation-sorted samples at the search bound.
///
/// The bound index is the first object point: `ground` holds indices
/// `[0, bound)`, `objects` holds `[bound, len)`.
#[derive(Debug, Clone, Copy)]
pub struct Partition<'a> {
    pub ground: &'a [Sample],
    pub objects: &'a [Sample],
}

impl<'a> Partition<'a> {
    /// Elevation of the lowest object point, if any.
    pub fn split_elevation(&self) -> Option<f64> {
        self.objects.first().map(|s| s.elevation)
    }
}

/// Partition `sorted` at `bound_index`.
///
/// A bound past the end leaves every sample on the ground side.
pub fn partition(sorted: &SortedSamples, bound_index: usize) -> Partition<'_> {
    let samples = sorted.samples();
    let (ground, objects) = samples.split_at(bound_index.min(samples.len()));
    Partition { ground, objects }
}

/// IDs of the samples classified as object points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedIds {
    ids: BTreeSet<i64>,
}

impl RemovedIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the IDs of `samples`.
    pub fn from_samples(samples: &[Sample]) -> Self {
        Self {
            ids: samples.iter().map(|s| s.id).collect(),
        }
    }

    #[inline]
    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// IDs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.ids.iter().copied()
    }
}

impl FromIterator<i64> for RemovedIds {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::SampleSet;

    fn sorted_fixture() -> SortedSamples {
        SampleSet::from(vec![
            Sample::new(1, 10.0),
            Sample::new(2, 11.0),
            Sample::new(3, 12.0),
            Sample::new(4, 13.0),
            Sample::new(5, 90.0),
        ])
        .into_sorted()
    }

    #[test]
    fn test_partition_bound_is_first_object() {
        let sorted = sorted_fixture();
        let split = partition(&sorted, 2);

        let ground: Vec<i64> = split.ground.iter().map(|s| s.id).collect();
        let objects: Vec<i64> = split.objects.iter().map(|s| s.id).collect();
        assert_eq!(ground, vec![1, 2]);
        assert_eq!(objects, vec![3, 4, 5]);
        assert_eq!(split.split_elevation(), Some(12.0));
    }

    #[test]
    fn test_partition_edges() {
        let sorted = sorted_fixture();

        let all_ground = partition(&sorted, 5);
        assert_eq!(all_ground.ground.len(), 5);
        assert!(all_ground.objects.is_empty());
        assert_eq!(all_ground.split_elevation(), None);

        let clamped = partition(&sorted, 99);
        assert_eq!(clamped.ground.len(), 5);

        let all_objects = partition(&sorted, 0);
        assert!(all_objects.ground.is_empty());
        assert_eq!(all_objects.objects.len(), 5);
    }

    #[test]
    fn test_removed_ids_membership() {
        let sorted = sorted_fixture();
        let split = partition(&sorted, 3);
        let removed = RemovedIds::from_samples(split.objects);

        assert_eq!(removed.len(), 2);
        assert!(removed.contains(4));
        assert!(removed.contains(5));
        assert!(!removed.contains(1));
        assert!(!removed.contains(42));
    }

    #[test]
    fn test_removed_ids_iterate_in_id_order() {
        let removed: RemovedIds = [9, -3, 4, 4, 12].into_iter().collect();
        assert_eq!(removed.iter().collect::<Vec<_>>(), vec![-3, 4, 9, 12]);
        assert!(RemovedIds::new().is_empty());
    }
}
