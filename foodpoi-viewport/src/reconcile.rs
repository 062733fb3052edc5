//! Key-based diffing of displayed markers against fresh query results.

use std::collections::{BTreeMap, BTreeSet};

use foodpoi_core::QueryHit;

use crate::sink::{Marker, MarkerKey};

/// Markers currently displayed on one surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerSet {
    markers: BTreeMap<MarkerKey, Marker>,
}

impl MarkerSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `marker` under `key`, returning the marker it replaced.
    pub fn insert(&mut self, key: MarkerKey, marker: Marker) -> Option<Marker> {
        self.markers.insert(key, marker)
    }

    /// Forget `key`.
    pub fn remove(&mut self, key: &MarkerKey) -> Option<Marker> {
        self.markers.remove(key)
    }

    /// Whether `key` is displayed.
    pub fn contains(&self, key: &MarkerKey) -> bool {
        self.markers.contains_key(key)
    }

    /// Marker displayed under `key`.
    pub fn get(&self, key: &MarkerKey) -> Option<&Marker> {
        self.markers.get(key)
    }

    /// Displayed keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &MarkerKey> {
        self.markers.keys()
    }

    /// Number of displayed markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether nothing is displayed.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Changes needed to move a [`MarkerSet`] to a new result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerDelta {
    /// Hits not yet displayed, in result order.
    pub to_add: Vec<QueryHit>,
    /// Displayed keys absent from the result, in key order.
    pub to_remove: Vec<MarkerKey>,
}

impl MarkerDelta {
    /// Whether the display is already up to date.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff `previous` against `current` by POI id.
///
/// Markers present in both are left alone. A POI id repeated in `current` is
/// added once.
///
/// # Examples
/// ```
/// use foodpoi_core::{PoiRecord, QueryHit};
/// use foodpoi_viewport::{Marker, MarkerKey, MarkerSet, reconcile};
/// use geo::Coord;
///
/// let at = Coord { x: 8.4, y: 49.0 };
/// let mut shown = MarkerSet::new();
/// shown.insert(MarkerKey::poi("a"), Marker { coordinate: at, label: String::new() });
///
/// let hit = QueryHit {
///     record: PoiRecord::new("b", 1, "Imbiss", at).unwrap(),
///     distance_km: None,
/// };
/// let delta = reconcile(&shown, &[hit]);
/// assert_eq!(delta.to_remove, vec![MarkerKey::poi("a")]);
/// assert_eq!(delta.to_add[0].record.id(), "b");
/// ```
pub fn reconcile(previous: &MarkerSet, current: &[QueryHit]) -> MarkerDelta {
    let mut seen = BTreeSet::new();
    let mut to_add = Vec::new();
    for hit in current {
        let key = MarkerKey::poi(hit.record.id());
        if !previous.contains(&key) && !seen.contains(&key) {
            to_add.push(hit.clone());
        }
        seen.insert(key);
    }

    let to_remove = previous
        .keys()
        .filter(|key| !seen.contains(*key))
        .cloned()
        .collect();

    MarkerDelta { to_add, to_remove }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodpoi_core::PoiRecord;
    use geo::Coord;
    use rstest::rstest;

    fn hit(id: &str) -> QueryHit {
        QueryHit {
            record: PoiRecord::new(id, 1, format!("poi {id}"), Coord { x: 8.4, y: 49.0 })
                .expect("valid test coordinate"),
            distance_km: None,
        }
    }

    fn shown(ids: &[&str]) -> MarkerSet {
        let mut set = MarkerSet::new();
        for id in ids {
            set.insert(
                MarkerKey::poi(*id),
                Marker {
                    coordinate: Coord { x: 8.4, y: 49.0 },
                    label: String::new(),
                },
            );
        }
        set
    }

    fn added(delta: &MarkerDelta) -> Vec<&str> {
        delta.to_add.iter().map(|hit| hit.record.id()).collect()
    }

    #[rstest]
    fn replaces_stale_and_adds_new() {
        let delta = reconcile(&shown(&["A", "B"]), &[hit("B"), hit("C")]);
        assert_eq!(added(&delta), vec!["C"]);
        assert_eq!(delta.to_remove, vec![MarkerKey::poi("A")]);
    }

    #[rstest]
    fn identical_sets_need_no_changes() {
        let delta = reconcile(&shown(&["A", "B"]), &[hit("A"), hit("B")]);
        assert!(delta.is_empty());
    }

    #[rstest]
    fn empty_result_removes_everything() {
        let delta = reconcile(&shown(&["A", "B"]), &[]);
        assert!(delta.to_add.is_empty());
        assert_eq!(delta.to_remove, vec![MarkerKey::poi("A"), MarkerKey::poi("B")]);
    }

    #[rstest]
    fn first_result_adds_everything_in_order() {
        let delta = reconcile(&MarkerSet::new(), &[hit("C"), hit("A")]);
        assert_eq!(added(&delta), vec!["C", "A"]);
        assert!(delta.to_remove.is_empty());
    }

    #[rstest]
    fn duplicate_hits_are_added_once() {
        let delta = reconcile(&shown(&["A"]), &[hit("B"), hit("B"), hit("A"), hit("A")]);
        assert_eq!(added(&delta), vec!["B"]);
        assert!(delta.to_remove.is_empty());
    }
}
