use crate::data_store::DataStore;
use crate::dataset::DatasetId;
use crate::geometry_selector::GeometrySelector;
use crate::viewer::Viewer;

use std::collections::BTreeSet;
use std::ops::Range;

/// Keeps track of which datasets each viewer shows and pushes the matching
/// renderer specific visibility down to the viewers.
///
/// Membership and visibility are separate: a member of a viewer has been
/// handed to it for rendering at some point, but may be hidden there.
#[derive(Clone, Debug)]
pub struct VisibilityPropagator {
    memberships: Vec<BTreeSet<DatasetId>>,
    automatically_add_children: bool,
}

impl VisibilityPropagator {
    pub fn new(automatically_add_children: bool) -> Self {
        Self {
            memberships: Vec::new(),
            automatically_add_children,
        }
    }

    pub fn automatically_add_children(&self) -> bool {
        self.automatically_add_children
    }

    pub fn set_automatically_add_children(&mut self, enabled: bool) {
        self.automatically_add_children = enabled;
    }

    /// Adds an empty membership set for a new viewer and returns its index.
    pub fn register_viewer(&mut self) -> usize {
        self.memberships.push(BTreeSet::new());
        self.memberships.len() - 1
    }

    /// Forgets the membership sets of the viewers in `range`. Later viewers
    /// move down to fill the gap.
    pub fn deregister_viewers(&mut self, range: Range<usize>) {
        let end = range.end.min(self.memberships.len());
        let start = range.start.min(end);
        self.memberships.drain(start..end);
    }

    pub fn viewer_count(&self) -> usize {
        self.memberships.len()
    }

    pub fn members(&self, viewer: usize) -> Option<&BTreeSet<DatasetId>> {
        self.memberships.get(viewer)
    }

    pub fn dataset_count_in_viewer(&self, viewer: usize) -> usize {
        self.memberships.get(viewer).map_or(0, BTreeSet::len)
    }

    pub fn is_member(&self, viewer: usize, dataset: DatasetId) -> bool {
        self.memberships
            .get(viewer)
            .is_some_and(|members| members.contains(&dataset))
    }

    /// Indices of the viewers `dataset` is a member of.
    pub fn viewers_containing(&self, dataset: DatasetId) -> Vec<usize> {
        self.memberships
            .iter()
            .enumerate()
            .filter(|(_, members)| members.contains(&dataset))
            .map(|(index, _)| index)
            .collect()
    }

    /// Hides a new dataset in every viewer, then shows it wherever its
    /// grey-scale ancestor is already shown, with the ancestor's global
    /// visibility. This is what makes a fresh segmentation appear on top of
    /// the image it was drawn on.
    pub fn on_dataset_added<V: Viewer>(
        &mut self,
        store: &dyn DataStore,
        viewers: &mut [V],
        dataset: DatasetId,
    ) {
        let Some(added) = store.dataset(dataset) else {
            tracing::warn!(%dataset, "added dataset is not in the store");
            return;
        };
        if added.is_visibility_managed() {
            for viewer in viewers.iter_mut() {
                viewer.set_visibility(&[dataset], false);
            }
        }

        let Some(ancestor) = GeometrySelector::find_parent_grey_scale_image(store, dataset) else {
            return;
        };
        let visible = store
            .dataset(ancestor)
            .is_some_and(|ancestor| ancestor.is_visible());
        for index in self.viewers_containing(ancestor) {
            tracing::debug!(%dataset, %ancestor, viewer = index, visible, "inheriting membership");
            self.add_dataset_to_viewer(store, viewers, index, dataset, visible);
        }
    }

    /// Drops `dataset` from every membership set and makes every viewer
    /// forget it. The focused viewer, if any, is told to hide it first.
    pub fn on_dataset_removed<V: Viewer>(
        &mut self,
        viewers: &mut [V],
        focused: Option<usize>,
        dataset: DatasetId,
    ) {
        if let Some(viewer) = focused.and_then(|index| viewers.get_mut(index)) {
            viewer.set_visibility(&[dataset], false);
        }
        for members in &mut self.memberships {
            members.remove(&dataset);
        }
        for viewer in viewers.iter_mut() {
            viewer.forget_dataset(dataset);
        }
    }

    /// Pushes the global visibility of `dataset` down to the focused viewer if
    /// it shows the dataset.
    pub fn on_global_visibility_changed<V: Viewer>(
        &self,
        store: &dyn DataStore,
        viewers: &mut [V],
        focused: Option<usize>,
        dataset: DatasetId,
    ) {
        let Some(index) = focused else {
            return;
        };
        if !self.is_member(index, dataset) {
            return;
        }
        let (Some(viewer), Some(changed)) = (viewers.get_mut(index), store.dataset(dataset)) else {
            return;
        };
        viewer.set_visibility(&[dataset], changed.is_visible());
    }

    /// Makes `dataset` a member of viewer `index` and, when enabled, its
    /// visible directly derived children that are not helper objects. All of
    /// them get `visible` in one call. Returns the datasets that were set.
    pub fn add_dataset_to_viewer<V: Viewer>(
        &mut self,
        store: &dyn DataStore,
        viewers: &mut [V],
        index: usize,
        dataset: DatasetId,
        visible: bool,
    ) -> Vec<DatasetId> {
        let (Some(members), Some(viewer)) = (self.memberships.get_mut(index), viewers.get_mut(index))
        else {
            tracing::error!(viewer = index, %dataset, "no such viewer");
            return Vec::new();
        };

        let mut datasets = vec![dataset];
        if self.automatically_add_children {
            datasets.extend(
                store
                    .derived_children(dataset, false)
                    .into_iter()
                    .filter(|&child| {
                        store
                            .dataset(child)
                            .is_some_and(|child| child.is_visible() && !child.is_helper())
                    }),
            );
        }
        members.extend(datasets.iter().copied());
        viewer.set_visibility(&datasets, visible);
        datasets
    }

    /// Hides every member of viewer `index` there and empties its membership set.
    pub fn remove_all_datasets_from_viewer<V: Viewer>(&mut self, viewers: &mut [V], index: usize) {
        let (Some(members), Some(viewer)) = (self.memberships.get_mut(index), viewers.get_mut(index))
        else {
            return;
        };
        let datasets: Vec<_> = std::mem::take(members).into_iter().collect();
        if !datasets.is_empty() {
            viewer.set_visibility(&datasets, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_store::InMemoryDataStore;
    use crate::dataset::Dataset;
    use crate::geometry::{Geometry, SharedGeometry};
    use crate::viewer::SingleViewer;

    fn geometry() -> SharedGeometry {
        Geometry::new((4, 4, 4), (1.0, 1.0, 1.0))
            .unwrap()
            .into_shared()
    }

    fn grid(count: usize) -> (VisibilityPropagator, Vec<SingleViewer>) {
        let mut propagator = VisibilityPropagator::new(true);
        let viewers = (0..count)
            .map(|index| {
                propagator.register_viewer();
                SingleViewer::new(format!("viewer {index}"), index as u64 * 4)
            })
            .collect();
        (propagator, viewers)
    }

    #[test]
    fn adding_brings_visible_children_along() {
        let mut store = InMemoryDataStore::new();
        let t1 = store.add(Dataset::image("t1", geometry()), &[]);
        let mask = store.add(Dataset::binary_image("mask", geometry()), &[t1]);
        let hidden = store.add(
            Dataset::binary_image("hidden", geometry()).with_visible(false),
            &[t1],
        );
        let helper = store.add(Dataset::point_set("feedback").as_helper(), &[t1]);
        let grandchild = store.add(Dataset::point_set("seeds"), &[mask]);
        let (mut propagator, mut viewers) = grid(2);

        let added = propagator.add_dataset_to_viewer(&store, &mut viewers, 1, t1, true);
        assert_eq!(added, vec![t1, mask]);
        assert!(propagator.is_member(1, mask));
        assert!(!propagator.is_member(1, hidden));
        assert!(!propagator.is_member(1, helper));
        assert!(!propagator.is_member(1, grandchild));
        assert_eq!(viewers[1].visible_datasets(), vec![t1, mask]);
        assert_eq!(propagator.dataset_count_in_viewer(0), 0);
    }

    #[test]
    fn children_stay_out_when_disabled() {
        let mut store = InMemoryDataStore::new();
        let t1 = store.add(Dataset::image("t1", geometry()), &[]);
        store.add(Dataset::binary_image("mask", geometry()), &[t1]);
        let (mut propagator, mut viewers) = grid(1);
        propagator.set_automatically_add_children(false);

        propagator.add_dataset_to_viewer(&store, &mut viewers, 0, t1, true);
        assert_eq!(propagator.dataset_count_in_viewer(0), 1);
    }

    #[test]
    fn remove_all_hides_members() {
        let mut store = InMemoryDataStore::new();
        let t1 = store.add(Dataset::image("t1", geometry()), &[]);
        let (mut propagator, mut viewers) = grid(1);
        propagator.add_dataset_to_viewer(&store, &mut viewers, 0, t1, true);

        propagator.remove_all_datasets_from_viewer(&mut viewers, 0);
        assert_eq!(propagator.dataset_count_in_viewer(0), 0);
        assert_eq!(viewers[0].dataset_visibility(t1), Some(false));
    }

    #[test]
    fn new_child_inherits_parent_viewers() {
        let mut store = InMemoryDataStore::new();
        let t1 = store.add(Dataset::image("t1", geometry()), &[]);
        let (mut propagator, mut viewers) = grid(3);
        propagator.add_dataset_to_viewer(&store, &mut viewers, 2, t1, true);

        let mask = store.add(Dataset::binary_image("mask", geometry()), &[t1]);
        propagator.on_dataset_added(&store, &mut viewers, mask);

        assert_eq!(propagator.viewers_containing(mask), vec![2]);
        assert_eq!(viewers[2].dataset_visibility(mask), Some(true));
        assert_eq!(viewers[0].dataset_visibility(mask), Some(false));
    }

    #[test]
    fn unmanaged_dataset_is_not_seeded() {
        let mut store = InMemoryDataStore::new();
        let planes = store.add(Dataset::surface("planes", geometry()).unmanaged(), &[]);
        let (mut propagator, mut viewers) = grid(2);

        propagator.on_dataset_added(&store, &mut viewers, planes);
        assert_eq!(viewers[0].dataset_visibility(planes), None);
    }

    #[test]
    fn global_change_reaches_focused_member_only() {
        let mut store = InMemoryDataStore::new();
        let t1 = store.add(Dataset::image("t1", geometry()), &[]);
        let (mut propagator, mut viewers) = grid(2);
        propagator.add_dataset_to_viewer(&store, &mut viewers, 0, t1, true);
        store.set_global_visibility(t1, false);

        propagator.on_global_visibility_changed(&store, &mut viewers, Some(1), t1);
        assert_eq!(viewers[0].dataset_visibility(t1), Some(true));
        assert_eq!(viewers[1].dataset_visibility(t1), None);

        propagator.on_global_visibility_changed(&store, &mut viewers, Some(0), t1);
        assert_eq!(viewers[0].dataset_visibility(t1), Some(false));
    }

    #[test]
    fn removal_prunes_membership_and_viewer_visibility() {
        let mut store = InMemoryDataStore::new();
        let t1 = store.add(Dataset::image("t1", geometry()), &[]);
        let t2 = store.add(Dataset::image("t2", geometry()), &[]);
        let (mut propagator, mut viewers) = grid(2);
        propagator.add_dataset_to_viewer(&store, &mut viewers, 0, t1, true);
        propagator.add_dataset_to_viewer(&store, &mut viewers, 0, t2, true);
        propagator.add_dataset_to_viewer(&store, &mut viewers, 1, t1, true);

        propagator.on_dataset_removed(&mut viewers, Some(1), t1);
        assert!(propagator.viewers_containing(t1).is_empty());
        for viewer in &viewers {
            assert_eq!(viewer.dataset_visibility(t1), None);
        }
        assert_eq!(viewers[0].visible_datasets(), vec![t2]);
    }

    #[test]
    fn deregistering_shifts_later_viewers_down() {
        let mut store = InMemoryDataStore::new();
        let t1 = store.add(Dataset::image("t1", geometry()), &[]);
        let (mut propagator, mut viewers) = grid(3);
        propagator.add_dataset_to_viewer(&store, &mut viewers, 2, t1, true);

        propagator.deregister_viewers(0..1);
        assert_eq!(propagator.viewer_count(), 2);
        assert_eq!(propagator.viewers_containing(t1), vec![1]);
        propagator.deregister_viewers(1..10);
        assert_eq!(propagator.viewer_count(), 1);
    }
}
