use crate::data_store::DataStore;
use crate::dataset::DatasetId;
use crate::enums::{Orientation, WindowLayout};
use crate::geometry::SharedGeometry;

use std::collections::HashSet;

/// Picks the geometry that a viewer should use for a set of datasets.
pub struct GeometrySelector;

impl GeometrySelector {
    /// Select the geometry for `datasets`.
    ///
    /// # Arguments
    ///
    /// * `store` - Data store used to resolve datasets and their parents
    /// * `datasets` - Dropped datasets, in drop order
    /// * `explicit_index` - Dataset to take the geometry from. Out of range
    ///   indices fall back to the automatic choice.
    ///
    /// The automatic choice is the first image, then the first dataset with any
    /// geometry at all, then the first dataset with data. If the chosen dataset
    /// is not a grey-scale image and has a grey-scale image among its ancestors,
    /// the geometry of that ancestor is returned instead.
    pub fn select_geometry(
        store: &dyn DataStore,
        datasets: &[DatasetId],
        explicit_index: Option<usize>,
    ) -> Option<SharedGeometry> {
        let chosen = match explicit_index.filter(|&index| index < datasets.len()) {
            Some(index) => datasets[index],
            None => Self::first_image(store, datasets)
                .or_else(|| Self::first_with_geometry(store, datasets))
                .or_else(|| Self::first_with_data(store, datasets))?,
        };
        let dataset = store.dataset(chosen)?;

        if !dataset.is_grey_scale_image() {
            if let Some(ancestor) = Self::find_parent_grey_scale_image(store, chosen) {
                if let Some(geometry) = store.dataset(ancestor).and_then(|d| d.geometry.clone()) {
                    return Some(geometry);
                }
            }
        }
        dataset.geometry.clone()
    }

    fn first_image(store: &dyn DataStore, datasets: &[DatasetId]) -> Option<DatasetId> {
        datasets.iter().copied().find(|&id| {
            store
                .dataset(id)
                .is_some_and(|dataset| dataset.is_image() && dataset.geometry.is_some())
        })
    }

    fn first_with_geometry(store: &dyn DataStore, datasets: &[DatasetId]) -> Option<DatasetId> {
        datasets.iter().copied().find(|&id| {
            store
                .dataset(id)
                .is_some_and(|dataset| dataset.geometry.is_some())
        })
    }

    fn first_with_data(store: &dyn DataStore, datasets: &[DatasetId]) -> Option<DatasetId> {
        datasets
            .iter()
            .copied()
            .find(|&id| store.dataset(id).is_some_and(|dataset| dataset.kind.is_some()))
    }

    /// Nearest grey-scale image up the chain of first parents of `id`.
    pub fn find_parent_grey_scale_image(
        store: &dyn DataStore,
        id: DatasetId,
    ) -> Option<DatasetId> {
        let mut visited = HashSet::from([id]);
        let mut current = id;
        while let Some(parent) = store.parents(current).first().copied() {
            if !visited.insert(parent) {
                return None;
            }
            if store
                .dataset(parent)
                .is_some_and(|dataset| dataset.is_grey_scale_image())
            {
                return Some(parent);
            }
            current = parent;
        }
        None
    }

    /// Layout a drop should switch the viewers to. `AsAcquired` is resolved to
    /// the single window layout matching the plane the first image was acquired
    /// in, or coronal if there is no image to look at.
    pub fn window_layout_for(
        store: &dyn DataStore,
        datasets: &[DatasetId],
        default_layout: WindowLayout,
    ) -> WindowLayout {
        if default_layout != WindowLayout::AsAcquired {
            return default_layout;
        }
        let geometry = datasets
            .iter()
            .filter_map(|&id| store.dataset(id))
            .find(|dataset| dataset.is_image())
            .and_then(|image| image.geometry.clone());

        let orientation = match geometry {
            Some(geometry) => geometry.as_acquired_orientation(),
            None => {
                tracing::warn!(
                    datasets = datasets.len(),
                    "no image to work out the 'as acquired' orientation, using coronal"
                );
                Orientation::Coronal
            }
        };
        WindowLayout::from_orientation(orientation)
    }
}
