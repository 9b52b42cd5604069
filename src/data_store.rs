use crate::dataset::{Dataset, DatasetId};
use crate::enums::InterpolationType;

use std::collections::{HashMap, HashSet};

/// Change notifications emitted by a data store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    DatasetAdded(DatasetId),
    DatasetRemoved(DatasetId),
    GlobalVisibilityChanged(DatasetId),
}

/// The dataset repository the display layer works against.
///
/// Stores that buffer their own notifications hand them over through
/// [`DataStore::drain_events`]; the visibility manager polls it after every
/// step so that changes made as a side effect of handling one notification are
/// queued behind it rather than handled re-entrantly.
pub trait DataStore {
    /// All datasets, in insertion order.
    fn all_datasets(&self) -> Vec<DatasetId>;

    fn dataset(&self, id: DatasetId) -> Option<&Dataset>;

    /// Datasets `id` was derived from.
    fn parents(&self, id: DatasetId) -> Vec<DatasetId>;

    /// Datasets derived from `id`; with `recursive` the whole subtree.
    fn derived_children(&self, id: DatasetId, recursive: bool) -> Vec<DatasetId>;

    fn set_global_visibility(&mut self, id: DatasetId, visible: bool);

    fn set_reslice_interpolation(&mut self, id: DatasetId, interpolation: InterpolationType);

    fn drain_events(&mut self) -> Vec<StoreEvent> {
        Vec::new()
    }
}

/// Data store keeping datasets and their derivation links in memory.
#[derive(Debug, Default)]
pub struct InMemoryDataStore {
    order: Vec<DatasetId>,
    datasets: HashMap<DatasetId, Dataset>,
    parents: HashMap<DatasetId, Vec<DatasetId>>,
    events: Vec<StoreEvent>,
    next_id: u64,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dataset derived from `parents` and returns its new id.
    /// Parents that are not in the store are ignored.
    pub fn add(&mut self, mut dataset: Dataset, parents: &[DatasetId]) -> DatasetId {
        self.next_id += 1;
        let id = DatasetId(self.next_id);
        dataset.id = id;
        let parents: Vec<_> = parents
            .iter()
            .copied()
            .filter(|parent| self.datasets.contains_key(parent))
            .collect();
        self.order.push(id);
        self.datasets.insert(id, dataset);
        self.parents.insert(id, parents);
        self.events.push(StoreEvent::DatasetAdded(id));
        id
    }

    /// Removes a dataset. Datasets derived from it lose the link.
    pub fn remove(&mut self, id: DatasetId) -> Option<Dataset> {
        let dataset = self.datasets.remove(&id)?;
        self.order.retain(|other| *other != id);
        self.parents.remove(&id);
        for links in self.parents.values_mut() {
            links.retain(|parent| *parent != id);
        }
        self.events.push(StoreEvent::DatasetRemoved(id));
        Some(dataset)
    }

    pub fn dataset_mut(&mut self, id: DatasetId) -> Option<&mut Dataset> {
        self.datasets.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn direct_children(&self, id: DatasetId) -> impl Iterator<Item = DatasetId> + '_ {
        self.order.iter().copied().filter(move |candidate| {
            self.parents
                .get(candidate)
                .is_some_and(|links| links.contains(&id))
        })
    }
}

impl DataStore for InMemoryDataStore {
    fn all_datasets(&self) -> Vec<DatasetId> {
        self.order.clone()
    }

    fn dataset(&self, id: DatasetId) -> Option<&Dataset> {
        self.datasets.get(&id)
    }

    fn parents(&self, id: DatasetId) -> Vec<DatasetId> {
        self.parents.get(&id).cloned().unwrap_or_default()
    }

    fn derived_children(&self, id: DatasetId, recursive: bool) -> Vec<DatasetId> {
        if !recursive {
            return self.direct_children(id).collect();
        }
        let mut seen = HashSet::from([id]);
        let mut found = Vec::new();
        let mut frontier = vec![id];
        while let Some(current) = frontier.pop() {
            for child in self.direct_children(current) {
                if seen.insert(child) {
                    found.push(child);
                    frontier.push(child);
                }
            }
        }
        found
    }

    fn set_global_visibility(&mut self, id: DatasetId, visible: bool) {
        if let Some(dataset) = self.datasets.get_mut(&id) {
            if dataset.properties.visible != Some(visible) {
                dataset.properties.visible = Some(visible);
                self.events.push(StoreEvent::GlobalVisibilityChanged(id));
            }
        }
    }

    fn set_reslice_interpolation(&mut self, id: DatasetId, interpolation: InterpolationType) {
        if let Some(dataset) = self.datasets.get_mut(&id) {
            if dataset.properties.reslice_interpolation.is_some() {
                dataset.properties.reslice_interpolation = Some(interpolation);
            }
        }
    }

    fn drain_events(&mut self) -> Vec<StoreEvent> {
        std::mem::take(&mut self.events)
    }
}
