//! End to end drops onto a grid of viewers, through the public API only.

use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;

use dnd_display::data_store::{DataStore, InMemoryDataStore, StoreEvent};
use dnd_display::dataset::{Dataset, DatasetId};
use dnd_display::enums::{DropType, GeometryBinding, InterpolationType, Orientation, WindowLayout};
use dnd_display::geometry::{Geometry, SharedGeometry};
use dnd_display::geometry_selector::GeometrySelector;
use dnd_display::interaction::InteractionContext;
use dnd_display::manager::MultiViewerVisibilityManager;
use dnd_display::settings::DisplaySettings;
use dnd_display::viewer::{SingleViewer, Viewer, WindowId};
use ndarray::array;

type Manager = MultiViewerVisibilityManager<SingleViewer>;

fn geometry(dim: (usize, usize, usize)) -> SharedGeometry {
    Geometry::new(dim, (1.0, 1.0, 1.5))
        .expect("should have created geometry")
        .into_shared()
}

/// First render window of viewer `index`.
fn window(index: usize) -> WindowId {
    WindowId(index as u64 * 4)
}

fn grid(count: usize, settings: &DisplaySettings, store: &mut dyn DataStore) -> Manager {
    let mut manager = Manager::new(settings, Rc::new(InteractionContext::new()));
    for index in 0..count {
        let viewer = SingleViewer::with_settings(format!("viewer {index}"), index as u64 * 4, settings);
        manager.register_viewer(viewer, &*store);
    }
    manager.process_store_events(store);
    manager
}

fn members(manager: &Manager, index: usize) -> BTreeSet<DatasetId> {
    manager.members(index).cloned().unwrap_or_default()
}

fn images(store: &mut InMemoryDataStore, count: usize) -> Vec<DatasetId> {
    (0..count)
        .map(|index| store.add(Dataset::image(format!("image {index}"), geometry((20, 16, 16))), &[]))
        .collect()
}

#[test]
fn single_drop_replaces_viewer_contents() {
    let mut store = InMemoryDataStore::new();
    let ids = images(&mut store, 3);
    let (a, b, c) = (ids[0], ids[1], ids[2]);
    let mut manager = grid(2, &DisplaySettings::default(), &mut store);

    manager.on_nodes_dropped(&mut store, window(0), vec![a, b]);
    assert_eq!(members(&manager, 0), BTreeSet::from([a, b]));
    let mask = store.add(Dataset::binary_image("mask", geometry((20, 16, 16))), &[c]);

    let outcome = manager.on_nodes_dropped(&mut store, window(0), vec![c]);
    assert!(outcome.is_complete());
    assert_eq!(members(&manager, 0), BTreeSet::from([c, mask]));
    assert_eq!(manager.viewers()[0].visible_datasets(), vec![c, mask]);
    assert_eq!(manager.viewers()[0].dataset_visibility(a), Some(false));
}

#[test]
fn single_drop_accumulates_when_asked() {
    let mut store = InMemoryDataStore::new();
    let ids = images(&mut store, 3);
    let settings = DisplaySettings {
        accumulate: true,
        ..DisplaySettings::default()
    };
    let mut manager = grid(2, &settings, &mut store);

    manager.on_nodes_dropped(&mut store, window(1), vec![ids[0], ids[1]]);
    manager.on_nodes_dropped(&mut store, window(1), vec![ids[2]]);
    assert_eq!(members(&manager, 1), ids.iter().copied().collect());
    assert!(members(&manager, 0).is_empty());
}

#[test]
fn multiple_drop_goes_round_the_grid() {
    let mut store = InMemoryDataStore::new();
    let ids = images(&mut store, 3);
    let settings = DisplaySettings {
        drop_type: DropType::Multiple,
        ..DisplaySettings::default()
    };
    let mut manager = grid(5, &settings, &mut store);

    let outcome = manager.on_nodes_dropped(&mut store, window(2), ids.clone());
    assert_eq!(outcome.viewers(), BTreeSet::from([2, 3, 4]));
    assert_eq!(members(&manager, 2), BTreeSet::from([ids[0]]));
    assert_eq!(members(&manager, 3), BTreeSet::from([ids[1]]));
    assert_eq!(members(&manager, 4), BTreeSet::from([ids[2]]));
    assert!(members(&manager, 0).is_empty());
    assert!(members(&manager, 1).is_empty());
}

#[test]
fn multiple_drop_wraps_past_the_last_viewer() {
    let mut store = InMemoryDataStore::new();
    let ids = images(&mut store, 2);
    let settings = DisplaySettings {
        drop_type: DropType::Multiple,
        ..DisplaySettings::default()
    };
    let mut manager = grid(5, &settings, &mut store);

    manager.on_nodes_dropped(&mut store, window(4), ids.clone());
    assert_eq!(members(&manager, 4), BTreeSet::from([ids[0]]));
    assert_eq!(members(&manager, 0), BTreeSet::from([ids[1]]));
}

#[test]
fn multiple_drop_skips_hidden_viewers() {
    let mut store = InMemoryDataStore::new();
    let ids = images(&mut store, 2);
    let settings = DisplaySettings {
        drop_type: DropType::Multiple,
        ..DisplaySettings::default()
    };
    let mut manager = grid(3, &settings, &mut store);
    manager.viewer_mut(1).expect("viewer 1").set_shown(false);

    manager.on_nodes_dropped(&mut store, window(0), ids.clone());
    assert_eq!(members(&manager, 0), BTreeSet::from([ids[0]]));
    assert!(members(&manager, 1).is_empty());
    assert_eq!(members(&manager, 2), BTreeSet::from([ids[1]]));
}

fn depth(manager: &Manager, index: usize) -> Option<usize> {
    manager.viewers()[index]
        .state()
        .active_geometry()
        .map(|geometry| geometry.dim().0)
}

#[test]
fn multiple_drop_accumulates_onto_occupied_viewers() {
    let mut store = InMemoryDataStore::new();
    let old = store.add(Dataset::image("old", geometry((20, 16, 16))), &[]);
    let a = store.add(Dataset::image("a", geometry((30, 16, 16))), &[]);
    let b = store.add(Dataset::image("b", geometry((30, 16, 16))), &[]);
    let mut manager = grid(3, &DisplaySettings::default(), &mut store);
    manager.on_nodes_dropped(&mut store, window(0), vec![old]);

    manager.set_drop_type(DropType::Multiple);
    manager.set_accumulate(true);
    let outcome = manager.on_nodes_dropped(&mut store, window(0), vec![a, b]);

    assert!(outcome.is_complete());
    assert_eq!(members(&manager, 0), BTreeSet::from([old, a]));
    assert_eq!(depth(&manager, 0), Some(20));
    assert_eq!(members(&manager, 1), BTreeSet::from([b]));
    assert_eq!(depth(&manager, 1), Some(30));
    assert!(manager.viewers()[1].state().is_enabled());
    assert_eq!(manager.viewers()[1].state().window_layout(), WindowLayout::Coronal);
    assert!(members(&manager, 2).is_empty());
    assert_eq!(manager.viewers()[0].visible_datasets(), vec![old, a]);
}

#[test]
fn thumbnails_accumulate_without_clearing() {
    let mut store = InMemoryDataStore::new();
    let old = store.add(Dataset::image("old", geometry((20, 16, 16))), &[]);
    let volume = store.add(Dataset::image("volume", geometry((100, 16, 16))), &[]);
    let settings = DisplaySettings {
        default_window_layout: WindowLayout::Axial,
        ..DisplaySettings::default()
    };
    let mut manager = grid(4, &settings, &mut store);
    manager.on_nodes_dropped(&mut store, window(0), vec![old]);
    manager.on_nodes_dropped(&mut store, window(2), vec![old]);

    manager.set_drop_type(DropType::All);
    manager.set_accumulate(true);
    let outcome = manager.on_nodes_dropped(&mut store, window(0), vec![volume]);

    assert!(outcome.is_complete());
    for index in [0, 2] {
        assert_eq!(members(&manager, index), BTreeSet::from([old, volume]));
        assert_eq!(depth(&manager, index), Some(20));
    }
    for index in [1, 3] {
        assert_eq!(members(&manager, index), BTreeSet::from([volume]));
        assert_eq!(depth(&manager, index), Some(100));
        assert!(manager.viewers()[index].state().is_enabled());
    }
    // Spread over the 20 slices the first viewer keeps showing.
    let slices: Vec<_> = manager
        .viewers()
        .iter()
        .map(|viewer| viewer.selected_slice(Orientation::Axial))
        .collect();
    assert_eq!(slices, vec![Some(1), Some(5), Some(10), Some(14)]);
}

#[test]
fn thumbnails_with_fewer_slices_than_viewers() {
    let mut store = InMemoryDataStore::new();
    let thin = store.add(Dataset::image("thin", geometry((2, 16, 16))), &[]);
    let settings = DisplaySettings {
        drop_type: DropType::All,
        default_window_layout: WindowLayout::Axial,
        ..DisplaySettings::default()
    };
    let mut manager = grid(3, &settings, &mut store);

    manager.on_nodes_dropped(&mut store, window(0), vec![thin]);
    let viewers = manager.viewers();
    assert_eq!(viewers[0].selected_slice(Orientation::Axial), Some(0));
    assert_eq!(viewers[1].selected_slice(Orientation::Axial), Some(1));
    assert!(!viewers[2].has_geometry());
    assert!(!viewers[2].state().is_enabled());
    assert!(members(&manager, 2).is_empty());
}

#[test]
fn thumbnails_spread_over_trimmed_slices() {
    let mut store = InMemoryDataStore::new();
    let volume = store.add(Dataset::image("volume", geometry((100, 16, 16))), &[]);
    let settings = DisplaySettings {
        drop_type: DropType::All,
        default_window_layout: WindowLayout::Ortho,
        ..DisplaySettings::default()
    };
    let mut manager = grid(4, &settings, &mut store);

    let outcome = manager.on_nodes_dropped(&mut store, window(2), vec![volume]);
    assert!(outcome.is_complete());
    let slices: Vec<_> = manager
        .viewers()
        .iter()
        .map(|viewer| viewer.selected_slice(Orientation::Axial))
        .collect();
    assert_eq!(slices, vec![Some(5), Some(27), Some(50), Some(72)]);
    for (index, viewer) in manager.viewers().iter().enumerate() {
        assert_eq!(viewer.state().window_layout(), WindowLayout::Axial);
        assert_eq!(members(&manager, index), BTreeSet::from([volume]));
    }
}

#[test]
fn point_set_is_shown_in_its_image_geometry() {
    let mut store = InMemoryDataStore::new();
    let anatomy = geometry((30, 20, 20));
    let t1 = store.add(Dataset::image("t1", anatomy.clone()), &[]);
    let seeds = store.add(Dataset::point_set("seeds"), &[t1]);

    let selected = GeometrySelector::select_geometry(&store, &[seeds], None).expect("geometry");
    assert!(Arc::ptr_eq(&selected, &anatomy));

    let mut manager = grid(1, &DisplaySettings::default(), &mut store);
    manager.on_nodes_dropped(&mut store, window(0), vec![seeds]);
    let shown = manager.viewers()[0].state().geometry().expect("viewer geometry");
    assert!(Arc::ptr_eq(shown, &anatomy));
}

#[test]
fn new_segmentation_appears_under_shown_image() {
    let mut store = InMemoryDataStore::new();
    let t1 = store.add(Dataset::image("t1", geometry((20, 16, 16))), &[]);
    let mut manager = grid(3, &DisplaySettings::default(), &mut store);
    manager.on_nodes_dropped(&mut store, window(1), vec![t1]);
    assert!(store.dataset(t1).expect("t1").is_visible());

    let mask = store.add(Dataset::binary_image("mask", geometry((20, 16, 16))), &[t1]);
    manager.process_store_events(&mut store);

    assert_eq!(members(&manager, 1), BTreeSet::from([t1, mask]));
    assert_eq!(manager.viewers()[1].dataset_visibility(mask), Some(true));
    assert_eq!(manager.viewers()[0].dataset_visibility(mask), Some(false));
    assert!(members(&manager, 0).is_empty());
}

#[test]
fn re_registering_a_viewer_starts_from_scratch() {
    let mut store = InMemoryDataStore::new();
    let t1 = store.add(Dataset::image("t1", geometry((20, 16, 16))), &[]);
    let mut manager = grid(2, &DisplaySettings::default(), &mut store);
    manager.on_nodes_dropped(&mut store, window(1), vec![t1]);
    assert!(
        manager.viewers()[1]
            .state()
            .is_layout_initialized(WindowLayout::Coronal, GeometryBinding::Unbound)
    );

    for _ in 0..2 {
        let viewer = manager.deregister_viewers(1..).pop().expect("deregistered viewer");
        let index = manager.register_viewer(viewer, &store);
        assert_eq!(index, 1);
        assert_eq!(manager.dataset_count_in_viewer(1), 0);
        let state = manager.viewers()[1].state();
        for layout in WindowLayout::ALL {
            for binding in [GeometryBinding::Unbound, GeometryBinding::Bound] {
                assert!(!state.is_layout_initialized(layout, binding));
            }
        }
    }
}

/// Store that creates a helper dataset whenever an image gets its
/// interpolation set, like a tool reacting to new images would.
struct SpawningStore {
    inner: InMemoryDataStore,
    interpolation_calls: usize,
    spawned: Vec<DatasetId>,
}

impl DataStore for SpawningStore {
    fn all_datasets(&self) -> Vec<DatasetId> {
        self.inner.all_datasets()
    }

    fn dataset(&self, id: DatasetId) -> Option<&Dataset> {
        self.inner.dataset(id)
    }

    fn parents(&self, id: DatasetId) -> Vec<DatasetId> {
        self.inner.parents(id)
    }

    fn derived_children(&self, id: DatasetId, recursive: bool) -> Vec<DatasetId> {
        self.inner.derived_children(id, recursive)
    }

    fn set_global_visibility(&mut self, id: DatasetId, visible: bool) {
        self.inner.set_global_visibility(id, visible);
    }

    fn set_reslice_interpolation(&mut self, id: DatasetId, interpolation: InterpolationType) {
        self.interpolation_calls += 1;
        self.inner.set_reslice_interpolation(id, interpolation);
        if self.inner.dataset(id).is_some_and(|dataset| !dataset.is_helper()) {
            let helper = self.inner.add(Dataset::point_set("feedback").as_helper(), &[id]);
            self.spawned.push(helper);
        }
    }

    fn drain_events(&mut self) -> Vec<StoreEvent> {
        self.inner.drain_events()
    }
}

#[test]
fn datasets_added_while_handling_an_addition_are_queued() {
    let mut store = SpawningStore {
        inner: InMemoryDataStore::new(),
        interpolation_calls: 0,
        spawned: Vec::new(),
    };
    let mut manager = grid(2, &DisplaySettings::default(), &mut store);
    let t1 = store.inner.add(Dataset::image("t1", geometry((20, 16, 16))), &[]);

    manager.on_dataset_added(&mut store, t1);
    assert_eq!(store.spawned.len(), 1);
    assert_eq!(store.interpolation_calls, 2);
    let helper = store.spawned[0];
    for viewer in manager.viewers() {
        assert_eq!(viewer.dataset_visibility(t1), Some(false));
        assert_eq!(viewer.dataset_visibility(helper), Some(false));
    }

    manager.process_store_events(&mut store);
    assert_eq!(store.interpolation_calls, 2);
}

#[test]
fn as_acquired_layout_follows_the_image() {
    let mut store = InMemoryDataStore::new();
    let sagittal = Geometry::new((20, 16, 16), (1.0, 1.0, 1.0))
        .expect("should have created geometry")
        .with_direction(array![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
        .expect("should have set direction")
        .into_shared();
    let image = store.add(Dataset::image("sagittal", sagittal), &[]);
    let points = store.add(Dataset::point_set("points"), &[]);
    let settings = DisplaySettings {
        default_window_layout: WindowLayout::AsAcquired,
        ..DisplaySettings::default()
    };
    let mut manager = grid(2, &settings, &mut store);

    manager.on_nodes_dropped(&mut store, window(0), vec![image]);
    assert_eq!(manager.viewers()[0].state().window_layout(), WindowLayout::Sagittal);

    let outcome = manager.on_nodes_dropped(&mut store, window(1), vec![points]);
    assert!(!outcome.is_complete());
    assert_eq!(manager.viewers()[1].state().window_layout(), WindowLayout::Unknown);
}

#[test]
fn selecting_a_window_copies_its_visibility_to_the_store() {
    let mut store = InMemoryDataStore::new();
    let ids = images(&mut store, 2);
    let mut manager = grid(2, &DisplaySettings::default(), &mut store);
    manager.on_nodes_dropped(&mut store, window(0), vec![ids[0]]);
    manager.on_nodes_dropped(&mut store, window(1), vec![ids[1]]);
    assert!(!store.dataset(ids[0]).expect("first").is_visible());

    manager.on_window_selected(&mut store, window(0));
    assert!(store.dataset(ids[0]).expect("first").is_visible());
    assert!(!store.dataset(ids[1]).expect("second").is_visible());
    assert_eq!(manager.focused_viewer(), Some(0));
    // The store changes made by the sync are not fed back into the viewers.
    assert_eq!(manager.viewers()[1].dataset_visibility(ids[1]), Some(true));
}
