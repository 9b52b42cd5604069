use std::path::PathBuf;
use std::rc::Rc;

use dnd_display::{
    data_store::{DataStore, InMemoryDataStore},
    dataset::Dataset,
    enums::{DropType, Orientation},
    geometry::Geometry,
    interaction::InteractionContext,
    manager::MultiViewerVisibilityManager,
    settings::DisplaySettings,
    viewer::{SingleViewer, Viewer, WindowId},
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => DisplaySettings::load_from_path(&path).expect("should have loaded settings"),
        None => DisplaySettings::default(),
    };

    let mut store = InMemoryDataStore::new();
    let anatomy = Geometry::new((100, 256, 256), (0.9, 0.9, 1.5))
        .expect("should have created geometry")
        .into_shared();
    let t1 = store.add(Dataset::image("T1", anatomy.clone()), &[]);
    let t2 = store.add(Dataset::image("T2", anatomy.clone()), &[]);
    let mask = store.add(Dataset::binary_image("brain mask", anatomy), &[t1]);
    let seeds = store.add(Dataset::point_set("seeds"), &[t1]);

    let context = Rc::new(InteractionContext::new());
    let mut manager = MultiViewerVisibilityManager::new(&settings, context);
    for index in 0..4 {
        let viewer = SingleViewer::with_settings(format!("viewer {index}"), index * 4, &settings);
        manager.register_viewer(viewer, &store);
    }
    manager.process_store_events(&mut store);

    for drop_type in [DropType::Single, DropType::Multiple, DropType::All] {
        manager.set_drop_type(drop_type);
        let outcome = manager.on_nodes_dropped(&mut store, WindowId(0), vec![t1, t2]);
        tracing::info!(?drop_type, placements = ?outcome.placements, failures = outcome.failures.len(), "dropped T1 and T2");

        for (index, viewer) in manager.viewers().iter().enumerate() {
            tracing::info!(
                viewer = index,
                layout = ?viewer.state().window_layout(),
                slice = ?viewer.selected_slice(Orientation::Axial),
                visible = ?viewer.visible_datasets(),
                "viewer"
            );
        }
    }

    let switched = manager.activate_tool();
    tracing::info!(switched, "display interactors handed to a tool");
    manager.deactivate_tool();

    manager.on_window_selected(&mut store, WindowId(4));
    store.set_global_visibility(mask, false);
    manager.process_store_events(&mut store);
    tracing::info!(
        mask_visible = ?manager.viewers()[1].dataset_visibility(mask),
        seeds_visible = ?manager.viewers()[1].dataset_visibility(seeds),
        "hid the mask in the selected viewer"
    );
}
