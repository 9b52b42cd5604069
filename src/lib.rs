//! # Drag and drop display library
//!
//! This crate provides the layout and visibility engine behind a grid of
//! medical image viewers that datasets are dragged and dropped onto.
//!
//! Given a grid of viewers and a list of dropped datasets it decides which
//! viewer receives which dataset, which geometry, window layout and slice
//! each viewer shows, and keeps the visibility of every dataset consistent
//! between its global flag and the viewers showing it. Datasets can be
//! dropped in three ways:
//!  - Single: every dataset goes into the viewer it was dropped on
//!  - Multiple: one dataset per viewer, starting at the drop target
//!  - All: every dataset into every viewer, each showing a different slice
//!
//!  Each viewer remembers its selected position, cursor positions, zoom and
//!  time step per window layout and geometry binding, so that switching
//!  layouts back and forth restores what the user was looking at.
//!
//!  Rendering is left to the host application, which plugs its viewers and
//!  its data store in through the [`Viewer`] and [`DataStore`] traits.
//!
//! # Examples
//!
//! ## Dropping an image into a 2x2 grid
//!
//! ```
//! # use dnd_display::data_store::InMemoryDataStore;
//! # use dnd_display::dataset::Dataset;
//! # use dnd_display::geometry::Geometry;
//! # use dnd_display::interaction::InteractionContext;
//! # use dnd_display::manager::MultiViewerVisibilityManager;
//! # use dnd_display::settings::DisplaySettings;
//! # use dnd_display::viewer::{SingleViewer, WindowId};
//! # use std::rc::Rc;
//! let mut store = InMemoryDataStore::new();
//! let geometry = Geometry::new((64, 128, 128), (1.0, 1.0, 2.0))
//!     .expect("should have created geometry")
//!     .into_shared();
//! let t1 = store.add(Dataset::image("T1", geometry), &[]);
//!
//! let settings = DisplaySettings::default();
//! let mut manager = MultiViewerVisibilityManager::new(&settings, Rc::new(InteractionContext::new()));
//! for index in 0..4 {
//!     manager.register_viewer(SingleViewer::with_settings("viewer", index * 4, &settings), &store);
//! }
//!
//! // The render windows of the second viewer are 4 to 7.
//! let outcome = manager.on_nodes_dropped(&mut store, WindowId(5), vec![t1]);
//! assert!(outcome.is_complete());
//! assert_eq!(manager.viewers()[1].visible_datasets(), vec![t1]);
//! ```
//!
//! [`Viewer`]: viewer::Viewer
//! [`DataStore`]: data_store::DataStore

pub mod data_store;
pub mod dataset;
pub mod drop_distributor;
pub mod enums;
pub mod geometry;
pub mod geometry_selector;
pub mod interaction;
pub mod manager;
pub mod settings;
pub mod viewer;
pub mod viewer_state;
pub mod visibility;
