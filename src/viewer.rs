use crate::dataset::DatasetId;
use crate::enums::{GeometryBinding, Orientation, WindowLayout};
use crate::geometry::SharedGeometry;
use crate::settings::DisplaySettings;
use crate::viewer_state::ViewerState;

use std::collections::HashMap;

/// Handle of a render window owned by the host toolkit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// Commands the visibility manager issues to one viewer of the grid.
pub trait Viewer {
    /// Sets the geometry the viewer samples. Bound viewers take it as their
    /// shared geometry, unbound ones as their own.
    fn set_geometry(&mut self, geometry: SharedGeometry);

    fn set_window_layout(&mut self, layout: WindowLayout);

    fn set_enabled(&mut self, enabled: bool);

    fn set_selected_slice(&mut self, orientation: Orientation, slice: usize);

    fn fit_to_display(&mut self);

    /// Sets the renderer specific visibility of the datasets in this viewer.
    fn set_visibility(&mut self, datasets: &[DatasetId], visible: bool);

    /// Renderer specific visibility of a dataset, `None` if never set.
    fn dataset_visibility(&self, dataset: DatasetId) -> Option<bool>;

    /// Drops the renderer specific visibility of a dataset that left the store.
    fn forget_dataset(&mut self, dataset: DatasetId);

    fn max_slice(&self, orientation: Orientation) -> usize;

    fn contains_render_window(&self, window: WindowId) -> bool;

    /// Whether the viewer is currently shown in the grid.
    fn is_visible(&self) -> bool;

    fn has_geometry(&self) -> bool;

    /// Forgets everything remembered per window layout.
    fn reset_layout_states(&mut self);
}

/// A viewer of three 2D render windows and one 3D window, keeping its display
/// state in a [`ViewerState`].
#[derive(Debug)]
pub struct SingleViewer {
    name: String,
    /// Axial, sagittal, coronal and 3D window.
    windows: [WindowId; 4],
    state: ViewerState,
    visibility: HashMap<DatasetId, bool>,
    visible: bool,
}

impl SingleViewer {
    /// Creates a viewer whose four render windows get consecutive ids from `first_window`.
    pub fn new(name: impl Into<String>, first_window: u64) -> Self {
        Self {
            name: name.into(),
            windows: [0, 1, 2, 3].map(|offset| WindowId(first_window + offset)),
            state: ViewerState::new(),
            visibility: HashMap::new(),
            visible: true,
        }
    }

    /// Same as [`Self::new`], with the layout memory and double-click interval
    /// taken from `settings`.
    pub fn with_settings(
        name: impl Into<String>,
        first_window: u64,
        settings: &DisplaySettings,
    ) -> Self {
        let mut viewer = Self::new(name, first_window);
        viewer
            .state
            .set_remember_settings_per_window_layout(settings.remember_settings_per_window_layout);
        viewer
            .state
            .set_double_click_interval(settings.double_click_interval());
        viewer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render_window(&self, orientation: Option<Orientation>) -> WindowId {
        match orientation {
            Some(orientation) => self.windows[orientation.index()],
            None => self.windows[3],
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ViewerState {
        &mut self.state
    }

    /// Shows or hides the viewer in the grid.
    pub fn set_shown(&mut self, shown: bool) {
        self.visible = shown;
    }

    pub fn selected_slice(&self, orientation: Orientation) -> Option<usize> {
        self.state.selected_slice(orientation)
    }

    /// Datasets currently rendered in this viewer.
    pub fn visible_datasets(&self) -> Vec<DatasetId> {
        let mut visible: Vec<_> = self
            .visibility
            .iter()
            .filter(|(_, visible)| **visible)
            .map(|(id, _)| *id)
            .collect();
        visible.sort();
        visible
    }
}

impl Viewer for SingleViewer {
    fn set_geometry(&mut self, geometry: SharedGeometry) {
        match self.state.geometry_binding() {
            GeometryBinding::Bound => self.state.set_bound_geometry(geometry),
            GeometryBinding::Unbound => self.state.set_geometry(geometry),
        }
    }

    fn set_window_layout(&mut self, layout: WindowLayout) {
        self.state.set_window_layout(layout);
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.state.set_enabled(enabled);
    }

    fn set_selected_slice(&mut self, orientation: Orientation, slice: usize) {
        self.state.set_selected_slice(orientation, slice);
    }

    fn fit_to_display(&mut self) {
        self.state.fit_to_display();
    }

    fn set_visibility(&mut self, datasets: &[DatasetId], visible: bool) {
        for &dataset in datasets {
            self.visibility.insert(dataset, visible);
        }
    }

    fn dataset_visibility(&self, dataset: DatasetId) -> Option<bool> {
        self.visibility.get(&dataset).copied()
    }

    fn forget_dataset(&mut self, dataset: DatasetId) {
        self.visibility.remove(&dataset);
    }

    fn max_slice(&self, orientation: Orientation) -> usize {
        self.state.max_slice(orientation)
    }

    fn contains_render_window(&self, window: WindowId) -> bool {
        self.windows.contains(&window)
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn has_geometry(&self) -> bool {
        self.state.active_geometry().is_some()
    }

    fn reset_layout_states(&mut self) {
        self.state.reset_layout_states();
    }
}
