use crate::data_store::DataStore;
use crate::dataset::DatasetId;
use crate::enums::{DropType, Orientation, WindowLayout};
use crate::geometry::SharedGeometry;
use crate::geometry_selector::GeometrySelector;
use crate::settings::DisplaySettings;
use crate::viewer::WindowId;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DropError {
    #[error("No geometry found for {datasets} dataset(s) dropped into viewer {viewer}")]
    GeometryResolution { viewer: usize, datasets: usize },

    #[error("Viewer index {index} out of range, {viewer_count} viewers registered")]
    InvalidViewerIndex { index: usize, viewer_count: usize },

    #[error("Render window {0:?} does not belong to any registered viewer")]
    UnknownDropTarget(WindowId),

    #[error("No visible viewer left for dataset {dataset}")]
    NoVisibleViewer { dataset: DatasetId },
}

/// Datasets dropped onto one viewer of the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct DropRequest {
    pub target: usize,
    pub datasets: Vec<DatasetId>,
    pub drop_type: DropType,
    /// Keep what the receiving viewers already show.
    pub accumulate: bool,
}

/// What the distributor needs to know about each viewer of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewerSlot {
    pub visible: bool,
    pub member_count: usize,
    /// Slice count per orientation of the geometry the viewer shows now, in
    /// [`Orientation::index`] order.
    pub slice_counts: Option<[usize; 3]>,
}

/// A single change to one viewer of the grid.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerCommand {
    RemoveAllDatasets { viewer: usize },
    SetGeometry { viewer: usize, geometry: SharedGeometry },
    SetWindowLayout { viewer: usize, layout: WindowLayout },
    SetEnabled { viewer: usize, enabled: bool },
    SetSelectedSlice { viewer: usize, orientation: Orientation, slice: usize },
    FitToDisplay { viewer: usize },
    AddDataset { viewer: usize, dataset: DatasetId },
}

impl ViewerCommand {
    pub fn viewer(&self) -> usize {
        match *self {
            ViewerCommand::RemoveAllDatasets { viewer }
            | ViewerCommand::SetGeometry { viewer, .. }
            | ViewerCommand::SetWindowLayout { viewer, .. }
            | ViewerCommand::SetEnabled { viewer, .. }
            | ViewerCommand::SetSelectedSlice { viewer, .. }
            | ViewerCommand::FitToDisplay { viewer }
            | ViewerCommand::AddDataset { viewer, .. } => viewer,
        }
    }
}

/// Commands for one drop, in the order they are to be applied, and the
/// datasets that could not be placed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DropPlan {
    pub commands: Vec<ViewerCommand>,
    pub failures: Vec<DropError>,
}

impl DropPlan {
    fn failed(error: DropError) -> Self {
        tracing::error!(%error, "drop aborted");
        Self {
            commands: Vec::new(),
            failures: vec![error],
        }
    }

    /// Datasets the plan adds to `viewer`, in order.
    pub fn datasets_for(&self, viewer: usize) -> Vec<DatasetId> {
        self.commands
            .iter()
            .filter_map(|command| match *command {
                ViewerCommand::AddDataset { viewer: v, dataset } if v == viewer => Some(dataset),
                _ => None,
            })
            .collect()
    }

    /// Slice the plan selects in `viewer`, if any.
    pub fn slice_for(&self, viewer: usize) -> Option<usize> {
        self.commands.iter().rev().find_map(|command| match *command {
            ViewerCommand::SetSelectedSlice { viewer: v, slice, .. } if v == viewer => Some(slice),
            _ => None,
        })
    }

    pub fn touches(&self, viewer: usize) -> bool {
        self.commands.iter().any(|command| command.viewer() == viewer)
    }
}

/// Slice each thumbnail viewer shows when the datasets are dropped into all of them.
///
/// With no more slices than viewers, viewer `i` shows slice `i` and the rest are
/// left alone. Otherwise `edge_trim` of the slices are skipped at either end,
/// as they are usually blank, and the remaining ones are spread evenly.
pub fn thumbnail_slices(
    number_of_slices: usize,
    number_of_viewers: usize,
    edge_trim: f64,
) -> Vec<usize> {
    let viewers_to_use = number_of_slices.min(number_of_viewers);
    if number_of_slices <= number_of_viewers {
        return (0..viewers_to_use).collect();
    }
    let edge = (number_of_slices as f64 * edge_trim.clamp(0.0, 0.5)).floor() as usize;
    let remaining = number_of_slices.saturating_sub(2 * edge);
    (0..viewers_to_use)
        .map(|i| edge + remaining * i / number_of_viewers)
        .collect()
}

/// First visible viewer at or after `cursor`. With `wrap` the search continues
/// from the first viewer up to `cursor`.
pub fn next_visible_viewer(visible: &[bool], cursor: usize, wrap: bool) -> Option<usize> {
    let start = cursor.min(visible.len());
    let found = (start..visible.len()).find(|&index| visible[index]);
    if found.is_some() || !wrap {
        return found;
    }
    (0..start).find(|&index| visible[index])
}

/// Decides which viewer gets which dataset.
#[derive(Clone, Debug)]
pub struct DropDistributor {
    default_window_layout: WindowLayout,
    edge_trim: f64,
    wrap_multiple_drop: bool,
}

impl DropDistributor {
    pub fn new(settings: &DisplaySettings) -> Self {
        Self {
            default_window_layout: settings.default_window_layout,
            edge_trim: settings.thumbnail_edge_trim,
            wrap_multiple_drop: settings.wrap_multiple_drop,
        }
    }

    pub fn set_default_window_layout(&mut self, layout: WindowLayout) {
        self.default_window_layout = layout;
    }

    pub fn default_window_layout(&self) -> WindowLayout {
        self.default_window_layout
    }

    /// Works out the commands for `request` against the current grid.
    pub fn plan(
        &self,
        request: &DropRequest,
        store: &dyn DataStore,
        slots: &[ViewerSlot],
    ) -> DropPlan {
        if request.target >= slots.len() {
            return DropPlan::failed(DropError::InvalidViewerIndex {
                index: request.target,
                viewer_count: slots.len(),
            });
        }
        tracing::debug!(
            drop_type = ?request.drop_type,
            viewer = request.target,
            datasets = request.datasets.len(),
            accumulate = request.accumulate,
            "datasets dropped"
        );
        let layout =
            GeometrySelector::window_layout_for(store, &request.datasets, self.default_window_layout);
        let mut members: Vec<usize> = slots.iter().map(|slot| slot.member_count).collect();

        match request.drop_type {
            DropType::Single => Self::plan_single(request, store, layout, &mut members),
            DropType::Multiple => {
                self.plan_multiple(request, store, layout, slots, &mut members)
            }
            DropType::All => self.plan_all(request, store, layout, slots, &mut members),
        }
    }

    /// Clears `viewer` unless accumulating, then sets it up for `geometry` if it
    /// is empty or was just cleared.
    fn prepare_viewer(
        commands: &mut Vec<ViewerCommand>,
        members: &mut [usize],
        viewer: usize,
        geometry: &SharedGeometry,
        layout: WindowLayout,
        accumulate: bool,
    ) {
        if members[viewer] > 0 && !accumulate {
            commands.push(ViewerCommand::RemoveAllDatasets { viewer });
            members[viewer] = 0;
        }
        if members[viewer] == 0 || !accumulate {
            commands.push(ViewerCommand::SetGeometry {
                viewer,
                geometry: geometry.clone(),
            });
            commands.push(ViewerCommand::SetWindowLayout { viewer, layout });
            commands.push(ViewerCommand::SetEnabled {
                viewer,
                enabled: true,
            });
        }
    }

    fn plan_single(
        request: &DropRequest,
        store: &dyn DataStore,
        layout: WindowLayout,
        members: &mut [usize],
    ) -> DropPlan {
        let viewer = request.target;
        let Some(geometry) = GeometrySelector::select_geometry(store, &request.datasets, None)
        else {
            return DropPlan::failed(DropError::GeometryResolution {
                viewer,
                datasets: request.datasets.len(),
            });
        };

        let mut plan = DropPlan::default();
        Self::prepare_viewer(
            &mut plan.commands,
            members,
            viewer,
            &geometry,
            layout,
            request.accumulate,
        );
        for &dataset in &request.datasets {
            plan.commands.push(ViewerCommand::AddDataset { viewer, dataset });
            members[viewer] += 1;
        }
        plan
    }

    fn plan_multiple(
        &self,
        request: &DropRequest,
        store: &dyn DataStore,
        layout: WindowLayout,
        slots: &[ViewerSlot],
        members: &mut [usize],
    ) -> DropPlan {
        let visible: Vec<bool> = slots.iter().map(|slot| slot.visible).collect();
        let mut plan = DropPlan::default();
        let mut cursor = request.target;

        for (index, &dataset) in request.datasets.iter().enumerate() {
            let Some(viewer) = next_visible_viewer(&visible, cursor, self.wrap_multiple_drop)
            else {
                let error = DropError::NoVisibleViewer { dataset };
                tracing::error!(%error, "dataset skipped");
                plan.failures.push(error);
                cursor += 1;
                continue;
            };
            // Always move on, even past a failed dataset.
            cursor = viewer + 1;

            let Some(geometry) =
                GeometrySelector::select_geometry(store, &request.datasets, Some(index))
            else {
                let error = DropError::GeometryResolution {
                    viewer,
                    datasets: 1,
                };
                tracing::error!(%error, %dataset, "dataset skipped");
                plan.failures.push(error);
                continue;
            };

            tracing::debug!(%dataset, viewer, "dropping into viewer");
            Self::prepare_viewer(
                &mut plan.commands,
                members,
                viewer,
                &geometry,
                layout,
                request.accumulate,
            );
            plan.commands.push(ViewerCommand::AddDataset { viewer, dataset });
            members[viewer] += 1;
        }
        plan
    }

    fn plan_all(
        &self,
        request: &DropRequest,
        store: &dyn DataStore,
        layout: WindowLayout,
        slots: &[ViewerSlot],
        members: &mut [usize],
    ) -> DropPlan {
        let Some(geometry) = GeometrySelector::select_geometry(store, &request.datasets, None)
        else {
            return DropPlan::failed(DropError::GeometryResolution {
                viewer: request.target,
                datasets: request.datasets.len(),
            });
        };

        // Thumbnails need a single slice orientation.
        let (orientation, layout) = match layout.orientation() {
            Some(orientation) => (orientation, layout),
            None => (Orientation::Axial, WindowLayout::Axial),
        };

        let mut plan = DropPlan::default();
        if !request.accumulate && members.iter().any(|&count| count > 0) {
            for (viewer, count) in members.iter_mut().enumerate() {
                if *count > 0 {
                    plan.commands.push(ViewerCommand::RemoveAllDatasets { viewer });
                    *count = 0;
                }
            }
        }

        // The first viewer is the reference. When accumulating onto it, it
        // keeps its geometry and so does its slice count.
        let kept = if request.accumulate && members[0] > 0 {
            slots[0].slice_counts.map(|counts| counts[orientation.index()])
        } else {
            None
        };
        let number_of_slices = kept.unwrap_or_else(|| geometry.max_slice(orientation) + 1);
        let slices = thumbnail_slices(number_of_slices, members.len(), self.edge_trim);
        tracing::debug!(
            number_of_slices,
            viewers_to_use = slices.len(),
            ?slices,
            "spreading thumbnails"
        );

        for (viewer, &slice) in slices.iter().enumerate() {
            if members[viewer] == 0 || !request.accumulate {
                plan.commands.push(ViewerCommand::SetGeometry {
                    viewer,
                    geometry: geometry.clone(),
                });
                plan.commands.push(ViewerCommand::SetWindowLayout { viewer, layout });
                plan.commands.push(ViewerCommand::SetEnabled {
                    viewer,
                    enabled: true,
                });
            }
            plan.commands.push(ViewerCommand::SetSelectedSlice {
                viewer,
                orientation,
                slice,
            });
            plan.commands.push(ViewerCommand::FitToDisplay { viewer });
        }

        for viewer in 0..slices.len() {
            for &dataset in &request.datasets {
                plan.commands.push(ViewerCommand::AddDataset { viewer, dataset });
                members[viewer] += 1;
            }
        }
        plan
    }
}
