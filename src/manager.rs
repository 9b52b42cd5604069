use crate::data_store::{DataStore, StoreEvent};
use crate::dataset::DatasetId;
use crate::drop_distributor::{
    DropDistributor, DropError, DropRequest, ViewerCommand, ViewerSlot,
};
use crate::enums::{DropType, InterpolationType, Orientation, WindowLayout};
use crate::interaction::{InteractionContext, ObserverId, ObserverRole};
use crate::settings::DisplaySettings;
use crate::viewer::{Viewer, WindowId};
use crate::visibility::VisibilityPropagator;

use std::collections::{BTreeSet, VecDeque};
use std::ops::{Bound, Range, RangeBounds};
use std::rc::Rc;

/// What became of a drop.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DropOutcome {
    /// Index of the viewer the datasets were dropped onto.
    pub target: Option<usize>,
    /// Viewer and dataset of every placement, in the order they were made.
    pub placements: Vec<(usize, DatasetId)>,
    pub failures: Vec<DropError>,
}

impl DropOutcome {
    fn failed(error: DropError) -> Self {
        tracing::error!(%error, "drop ignored");
        Self {
            target: None,
            placements: Vec::new(),
            failures: vec![error],
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Viewers that received at least one dataset.
    pub fn viewers(&self) -> BTreeSet<usize> {
        self.placements.iter().map(|&(viewer, _)| viewer).collect()
    }
}

/// Keeps a grid of viewers in step with a data store: distributes dropped
/// datasets over the viewers and keeps per viewer and global visibility
/// consistent as datasets come and go.
///
/// Store notifications are handled one at a time in arrival order. Changes
/// the store makes while one is being handled are queued behind it.
pub struct MultiViewerVisibilityManager<V: Viewer> {
    viewers: Vec<V>,
    propagator: VisibilityPropagator,
    distributor: DropDistributor,
    context: Rc<InteractionContext>,
    /// Display interactor of each viewer, registered in `context`.
    display_interactors: Vec<ObserverId>,
    display_interactor_config: String,
    tool_interactor_config: String,
    tool_active: bool,
    drop_type: DropType,
    accumulate: bool,
    interpolation: InterpolationType,
    selected_viewer: Option<usize>,
    /// Ignore global visibility notifications.
    blocked: bool,
    pending: VecDeque<StoreEvent>,
}

impl<V: Viewer> MultiViewerVisibilityManager<V> {
    pub fn new(settings: &DisplaySettings, context: Rc<InteractionContext>) -> Self {
        Self {
            viewers: Vec::new(),
            propagator: VisibilityPropagator::new(settings.automatically_add_children),
            distributor: DropDistributor::new(settings),
            context,
            display_interactors: Vec::new(),
            display_interactor_config: settings.display_interactor_config.clone(),
            tool_interactor_config: settings.tool_interactor_config.clone(),
            tool_active: false,
            drop_type: settings.drop_type,
            accumulate: settings.accumulate,
            interpolation: settings.interpolation,
            selected_viewer: None,
            blocked: false,
            pending: VecDeque::new(),
        }
    }

    // ---- configuration ----

    pub fn drop_type(&self) -> DropType {
        self.drop_type
    }

    pub fn set_drop_type(&mut self, drop_type: DropType) {
        self.drop_type = drop_type;
    }

    pub fn accumulate(&self) -> bool {
        self.accumulate
    }

    pub fn set_accumulate(&mut self, accumulate: bool) {
        self.accumulate = accumulate;
    }

    pub fn default_window_layout(&self) -> WindowLayout {
        self.distributor.default_window_layout()
    }

    pub fn set_default_window_layout(&mut self, layout: WindowLayout) {
        self.distributor.set_default_window_layout(layout);
    }

    pub fn interpolation_type(&self) -> InterpolationType {
        self.interpolation
    }

    /// Interpolation given to resliceable datasets as they are added.
    pub fn set_interpolation_type(&mut self, interpolation: InterpolationType) {
        self.interpolation = interpolation;
    }

    pub fn automatically_add_children(&self) -> bool {
        self.propagator.automatically_add_children()
    }

    pub fn set_automatically_add_children(&mut self, enabled: bool) {
        self.propagator.set_automatically_add_children(enabled);
    }

    /// Blocks the global visibility listener and returns whether it was blocked before.
    pub fn set_blocked(&mut self, blocked: bool) -> bool {
        std::mem::replace(&mut self.blocked, blocked)
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    // ---- viewers ----

    /// Adds a viewer to the grid and returns its index. Its layout memory is
    /// reset, every dataset with a global visibility starts out hidden in it
    /// and a display interactor is registered for it.
    pub fn register_viewer(&mut self, mut viewer: V, store: &dyn DataStore) -> usize {
        viewer.reset_layout_states();
        let hidden: Vec<_> = store
            .all_datasets()
            .into_iter()
            .filter(|&id| {
                store
                    .dataset(id)
                    .is_some_and(|dataset| dataset.has_visibility_property())
            })
            .collect();
        viewer.set_visibility(&hidden, false);

        self.viewers.push(viewer);
        let index = self.propagator.register_viewer();
        let interactor = self.context.register_observer(
            ObserverRole::DisplayInteractor,
            self.display_interactor_config.as_str(),
        );
        self.display_interactors.push(interactor);
        if self.tool_active {
            self.context
                .override_display_interactor_config(&self.tool_interactor_config);
        }
        tracing::debug!(viewer = index, hidden = hidden.len(), "viewer registered");
        index
    }

    /// Removes the viewers in `range` from the grid and hands them back with
    /// every dataset hidden. Later viewers move down to fill the gap.
    pub fn deregister_viewers(&mut self, range: impl RangeBounds<usize>) -> Vec<V> {
        let range = self.resolve_range(range);
        for index in range.clone() {
            self.propagator
                .remove_all_datasets_from_viewer(&mut self.viewers, index);
        }
        self.propagator.deregister_viewers(range.clone());
        for interactor in self.display_interactors.drain(range.clone()) {
            self.context.deregister_observer(interactor);
        }
        self.selected_viewer = match self.selected_viewer {
            Some(selected) if range.contains(&selected) => None,
            Some(selected) if selected >= range.end => Some(selected - range.len()),
            other => other,
        };
        tracing::debug!(?range, "viewers deregistered");
        self.viewers.drain(range).collect()
    }

    /// Removes every dataset from the viewers in `range`.
    pub fn clear_viewers(&mut self, range: impl RangeBounds<usize>) {
        for index in self.resolve_range(range) {
            self.propagator
                .remove_all_datasets_from_viewer(&mut self.viewers, index);
        }
    }

    fn resolve_range(&self, range: impl RangeBounds<usize>) -> Range<usize> {
        let count = self.viewers.len();
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end.saturating_add(1),
            Bound::Excluded(&end) => end,
            Bound::Unbounded => count,
        };
        let end = end.min(count);
        start.min(end)..end
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    pub fn viewers(&self) -> &[V] {
        &self.viewers
    }

    pub fn viewer(&self, index: usize) -> Option<&V> {
        self.viewers.get(index)
    }

    pub fn viewer_mut(&mut self, index: usize) -> Option<&mut V> {
        self.viewers.get_mut(index)
    }

    pub fn members(&self, index: usize) -> Option<&BTreeSet<DatasetId>> {
        self.propagator.members(index)
    }

    pub fn dataset_count_in_viewer(&self, index: usize) -> usize {
        self.propagator.dataset_count_in_viewer(index)
    }

    pub fn viewer_index_for_window(&self, window: WindowId) -> Option<usize> {
        self.viewers
            .iter()
            .position(|viewer| viewer.contains_render_window(window))
    }

    /// Viewer owning the render window that has the focus.
    pub fn focused_viewer(&self) -> Option<usize> {
        self.context
            .focused_window()
            .and_then(|window| self.viewer_index_for_window(window))
    }

    pub fn selected_viewer(&self) -> Option<usize> {
        self.selected_viewer
    }

    pub fn context(&self) -> &Rc<InteractionContext> {
        &self.context
    }

    /// Observer that pans, zooms and moves the slices of viewer `index`.
    pub fn display_interactor(&self, index: usize) -> Option<ObserverId> {
        self.display_interactors.get(index).copied()
    }

    // ---- tools ----

    /// Switches every display interactor to the tool config so that a tool
    /// gets the mouse buttons it needs. Returns how many were switched.
    pub fn activate_tool(&mut self) -> usize {
        self.tool_active = true;
        let switched = self
            .context
            .override_display_interactor_config(&self.tool_interactor_config);
        tracing::debug!(switched, config = %self.tool_interactor_config, "tool activated");
        switched
    }

    /// Gives the display interactors back the configs they had before
    /// [`Self::activate_tool`].
    pub fn deactivate_tool(&mut self) {
        if !self.tool_active {
            return;
        }
        self.tool_active = false;
        self.context.restore_display_interactor_configs();
        tracing::debug!("tool deactivated");
    }

    pub fn is_tool_active(&self) -> bool {
        self.tool_active
    }

    // ---- drops ----

    /// Distributes `datasets` dropped onto `window` over the grid according
    /// to the drop type. Failures are logged and reported in the outcome.
    pub fn on_nodes_dropped(
        &mut self,
        store: &mut dyn DataStore,
        window: WindowId,
        datasets: Vec<DatasetId>,
    ) -> DropOutcome {
        self.process_store_events(store);
        let Some(target) = self.viewer_index_for_window(window) else {
            return DropOutcome::failed(DropError::UnknownDropTarget(window));
        };

        let slots: Vec<_> = self
            .viewers
            .iter()
            .enumerate()
            .map(|(index, viewer)| ViewerSlot {
                visible: viewer.is_visible(),
                member_count: self.propagator.dataset_count_in_viewer(index),
                slice_counts: viewer
                    .has_geometry()
                    .then(|| Orientation::ALL.map(|orientation| viewer.max_slice(orientation) + 1)),
            })
            .collect();
        let request = DropRequest {
            target,
            datasets,
            drop_type: self.drop_type,
            accumulate: self.accumulate,
        };
        let plan = self.distributor.plan(&request, &*store, &slots);

        let mut outcome = DropOutcome {
            target: Some(target),
            placements: Vec::new(),
            failures: plan.failures,
        };
        for command in plan.commands {
            if let ViewerCommand::AddDataset { viewer, dataset } = command {
                outcome.placements.push((viewer, dataset));
            }
            self.apply(&*store, command);
        }

        if self.viewers[target].has_geometry() {
            self.update_global_visibilities(store, target);
        }
        self.run_pending(store);
        outcome
    }

    fn apply(&mut self, store: &dyn DataStore, command: ViewerCommand) {
        let index = command.viewer();
        match command {
            ViewerCommand::RemoveAllDatasets { viewer } => {
                self.propagator
                    .remove_all_datasets_from_viewer(&mut self.viewers, viewer);
            }
            ViewerCommand::AddDataset { viewer, dataset } => {
                // Dropped datasets are shown whatever their global visibility.
                self.propagator
                    .add_dataset_to_viewer(store, &mut self.viewers, viewer, dataset, true);
            }
            command => {
                let Some(viewer) = self.viewers.get_mut(index) else {
                    tracing::error!(viewer = index, "command for missing viewer");
                    return;
                };
                match command {
                    ViewerCommand::SetGeometry { geometry, .. } => viewer.set_geometry(geometry),
                    ViewerCommand::SetWindowLayout { layout, .. } => {
                        viewer.set_window_layout(layout)
                    }
                    ViewerCommand::SetEnabled { enabled, .. } => viewer.set_enabled(enabled),
                    ViewerCommand::SetSelectedSlice {
                        orientation, slice, ..
                    } => viewer.set_selected_slice(orientation, slice),
                    ViewerCommand::FitToDisplay { .. } => viewer.fit_to_display(),
                    ViewerCommand::RemoveAllDatasets { .. } | ViewerCommand::AddDataset { .. } => {}
                }
            }
        }
    }

    // ---- selection ----

    /// Makes the viewer owning `window` the selected one and copies its
    /// visibilities into the global ones.
    pub fn on_window_selected(&mut self, store: &mut dyn DataStore, window: WindowId) {
        let Some(index) = self.viewer_index_for_window(window) else {
            tracing::warn!(?window, "selected window belongs to no viewer");
            return;
        };
        self.selected_viewer = Some(index);
        self.context.set_focused_window(Some(window));
        if self.viewers[index].has_geometry() {
            self.update_global_visibilities(store, index);
        }
        self.run_pending(store);
    }

    /// Sets the global visibility of every managed dataset to its visibility
    /// in viewer `index`. The notifications this causes are not listened to.
    pub fn update_global_visibilities(&mut self, store: &mut dyn DataStore, index: usize) {
        let Some(viewer) = self.viewers.get(index) else {
            return;
        };
        let was_blocked = std::mem::replace(&mut self.blocked, true);
        for id in store.all_datasets() {
            let Some(dataset) = store.dataset(id) else {
                continue;
            };
            if !dataset.is_visibility_managed() {
                continue;
            }
            let visible = viewer
                .dataset_visibility(id)
                .unwrap_or_else(|| dataset.is_visible());
            store.set_global_visibility(id, visible);
        }
        self.collect_store_events(store);
        self.blocked = was_blocked;
    }

    // ---- store notifications ----

    pub fn on_dataset_added(&mut self, store: &mut dyn DataStore, dataset: DatasetId) {
        self.handle_store_event(store, StoreEvent::DatasetAdded(dataset));
    }

    pub fn on_dataset_removed(&mut self, store: &mut dyn DataStore, dataset: DatasetId) {
        self.handle_store_event(store, StoreEvent::DatasetRemoved(dataset));
    }

    pub fn on_global_visibility_changed(&mut self, store: &mut dyn DataStore, dataset: DatasetId) {
        self.handle_store_event(store, StoreEvent::GlobalVisibilityChanged(dataset));
    }

    /// Handles everything the store has queued up, including what the
    /// handling itself makes the store queue.
    pub fn process_store_events(&mut self, store: &mut dyn DataStore) {
        self.collect_store_events(store);
        self.run_pending(store);
    }

    fn handle_store_event(&mut self, store: &mut dyn DataStore, event: StoreEvent) {
        self.collect_store_events(store);
        if !self.pending.contains(&event) {
            self.pending.push_back(event);
        }
        self.run_pending(store);
    }

    fn collect_store_events(&mut self, store: &mut dyn DataStore) {
        for event in store.drain_events() {
            if self.blocked && matches!(event, StoreEvent::GlobalVisibilityChanged(_)) {
                tracing::trace!(?event, "ignored while blocked");
                continue;
            }
            self.pending.push_back(event);
        }
    }

    fn run_pending(&mut self, store: &mut dyn DataStore) {
        while let Some(event) = self.pending.pop_front() {
            self.dispatch(store, event);
            self.collect_store_events(store);
        }
    }

    fn dispatch(&mut self, store: &mut dyn DataStore, event: StoreEvent) {
        tracing::trace!(?event, "store event");
        match event {
            StoreEvent::DatasetAdded(dataset) => {
                store.set_reslice_interpolation(dataset, self.interpolation);
                self.propagator
                    .on_dataset_added(&*store, &mut self.viewers, dataset);
            }
            StoreEvent::DatasetRemoved(dataset) => {
                let focused = self.focused_viewer();
                self.propagator
                    .on_dataset_removed(&mut self.viewers, focused, dataset);
            }
            StoreEvent::GlobalVisibilityChanged(dataset) => {
                if self.blocked {
                    return;
                }
                let focused = self.focused_viewer();
                self.propagator.on_global_visibility_changed(
                    &*store,
                    &mut self.viewers,
                    focused,
                    dataset,
                );
            }
        }
    }
}
