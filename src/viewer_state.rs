use crate::enums::{GeometryBinding, Orientation, WindowLayout};
use crate::geometry::{Point3, SharedGeometry};

use std::collections::{HashMap, VecDeque};
use std::ops::{Index, IndexMut};
use web_time::{Duration, Instant};

/// Position inside a render window, normalised with the size of the window.
pub type Vector2 = [f64; 2];

pub const CENTRE: Vector2 = [0.5, 0.5];

pub const DEFAULT_DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(400);

const SELECTED_POSITION_HISTORY: usize = 3;
const CURSOR_POSITION_HISTORY: usize = 7;

/// What a viewer shows in one window layout.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutState {
    pub selected_position: Point3,
    /// One per 2D render window, see [`Orientation::index`].
    pub cursor_positions: [Vector2; 3],
    /// Millimetres per pixel, one per 2D render window.
    pub scale_factors: [f64; 3],
    pub time_step: usize,
    /// `None` selects the 3D window.
    pub selected_window: Option<Orientation>,
    pub cursor_position_bound: bool,
    pub scale_factor_bound: bool,
    pub initialized: bool,
}

const UNINITIALIZED: LayoutState = LayoutState {
    selected_position: [0.0; 3],
    cursor_positions: [CENTRE; 3],
    scale_factors: [1.0; 3],
    time_step: 0,
    selected_window: None,
    cursor_position_bound: false,
    scale_factor_bound: false,
    initialized: false,
};

impl Default for LayoutState {
    fn default() -> Self {
        UNINITIALIZED
    }
}

/// One value per geometry binding mode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BindingPair<T> {
    pub unbound: T,
    pub bound: T,
}

impl<T> Index<GeometryBinding> for BindingPair<T> {
    type Output = T;

    fn index(&self, binding: GeometryBinding) -> &T {
        match binding {
            GeometryBinding::Unbound => &self.unbound,
            GeometryBinding::Bound => &self.bound,
        }
    }
}

impl<T> IndexMut<GeometryBinding> for BindingPair<T> {
    fn index_mut(&mut self, binding: GeometryBinding) -> &mut T {
        match binding {
            GeometryBinding::Unbound => &mut self.unbound,
            GeometryBinding::Bound => &mut self.bound,
        }
    }
}

/// The last few selected positions and cursor positions with the time they were set.
///
/// A double click that toggles the window layout first moves the position like
/// a single click does. The history lets the viewer put back the position from
/// before the click when it leaves the layout.
#[derive(Clone, Debug, Default)]
pub struct PositionHistory {
    selected_positions: VecDeque<(Instant, Point3)>,
    cursor_positions: VecDeque<(Instant, [Vector2; 3])>,
}

impl PositionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.selected_positions.clear();
        self.cursor_positions.clear();
    }

    /// Forget everything but the given positions.
    pub fn reset(&mut self, at: Instant, position: Point3, cursors: [Vector2; 3]) {
        self.clear();
        self.record_selected_position(at, position);
        self.record_cursor_positions(at, cursors);
    }

    pub fn record_selected_position(&mut self, at: Instant, position: Point3) {
        self.selected_positions.push_back((at, position));
        if self.selected_positions.len() > SELECTED_POSITION_HISTORY {
            self.selected_positions.pop_front();
        }
    }

    pub fn record_cursor_positions(&mut self, at: Instant, cursors: [Vector2; 3]) {
        self.cursor_positions.push_back((at, cursors));
        if self.cursor_positions.len() > CURSOR_POSITION_HISTORY {
            self.cursor_positions.pop_front();
        }
    }

    /// The most recent selected position set before `threshold`.
    pub fn selected_position_before(&self, threshold: Instant) -> Option<Point3> {
        self.selected_positions
            .iter()
            .rev()
            .find(|(at, _)| *at < threshold)
            .map(|(_, position)| *position)
    }

    /// The most recent cursor positions set before `threshold`.
    pub fn cursor_positions_before(&self, threshold: Instant) -> Option<[Vector2; 3]> {
        self.cursor_positions
            .iter()
            .rev()
            .find(|(at, _)| *at < threshold)
            .map(|(_, cursors)| *cursors)
    }

    pub fn selected_position_count(&self) -> usize {
        self.selected_positions.len()
    }

    pub fn cursor_position_count(&self) -> usize {
        self.cursor_positions.len()
    }
}

/// Notification sent out by a viewer when its state changes.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerChange {
    GeometryChanged,
    GeometryBindingChanged(GeometryBinding),
    EnabledChanged(bool),
    WindowLayoutChanged(WindowLayout),
    SelectedPositionChanged(Point3),
    TimeStepChanged(usize),
    CursorPositionChanged(Orientation, Vector2),
    ScaleFactorChanged(Orientation, f64),
    CursorPositionBindingChanged(bool),
    ScaleFactorBindingChanged(bool),
}

impl ViewerChange {
    /// True if `self` makes an earlier, still pending `other` obsolete.
    fn supersedes(&self, other: &ViewerChange) -> bool {
        match (self, other) {
            (ViewerChange::CursorPositionChanged(a, _), ViewerChange::CursorPositionChanged(b, _))
            | (ViewerChange::ScaleFactorChanged(a, _), ViewerChange::ScaleFactorChanged(b, _)) => {
                a == b
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

/// Display state of one viewer, remembered per window layout and geometry binding.
#[derive(Debug)]
pub struct ViewerState {
    geometry: Option<SharedGeometry>,
    bound_geometry: Option<SharedGeometry>,
    binding: GeometryBinding,
    window_layout: WindowLayout,
    layout_states: HashMap<WindowLayout, BindingPair<LayoutState>>,
    history: PositionHistory,
    enabled: bool,
    remember_settings_per_window_layout: bool,
    single_window_layout: WindowLayout,
    multi_window_layout: WindowLayout,
    double_click_interval: Duration,
    /// Size of each 2D render window in pixels (width, height).
    render_window_size: (f64, f64),
    update_blocked: bool,
    pending: Vec<ViewerChange>,
    notifications: Vec<ViewerChange>,
    render_requests: usize,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerState {
    pub fn new() -> Self {
        Self {
            geometry: None,
            bound_geometry: None,
            binding: GeometryBinding::Unbound,
            window_layout: WindowLayout::Unknown,
            layout_states: HashMap::new(),
            history: PositionHistory::new(),
            enabled: false,
            remember_settings_per_window_layout: true,
            single_window_layout: WindowLayout::Coronal,
            multi_window_layout: WindowLayout::Ortho,
            double_click_interval: DEFAULT_DOUBLE_CLICK_INTERVAL,
            render_window_size: (512.0, 512.0),
            update_blocked: false,
            pending: Vec::new(),
            notifications: Vec::new(),
            render_requests: 0,
        }
    }

    pub fn set_remember_settings_per_window_layout(&mut self, remember: bool) {
        self.remember_settings_per_window_layout = remember;
    }

    pub fn remember_settings_per_window_layout(&self) -> bool {
        self.remember_settings_per_window_layout
    }

    pub fn set_double_click_interval(&mut self, interval: Duration) {
        self.double_click_interval = interval;
    }

    pub fn set_render_window_size(&mut self, width: f64, height: f64) {
        self.render_window_size = (width.max(1.0), height.max(1.0));
    }

    /// Sets the layout `toggle_multi_window_layout` switches to from a multi window layout.
    pub fn set_default_single_window_layout(&mut self, layout: WindowLayout) {
        if layout.is_single_window() {
            self.single_window_layout = layout;
        }
    }

    /// Sets the layout `toggle_multi_window_layout` switches to from a single window layout.
    pub fn set_default_multi_window_layout(&mut self, layout: WindowLayout) {
        if layout.is_multi_window() {
            self.multi_window_layout = layout;
        }
    }

    // ---- update batching ----

    /// Blocks the update of the viewer and returns whether it was blocked before.
    ///
    /// While blocked, state changes are applied but their notifications are
    /// held back, keeping only the latest of each kind. Unblocking sends them
    /// out together with a single render request. Restore the previous value
    /// when done:
    ///
    /// ```
    /// # use dnd_display::viewer_state::ViewerState;
    /// # let mut state = ViewerState::new();
    /// let was_blocked = state.block_update(true);
    /// // change layout, positions, ...
    /// state.block_update(was_blocked);
    /// ```
    pub fn block_update(&mut self, blocked: bool) -> bool {
        let was_blocked = self.update_blocked;
        self.update_blocked = blocked;
        if was_blocked && !blocked && !self.pending.is_empty() {
            self.notifications.append(&mut self.pending);
            self.render_requests += 1;
        }
        was_blocked
    }

    pub fn is_update_blocked(&self) -> bool {
        self.update_blocked
    }

    /// Notifications sent out since the last call.
    pub fn take_notifications(&mut self) -> Vec<ViewerChange> {
        std::mem::take(&mut self.notifications)
    }

    /// Number of times the viewer asked to be re-rendered.
    pub fn render_requests(&self) -> usize {
        self.render_requests
    }

    fn emit(&mut self, change: ViewerChange) {
        if self.update_blocked {
            match self.pending.iter_mut().find(|pending| change.supersedes(pending)) {
                Some(pending) => *pending = change,
                None => self.pending.push(change),
            }
        } else {
            self.notifications.push(change);
            self.render_requests += 1;
        }
    }

    // ---- layout records ----

    fn active(&self) -> &LayoutState {
        self.layout_state(self.window_layout, self.binding)
    }

    fn active_mut(&mut self) -> &mut LayoutState {
        let binding = self.binding;
        &mut self.layout_states.entry(self.window_layout).or_default()[binding]
    }

    /// The record kept for `layout` in the given binding mode.
    pub fn layout_state(&self, layout: WindowLayout, binding: GeometryBinding) -> &LayoutState {
        self.layout_states
            .get(&layout)
            .map_or(&UNINITIALIZED, |pair| &pair[binding])
    }

    pub fn is_layout_initialized(&self, layout: WindowLayout, binding: GeometryBinding) -> bool {
        self.layout_state(layout, binding).initialized
    }

    /// Marks every layout record uninitialized and forgets the position history.
    pub fn reset_layout_states(&mut self) {
        self.layout_states.clear();
        self.history.clear();
    }

    fn invalidate_binding(&mut self, binding: GeometryBinding) {
        for pair in self.layout_states.values_mut() {
            pair[binding].initialized = false;
        }
    }

    fn fitted_scale_factors(&self, bound: bool) -> Option<[f64; 3]> {
        let geometry = self.active_geometry()?;
        let (width, height) = self.render_window_size;
        let mut factors = [1.0; 3];
        for orientation in Orientation::ALL {
            let (extent_x, extent_y) = geometry.slice_extent(orientation);
            factors[orientation.index()] = (extent_x / width).max(extent_y / height);
        }
        if bound {
            let largest = factors.iter().copied().fold(f64::MIN, f64::max);
            factors = [largest; 3];
        }
        Some(factors)
    }

    /// Fills the active record, from `seed` if it was initialized, otherwise from
    /// the geometry. Without a geometry the record stays uninitialized.
    fn initialize_active(&mut self, seed: Option<LayoutState>) {
        let Some(geometry) = self.active_geometry().cloned() else {
            return;
        };
        let layout = self.window_layout;
        let multi = layout.is_multi_window();
        let fitted = self.fitted_scale_factors(multi).unwrap_or([1.0; 3]);

        let state = self.active_mut();
        match seed.filter(|seed| seed.initialized) {
            Some(seed) => {
                state.selected_position = seed.selected_position;
                state.time_step = seed.time_step;
                state.scale_factors = seed.scale_factors;
            }
            None => {
                state.selected_position = geometry.centre();
                state.time_step = 0;
                state.scale_factors = fitted;
            }
        }
        state.cursor_positions = [CENTRE; 3];
        state.selected_window = layout.orientations().first().copied();
        state.cursor_position_bound = multi;
        state.scale_factor_bound = multi;
        state.initialized = true;
    }

    fn emit_active_state(&mut self) {
        let state = self.active().clone();
        self.emit(ViewerChange::SelectedPositionChanged(state.selected_position));
        self.emit(ViewerChange::TimeStepChanged(state.time_step));
        for &orientation in self.window_layout.orientations() {
            let index = orientation.index();
            self.emit(ViewerChange::CursorPositionChanged(
                orientation,
                state.cursor_positions[index],
            ));
            self.emit(ViewerChange::ScaleFactorChanged(
                orientation,
                state.scale_factors[index],
            ));
        }
    }

    // ---- geometry ----

    /// The geometry in use: the shared one when bound, otherwise the viewer's own.
    pub fn active_geometry(&self) -> Option<&SharedGeometry> {
        match self.binding {
            GeometryBinding::Bound => self.bound_geometry.as_ref(),
            GeometryBinding::Unbound => self.geometry.as_ref(),
        }
    }

    pub fn geometry(&self) -> Option<&SharedGeometry> {
        self.geometry.as_ref()
    }

    pub fn bound_geometry(&self) -> Option<&SharedGeometry> {
        self.bound_geometry.as_ref()
    }

    /// Sets the geometry owned by this viewer. Every unbound layout record is
    /// reset, the current one is re-initialized at the centre of the geometry.
    pub fn set_geometry(&mut self, geometry: SharedGeometry) {
        self.geometry = Some(geometry);
        self.on_geometry_replaced(GeometryBinding::Unbound);
    }

    /// Sets the geometry shared with the other bound viewers.
    pub fn set_bound_geometry(&mut self, geometry: SharedGeometry) {
        self.bound_geometry = Some(geometry);
        self.on_geometry_replaced(GeometryBinding::Bound);
    }

    fn on_geometry_replaced(&mut self, binding: GeometryBinding) {
        self.invalidate_binding(binding);
        if binding == self.binding {
            self.initialize_active(None);
            let state = self.active().clone();
            self.history
                .reset(Instant::now(), state.selected_position, state.cursor_positions);
            self.emit(ViewerChange::GeometryChanged);
            self.emit_active_state();
        }
    }

    pub fn geometry_binding(&self) -> GeometryBinding {
        self.binding
    }

    pub fn set_geometry_binding(&mut self, binding: GeometryBinding) {
        if binding == self.binding {
            return;
        }
        let was_blocked = self.block_update(true);
        let previous = self.active().clone();
        self.binding = binding;
        if !self.active().initialized {
            self.initialize_active(Some(previous));
        }
        self.emit(ViewerChange::GeometryBindingChanged(binding));
        self.emit(ViewerChange::GeometryChanged);
        self.emit_active_state();
        self.block_update(was_blocked);
    }

    pub fn max_slice(&self, orientation: Orientation) -> usize {
        self.active_geometry()
            .map_or(0, |geometry| geometry.max_slice(orientation))
    }

    pub fn max_time_step(&self) -> usize {
        self.active_geometry()
            .map_or(0, |geometry| geometry.max_time_step())
    }

    // ---- enabled ----

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.enabled {
            self.enabled = enabled;
            self.emit(ViewerChange::EnabledChanged(enabled));
        }
    }

    // ---- window layout ----

    pub fn window_layout(&self) -> WindowLayout {
        self.window_layout
    }

    pub fn set_window_layout(&mut self, layout: WindowLayout) {
        self.set_window_layout_at(layout, Instant::now());
    }

    /// Switches the window layout at time `now`.
    ///
    /// When settings are remembered per layout, the record of the layout being
    /// left keeps the position from before any click within the double click
    /// interval, and the record of the new layout is restored if it was used
    /// before. Otherwise the new layout continues from the current position.
    pub fn set_window_layout_at(&mut self, layout: WindowLayout, now: Instant) {
        if layout == self.window_layout {
            return;
        }
        let was_blocked = self.block_update(true);

        if self.remember_settings_per_window_layout && self.active().initialized {
            if let Some(threshold) = now.checked_sub(self.double_click_interval) {
                let position = self.history.selected_position_before(threshold);
                let cursors = self.history.cursor_positions_before(threshold);
                let state = self.active_mut();
                if let Some(position) = position {
                    state.selected_position = position;
                }
                if let Some(cursors) = cursors {
                    state.cursor_positions = cursors;
                }
            }
        }

        let previous = self.active().clone();
        self.window_layout = layout;
        if !self.remember_settings_per_window_layout {
            self.active_mut().initialized = false;
        }
        if !self.active().initialized {
            self.initialize_active(Some(previous));
        }

        let state = self.active().clone();
        self.history
            .reset(now, state.selected_position, state.cursor_positions);

        tracing::debug!(?layout, initialized = state.initialized, "window layout changed");
        self.emit(ViewerChange::WindowLayoutChanged(layout));
        self.emit_active_state();
        self.block_update(was_blocked);
    }

    pub fn toggle_multi_window_layout(&mut self) {
        self.toggle_multi_window_layout_at(Instant::now());
    }

    /// Switches between a single and a multi window layout. Leaving a multi window
    /// layout goes to the single layout of the selected render window.
    pub fn toggle_multi_window_layout_at(&mut self, now: Instant) {
        let target = if self.window_layout.is_single_window() {
            self.multi_window_layout
        } else {
            self.active()
                .selected_window
                .map(WindowLayout::from_orientation)
                .unwrap_or(self.single_window_layout)
        };
        self.set_window_layout_at(target, now);
    }

    // ---- position ----

    pub fn selected_position(&self) -> Point3 {
        self.active().selected_position
    }

    pub fn set_selected_position(&mut self, position: Point3) {
        self.set_selected_position_at(position, Instant::now());
    }

    pub fn set_selected_position_at(&mut self, position: Point3, now: Instant) {
        if self.active().selected_position == position && self.active().initialized {
            return;
        }
        self.active_mut().selected_position = position;
        self.history.record_selected_position(now, position);
        self.emit(ViewerChange::SelectedPositionChanged(position));
    }

    /// Index of the selected slice, if there is a geometry.
    pub fn selected_slice(&self, orientation: Orientation) -> Option<usize> {
        let geometry = self.active_geometry()?;
        Some(geometry.slice_at(orientation, &self.active().selected_position))
    }

    /// Selects a slice, clamped to the geometry. Does nothing without a geometry.
    pub fn set_selected_slice(&mut self, orientation: Orientation, slice: usize) {
        self.set_selected_slice_at(orientation, slice, Instant::now());
    }

    pub fn set_selected_slice_at(&mut self, orientation: Orientation, slice: usize, now: Instant) {
        let Some(geometry) = self.active_geometry() else {
            return;
        };
        let position =
            geometry.position_on_slice(orientation, slice, &self.active().selected_position);
        self.set_selected_position_at(position, now);
    }

    /// Moves the selection `delta` slices. With `restart` the selection wraps
    /// around at either end, otherwise it stops there.
    pub fn move_slice(&mut self, orientation: Orientation, delta: isize, restart: bool) {
        let Some(current) = self.selected_slice(orientation) else {
            return;
        };
        let count = (self.max_slice(orientation) + 1) as isize;
        let target = current as isize + delta;
        let slice = if restart {
            target.rem_euclid(count)
        } else {
            target.clamp(0, count - 1)
        };
        self.set_selected_slice(orientation, slice as usize);
    }

    pub fn time_step(&self) -> usize {
        self.active().time_step
    }

    pub fn set_time_step(&mut self, time_step: usize) {
        let time_step = time_step.min(self.max_time_step());
        if time_step != self.active().time_step {
            self.active_mut().time_step = time_step;
            self.emit(ViewerChange::TimeStepChanged(time_step));
        }
    }

    pub fn selected_window(&self) -> Option<Orientation> {
        self.active().selected_window
    }

    pub fn set_selected_window(&mut self, window: Option<Orientation>) {
        self.active_mut().selected_window = window;
    }

    // ---- cursor positions ----

    pub fn cursor_position(&self, orientation: Orientation) -> Vector2 {
        self.active().cursor_positions[orientation.index()]
    }

    pub fn cursor_positions(&self) -> [Vector2; 3] {
        self.active().cursor_positions
    }

    /// Sets the cursor position of one render window. If cursor positions are
    /// bound, every window of the layout follows.
    pub fn set_cursor_position(&mut self, orientation: Orientation, position: Vector2) {
        let mut cursors = self.cursor_positions();
        if self.active().cursor_position_bound {
            for &other in self.window_layout.orientations() {
                cursors[other.index()] = position;
            }
        }
        cursors[orientation.index()] = position;
        self.set_cursor_positions(cursors);
    }

    pub fn set_cursor_positions(&mut self, cursors: [Vector2; 3]) {
        self.set_cursor_positions_at(cursors, Instant::now());
    }

    pub fn set_cursor_positions_at(&mut self, cursors: [Vector2; 3], now: Instant) {
        let previous = self.cursor_positions();
        self.active_mut().cursor_positions = cursors;
        self.history.record_cursor_positions(now, cursors);
        for orientation in Orientation::ALL {
            let index = orientation.index();
            if previous[index] != cursors[index] {
                self.emit(ViewerChange::CursorPositionChanged(orientation, cursors[index]));
            }
        }
    }

    pub fn cursor_position_binding(&self) -> bool {
        self.active().cursor_position_bound
    }

    pub fn set_cursor_position_binding(&mut self, bound: bool) {
        if bound != self.active().cursor_position_bound {
            self.active_mut().cursor_position_bound = bound;
            self.emit(ViewerChange::CursorPositionBindingChanged(bound));
        }
    }

    // ---- scale factors ----

    pub fn scale_factor(&self, orientation: Orientation) -> f64 {
        self.active().scale_factors[orientation.index()]
    }

    pub fn scale_factors(&self) -> [f64; 3] {
        self.active().scale_factors
    }

    /// Sets the scale factor of one render window. If scale factors are bound,
    /// every window of the layout follows.
    pub fn set_scale_factor(&mut self, orientation: Orientation, scale_factor: f64) {
        let mut factors = self.scale_factors();
        if self.active().scale_factor_bound {
            for &other in self.window_layout.orientations() {
                factors[other.index()] = scale_factor;
            }
        }
        factors[orientation.index()] = scale_factor;
        self.set_scale_factors(factors);
    }

    pub fn set_scale_factors(&mut self, factors: [f64; 3]) {
        let previous = self.scale_factors();
        self.active_mut().scale_factors = factors;
        for orientation in Orientation::ALL {
            let index = orientation.index();
            if previous[index] != factors[index] {
                self.emit(ViewerChange::ScaleFactorChanged(orientation, factors[index]));
            }
        }
    }

    pub fn scale_factor_binding(&self) -> bool {
        self.active().scale_factor_bound
    }

    /// Binding the scale factors aligns the layout's windows to the selected one.
    pub fn set_scale_factor_binding(&mut self, bound: bool) {
        if bound == self.active().scale_factor_bound {
            return;
        }
        self.active_mut().scale_factor_bound = bound;
        self.emit(ViewerChange::ScaleFactorBindingChanged(bound));
        if bound {
            if let Some(selected) = self.selected_window() {
                self.set_scale_factor(selected, self.scale_factor(selected));
            }
        }
    }

    /// Centres the cursors and zooms each render window so that the whole slice fits.
    pub fn fit_to_display(&mut self) {
        let bound = self.active().scale_factor_bound;
        let Some(factors) = self.fitted_scale_factors(bound) else {
            return;
        };
        let was_blocked = self.block_update(true);
        self.set_cursor_positions([CENTRE; 3]);
        self.set_scale_factors(factors);
        self.block_update(was_blocked);
    }

    pub fn history(&self) -> &PositionHistory {
        &self.history
    }
}
