use crate::viewer::WindowId;

use std::cell::{Cell, RefCell};

/// What kind of event observer was registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObserverRole {
    /// Pans, zooms and moves the slices of the drag and drop display.
    DisplayInteractor,
    Tool,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug)]
struct Observer {
    id: ObserverId,
    role: ObserverRole,
    event_config: String,
    /// Config to go back to once an override is lifted.
    saved_config: Option<String>,
}

/// Interaction state owned by the host application and handed to the
/// components that need it: which render window has the focus, and the
/// registered event observers tagged by role.
#[derive(Debug, Default)]
pub struct InteractionContext {
    focused_window: Cell<Option<WindowId>>,
    observers: RefCell<Vec<Observer>>,
    next_observer: Cell<u64>,
}

impl InteractionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.focused_window.get()
    }

    pub fn set_focused_window(&self, window: Option<WindowId>) {
        self.focused_window.set(window);
    }

    pub fn register_observer(
        &self,
        role: ObserverRole,
        event_config: impl Into<String>,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer.get());
        self.next_observer.set(id.0 + 1);
        self.observers.borrow_mut().push(Observer {
            id,
            role,
            event_config: event_config.into(),
            saved_config: None,
        });
        id
    }

    pub fn deregister_observer(&self, id: ObserverId) {
        self.observers.borrow_mut().retain(|observer| observer.id != id);
    }

    pub fn is_display_interactor(&self, id: ObserverId) -> bool {
        self.observers
            .borrow()
            .iter()
            .any(|observer| observer.id == id && observer.role == ObserverRole::DisplayInteractor)
    }

    pub fn event_config(&self, id: ObserverId) -> Option<String> {
        self.observers
            .borrow()
            .iter()
            .find(|observer| observer.id == id)
            .map(|observer| observer.event_config.clone())
    }

    /// Switches every display interactor to `event_config`, e.g. while a tool
    /// that needs the mouse buttons is active. Returns how many were switched.
    pub fn override_display_interactor_config(&self, event_config: &str) -> usize {
        let mut switched = 0;
        for observer in self.observers.borrow_mut().iter_mut() {
            if observer.role != ObserverRole::DisplayInteractor {
                continue;
            }
            if observer.saved_config.is_none() {
                observer.saved_config = Some(observer.event_config.clone());
            }
            observer.event_config = event_config.to_owned();
            switched += 1;
        }
        switched
    }

    /// Puts back the configs replaced by [`Self::override_display_interactor_config`].
    pub fn restore_display_interactor_configs(&self) {
        for observer in self.observers.borrow_mut().iter_mut() {
            if let Some(saved) = observer.saved_config.take() {
                observer.event_config = saved;
            }
        }
    }
}
