//! Notification channel used to announce changes. [Injector](crate::injector::Injector)s expose an
//! [EventDispatcher] of [MappingEvent]s, which observers can subscribe to:
//!
//! ```
//! use keystone_di::event::MAPPING_CREATED;
//! use keystone_di::injector::Injector;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let injector = Injector::new().unwrap();
//! let created = Rc::new(Cell::new(0));
//!
//! let counter = created.clone();
//! injector
//!     .events()
//!     .add_event_listener(MAPPING_CREATED, move |_| counter.set(counter.get() + 1))
//!     .unwrap();
//!
//! injector.map::<u8>().unwrap();
//! assert_eq!(created.get(), 1);
//! ```

use crate::error::EventDispatcherError;
use crate::instance::TypeKey;
use crate::mapping::InjectionMapping;
use derive_more::Constructor;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Dispatched if an existing mapping is overridden without first unmapping it. In most cases,
/// overriding existing mappings is a sign of bugs; deliberate changes should unmap first.
pub const MAPPING_OVERRIDE: &str = "mappingOverride";

/// Dispatched when a new mapping is created.
pub const MAPPING_CREATED: &str = "mappingCreated";

/// Dispatched when a mapping is destroyed.
pub const MAPPING_DESTROYED: &str = "mappingDestroyed";

/// Dispatched when a module is registered with an application context.
pub const REGISTER_MODULE: &str = "registerModule";

/// Something which can be dispatched by an [EventDispatcher].
pub trait Event: 'static {
    /// Type used to select listeners.
    fn event_type(&self) -> &str;
}

/// Notification about a mapping change in an [Injector](crate::injector::Injector).
#[derive(Constructor, Clone, Debug)]
pub struct MappingEvent {
    event_type: &'static str,
    mapped_type: TypeKey,
    mapping: InjectionMapping,
}

impl MappingEvent {
    #[inline]
    pub fn mapped_type(&self) -> TypeKey {
        self.mapped_type
    }

    /// The affected mapping - the previous one for overrides.
    #[inline]
    pub fn mapping(&self) -> &InjectionMapping {
        &self.mapping
    }
}

impl Event for MappingEvent {
    #[inline]
    fn event_type(&self) -> &str {
        self.event_type
    }
}

/// Notification about a module being attached to an application context.
#[derive(Constructor, Clone, Debug, Eq, PartialEq)]
pub struct ContextModuleEvent {
    module_name: String,
}

impl ContextModuleEvent {
    #[inline]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }
}

impl Event for ContextModuleEvent {
    #[inline]
    fn event_type(&self) -> &str {
        REGISTER_MODULE
    }
}

/// Identifier of a registered listener.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ListenerId(u64);

pub type EventListener<E> = Rc<dyn Fn(&E)>;

/// Predicate which must pass for a listener to be called.
pub type EventGuard<E> = Rc<dyn Fn(&E) -> bool>;

struct ListenerEntry<E> {
    id: ListenerId,
    callback: EventListener<E>,
    once: Cell<bool>,
    guards: RefCell<Vec<EventGuard<E>>>,
}

impl<E> ListenerEntry<E> {
    fn accepts(&self, event: &E) -> bool {
        self.guards.borrow().iter().all(|guard| guard(event))
    }
}

/// Handle to a registered listener, allowing further configuration.
pub struct EventListenerHandle<E> {
    entry: Rc<ListenerEntry<E>>,
}

impl<E> EventListenerHandle<E> {
    #[inline]
    pub fn id(&self) -> ListenerId {
        self.entry.id
    }

    /// Removes the listener after the first invocation.
    pub fn once(&self) -> &Self {
        self.entry.once.set(true);
        self
    }

    /// Adds a guard - the listener is only called if all guards pass.
    pub fn with_guard<G: Fn(&E) -> bool + 'static>(&self, guard: G) -> &Self {
        self.entry.guards.borrow_mut().push(Rc::new(guard));
        self
    }
}

/// Simple synchronous publish/subscribe channel. Listeners are called in registration order.
pub struct EventDispatcher<E> {
    listeners: RefCell<FxHashMap<String, Vec<Rc<ListenerEntry<E>>>>>,
    next_id: Cell<u64>,
}

impl<E> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self {
            listeners: Default::default(),
            next_id: Cell::new(0),
        }
    }
}

impl<E: Event> EventDispatcher<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for given event type.
    pub fn add_event_listener<F: Fn(&E) + 'static>(
        &self,
        event_type: &str,
        callback: F,
    ) -> Result<EventListenerHandle<E>, EventDispatcherError> {
        if event_type.is_empty() {
            return Err(EventDispatcherError::InvalidEventType);
        }

        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let entry = Rc::new(ListenerEntry {
            id,
            callback: Rc::new(callback),
            once: Cell::new(false),
            guards: Default::default(),
        });

        self.listeners
            .borrow_mut()
            .entry(event_type.to_string())
            .or_default()
            .push(entry.clone());

        Ok(EventListenerHandle { entry })
    }

    /// Checks if there's any listener for given event type.
    pub fn has_event_listener(&self, event_type: &str) -> bool {
        self.listeners
            .borrow()
            .get(event_type)
            .map(|listeners| !listeners.is_empty())
            .unwrap_or(false)
    }

    /// Checks if given listener is registered for given event type.
    pub fn has_listener(&self, event_type: &str, id: ListenerId) -> bool {
        self.listeners
            .borrow()
            .get(event_type)
            .map(|listeners| listeners.iter().any(|listener| listener.id == id))
            .unwrap_or(false)
    }

    /// Removes given listener. Returns if the listener was registered.
    pub fn remove_event_listener(
        &self,
        event_type: &str,
        id: ListenerId,
    ) -> Result<bool, EventDispatcherError> {
        if event_type.is_empty() {
            return Err(EventDispatcherError::InvalidEventType);
        }

        Ok(self.remove_listener(event_type, id))
    }

    pub fn remove_all_event_listeners(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Number of all registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().values().map(Vec::len).sum()
    }

    /// Calls all listeners registered for the type of given event, whose guards pass.
    pub fn dispatch_event(&self, event: &E) -> Result<(), EventDispatcherError> {
        if event.event_type().is_empty() {
            return Err(EventDispatcherError::InvalidEventType);
        }

        self.notify(event);
        Ok(())
    }

    pub(crate) fn notify(&self, event: &E) {
        let event_type = event.event_type();

        // listeners can modify the dispatcher
        let listeners = self
            .listeners
            .borrow()
            .get(event_type)
            .map(|listeners| listeners.iter().cloned().collect_vec())
            .unwrap_or_default();

        for listener in listeners {
            if !listener.accepts(event) {
                continue;
            }

            if listener.once.get() && !self.remove_listener(event_type, listener.id) {
                // already removed by a previous listener
                continue;
            }

            (listener.callback)(event);
        }
    }

    fn remove_listener(&self, event_type: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(entries) = listeners.get_mut(event_type) else {
            return false;
        };

        let count = entries.len();
        entries.retain(|listener| listener.id != id);
        let removed = entries.len() != count;

        if entries.is_empty() {
            listeners.remove(event_type);
        }

        removed
    }
}
