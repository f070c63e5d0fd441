//! Generic keyed component registry with change notifications.
//!
//! [`ComponentRegistry`] stores one value per component id and raises a
//! [`RegistryEvent`] for every add, update and removal. Events go to
//! subscribed listeners synchronously and are also queued until drained,
//! unless the registry was built with [`ComponentRegistry::unqueued`].

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle returned by [`ComponentRegistry::subscribe`].
    pub struct ListenerId;
}

// ---------------------------------------------------------------------------
// RegistryEvent
// ---------------------------------------------------------------------------

/// Change notification raised by a [`ComponentRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegistryEvent {
    ComponentAdded(String),
    ComponentUpdated(String),
    ComponentRemoved(String),
}

impl RegistryEvent {
    /// Id of the component the event is about.
    pub fn id(&self) -> &str {
        match self {
            RegistryEvent::ComponentAdded(id)
            | RegistryEvent::ComponentUpdated(id)
            | RegistryEvent::ComponentRemoved(id) => id,
        }
    }

    /// Wire name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::ComponentAdded(_) => "COMPONENT_ADDED",
            RegistryEvent::ComponentUpdated(_) => "COMPONENT_UPDATED",
            RegistryEvent::ComponentRemoved(_) => "COMPONENT_REMOVED",
        }
    }
}

impl fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.id())
    }
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

type Listener = Box<dyn FnMut(&RegistryEvent)>;

/// Keyed store of component values, ordered by id.
pub struct ComponentRegistry<T> {
    components: BTreeMap<String, T>,
    listeners: SlotMap<ListenerId, Listener>,
    events: VecDeque<RegistryEvent>,
    queue_events: bool,
}

impl<T> Default for ComponentRegistry<T> {
    fn default() -> Self {
        Self {
            components: BTreeMap::new(),
            listeners: SlotMap::with_key(),
            events: VecDeque::new(),
            queue_events: true,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ComponentRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.components)
            .field("listeners", &self.listeners.len())
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl<T> ComponentRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that only notifies listeners. Nothing is queued, so
    /// [`drain_events`](Self::drain_events) always comes back empty.
    pub fn unqueued() -> Self {
        Self {
            queue_events: false,
            ..Self::default()
        }
    }

    /// Insert `value` under `id`, replacing any previous value. Raises
    /// `ComponentAdded` and returns the replaced value.
    pub fn add(&mut self, id: impl Into<String>, value: T) -> Option<T> {
        let id = id.into();
        let previous = self.components.insert(id.clone(), value);
        self.emit(RegistryEvent::ComponentAdded(id));
        previous
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.components.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.components.get_mut(id)
    }

    /// Replace the value under `id` and raise `ComponentUpdated`.
    ///
    /// An unknown id behaves like [`add`](Self::add) and raises
    /// `ComponentAdded`. Returns whether the id was already present.
    pub fn update(&mut self, id: impl Into<String>, value: T) -> bool {
        let id = id.into();
        match self.components.get_mut(&id) {
            Some(slot) => {
                *slot = value;
                self.emit(RegistryEvent::ComponentUpdated(id));
                true
            }
            None => {
                self.add(id, value);
                false
            }
        }
    }

    /// Remove `id`. Returns `false` (and raises nothing) for an unknown id.
    pub fn remove(&mut self, id: &str) -> bool {
        self.take(id).is_some()
    }

    /// Remove `id` and return its value, raising `ComponentRemoved`.
    pub fn take(&mut self, id: &str) -> Option<T> {
        let value = self.components.remove(id)?;
        self.emit(RegistryEvent::ComponentRemoved(id.to_owned()));
        Some(value)
    }

    /// Remove every entry, raising `ComponentRemoved` for each in id order.
    pub fn clear(&mut self) {
        let components = std::mem::take(&mut self.components);
        for id in components.into_keys() {
            self.emit(RegistryEvent::ComponentRemoved(id));
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.components.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.components.iter().map(|(id, value)| (id.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Call `listener` for every future event.
    pub fn subscribe(&mut self, listener: impl FnMut(&RegistryEvent) + 'static) -> ListenerId {
        self.listeners.insert(Box::new(listener))
    }

    /// Stop notifying `listener`. Returns whether it was subscribed.
    pub fn unsubscribe(&mut self, listener: ListenerId) -> bool {
        self.listeners.remove(listener).is_some()
    }

    /// Take every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        self.events.drain(..).collect()
    }

    /// Number of queued events.
    pub fn pending_count(&self) -> usize {
        self.events.len()
    }

    fn emit(&mut self, event: RegistryEvent) {
        tracing::trace!(event = %event, "registry event");
        for listener in self.listeners.values_mut() {
            listener(&event);
        }
        if self.queue_events {
            self.events.push_back(event);
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
