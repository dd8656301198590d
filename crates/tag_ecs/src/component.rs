//! Component handles and their per-entity data stores.
//!
//! A component is a typed slot: a single capability bit plus a sparse
//! `EntityId → data` map. The handle returned by
//! [`Engine::new_component`](crate::Engine::new_component) is the only way
//! to address that slot's data afterwards, so callers are expected to
//! retain it (typically in a registry struct built once at startup).

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId};
use crate::tag::Tag;

/// An opaque component datum. Stored per entity; readers downcast to the
/// concrete type they stored.
pub type ComponentData = Arc<dyn Any + Send + Sync>;

/// Cleanup callback invoked when an entity loses a component. Runs inside
/// the removal critical section, before the datum is deleted.
pub type Destructor = Box<dyn Fn(&Entity, &ComponentData) + Send + Sync>;

/// A component's identifier: its position in `[0, 64)`, which is also the
/// position of its bit in every tag that references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(u32);

impl ComponentId {
    pub(crate) const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw id value.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) struct ComponentInner {
    id: ComponentId,
    tag: Tag,
    data: RwLock<HashMap<EntityId, ComponentData>>,
    destructor: RwLock<Option<Destructor>>,
}

/// A handle to a registered component slot.
///
/// Cheap to clone; all clones address the same slot. Owned by the
/// [`Engine`](crate::Engine) that created it and alive for the engine's
/// lifetime — there is no unregistration path.
#[derive(Clone)]
pub struct Component {
    inner: Arc<ComponentInner>,
}

impl Component {
    pub(crate) fn new(id: ComponentId) -> Self {
        Self {
            inner: Arc::new(ComponentInner {
                id,
                tag: Tag::from_bit(id.id()),
                data: RwLock::new(HashMap::new()),
                destructor: RwLock::new(None),
            }),
        }
    }

    /// This component's identifier.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.inner.id
    }

    /// This component's single-bit capability tag.
    #[must_use]
    pub fn tag(&self) -> Tag {
        self.inner.tag
    }

    /// Install a cleanup callback to run whenever an entity loses this
    /// component. The callback sees the entity and the datum before the
    /// datum is deleted. Replaces any previously installed destructor.
    pub fn set_destructor<F>(&self, destructor: F)
    where
        F: Fn(&Entity, &ComponentData) + Send + Sync + 'static,
    {
        *self.inner.destructor.write() = Some(Box::new(destructor));
    }

    /// Store a datum for `entity_id`, replacing any previous one.
    pub(crate) fn store(&self, entity_id: EntityId, value: ComponentData) {
        self.inner.data.write().insert(entity_id, value);
    }

    /// Delete the entity's datum, running the destructor first if one is
    /// installed and a datum exists. Both happen under the data store's
    /// exclusive lock, so a slow destructor stalls every reader and writer
    /// of this component.
    pub(crate) fn remove(&self, entity: &Entity) {
        let mut data = self.inner.data.write();
        if let Some(value) = data.get(&entity.id()) {
            if let Some(destructor) = self.inner.destructor.read().as_ref() {
                destructor(entity, value);
            }
        }
        data.remove(&entity.id());
    }

    /// The datum stored for `entity_id`, if any.
    pub(crate) fn data_for(&self, entity_id: EntityId) -> Option<ComponentData> {
        self.inner.data.read().get(&entity_id).cloned()
    }

    /// Drop an entity's datum without running the destructor or touching
    /// the entity's tag. Test-only: used to construct the inconsistent
    /// tag-without-data state that strict and lenient queries treat
    /// differently.
    #[cfg(test)]
    pub(crate) fn forget_datum(&self, entity_id: EntityId) {
        self.inner.data.write().remove(&entity_id);
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.inner.id)
            .field("entities", &self.inner.data.read().len())
            .finish()
    }
}
