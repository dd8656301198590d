//! Entities: an identity plus an aggregate capability tag.
//!
//! An entity carries no data of its own. Its aggregate tag is the OR of
//! every attached component's bit and is the single source of truth for
//! "does this entity have component X" and for view membership.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::component::{Component, ComponentData};
use crate::engine::EngineInner;
use crate::tag::Tag;

/// A unique entity identifier.
///
/// Assigned by a monotonically increasing counter starting at 0, unique
/// for the lifetime of an [`Engine`](crate::Engine) instance and never
/// reused, even after disposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    pub(crate) const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw id value.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) struct EntityInner {
    id: EntityId,
    /// Aggregate tag flags. Atomic so that concurrent attach/detach of
    /// distinct components on the same entity cannot lose a bit update.
    tag: AtomicU64,
    /// Back-reference to the owning engine, used to notify views when the
    /// aggregate tag crosses a membership boundary.
    engine: Weak<EngineInner>,
}

/// A handle to a live entity.
///
/// Cheap to clone; all clones address the same entity. Created and owned
/// by exactly one [`Engine`](crate::Engine); entities never move between
/// engines.
#[derive(Clone)]
pub struct Entity {
    inner: Arc<EntityInner>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, engine: Weak<EngineInner>) -> Self {
        Self {
            inner: Arc::new(EntityInner {
                id,
                tag: AtomicU64::new(0),
                engine,
            }),
        }
    }

    /// This entity's identifier.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.inner.id
    }

    /// The aggregate tag: the OR of every attached component's bit.
    #[must_use]
    pub fn tag(&self) -> Tag {
        Tag::from_flags(self.inner.tag.load(Ordering::Acquire))
    }

    /// Whether this entity's aggregate tag matches `tag`.
    #[must_use]
    pub fn matches(&self, tag: Tag) -> bool {
        self.tag().matches(tag)
    }

    /// Whether this entity currently has `component` attached.
    #[must_use]
    pub fn has_component(&self, component: &Component) -> bool {
        self.tag().matches(component.tag())
    }

    /// Attach a component with the given datum, replacing any previous
    /// datum for that component.
    ///
    /// Stores the datum, ORs the component's bit into the aggregate tag,
    /// and appends this entity to every view whose membership boundary was
    /// crossed upward — synchronously, before this call returns. This is
    /// the only operation that ever grants view membership.
    ///
    /// Returns `&self` so attachments chain during bulk setup.
    pub fn add_component<T>(&self, component: &Component, value: T) -> &Self
    where
        T: Send + Sync + 'static,
    {
        component.store(self.inner.id, Arc::new(value));

        let bit = component.tag().flags();
        let before = Tag::from_flags(self.inner.tag.fetch_or(bit, Ordering::AcqRel));
        let after = Tag::from_flags(before.flags() | bit);
        trace!(entity = %self.inner.id, component = %component.id(), "component attached");

        if let Some(engine) = self.inner.engine.upgrade() {
            for view in engine.views_snapshot() {
                if !before.matches(view.tag()) && after.matches(view.tag()) {
                    view.add(&engine, self);
                }
            }
        }
        self
    }

    /// Detach a component.
    ///
    /// Runs the component's destructor (if one is installed and this
    /// entity holds a datum), deletes the datum, clears the component's
    /// bit from the aggregate tag, and removes this entity from every view
    /// whose membership boundary was crossed downward — synchronously,
    /// before this call returns. A no-op when the entity never had the
    /// component.
    pub fn remove_component(&self, component: &Component) -> &Self {
        component.remove(self);

        let bit = component.tag().flags();
        let before = Tag::from_flags(self.inner.tag.fetch_and(!bit, Ordering::AcqRel));
        let after = Tag::from_flags(before.flags() & !bit);
        trace!(entity = %self.inner.id, component = %component.id(), "component detached");

        if let Some(engine) = self.inner.engine.upgrade() {
            for view in engine.views_snapshot() {
                if before.matches(view.tag()) && !after.matches(view.tag()) {
                    view.remove(self.inner.id);
                }
            }
        }
        self
    }

    /// The opaque datum stored for `component`, or `None` if this entity
    /// never had one stored.
    #[must_use]
    pub fn get_component_data(&self, component: &Component) -> Option<ComponentData> {
        component.data_for(self.inner.id)
    }

    /// Typed read of the datum stored for `component`. `None` when no
    /// datum is stored or when it was stored as a different type.
    #[must_use]
    pub fn get_component<T>(&self, component: &Component) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.get_component_data(component)
            .and_then(|data| data.downcast::<T>().ok())
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Entity {}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.inner.id)
            .field("tag", &self.tag())
            .finish()
    }
}
