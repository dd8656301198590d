//! Views: live, incrementally maintained query caches.
//!
//! A view pins a tag and keeps the set of matching entities current as
//! they gain and lose components. Reading a view is O(cache length) — no
//! rescan of the world — which is the whole point: hot per-frame reads
//! ("all renderable entities") should not pay
//! [`Engine::query`](crate::Engine::query)'s full-scan cost every tick.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::engine::EngineInner;
use crate::entity::{Entity, EntityId};
use crate::query::QueryResult;
use crate::tag::Tag;

pub(crate) struct ViewInner {
    tag: Tag,
    entries: RwLock<Vec<QueryResult>>,
}

/// A handle to a live query cache.
///
/// Cheap to clone; all clones read the same cache. Views are owned by the
/// [`Engine`](crate::Engine) that created them and live for the engine's
/// lifetime — there is no disposal path for a view.
#[derive(Clone)]
pub struct View {
    inner: Arc<ViewInner>,
}

impl View {
    pub(crate) fn new(tag: Tag, seed: Vec<QueryResult>) -> Self {
        Self {
            inner: Arc::new(ViewInner {
                tag,
                entries: RwLock::new(seed),
            }),
        }
    }

    /// The tag this view matches against.
    #[must_use]
    pub fn tag(&self) -> Tag {
        self.inner.tag
    }

    /// The current cached result set.
    ///
    /// Removal uses an unordered swap-remove, so iteration order is
    /// unspecified and may change after any removal. Do not rely on it.
    #[must_use]
    pub fn get(&self) -> Vec<QueryResult> {
        self.inner.entries.read().clone()
    }

    /// The number of entities currently in the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Whether the cache is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Project the cached result set down to its entities.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        crate::query::entities(&self.inner.entries.read())
    }

    /// Append an entity that just crossed into this view's tag.
    ///
    /// The cached entry is a strict snapshot; when the entity's data store
    /// is inconsistent with its tag (a datum missing for a tagged
    /// component) the append is skipped rather than caching a hole.
    pub(crate) fn add(&self, engine: &Arc<EngineInner>, entity: &Entity) {
        match engine.snapshot_strict(entity, self.inner.tag) {
            Some(result) => self.inner.entries.write().push(result),
            None => {
                trace!(entity = %entity.id(), "view append skipped: no strict snapshot");
            }
        }
    }

    /// Remove an entity that just crossed out of this view's tag.
    /// Swap-remove keeps this O(1) at the cost of reordering the cache.
    pub(crate) fn remove(&self, entity_id: EntityId) {
        let mut entries = self.inner.entries.write();
        if let Some(index) = entries
            .iter()
            .position(|result| result.entity().id() == entity_id)
        {
            entries.swap_remove(index);
        }
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("tag", &self.inner.tag)
            .field("entries", &self.inner.entries.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Engine, build_tag};

    #[test]
    fn test_view_seeds_from_existing_entities() {
        let engine = Engine::new();
        let marker = engine.new_component();
        let entity = engine.new_entity();
        entity.add_component(&marker, ());

        let view = engine.create_view([(&marker).into()]);
        assert_eq!(view.len(), 1);
        assert_eq!(view.entities(), vec![entity]);
    }

    #[test]
    fn test_membership_granted_synchronously_on_attach() {
        let engine = Engine::new();
        let position = engine.new_component();
        let health = engine.new_component();
        let alive = build_tag!(&position, &health);

        let view = engine.create_view([alive.into()]);
        let entity = engine.new_entity();

        entity.add_component(&position, (1_i32, 1_i32));
        assert!(view.is_empty(), "partial tag must not grant membership");

        entity.add_component(&health, 10_u32);
        assert_eq!(view.len(), 1, "must appear as soon as the attach returns");

        entity.remove_component(&health);
        assert!(view.is_empty(), "must vanish as soon as the detach returns");
    }

    #[test]
    fn test_view_entry_carries_component_data() {
        let engine = Engine::new();
        let position = engine.new_component();
        let view = engine.create_view([(&position).into()]);

        let entity = engine.new_entity();
        entity.add_component(&position, (3_i32, 4_i32));

        let entries = view.get();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].data_as::<(i32, i32)>(&position).as_deref(),
            Some(&(3, 4))
        );
        assert_eq!(entries[0].entity(), &entity);
    }

    #[test]
    fn test_reattach_does_not_duplicate_membership() {
        let engine = Engine::new();
        let marker = engine.new_component();
        let view = engine.create_view([(&marker).into()]);

        let entity = engine.new_entity();
        entity.add_component(&marker, 1_u8);
        // Same component again: no boundary crossing, no second entry.
        entity.add_component(&marker, 2_u8);

        assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_swap_remove_keeps_remaining_members() {
        let engine = Engine::new();
        let marker = engine.new_component();
        let view = engine.create_view([(&marker).into()]);

        let entities: Vec<_> = (0..4)
            .map(|n| {
                let entity = engine.new_entity();
                entity.add_component(&marker, n);
                entity
            })
            .collect();

        entities[1].remove_component(&marker);

        let mut remaining: Vec<_> = view
            .entities()
            .iter()
            .map(|entity| entity.id().id())
            .collect();
        remaining.sort_unstable();
        assert_eq!(
            remaining,
            vec![
                entities[0].id().id(),
                entities[2].id().id(),
                entities[3].id().id()
            ]
        );
    }
}
