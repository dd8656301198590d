//! The engine: registry of entities, components, and views.
//!
//! The engine owns the ordered entity list, the id→entity map, the
//! component list, and the view list, all behind one structural
//! reader-writer lock. Identifiers come from monotonic counters and are
//! never reused. Apart from entity disposal nothing is reclaimed
//! individually — dropping the engine releases everything at once.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::component::{Component, ComponentId};
use crate::entity::{Entity, EntityId};
use crate::error::EcsError;
use crate::query::QueryResult;
use crate::tag::{MAX_COMPONENTS, Tag, TagElement};
use crate::view::View;

/// Everything guarded by the engine-structural lock.
#[derive(Default)]
struct Registry {
    /// Ordered entity list, scanned by [`Engine::query`].
    entities: Vec<Entity>,
    /// Id-keyed lookup for [`Engine::get_entity_by_id`].
    by_id: HashMap<EntityId, Entity>,
    /// Registered components, in registration (= bit) order.
    components: Vec<Component>,
    /// Live views, notified on every membership boundary crossing.
    views: Vec<View>,
}

pub(crate) struct EngineInner {
    next_entity_id: AtomicU32,
    registry: RwLock<Registry>,
}

impl EngineInner {
    /// Clone the current view list out of the structural lock.
    ///
    /// Attach/detach notification iterates this snapshot instead of
    /// holding the structural lock, so notification never waits on one
    /// lock while holding another.
    pub(crate) fn views_snapshot(&self) -> Vec<View> {
        self.registry.read().views.clone()
    }

    /// Strict snapshot: the entity's datum for every component named in
    /// `tag`, or `None` if the entity does not match the tag or any named
    /// component has no stored datum.
    pub(crate) fn snapshot_strict(&self, entity: &Entity, tag: Tag) -> Option<QueryResult> {
        if !entity.matches(tag) {
            return None;
        }

        let components = self.registry.read().components.clone();
        let mut snapshot = HashMap::new();
        for component in &components {
            if tag.matches(component.tag()) {
                // One missing datum voids the whole result.
                let data = entity.get_component_data(component)?;
                snapshot.insert(component.id(), Some(data));
            }
        }
        Some(QueryResult::new(entity.clone(), snapshot))
    }
}

/// The entity-component registry and query surface.
///
/// Cheap to clone; all clones address the same world. Typical use:
/// register all components once at startup, build named [`Tag`]s for
/// recurring queries, create [`View`]s for hot read paths, run ad-hoc
/// [`query`](Engine::query)s for infrequent lookups, and
/// [`dispose_entity`](Engine::dispose_entity) when a world object goes
/// away.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EngineInner {
                next_entity_id: AtomicU32::new(0),
                registry: RwLock::new(Registry::default()),
            }),
        }
    }

    /// Allocate a new entity with an empty tag.
    ///
    /// Ids are dense and strictly increasing; concurrent callers never
    /// observe a duplicate.
    pub fn new_entity(&self) -> Entity {
        let id = EntityId::new(self.inner.next_entity_id.fetch_add(1, Ordering::Relaxed));
        let entity = Entity::new(id, Arc::downgrade(&self.inner));

        let mut registry = self.inner.registry.write();
        registry.entities.push(entity.clone());
        registry.by_id.insert(id, entity.clone());
        drop(registry);

        debug!(entity = %id, "entity allocated");
        entity
    }

    /// Register a new component slot.
    ///
    /// # Panics
    ///
    /// Panics when [`MAX_COMPONENTS`] components are already registered.
    /// Exhausting the component-id space is API misuse, not a runtime
    /// condition; callers preferring a `Result` use
    /// [`try_new_component`](Engine::try_new_component).
    #[must_use]
    pub fn new_component(&self) -> Component {
        match self.try_new_component() {
            Ok(component) => component,
            Err(err) => panic!("{err}"),
        }
    }

    /// Register a new component slot, failing softly on overflow.
    pub fn try_new_component(&self) -> Result<Component, EcsError> {
        let mut registry = self.inner.registry.write();
        let index = registry.components.len();
        if index >= MAX_COMPONENTS {
            return Err(EcsError::ComponentOverflow);
        }

        let component = Component::new(ComponentId::new(index as u32));
        registry.components.push(component.clone());
        drop(registry);

        debug!(component = %component.id(), "component registered");
        Ok(component)
    }

    /// Look up an entity by id and fetch the data of every component in
    /// the tag built from `elements`.
    ///
    /// Strict, all-or-nothing: returns `None` when the id is unknown, the
    /// entity does not satisfy the tag, or any named component has no
    /// stored datum for it. Contrast with the lenient
    /// [`query`](Engine::query).
    #[must_use]
    pub fn get_entity_by_id<I>(&self, id: EntityId, elements: I) -> Option<QueryResult>
    where
        I: IntoIterator<Item = TagElement>,
    {
        let entity = self.inner.registry.read().by_id.get(&id).cloned()?;
        let tag = Tag::from_elements(elements);
        self.inner.snapshot_strict(&entity, tag)
    }

    /// Scan the full entity list and return a snapshot for every entity
    /// matching `tag`.
    ///
    /// Lenient, best-effort per component: an entity that matches the tag
    /// is included even when some named component has no stored datum for
    /// it — that entry is simply absent in the result. O(entities ×
    /// components) on every call; for hot paths prefer a
    /// [`View`](Engine::create_view).
    #[must_use]
    pub fn query(&self, tag: Tag) -> Vec<QueryResult> {
        let registry = self.inner.registry.read();
        let mut matches = Vec::new();
        for entity in &registry.entities {
            if !entity.matches(tag) {
                continue;
            }
            let mut snapshot = HashMap::new();
            for component in &registry.components {
                if tag.matches(component.tag()) {
                    snapshot.insert(component.id(), entity.get_component_data(component));
                }
            }
            matches.push(QueryResult::new(entity.clone(), snapshot));
        }
        matches
    }

    /// Create a live view over the tag built from `elements`.
    ///
    /// The cache is seeded with a [`query`](Engine::query) and thereafter
    /// maintained synchronously by every attach/detach that crosses the
    /// tag's membership boundary. The view lives as long as the engine.
    pub fn create_view<I>(&self, elements: I) -> View
    where
        I: IntoIterator<Item = TagElement>,
    {
        let tag = Tag::from_elements(elements);
        let seed = self.query(tag);
        let view = View::new(tag, seed);

        self.inner.registry.write().views.push(view.clone());
        debug!(tag = ?tag, entries = view.len(), "view created");
        view
    }

    /// Dispose an entity: detach every component it holds (firing
    /// destructors and updating views), then remove it from the id map
    /// and the ordered entity list.
    ///
    /// After disposal the entity is invisible to fresh queries and id
    /// lookups. Previously taken handles and snapshots stay valid but
    /// address a hollowed-out entity. The id is never reassigned.
    pub fn dispose_entity<D>(&self, disposable: D)
    where
        D: Into<Disposable>,
    {
        let entity = disposable.into().into_entity();

        let components = self.inner.registry.read().components.clone();
        for component in &components {
            if entity.has_component(component) {
                entity.remove_component(component);
            }
        }

        let mut registry = self.inner.registry.write();
        registry.by_id.remove(&entity.id());
        registry.entities.retain(|other| other.id() != entity.id());
        drop(registry);

        debug!(entity = %entity.id(), "entity disposed");
    }

    /// Dispose several entities in sequence.
    pub fn dispose_entities<I, D>(&self, disposables: I)
    where
        I: IntoIterator<Item = D>,
        D: Into<Disposable>,
    {
        for disposable in disposables {
            self.dispose_entity(disposable);
        }
    }

    /// The number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.inner.registry.read().entities.len()
    }

    /// The number of registered components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.inner.registry.read().components.len()
    }
}

/// Input to [`Engine::dispose_entity`]: an entity handle, or a query
/// result wrapping one.
///
/// A closed union — there is no "invalid input" case to reject at
/// runtime.
pub enum Disposable {
    /// Dispose the entity itself.
    Entity(Entity),
    /// Dispose the entity wrapped by a query result.
    Result(QueryResult),
}

impl Disposable {
    fn into_entity(self) -> Entity {
        match self {
            Disposable::Entity(entity) => entity,
            Disposable::Result(result) => result.entity().clone(),
        }
    }
}

impl From<Entity> for Disposable {
    fn from(entity: Entity) -> Self {
        Disposable::Entity(entity)
    }
}

impl From<&Entity> for Disposable {
    fn from(entity: &Entity) -> Self {
        Disposable::Entity(entity.clone())
    }
}

impl From<QueryResult> for Disposable {
    fn from(result: QueryResult) -> Self {
        Disposable::Result(result)
    }
}

impl From<&QueryResult> for Disposable {
    fn from(result: &QueryResult) -> Self {
        Disposable::Result(result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_tag;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_entity_ids_are_dense_and_increasing() {
        let engine = Engine::new();
        for expected in 0..5 {
            assert_eq!(engine.new_entity().id().id(), expected);
        }
        assert_eq!(engine.entity_count(), 5);
    }

    #[test]
    fn test_concurrent_entity_allocation_yields_contiguous_ids() {
        let engine = Engine::new();
        let mut ids: Vec<u32> = thread::scope(|scope| {
            let handles: Vec<_> = (0..64)
                .map(|_| {
                    let engine = engine.clone();
                    scope.spawn(move || engine.new_entity().id().id())
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        ids.sort_unstable();
        let expected: Vec<u32> = (0..64).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_component_limit_is_sixty_four() {
        let engine = Engine::new();
        let components: Vec<_> = (0..MAX_COMPONENTS)
            .map(|_| engine.new_component())
            .collect();

        // The 64th registration succeeds and occupies bit 63.
        assert_eq!(components[63].tag().flags(), 1 << 63);
        assert_eq!(
            engine.try_new_component(),
            Err(EcsError::ComponentOverflow)
        );
    }

    #[test]
    #[should_panic(expected = "component registry full")]
    fn test_sixty_fifth_registration_panics() {
        let engine = Engine::new();
        for _ in 0..MAX_COMPONENTS {
            let _ = engine.new_component();
        }
        let _ = engine.new_component();
    }

    #[test]
    fn test_get_entity_by_id_unknown_is_none() {
        let engine = Engine::new();
        assert!(engine.get_entity_by_id(EntityId::new(7), []).is_none());
    }

    #[test]
    fn test_get_entity_by_id_with_empty_tag_finds_bare_entity() {
        let engine = Engine::new();
        let entity = engine.new_entity();
        let result = engine.get_entity_by_id(entity.id(), []).unwrap();
        assert_eq!(result.entity(), &entity);
    }

    #[test]
    fn test_strict_lookup_and_lenient_query_diverge() {
        let engine = Engine::new();
        let a = engine.new_component();
        let b = engine.new_component();

        let entity = engine.new_entity();
        entity.add_component(&a, 1_u32).add_component(&b, 2_u32);
        // Force the inconsistent state the policy split is about: the tag
        // bit for `b` stays set but its datum is gone.
        b.forget_datum(entity.id());

        // Strict single-entity lookup: all-or-nothing.
        assert!(
            engine
                .get_entity_by_id(entity.id(), [(&a).into(), (&b).into()])
                .is_none()
        );

        // Lenient bulk query: included, with an absent entry for `b`.
        let results = engine.query(build_tag!(&a, &b));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].data_as::<u32>(&a).as_deref(), Some(&1));
        assert!(results[0].queried(&b));
        assert!(results[0].data(&b).is_none());
    }

    #[test]
    fn test_query_with_inverse_tag() {
        let engine = Engine::new();
        let position = engine.new_component();
        let frozen = engine.new_component();

        let moving = engine.new_entity();
        moving.add_component(&position, (0_i32, 0_i32));

        let stuck = engine.new_entity();
        stuck
            .add_component(&position, (1_i32, 1_i32))
            .add_component(&frozen, ());

        // "Does NOT have frozen" matches exactly the moving entity.
        let results = engine.query(frozen.tag().inverse());
        let ids: Vec<_> = results.iter().map(|r| r.entity().id()).collect();
        assert_eq!(ids, vec![moving.id()]);
    }

    #[test]
    fn test_dispose_fires_one_destructor_per_attached_component() {
        let engine = Engine::new();
        let components: Vec<_> = (0..3).map(|_| engine.new_component()).collect();

        let fired = Arc::new(AtomicUsize::new(0));
        for component in &components {
            let fired = Arc::clone(&fired);
            component.set_destructor(move |_, _| {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        let entity = engine.new_entity();
        for (n, component) in components.iter().enumerate() {
            entity.add_component(component, n);
        }

        let id = entity.id();
        engine.dispose_entity(&entity);

        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert!(engine.get_entity_by_id(id, []).is_none());
        assert_eq!(engine.entity_count(), 0);
    }

    #[test]
    fn test_disposed_entity_invisible_to_fresh_queries() {
        let engine = Engine::new();
        let marker = engine.new_component();

        let keep = engine.new_entity();
        keep.add_component(&marker, ());
        let drop_me = engine.new_entity();
        drop_me.add_component(&marker, ());

        engine.dispose_entity(&drop_me);

        let results = engine.query(build_tag!(&marker));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity(), &keep);
    }

    #[test]
    fn test_dispose_accepts_query_results() {
        let engine = Engine::new();
        let marker = engine.new_component();
        let entity = engine.new_entity();
        entity.add_component(&marker, ());

        let results = engine.query(build_tag!(&marker));
        engine.dispose_entities(results);

        assert_eq!(engine.entity_count(), 0);
        assert!(engine.get_entity_by_id(entity.id(), []).is_none());
    }

    #[test]
    fn test_entity_ids_not_reused_after_disposal() {
        let engine = Engine::new();
        let first = engine.new_entity();
        let first_id = first.id().id();
        engine.dispose_entity(&first);

        let second = engine.new_entity();
        assert_eq!(second.id().id(), first_id + 1);
    }

    #[test]
    fn test_alive_view_scenario() {
        let engine = Engine::new();
        let position = engine.new_component();
        let health = engine.new_component();
        let alive = build_tag!(&position, &health);

        let view = engine.create_view([alive.into()]);

        let e1 = engine.new_entity();
        e1.add_component(&position, (1_i32, 1_i32));
        assert_eq!(view.len(), 0);

        e1.add_component(&health, (10_u32, 10_u32));
        assert_eq!(view.len(), 1);

        e1.remove_component(&health);
        assert_eq!(view.len(), 0);
    }

    #[test]
    fn test_dispose_removes_entity_from_views() {
        let engine = Engine::new();
        let marker = engine.new_component();
        let view = engine.create_view([(&marker).into()]);

        let entity = engine.new_entity();
        entity.add_component(&marker, ());
        assert_eq!(view.len(), 1);

        engine.dispose_entity(&entity);
        assert_eq!(view.len(), 0);
    }
}
