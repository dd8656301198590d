//! Query results: point-in-time snapshots of an entity and its data.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::component::{Component, ComponentData, ComponentId};
use crate::entity::Entity;

/// One matching entity together with the data of every component named in
/// the query tag.
///
/// A snapshot, not a live handle: each datum is taken at query time and
/// becomes stale as soon as the underlying store changes. An entry holding
/// `None` means the component was part of the query tag but the entity had
/// no datum stored for it — the lenient case
/// [`Engine::query`](crate::Engine::query) permits and the strict
/// [`Engine::get_entity_by_id`](crate::Engine::get_entity_by_id) rejects.
#[derive(Clone)]
pub struct QueryResult {
    entity: Entity,
    components: HashMap<ComponentId, Option<ComponentData>>,
}

impl QueryResult {
    pub(crate) fn new(
        entity: Entity,
        components: HashMap<ComponentId, Option<ComponentData>>,
    ) -> Self {
        Self { entity, components }
    }

    /// The matched entity.
    #[must_use]
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// The snapshotted datum for `component`. `None` when the component
    /// was not part of the query tag or had no stored datum.
    #[must_use]
    pub fn data(&self, component: &Component) -> Option<&ComponentData> {
        self.components
            .get(&component.id())
            .and_then(|entry| entry.as_ref())
    }

    /// Typed read of the snapshotted datum for `component`.
    #[must_use]
    pub fn data_as<T>(&self, component: &Component) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.data(component)
            .and_then(|data| Arc::clone(data).downcast::<T>().ok())
    }

    /// Whether the query tag named `component` at all (present even when
    /// the snapshotted datum is absent).
    #[must_use]
    pub fn queried(&self, component: &Component) -> bool {
        self.components.contains_key(&component.id())
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("entity", &self.entity.id())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Project a result set down to its entities.
#[must_use]
pub fn entities(results: &[QueryResult]) -> Vec<Entity> {
    results.iter().map(|result| result.entity.clone()).collect()
}
