//! Engine error types.

use crate::tag::MAX_COMPONENTS;

/// Errors that can occur while operating the engine.
///
/// Absence (an unknown entity id, a component without stored data, a query
/// with no matches) is not an error — those cases are expressed through
/// `Option` and empty collections. This type covers genuine registration
/// failures only.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The component-id space is exhausted: an engine supports at most
    /// [`MAX_COMPONENTS`] component registrations.
    #[error("component registry full: an engine supports at most {MAX_COMPONENTS} components")]
    ComponentOverflow,
}
