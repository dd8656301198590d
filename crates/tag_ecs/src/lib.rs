//! # tag_ecs
//!
//! A capability-bitmask Entity-Component-System runtime.
//!
//! The engine stores arbitrary per-entity data under up to 64 component
//! slots, classifies entities by a 64-bit capability bitmask ([`Tag`]),
//! answers set-membership queries over that classification, and keeps
//! cached query results ([`View`]s) current as entities gain and lose
//! components.
//!
//! This crate provides:
//!
//! - [`Tag`] — a 64-bit capability set with an inversion flag; built with
//!   [`build_tag!`] from components and other tags.
//! - [`Component`] — a registered slot (one bit, a sparse per-entity data
//!   store, an optional destructor).
//! - [`Entity`] — an identity plus the aggregate tag of its components.
//! - [`Engine`] — the registry: allocates entities and components, runs
//!   [`query`](Engine::query)s, owns the views.
//! - [`View`] — a live query cache, maintained synchronously on every
//!   attach/detach that crosses its tag's membership boundary.
//!
//! ## Example
//!
//! ```
//! use tag_ecs::{Engine, build_tag};
//!
//! let engine = Engine::new();
//! let position = engine.new_component();
//! let health = engine.new_component();
//!
//! let alive = engine.create_view([build_tag!(&position, &health).into()]);
//!
//! let player = engine.new_entity();
//! player
//!     .add_component(&position, (0_i32, 0_i32))
//!     .add_component(&health, 10_u32);
//!
//! assert_eq!(alive.len(), 1);
//! assert_eq!(
//!     alive.get()[0].data_as::<u32>(&health).as_deref(),
//!     Some(&10)
//! );
//!
//! engine.dispose_entity(&player);
//! assert!(alive.is_empty());
//! ```
//!
//! ## Concurrency
//!
//! Synchronous shared-memory concurrency: one structural lock over the
//! registry, one lock per component data store, one lock per view cache,
//! and an atomic per-entity aggregate tag. All lock acquisitions block;
//! there is no cancellation. Attach components to a given entity from a
//! single logical thread of control when their relative order matters —
//! concurrent attaches are lossless but unordered.

pub mod component;
pub mod engine;
pub mod entity;
pub mod error;
pub mod query;
pub mod tag;
pub mod view;

pub use component::{Component, ComponentData, ComponentId, Destructor};
pub use engine::{Disposable, Engine};
pub use entity::{Entity, EntityId};
pub use error::EcsError;
pub use query::{QueryResult, entities};
pub use tag::{MAX_COMPONENTS, Tag, TagElement};
pub use view::View;
