//! Dungeon demo — a consumer of the `tag_ecs` engine.
//!
//! Shows the intended usage contract: register every component once at
//! startup, build named tags for the recurring queries, hold a view for
//! the hot per-frame path, run ad-hoc queries for infrequent lookups, and
//! dispose entities when world objects go away. All component handles are
//! threaded through an explicit [`World`] value — no globals.

use std::collections::HashMap;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tag_ecs::{Component, Engine, Tag, build_tag};

/// A grid position.
#[derive(Debug, Clone, Copy)]
struct Position {
    x: i32,
    y: i32,
}

/// A drawable glyph.
#[derive(Debug, Clone, Copy)]
struct Renderable {
    glyph: char,
}

/// Hit points.
#[derive(Debug, Clone, Copy)]
struct Health {
    current: u32,
    max: u32,
}

/// Marker data for the player entity.
#[derive(Debug, Clone, Copy)]
struct Player;

/// Marker data for hostile entities.
#[derive(Debug, Clone, Copy)]
struct Monster;

/// Everything the game systems need: the engine, the component handles,
/// and the named tags for recurring queries.
struct World {
    engine: Engine,
    player: Component,
    position: Component,
    renderable: Component,
    monster: Component,
    health: Component,
    tags: HashMap<&'static str, Tag>,
}

/// Register all components and named tags, then populate the dungeon.
fn initialize_world(spawn_points: &[(i32, i32)]) -> World {
    let engine = Engine::new();

    let player = engine.new_component();
    let position = engine.new_component();
    let renderable = engine.new_component();
    let monster = engine.new_component();
    let health = engine.new_component();

    renderable.set_destructor(|entity, _| {
        info!(entity = %entity.id(), "sprite released");
    });

    let mut tags = HashMap::new();
    tags.insert("players", build_tag!(&player, &position));
    tags.insert("renderables", build_tag!(&renderable, &position));
    tags.insert("monsters", build_tag!(&monster, &position, &health));

    let (px, py) = spawn_points[0];
    engine
        .new_entity()
        .add_component(&player, Player)
        .add_component(&renderable, Renderable { glyph: '@' })
        .add_component(&health, Health {
            current: 30,
            max: 30,
        })
        .add_component(&position, Position { x: px, y: py });

    for &(x, y) in &spawn_points[1..] {
        engine
            .new_entity()
            .add_component(&monster, Monster)
            .add_component(&renderable, Renderable { glyph: 's' })
            .add_component(&health, Health {
                current: 10,
                max: 10,
            })
            .add_component(&position, Position { x, y });
    }

    World {
        engine,
        player,
        position,
        renderable,
        monster,
        health,
        tags,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let world = initialize_world(&[(4, 4), (12, 3), (7, 9)]);
    info!(
        entities = world.engine.entity_count(),
        components = world.engine.component_count(),
        "world initialized"
    );

    // Hot path: the renderer reads this view every frame instead of
    // re-scanning the world.
    let renderables = world.engine.create_view([world.tags["renderables"].into()]);
    for entry in renderables.get() {
        let glyph = entry
            .data_as::<Renderable>(&world.renderable)
            .map(|r| r.glyph)
            .unwrap_or('?');
        let at = entry.data_as::<Position>(&world.position);
        info!(
            entity = %entry.entity().id(),
            glyph = %glyph,
            x = at.as_ref().map(|p| p.x),
            y = at.map(|p| p.y),
            "draw"
        );
    }

    // Ad-hoc lookup: the turn loop damages the nearest monster.
    let monsters = world.engine.query(world.tags["monsters"]);
    if let Some(victim) = monsters.first() {
        debug_assert!(victim.entity().has_component(&world.monster));
        let hp = victim
            .data_as::<Health>(&world.health)
            .map(|h| Health {
                current: h.current.saturating_sub(10),
                max: h.max,
            })
            .unwrap_or(Health { current: 0, max: 0 });
        info!(entity = %victim.entity().id(), hp = hp.current, "monster hit");

        if hp.current == 0 {
            // Death: the destructor logs the sprite release and the
            // renderables view shrinks before dispose_entity returns.
            world.engine.dispose_entity(victim);
        } else {
            victim.entity().add_component(&world.health, hp);
        }
    }

    info!(
        renderables = renderables.len(),
        entities = world.engine.entity_count(),
        "after turn"
    );

    // The player is still standing.
    let players = world.engine.query(world.tags["players"]);
    let alive = players
        .iter()
        .filter(|p| p.entity().has_component(&world.player))
        .filter_map(|p| p.entity().get_component::<Health>(&world.health))
        .map(|h| h.current)
        .next()
        .unwrap_or(0);
    info!(hp = alive, "player status");

    Ok(())
}
