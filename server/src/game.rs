//! The tick scheduler: one call to [`step`] advances the whole arena by
//! a single simulation frame.
//!
//! Phase order inside a tick: due bot respawns, bot decisions and
//! steering, movement and eating for every living creature, a collision
//! pass over the fully moved world, death resolution, corpse cleanup
//! and the periodic food prune. Victims are collected before any of
//! them is marked dead, so the outcome never depends on the order the
//! creature map happens to iterate in.

use crate::bot;
use crate::collision;
use crate::creature::Controller;
use crate::world::World;
use log::info;
use rand::Rng;
use std::time::Instant;

/// Things a tick did that the gateway has to relay or log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    CreatureDied { id: u32, score: u32 },
    BotSpawned { id: u32 },
}

#[derive(Debug, Default)]
pub struct TickReport {
    pub events: Vec<TickEvent>,
}

pub fn step(world: &mut World, now: Instant, rng: &mut impl Rng) -> TickReport {
    let mut report = TickReport::default();
    world.tick = world.tick.wrapping_add(1);

    // Replacement bots that have come due.
    let mut due = 0;
    world.bot_respawns.retain(|at| {
        if *at <= now {
            due += 1;
            false
        } else {
            true
        }
    });
    for _ in 0..due {
        let id = world.spawn_bot(now, rng);
        info!("Respawned bot {}", id);
        report.events.push(TickEvent::BotSpawned { id });
    }

    // Bots re-decide on their own clock but steer every tick.
    let mut decisions = Vec::new();
    for creature in world.creatures.values() {
        if !creature.alive {
            continue;
        }
        if let Controller::Bot(state) = &creature.controller {
            if state.decision_due(now, &world.config) {
                decisions.push((
                    creature.id,
                    bot::decide(creature, &world.creatures, world.food.items(), &world.config),
                ));
            }
        }
    }
    for (id, decision) in decisions {
        if let Some(creature) = world.creatures.get_mut(&id) {
            if let Controller::Bot(state) = &mut creature.controller {
                state.adopt(decision, now);
            }
        }
    }
    for creature in world.creatures.values_mut() {
        if creature.alive {
            bot::steer(creature, &world.config, now);
        }
    }

    // Movement and eating. A creature that cannot move at all is dealt
    // with like any other death below.
    let ids: Vec<u32> = world.creatures.keys().copied().collect();
    let mut victims: Vec<(u32, u32)> = Vec::new();
    for id in &ids {
        if let Some(creature) = world.creatures.get_mut(id) {
            if !creature.alive {
                continue;
            }
            if !creature.advance(now, &world.config) {
                victims.push((*id, 0));
                continue;
            }
            if let Some(head) = creature.head() {
                let eaten = collision::eaten_food(head, world.food.items(), &world.config);
                if !eaten.is_empty() {
                    for index in &eaten {
                        world.food.respawn_at(*index, &world.config, rng);
                    }
                    creature.grow(eaten.len());
                }
            }
        }
    }

    // Collision pass against the fully moved world.
    for (id, creature) in &world.creatures {
        if !creature.alive {
            continue;
        }
        if collision::check_death(creature, &world.creatures, now, &world.config).is_some() {
            victims.push((*id, creature.score()));
        }
    }

    // Resolve every death at once: scatter the corpse into food, queue
    // bot replacements and report the loss.
    for (id, score) in &victims {
        if let Some(creature) = world.creatures.get_mut(id) {
            creature.alive = false;
            info!("Creature {} ({}) died with score {}", id, creature.name, score);
            world
                .food
                .scatter_from_death(creature.segments.iter(), &creature.color, &world.config);
            if creature.is_bot() {
                world
                    .bot_respawns
                    .push(now + world.config.bot_respawn_delay());
            }
            world.corpses.push((*id, now));
            report.events.push(TickEvent::CreatureDied {
                id: *id,
                score: *score,
            });
        }
    }

    // Corpses linger briefly, then disappear entirely.
    let linger = world.config.corpse_linger();
    let creatures = &mut world.creatures;
    world.corpses.retain(|(id, died_at)| {
        if now.duration_since(*died_at) >= linger {
            creatures.remove(id);
            false
        } else {
            true
        }
    });

    world.food.maybe_prune(now, &world.config);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::world::World;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::Vec2;
    use std::time::Duration;

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(23)
    }

    fn bare_config() -> GameConfig {
        GameConfig {
            bot_count: 0,
            food_count: 0,
            ..GameConfig::default()
        }
    }

    /// Rebuilds a creature's body at an exact spot, ages it out of its
    /// grace window and pins any bot steering to its current heading.
    fn place(world: &mut World, id: u32, head: Vec2, heading: Vec2, now: Instant) {
        let initial_length = world.config.initial_length;
        let spacing = world.config.segment_spacing;
        if let Some(creature) = world.creatures.get_mut(&id) {
            creature.segments.clear();
            for i in 0..initial_length {
                creature
                    .segments
                    .push_back(head.sub(&heading.scale(spacing * i as f32)));
            }
            creature.heading = heading;
            creature.spawned_at = now - Duration::from_secs(10);
            creature.boost_clock = now;
            if let Controller::Bot(state) = &mut creature.controller {
                state.target = head.add(&heading.scale(1000.0));
                state.last_decision = now;
            }
        }
    }

    #[test]
    fn test_eating_grows_by_exactly_k() {
        let mut config = bare_config();
        config.death_food_ratio = 1.0;
        let mut rng = seeded_rng();
        let t0 = Instant::now();
        let mut world = World::new(config, t0, &mut rng);

        let id = world.spawn_player("eater", t0, &mut rng);
        place(&mut world, id, Vec2::new(1500.0, 1500.0), Vec2::new(1.0, 0.0), t0);

        // Three pickups inside the radius of the post-move head, placed
        // through the public scatter path.
        let drops = vec![
            Vec2::new(1505.0, 1500.0),
            Vec2::new(1510.0, 1500.0),
            Vec2::new(1495.0, 1500.0),
        ];
        let config = world.config.clone();
        world.food.scatter_from_death(&drops, "#FF6B6B", &config);

        let report = step(&mut world, t0 + Duration::from_millis(50), &mut rng);
        assert!(report.events.is_empty());
        assert_eq!(world.creatures[&id].len(), 18);
        // Eaten items were replaced in place, not removed.
        assert_eq!(world.food.len(), 3);
    }

    #[test]
    fn test_length_floor_holds_across_ticks() {
        let config = bare_config();
        let mut rng = seeded_rng();
        let t0 = Instant::now();
        let mut world = World::new(config, t0, &mut rng);

        let id = world.spawn_player("floored", t0, &mut rng);
        place(&mut world, id, Vec2::new(1500.0, 1500.0), Vec2::new(1.0, 0.0), t0);
        let config = world.config.clone();
        if let Some(creature) = world.creatures.get_mut(&id) {
            creature.shrink(100, &config);
            assert_eq!(creature.len(), config.min_length);
            creature.set_boosting(true, &config, t0);
        }

        for i in 1..=40 {
            step(&mut world, t0 + Duration::from_millis(50 * i), &mut rng);
            let creature = &world.creatures[&id];
            assert!(creature.alive);
            assert_eq!(creature.len(), config.min_length);
        }
    }

    #[test]
    fn test_head_on_collision_kills_both() {
        let config = bare_config();
        let mut rng = seeded_rng();
        let t0 = Instant::now();
        let mut world = World::new(config, t0, &mut rng);

        let a = world.spawn_player("left", t0, &mut rng);
        let b = world.spawn_player("right", t0, &mut rng);
        place(&mut world, a, Vec2::new(1500.0, 1500.0), Vec2::new(1.0, 0.0), t0);
        place(&mut world, b, Vec2::new(1505.9, 1500.0), Vec2::new(-1.0, 0.0), t0);

        let report = step(&mut world, t0 + Duration::from_millis(50), &mut rng);

        let mut dead: Vec<u32> = report
            .events
            .iter()
            .filter_map(|event| match event {
                TickEvent::CreatureDied { id, score } => {
                    assert_eq!(*score, 15);
                    Some(*id)
                }
                _ => None,
            })
            .collect();
        dead.sort();
        assert_eq!(dead, vec![a, b]);
        assert!(!world.creatures[&a].alive);
        assert!(!world.creatures[&b].alive);

        // Both corpses scattered: half of each 15-segment body.
        assert_eq!(world.food.len(), 16);

        // The dead never reach the next snapshot even while lingering.
        let (creatures, _) = world.build_snapshot();
        assert!(creatures.is_empty());

        // Past the linger window the corpses disappear entirely.
        step(&mut world, t0 + Duration::from_millis(200), &mut rng);
        assert!(world.creatures.is_empty());
        assert!(world.corpses.is_empty());
    }

    #[test]
    fn test_border_death_drops_interior_food_only() {
        let config = bare_config();
        let mut rng = seeded_rng();
        let t0 = Instant::now();
        let mut world = World::new(config, t0, &mut rng);

        let id = world.spawn_player("edge", t0, &mut rng);
        place(&mut world, id, Vec2::new(102.0, 1500.0), Vec2::new(-1.0, 0.0), t0);

        let report = step(&mut world, t0 + Duration::from_millis(50), &mut rng);
        assert_eq!(report.events, vec![TickEvent::CreatureDied { id, score: 15 }]);
        // Index 0 of the corpse sits on the border and is skipped; the
        // other seven strided segments drop.
        assert_eq!(world.food.len(), 7);
    }

    #[test]
    fn test_dead_bot_is_replaced_after_the_delay() {
        let mut config = bare_config();
        config.bot_count = 1;
        let mut rng = seeded_rng();
        let t0 = Instant::now();
        let mut world = World::new(config, t0, &mut rng);
        assert_eq!(world.living_bots(), 1);

        place(&mut world, 1, Vec2::new(102.0, 1500.0), Vec2::new(-1.0, 0.0), t0);

        let report = step(&mut world, t0 + Duration::from_millis(50), &mut rng);
        assert_eq!(
            report.events,
            vec![TickEvent::CreatureDied { id: 1, score: 15 }]
        );
        assert_eq!(world.living_bots(), 0);
        assert_eq!(world.bot_respawns.len(), 1);

        // Not due yet.
        let report = step(&mut world, t0 + Duration::from_millis(1000), &mut rng);
        assert!(report.events.is_empty());
        assert_eq!(world.living_bots(), 0);

        // Past the respawn delay a fresh bot arrives under a fresh id.
        let report = step(&mut world, t0 + Duration::from_millis(3100), &mut rng);
        assert_eq!(report.events, vec![TickEvent::BotSpawned { id: 2 }]);
        assert_eq!(world.living_bots(), 1);
        assert_eq!(world.creatures[&2].name, "Bot 2");
    }

    #[test]
    fn test_bot_adopts_a_decision_when_due() {
        let mut config = bare_config();
        config.bot_count = 1;
        let mut rng = seeded_rng();
        let t0 = Instant::now();
        let mut world = World::new(config, t0, &mut rng);

        // Before the decision interval the spawn target is untouched.
        step(&mut world, t0 + Duration::from_millis(50), &mut rng);
        let center = world.config.center();
        if let Controller::Bot(state) = &world.creatures[&1].controller {
            assert_ne!(state.target, center);
        }

        // Once due, an empty arena resolves to farming toward the center.
        step(&mut world, t0 + Duration::from_millis(250), &mut rng);
        match &world.creatures[&1].controller {
            Controller::Bot(state) => {
                assert_eq!(state.strategy, bot::Strategy::Farm);
                assert_eq!(state.target, center);
            }
            Controller::Player => panic!("bot lost its controller"),
        }
    }

    #[test]
    fn test_tick_counter_advances() {
        let config = bare_config();
        let mut rng = seeded_rng();
        let t0 = Instant::now();
        let mut world = World::new(config, t0, &mut rng);

        assert_eq!(world.tick, 0);
        step(&mut world, t0 + Duration::from_millis(50), &mut rng);
        step(&mut world, t0 + Duration::from_millis(100), &mut rng);
        assert_eq!(world.tick, 2);
    }
}
