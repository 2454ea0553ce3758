//! Boundary, body and food proximity checks. Pure queries, no mutation.

use crate::config::{GameConfig, SelfCollisionPolicy};
use crate::creature::Creature;
use crate::food::Food;
use shared::Vec2;
use std::collections::HashMap;
use std::time::Instant;

/// Why a creature died this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Border,
    Creature { other: u32 },
}

/// True when a head sits on or past the lethal border inset.
pub fn hits_border(point: Vec2, config: &GameConfig) -> bool {
    point.x <= config.map_border
        || point.x >= config.map_width - config.map_border
        || point.y <= config.map_border
        || point.y >= config.map_height - config.map_border
}

/// Evaluates every lethal condition for the subject's head against a
/// consistent view of the world.
///
/// A subject inside its grace window cannot die here at all. Bodies are
/// matched by id, so the subject never trips over its own trail by
/// accident; the trail participates only under the after-segment
/// policy, whose offset must clear the neck.
pub fn check_death(
    subject: &Creature,
    creatures: &HashMap<u32, Creature>,
    now: Instant,
    config: &GameConfig,
) -> Option<DeathCause> {
    let head = subject.head()?;

    if subject.in_grace(now, config) {
        return None;
    }

    if hits_border(head, config) {
        return Some(DeathCause::Border);
    }

    for (id, other) in creatures {
        if !other.alive {
            continue;
        }

        if *id == subject.id {
            if let SelfCollisionPolicy::AfterSegment(offset) = config.self_collision {
                if hits_body(head, other.segments.iter().skip(offset), config) {
                    return Some(DeathCause::Creature { other: *id });
                }
            }
            continue;
        }

        if hits_body(head, other.segments.iter(), config) {
            return Some(DeathCause::Creature { other: *id });
        }
    }

    None
}

fn hits_body<'a, I>(head: Vec2, segments: I, config: &GameConfig) -> bool
where
    I: Iterator<Item = &'a Vec2>,
{
    for segment in segments {
        if head.distance(segment) < config.collision_threshold {
            return true;
        }
    }
    false
}

/// Indices of every food item within pickup range of a head. Several
/// pickups can land in the same tick.
pub fn eaten_food(head: Vec2, foods: &[Food], config: &GameConfig) -> Vec<usize> {
    foods
        .iter()
        .enumerate()
        .filter(|(_, food)| head.distance(&food.position) < config.food_pickup_radius)
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creature::Controller;
    use std::time::Duration;

    fn aged_creature(id: u32, head: Vec2, config: &GameConfig) -> Creature {
        let mut creature = Creature::new(
            id,
            format!("worm-{}", id),
            head,
            Vec2::new(1.0, 0.0),
            "#FF6B6B".to_string(),
            Controller::Player,
            config,
            Instant::now(),
        );
        // Well past the grace window.
        creature.spawned_at = Instant::now() - Duration::from_secs(10);
        creature
    }

    fn world_of(creatures: Vec<Creature>) -> HashMap<u32, Creature> {
        creatures.into_iter().map(|c| (c.id, c)).collect()
    }

    #[test]
    fn test_border_exact_inset_is_lethal() {
        let config = GameConfig::default();
        assert!(hits_border(Vec2::new(100.0, 1500.0), &config));
        assert!(hits_border(Vec2::new(2900.0, 1500.0), &config));
        assert!(hits_border(Vec2::new(1500.0, 100.0), &config));
        assert!(hits_border(Vec2::new(1500.0, 2900.0), &config));

        assert!(!hits_border(Vec2::new(100.1, 1500.0), &config));
        assert!(!hits_border(Vec2::new(2899.9, 2899.9), &config));
    }

    #[test]
    fn test_border_death_reported() {
        let config = GameConfig::default();
        let subject = aged_creature(1, Vec2::new(100.0, 1500.0), &config);
        let world = world_of(vec![subject.clone()]);

        assert_eq!(
            check_death(&subject, &world, Instant::now(), &config),
            Some(DeathCause::Border)
        );
    }

    #[test]
    fn test_grace_window_suppresses_all_deaths() {
        let config = GameConfig::default();
        let mut subject = aged_creature(1, Vec2::new(100.0, 1500.0), &config);
        subject.spawned_at = Instant::now();
        let world = world_of(vec![subject.clone()]);

        // Head on the lethal inset, but the creature just spawned.
        assert_eq!(check_death(&subject, &world, Instant::now(), &config), None);
    }

    #[test]
    fn test_creature_collision_by_id() {
        let config = GameConfig::default();
        let subject = aged_creature(1, Vec2::new(1500.0, 1500.0), &config);
        // The other body trails straight through the subject's head.
        let other = aged_creature(2, Vec2::new(1503.0, 1500.0), &config);
        let world = world_of(vec![subject.clone(), other]);

        assert_eq!(
            check_death(&subject, &world, Instant::now(), &config),
            Some(DeathCause::Creature { other: 2 })
        );
    }

    #[test]
    fn test_own_body_ignored_when_disabled() {
        let config = GameConfig::default();
        let mut subject = aged_creature(1, Vec2::new(1500.0, 1500.0), &config);
        // Fold the whole body onto the head; only identity keeps this alive.
        for segment in subject.segments.iter_mut() {
            *segment = Vec2::new(1500.0, 1500.0);
        }
        let world = world_of(vec![subject.clone()]);

        assert_eq!(check_death(&subject, &world, Instant::now(), &config), None);
    }

    #[test]
    fn test_own_body_lethal_after_offset() {
        let mut config = GameConfig::default();
        config.self_collision = SelfCollisionPolicy::AfterSegment(3);

        let mut subject = aged_creature(1, Vec2::new(1500.0, 1500.0), &config);
        for segment in subject.segments.iter_mut() {
            *segment = Vec2::new(1500.0, 1500.0);
        }
        let world = world_of(vec![subject.clone()]);

        assert_eq!(
            check_death(&subject, &world, Instant::now(), &config),
            Some(DeathCause::Creature { other: 1 })
        );
    }

    #[test]
    fn test_after_segment_offset_clears_the_neck() {
        let mut config = GameConfig::default();
        config.self_collision = SelfCollisionPolicy::AfterSegment(3);

        // A straight body never reaches back to its own head once the
        // first few segments are excluded.
        let subject = aged_creature(1, Vec2::new(1500.0, 1500.0), &config);
        let world = world_of(vec![subject.clone()]);

        assert_eq!(check_death(&subject, &world, Instant::now(), &config), None);
    }

    #[test]
    fn test_dead_bodies_are_not_lethal() {
        let config = GameConfig::default();
        let subject = aged_creature(1, Vec2::new(1500.0, 1500.0), &config);
        let mut other = aged_creature(2, Vec2::new(1503.0, 1500.0), &config);
        other.alive = false;
        let world = world_of(vec![subject.clone(), other]);

        assert_eq!(check_death(&subject, &world, Instant::now(), &config), None);
    }

    #[test]
    fn test_head_on_pair_both_evaluated_dead() {
        let config = GameConfig::default();
        let a = aged_creature(1, Vec2::new(1500.0, 1500.0), &config);
        let mut b = aged_creature(2, Vec2::new(1505.0, 1500.0), &config);
        // Face each other so the bodies overlap around both heads.
        b.heading = Vec2::new(-1.0, 0.0);
        for (i, segment) in b.segments.iter_mut().enumerate() {
            *segment = Vec2::new(1505.0 + 10.0 * i as f32, 1500.0);
        }
        let world = world_of(vec![a.clone(), b.clone()]);
        let now = Instant::now();

        // Each check reads the same world; both die independently.
        assert_eq!(
            check_death(&a, &world, now, &config),
            Some(DeathCause::Creature { other: 2 })
        );
        assert_eq!(
            check_death(&b, &world, now, &config),
            Some(DeathCause::Creature { other: 1 })
        );
    }

    #[test]
    fn test_multi_food_pickup() {
        let config = GameConfig::default();
        let head = Vec2::new(1500.0, 1500.0);
        let foods = vec![
            Food {
                position: Vec2::new(1505.0, 1500.0),
                color: "#FF6B6B".to_string(),
            },
            Food {
                position: Vec2::new(1500.0, 1490.0),
                color: "#4ECDC4".to_string(),
            },
            Food {
                position: Vec2::new(1490.0, 1510.0),
                color: "#45B7D1".to_string(),
            },
            Food {
                position: Vec2::new(1600.0, 1500.0),
                color: "#FFA07A".to_string(),
            },
        ];

        let eaten = eaten_food(head, &foods, &config);
        assert_eq!(eaten, vec![0, 1]);
    }

    #[test]
    fn test_pickup_radius_is_exclusive() {
        let config = GameConfig::default();
        let head = Vec2::new(1500.0, 1500.0);
        let foods = vec![Food {
            position: Vec2::new(1500.0 + config.food_pickup_radius, 1500.0),
            color: "#FF6B6B".to_string(),
        }];

        assert!(eaten_food(head, &foods, &config).is_empty());
    }
}
