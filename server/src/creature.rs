use crate::bot::BotState;
use crate::config::GameConfig;
use shared::{Vec2, DIRECTION_DEADZONE};
use std::collections::VecDeque;
use std::time::Instant;

/// Who steers a creature.
#[derive(Debug, Clone)]
pub enum Controller {
    Player,
    Bot(BotState),
}

/// One snake in the arena, player- or bot-controlled.
#[derive(Debug, Clone)]
pub struct Creature {
    /// Stable identifier, never reassigned while this creature is tracked.
    pub id: u32,
    /// Display label, not necessarily unique.
    pub name: String,
    /// Body points, head first, tail last.
    pub segments: VecDeque<Vec2>,
    /// Unit direction of travel.
    pub heading: Vec2,
    pub color: String,
    /// False is terminal; a dead creature is removed, never revived.
    pub alive: bool,
    /// Boost intent. Gated off at the minimum length.
    pub boosting: bool,
    /// Spawn instant, drives the collision grace window.
    pub spawned_at: Instant,
    /// Last instant a whole drain unit of boosting was paid for.
    pub boost_clock: Instant,
    pub controller: Controller,
}

impl Creature {
    /// Builds a creature with its body laid out behind the head along
    /// the opposite of its heading.
    pub fn new(
        id: u32,
        name: String,
        head: Vec2,
        heading: Vec2,
        color: String,
        controller: Controller,
        config: &GameConfig,
        now: Instant,
    ) -> Creature {
        let mut segments = VecDeque::with_capacity(config.initial_length);
        for i in 0..config.initial_length {
            segments.push_back(head.sub(&heading.scale(config.segment_spacing * i as f32)));
        }

        Creature {
            id,
            name,
            segments,
            heading,
            color,
            alive: true,
            boosting: false,
            spawned_at: now,
            boost_clock: now,
            controller,
        }
    }

    pub fn head(&self) -> Option<Vec2> {
        self.segments.front().copied()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Score is the segment count; it is never stored separately.
    pub fn score(&self) -> u32 {
        self.segments.len() as u32
    }

    pub fn is_bot(&self) -> bool {
        matches!(self.controller, Controller::Bot(_))
    }

    pub fn in_grace(&self, now: Instant, config: &GameConfig) -> bool {
        now.duration_since(self.spawned_at) < config.grace_period()
    }

    /// Per-tick head displacement: the base speed decays with size down
    /// to a floor, and doubles (by default) while boost is effective.
    pub fn effective_speed(&self, config: &GameConfig) -> f32 {
        let decayed = config.base_speed - self.segments.len() as f32 * config.speed_decay;
        let speed = decayed.max(config.min_speed);
        if self.boosting && self.segments.len() > config.min_length {
            speed * config.boost_multiplier
        } else {
            speed
        }
    }

    /// Advances the creature by one tick: push a new head, pop one tail
    /// segment, then settle any boost drain that has come due.
    ///
    /// Returns false when the body is empty and nothing can move; the
    /// caller treats that as a forced death.
    pub fn advance(&mut self, now: Instant, config: &GameConfig) -> bool {
        let head = match self.segments.front() {
            Some(head) => *head,
            None => return false,
        };

        let speed = self.effective_speed(config);
        self.segments.push_front(head.add(&self.heading.scale(speed)));

        // The conveyor: without growth the body keeps its length.
        self.segments.pop_back();

        self.drain_boost(now, config);
        true
    }

    /// Converts elapsed boosting time into whole-segment removals.
    ///
    /// The clock advances only by the units actually consumed, so a
    /// fraction of a drain unit is never lost between ticks, and it
    /// snaps to now whenever boosting is off or gated at the floor.
    fn drain_boost(&mut self, now: Instant, config: &GameConfig) {
        if self.boosting && self.segments.len() > config.min_length {
            let unit = config.boost_drain_unit();
            while now.duration_since(self.boost_clock) >= unit
                && self.segments.len() > config.min_length
            {
                self.segments.pop_back();
                self.boost_clock += unit;
            }
        } else {
            self.boost_clock = now;
        }
    }

    /// Applies a steering intent. Vectors inside the dead-zone are
    /// ignored so the stored heading stays a unit vector.
    pub fn set_heading(&mut self, direction: Vec2) {
        if direction.magnitude() > DIRECTION_DEADZONE {
            self.heading = direction.normalize();
        }
    }

    /// Applies a boost intent, forced off at or below the minimum
    /// length. Turning boost on restarts the drain clock.
    pub fn set_boosting(&mut self, active: bool, config: &GameConfig, now: Instant) {
        let effective = active && self.segments.len() > config.min_length;
        if effective && !self.boosting {
            self.boost_clock = now;
        }
        self.boosting = effective;
    }

    /// Appends copies of the tail segment, one per food item eaten.
    pub fn grow(&mut self, count: usize) {
        if let Some(tail) = self.segments.back().copied() {
            for _ in 0..count {
                self.segments.push_back(tail);
            }
        }
    }

    /// Removes up to `count` tail segments, clamped at the minimum
    /// length.
    pub fn shrink(&mut self, count: usize, config: &GameConfig) {
        for _ in 0..count {
            if self.segments.len() <= config.min_length {
                break;
            }
            self.segments.pop_back();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::time::Duration;

    fn test_creature(config: &GameConfig, now: Instant) -> Creature {
        Creature::new(
            1,
            "worm".to_string(),
            Vec2::new(1500.0, 1500.0),
            Vec2::new(1.0, 0.0),
            "#FF6B6B".to_string(),
            Controller::Player,
            config,
            now,
        )
    }

    #[test]
    fn test_initial_layout() {
        let config = GameConfig::default();
        let creature = test_creature(&config, Instant::now());

        assert_eq!(creature.len(), 15);
        assert_eq!(creature.score(), 15);
        assert!(creature.alive);
        assert!(!creature.boosting);

        // Body trails the head against the heading at segment spacing.
        for (i, segment) in creature.segments.iter().enumerate() {
            assert_approx_eq!(segment.x, 1500.0 - 10.0 * i as f32, 0.001);
            assert_approx_eq!(segment.y, 1500.0, 0.001);
        }
    }

    #[test]
    fn test_effective_speed_decay() {
        let config = GameConfig::default();
        let now = Instant::now();
        let mut creature = test_creature(&config, now);

        // 15 segments: 3.0 - 15 * 0.005
        assert_approx_eq!(creature.effective_speed(&config), 2.925, 0.0001);

        creature.grow(385);
        assert_eq!(creature.len(), 400);
        // Decay would give 1.0; the floor holds at 1.5.
        assert_approx_eq!(creature.effective_speed(&config), 1.5, 0.0001);
    }

    #[test]
    fn test_boost_multiplier_gated_by_floor() {
        let config = GameConfig::default();
        let now = Instant::now();
        let mut creature = test_creature(&config, now);

        creature.set_boosting(true, &config, now);
        assert!(creature.boosting);
        assert_approx_eq!(creature.effective_speed(&config), 5.85, 0.0001);

        // At exactly the minimum length the multiplier no longer applies.
        creature.shrink(5, &config);
        assert_eq!(creature.len(), config.min_length);
        assert_approx_eq!(creature.effective_speed(&config), 2.95, 0.0001);
    }

    #[test]
    fn test_boost_forced_off_at_floor() {
        let config = GameConfig::default();
        let now = Instant::now();
        let mut creature = test_creature(&config, now);
        creature.shrink(5, &config);

        creature.set_boosting(true, &config, now);
        assert!(!creature.boosting);
    }

    #[test]
    fn test_conveyor_keeps_length() {
        let config = GameConfig::default();
        let t0 = Instant::now();
        let mut creature = test_creature(&config, t0);
        let speed = creature.effective_speed(&config);

        for i in 1..=5 {
            assert!(creature.advance(t0 + Duration::from_millis(50 * i), &config));
            assert_eq!(creature.len(), 15);
        }

        let head = creature.head().unwrap();
        assert_approx_eq!(head.x, 1500.0 + speed * 5.0, 0.001);
        assert_approx_eq!(head.y, 1500.0, 0.001);
    }

    #[test]
    fn test_advance_empty_body_reports_fault() {
        let config = GameConfig::default();
        let now = Instant::now();
        let mut creature = test_creature(&config, now);
        creature.segments.clear();

        assert!(!creature.advance(now, &config));
    }

    #[test]
    fn test_boost_drains_one_segment_per_unit() {
        let config = GameConfig::default();
        let t0 = Instant::now();
        let mut creature = test_creature(&config, t0);
        creature.set_boosting(true, &config, t0);

        // Tick every 50 ms through one full drain unit.
        let mut elapsed = 0;
        while elapsed < 1000 {
            elapsed += 50;
            creature.advance(t0 + Duration::from_millis(elapsed), &config);
        }

        // Exactly one segment paid for exactly one unit of boosting.
        assert_eq!(creature.len(), 14);
    }

    #[test]
    fn test_boost_drain_preserves_remainder() {
        let config = GameConfig::default();
        let t0 = Instant::now();
        let mut creature = test_creature(&config, t0);
        creature.set_boosting(true, &config, t0);

        // A long stall: 3.5 units elapsed in a single tick.
        let now = t0 + Duration::from_millis(3500);
        creature.advance(now, &config);
        assert_eq!(creature.len(), 12);

        // The half unit already served still counts.
        creature.advance(now + Duration::from_millis(500), &config);
        assert_eq!(creature.len(), 11);
    }

    #[test]
    fn test_boost_drain_stops_at_floor() {
        let config = GameConfig::default();
        let t0 = Instant::now();
        let mut creature = test_creature(&config, t0);
        creature.set_boosting(true, &config, t0);

        creature.advance(t0 + Duration::from_secs(60), &config);
        assert_eq!(creature.len(), config.min_length);
    }

    #[test]
    fn test_boost_clock_resets_when_intent_drops() {
        let config = GameConfig::default();
        let t0 = Instant::now();
        let mut creature = test_creature(&config, t0);

        creature.set_boosting(true, &config, t0);
        creature.advance(t0 + Duration::from_millis(900), &config);
        assert_eq!(creature.len(), 15);

        // Dropping the intent discards the 900 ms of stale elapsed time.
        creature.set_boosting(false, &config, t0 + Duration::from_millis(900));
        creature.advance(t0 + Duration::from_millis(950), &config);
        creature.set_boosting(true, &config, t0 + Duration::from_millis(950));

        creature.advance(t0 + Duration::from_millis(1900), &config);
        assert_eq!(creature.len(), 15);

        creature.advance(t0 + Duration::from_millis(1950), &config);
        assert_eq!(creature.len(), 14);
    }

    #[test]
    fn test_heading_deadzone() {
        let config = GameConfig::default();
        let mut creature = test_creature(&config, Instant::now());

        creature.set_heading(Vec2::new(0.05, 0.05));
        assert_approx_eq!(creature.heading.x, 1.0, 0.0001);
        assert_approx_eq!(creature.heading.y, 0.0, 0.0001);

        creature.set_heading(Vec2::new(3.0, 4.0));
        assert_approx_eq!(creature.heading.x, 0.6, 0.0001);
        assert_approx_eq!(creature.heading.y, 0.8, 0.0001);
        assert_approx_eq!(creature.heading.magnitude(), 1.0, 0.0001);
    }

    #[test]
    fn test_grow_is_exact() {
        let config = GameConfig::default();
        let mut creature = test_creature(&config, Instant::now());

        creature.grow(3);
        assert_eq!(creature.len(), 18);

        // Growth copies the tail in place.
        let tail = *creature.segments.back().unwrap();
        let before_tail = creature.segments[creature.len() - 4];
        assert_eq!(tail, before_tail);
    }

    #[test]
    fn test_shrink_clamps_at_minimum() {
        let config = GameConfig::default();
        let mut creature = test_creature(&config, Instant::now());

        creature.shrink(100, &config);
        assert_eq!(creature.len(), config.min_length);
    }

    #[test]
    fn test_grace_window() {
        let config = GameConfig::default();
        let t0 = Instant::now();
        let creature = test_creature(&config, t0);

        assert!(creature.in_grace(t0 + Duration::from_millis(1999), &config));
        assert!(!creature.in_grace(t0 + Duration::from_millis(2000), &config));
    }
}
