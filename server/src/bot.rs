//! Bot steering policy.
//!
//! Bots run a fixed priority ladder re-evaluated on a wall-clock period:
//! border flight, evasion, hunting, defensive repositioning, encircling
//! and food farming, first match wins. Selection is a pure function of
//! the world so every rung is testable in isolation; the chosen decision
//! is stored on the creature's controller and executed every tick by
//! [`steer`].

use crate::config::GameConfig;
use crate::creature::{Controller, Creature};
use crate::food::Food;
use shared::Vec2;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Distance from the lethal inset at which a bot turns back inward.
pub const BOT_BORDER_MARGIN: f32 = 200.0;
/// Any opposing segment closer than this is an immediate threat.
pub const DANGER_RADIUS: f32 = 150.0;
/// How far ahead evasive and defensive targets are projected.
pub const EVADE_PROJECTION: f32 = 200.0;
/// Segments above the minimum length a bot keeps in hand before it
/// spends any on boosting.
pub const EVADE_BOOST_MARGIN: usize = 5;
/// Head distance within which prey is considered at all.
pub const HUNT_RANGE: f32 = 400.0;
/// A creature at most this fraction of the bot's length counts as prey.
pub const HUNT_SIZE_RATIO: f32 = 0.7;
/// Ticks of prey movement folded into the intercept prediction.
pub const PREDICT_TICKS: f32 = 10.0;
/// Extra lead past the predicted head, aiming for a cut-off.
pub const CUTOFF_LEAD: f32 = 60.0;
/// Prey distance below which a hunting bot is willing to boost.
pub const HUNT_BOOST_RANGE: f32 = 250.0;
/// Length ratio at which another creature is treated as a menace.
pub const THREAT_SIZE_RATIO: f32 = 1.5;
/// Head distance at which menaces trigger defensive repositioning.
pub const CAUTION_RADIUS: f32 = 300.0;
/// Head distance at which a same-scale creature gets encircled.
pub const ORBIT_ENGAGE_RANGE: f32 = 200.0;
/// Radius of the encircling path around the predicted prey head.
pub const ORBIT_RADIUS: f32 = 120.0;
/// Radians the orbit angle advances per decision.
pub const ORBIT_STEP: f32 = 0.35;
/// Minimum body length before an encircling bot boosts.
pub const ORBIT_BOOST_LENGTH: usize = 30;
/// Edge length of the coarse grid cells used to rate food density.
pub const FARM_CELL: f32 = 150.0;
/// Food beyond this distance is ignored when picking a farming cell.
pub const FARM_SEARCH_RADIUS: f32 = 600.0;

/// The rungs of the priority ladder, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    AvoidBorder,
    Evade,
    Hunt,
    Defend,
    Encircle,
    Farm,
}

/// Per-bot steering state carried on the creature's controller.
#[derive(Debug, Clone)]
pub struct BotState {
    pub strategy: Strategy,
    pub target: Vec2,
    pub boost: bool,
    pub last_decision: Instant,
    pub orbit_angle: f32,
}

impl BotState {
    /// Fresh state aimed at the bot's own head, so it keeps its spawn
    /// heading until the first decision comes due.
    pub fn new(head: Vec2, now: Instant) -> BotState {
        BotState {
            strategy: Strategy::Farm,
            target: head,
            boost: false,
            last_decision: now,
            orbit_angle: 0.0,
        }
    }

    pub fn decision_due(&self, now: Instant, config: &GameConfig) -> bool {
        now.duration_since(self.last_decision) >= config.bot_decision_interval()
    }

    /// Stores a decision and restarts the decision clock.
    pub fn adopt(&mut self, decision: Decision, now: Instant) {
        self.strategy = decision.strategy;
        self.target = decision.target;
        self.boost = decision.boost;
        self.orbit_angle = decision.orbit_angle;
        self.last_decision = now;
    }
}

/// Outcome of one pass over the priority ladder.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub strategy: Strategy,
    pub target: Vec2,
    pub boost: bool,
    pub orbit_angle: f32,
}

/// Picks a strategy and target for one bot against the current world.
/// Pure: mutation happens later via [`BotState::adopt`] and [`steer`].
pub fn decide(
    bot: &Creature,
    creatures: &HashMap<u32, Creature>,
    foods: &[Food],
    config: &GameConfig,
) -> Decision {
    let orbit_angle = orbit_angle_of(bot);
    let head = match bot.head() {
        Some(head) => head,
        None => {
            return Decision {
                strategy: Strategy::Farm,
                target: config.center(),
                boost: false,
                orbit_angle,
            }
        }
    };

    // Border flight beats everything else.
    if near_border(head, config) {
        return Decision {
            strategy: Strategy::AvoidBorder,
            target: config.center(),
            boost: false,
            orbit_angle,
        };
    }

    let others: Vec<&Creature> = creatures
        .values()
        .filter(|other| other.id != bot.id && other.alive)
        .collect();

    // Immediate danger: an inverse-square repulsion field summed over
    // every hostile segment in radius.
    let mut repulsion = Vec2::new(0.0, 0.0);
    let mut threatened = false;
    for other in &others {
        for segment in &other.segments {
            let distance = head.distance(segment);
            if distance < DANGER_RADIUS {
                threatened = true;
                let away = head.sub(segment).normalize();
                repulsion = repulsion.add(&away.scale(1.0 / distance.max(1.0).powi(2)));
            }
        }
    }
    if threatened {
        return Decision {
            strategy: Strategy::Evade,
            target: head.add(&repulsion.normalize().scale(EVADE_PROJECTION)),
            boost: boost_margin_met(bot, config),
            orbit_angle,
        };
    }

    // Hunt the nearest vulnerable creature: boosting, or small enough.
    let mut prey: Option<(&Creature, Vec2, f32)> = None;
    for other in &others {
        let other_head = match other.head() {
            Some(other_head) => other_head,
            None => continue,
        };
        let distance = head.distance(&other_head);
        if distance >= HUNT_RANGE {
            continue;
        }
        let vulnerable =
            other.boosting || (other.len() as f32) <= bot.len() as f32 * HUNT_SIZE_RATIO;
        if !vulnerable {
            continue;
        }
        if prey.map_or(true, |(_, _, best)| distance < best) {
            prey = Some((*other, other_head, distance));
        }
    }
    if let Some((quarry, quarry_head, distance)) = prey {
        let predicted = predict_head(quarry, quarry_head, config);
        return Decision {
            strategy: Strategy::Hunt,
            target: predicted.add(&quarry.heading.scale(CUTOFF_LEAD)),
            boost: distance < HUNT_BOOST_RANGE && boost_margin_met(bot, config),
            orbit_angle,
        };
    }

    // Menaced by something much bigger: reposition away from all of them.
    let mut away_sum = Vec2::new(0.0, 0.0);
    let mut menaced = false;
    for other in &others {
        let other_head = match other.head() {
            Some(other_head) => other_head,
            None => continue,
        };
        if (other.len() as f32) >= bot.len() as f32 * THREAT_SIZE_RATIO
            && head.distance(&other_head) < CAUTION_RADIUS
        {
            menaced = true;
            away_sum = away_sum.add(&head.sub(&other_head).normalize());
        }
    }
    if menaced {
        return Decision {
            strategy: Strategy::Defend,
            target: head.add(&away_sum.normalize().scale(EVADE_PROJECTION)),
            boost: false,
            orbit_angle,
        };
    }

    // Close peer of our scale or less: circle its predicted position.
    let mut peer: Option<(&Creature, Vec2, f32)> = None;
    for other in &others {
        let other_head = match other.head() {
            Some(other_head) => other_head,
            None => continue,
        };
        let distance = head.distance(&other_head);
        if distance < ORBIT_ENGAGE_RANGE && other.len() <= bot.len() {
            if peer.map_or(true, |(_, _, best)| distance < best) {
                peer = Some((*other, other_head, distance));
            }
        }
    }
    if let Some((quarry, quarry_head, _)) = peer {
        let predicted = predict_head(quarry, quarry_head, config);
        let angle = orbit_angle + ORBIT_STEP;
        let offset = Vec2::new(angle.cos(), angle.sin()).scale(ORBIT_RADIUS);
        return Decision {
            strategy: Strategy::Encircle,
            target: predicted.add(&offset),
            boost: bot.len() >= ORBIT_BOOST_LENGTH,
            orbit_angle: angle,
        };
    }

    // Nothing nearby: head for the densest food cell in range.
    let mut cells: BTreeMap<(i32, i32), usize> = BTreeMap::new();
    for food in foods {
        if head.distance(&food.position) > FARM_SEARCH_RADIUS {
            continue;
        }
        let cell = (
            (food.position.x / FARM_CELL).floor() as i32,
            (food.position.y / FARM_CELL).floor() as i32,
        );
        *cells.entry(cell).or_insert(0) += 1;
    }
    let mut best: Option<((i32, i32), usize)> = None;
    for (cell, count) in &cells {
        if best.map_or(true, |(_, best_count)| *count > best_count) {
            best = Some((*cell, *count));
        }
    }
    let target = match best {
        Some(((cx, cy), _)) => Vec2::new(
            (cx as f32 + 0.5) * FARM_CELL,
            (cy as f32 + 0.5) * FARM_CELL,
        ),
        None => config.center(),
    };
    Decision {
        strategy: Strategy::Farm,
        target,
        boost: false,
        orbit_angle,
    }
}

/// Executes the stored decision for one tick: turn toward the target
/// and apply the boost intent. Players are untouched.
pub fn steer(creature: &mut Creature, config: &GameConfig, now: Instant) {
    let (target, boost) = match &creature.controller {
        Controller::Bot(state) => (state.target, state.boost),
        Controller::Player => return,
    };
    if let Some(head) = creature.head() {
        // The heading dead-zone doubles as the arrival epsilon.
        creature.set_heading(target.sub(&head));
    }
    creature.set_boosting(boost, config, now);
}

fn near_border(head: Vec2, config: &GameConfig) -> bool {
    head.x < config.map_border + BOT_BORDER_MARGIN
        || head.x > config.map_width - config.map_border - BOT_BORDER_MARGIN
        || head.y < config.map_border + BOT_BORDER_MARGIN
        || head.y > config.map_height - config.map_border - BOT_BORDER_MARGIN
}

fn predict_head(quarry: &Creature, quarry_head: Vec2, config: &GameConfig) -> Vec2 {
    quarry_head.add(
        &quarry
            .heading
            .scale(quarry.effective_speed(config) * PREDICT_TICKS),
    )
}

fn boost_margin_met(bot: &Creature, config: &GameConfig) -> bool {
    bot.len() >= config.min_length + EVADE_BOOST_MARGIN
}

fn orbit_angle_of(bot: &Creature) -> f32 {
    match &bot.controller {
        Controller::Bot(state) => state.orbit_angle,
        Controller::Player => 0.0,
    }
}
