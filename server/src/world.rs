//! Aggregate arena state: every creature, the food field, and the
//! spawn planner that places new bodies safely.

use crate::bot::BotState;
use crate::config::GameConfig;
use crate::creature::{Controller, Creature};
use crate::food::FoodField;
use rand::Rng;
use shared::{CreatureState, FoodState, Vec2};
use std::collections::HashMap;
use std::time::Instant;

pub struct World {
    pub config: GameConfig,
    pub creatures: HashMap<u32, Creature>,
    pub food: FoodField,
    /// Dead creatures kept briefly so late packets still resolve them.
    pub corpses: Vec<(u32, Instant)>,
    /// Instants at which replacement bots come due.
    pub bot_respawns: Vec<Instant>,
    pub tick: u32,
    next_creature_id: u32,
}

impl World {
    /// Builds the starting arena: baseline food plus the configured
    /// complement of bots.
    pub fn new(config: GameConfig, now: Instant, rng: &mut impl Rng) -> World {
        let food = FoodField::new(&config, now, rng);
        let mut world = World {
            config,
            creatures: HashMap::new(),
            food,
            corpses: Vec::new(),
            bot_respawns: Vec::new(),
            tick: 0,
            next_creature_id: 1,
        };
        for _ in 0..world.config.bot_count {
            world.spawn_bot(now, rng);
        }
        world
    }

    /// Samples positions inside the spawn margin until one clears every
    /// living head's safety radius, falling back to the map center when
    /// the attempt budget runs out.
    pub fn find_safe_position(&self, rng: &mut impl Rng) -> Vec2 {
        for _ in 0..self.config.spawn_attempts {
            let candidate = Vec2::new(
                rng.gen_range(
                    self.config.spawn_margin..self.config.map_width - self.config.spawn_margin,
                ),
                rng.gen_range(
                    self.config.spawn_margin..self.config.map_height - self.config.spawn_margin,
                ),
            );
            let safe = self
                .creatures
                .values()
                .filter(|other| other.alive)
                .all(|other| match other.head() {
                    Some(head) => head.distance(&candidate) >= self.config.spawn_safety_radius,
                    None => true,
                });
            if safe {
                return candidate;
            }
        }
        self.config.center()
    }

    /// Spawns a player-controlled creature and returns its id. Blank
    /// names collapse to the anonymous default.
    pub fn spawn_player(&mut self, name: &str, now: Instant, rng: &mut impl Rng) -> u32 {
        let trimmed = name.trim();
        let name = if trimmed.is_empty() {
            "Anonymous".to_string()
        } else {
            trimmed.to_string()
        };
        self.spawn(name, true, now, rng)
    }

    /// Spawns a bot named after the id it will receive.
    pub fn spawn_bot(&mut self, now: Instant, rng: &mut impl Rng) -> u32 {
        let name = format!("Bot {}", self.next_creature_id);
        self.spawn(name, false, now, rng)
    }

    fn spawn(&mut self, name: String, player: bool, now: Instant, rng: &mut impl Rng) -> u32 {
        let position = self.find_safe_position(rng);
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let heading = Vec2::new(angle.cos(), angle.sin());
        let controller = if player {
            Controller::Player
        } else {
            Controller::Bot(BotState::new(position, now))
        };

        // Ids count up forever; one is never reassigned.
        let id = self.next_creature_id;
        self.next_creature_id += 1;

        let creature = Creature::new(
            id,
            name,
            position,
            heading,
            crate::random_color(rng),
            controller,
            &self.config,
            now,
        );
        self.creatures.insert(id, creature);
        id
    }

    pub fn remove_creature(&mut self, id: u32) -> Option<Creature> {
        self.creatures.remove(&id)
    }

    /// Living creature with the given display name, if any.
    pub fn find_by_name(&mut self, name: &str) -> Option<&mut Creature> {
        self.creatures
            .values_mut()
            .find(|creature| creature.alive && creature.name == name)
    }

    pub fn living_creatures(&self) -> usize {
        self.creatures.values().filter(|c| c.alive).count()
    }

    pub fn living_players(&self) -> usize {
        self.creatures
            .values()
            .filter(|c| c.alive && !c.is_bot())
            .count()
    }

    pub fn living_bots(&self) -> usize {
        self.creatures
            .values()
            .filter(|c| c.alive && c.is_bot())
            .count()
    }

    /// The longest-lived bot still alive, the one an admin removal takes.
    pub fn oldest_bot(&self) -> Option<u32> {
        self.creatures
            .values()
            .filter(|c| c.alive && c.is_bot())
            .map(|c| c.id)
            .min()
    }

    /// Wire form of the world: living creatures keyed by id with long
    /// bodies thinned, plus the capped food list. The authoritative
    /// bodies are never thinned.
    pub fn build_snapshot(&self) -> (HashMap<u32, CreatureState>, Vec<FoodState>) {
        let creatures = self
            .creatures
            .values()
            .filter(|creature| creature.alive)
            .map(|creature| {
                (
                    creature.id,
                    CreatureState {
                        name: creature.name.clone(),
                        segments: wire_segments(creature, &self.config),
                        color: creature.color.clone(),
                        score: creature.score(),
                        boosting: creature.boosting,
                    },
                )
            })
            .collect();
        (creatures, self.food.snapshot(&self.config))
    }
}

fn wire_segments(creature: &Creature, config: &GameConfig) -> Vec<Vec2> {
    if creature.len() > config.wire_segment_limit {
        creature.segments.iter().step_by(2).copied().collect()
    } else {
        creature.segments.iter().copied().collect()
    }
}
