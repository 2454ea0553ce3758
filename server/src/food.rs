use crate::collision;
use crate::config::GameConfig;
use rand::Rng;
use shared::{FoodState, Vec2};
use std::time::Instant;

/// One pickup in the arena.
#[derive(Debug, Clone)]
pub struct Food {
    pub position: Vec2,
    pub color: String,
}

/// The arena's food population: a baseline of random pickups that are
/// replaced in place when eaten, plus death drops appended at the end
/// and trimmed back periodically.
#[derive(Debug)]
pub struct FoodField {
    items: Vec<Food>,
    last_prune: Instant,
}

impl FoodField {
    /// Fills the interior with the baseline food population.
    pub fn new(config: &GameConfig, now: Instant, rng: &mut impl Rng) -> FoodField {
        let mut items = Vec::with_capacity(config.food_cap());
        for _ in 0..config.food_count {
            items.push(random_food(config, rng));
        }
        FoodField {
            items,
            last_prune: now,
        }
    }

    pub fn items(&self) -> &[Food] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replaces a consumed item in place. The population never shrinks
    /// from eating; an out-of-range index is ignored.
    pub fn respawn_at(&mut self, index: usize, config: &GameConfig, rng: &mut impl Rng) {
        if let Some(slot) = self.items.get_mut(index) {
            *slot = random_food(config, rng);
        }
    }

    /// Converts part of a corpse into food of the dead creature's
    /// color. A stride over the body approximates the configured ratio,
    /// and segments resting on the lethal border are left out.
    pub fn scatter_from_death<'a, I>(&mut self, segments: I, color: &str, config: &GameConfig)
    where
        I: IntoIterator<Item = &'a Vec2>,
    {
        if config.death_food_ratio <= 0.0 {
            return;
        }
        let stride = ((1.0 / config.death_food_ratio).round() as usize).max(1);

        for segment in segments.into_iter().step_by(stride) {
            if collision::hits_border(*segment, config) {
                continue;
            }
            self.items.push(Food {
                position: *segment,
                color: color.to_string(),
            });
        }
    }

    /// Trims death-drop overflow back to the cap. Runs on its own wall
    /// clock period rather than every tick; returns the number removed.
    pub fn maybe_prune(&mut self, now: Instant, config: &GameConfig) -> usize {
        if now.duration_since(self.last_prune) < config.food_prune_interval() {
            return 0;
        }
        self.last_prune = now;

        let cap = config.food_cap();
        if self.items.len() > cap {
            let removed = self.items.len() - cap;
            self.items.truncate(cap);
            removed
        } else {
            0
        }
    }

    /// Wire form of at most the capped number of items.
    pub fn snapshot(&self, config: &GameConfig) -> Vec<FoodState> {
        self.items
            .iter()
            .take(config.food_cap())
            .map(|food| FoodState {
                position: food.position,
                color: food.color.clone(),
            })
            .collect()
    }
}

fn random_food(config: &GameConfig, rng: &mut impl Rng) -> Food {
    Food {
        position: random_interior_point(config, rng),
        color: crate::random_color(rng),
    }
}

/// Uniform point inside the safe interior, border excluded.
pub fn random_interior_point(config: &GameConfig, rng: &mut impl Rng) -> Vec2 {
    Vec2::new(
        rng.gen_range(config.map_border..config.map_width - config.map_border),
        rng.gen_range(config.map_border..config.map_height - config.map_border),
    )
}
