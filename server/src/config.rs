//! Runtime tuning for the arena simulation.
//!
//! Every knob lives in [`GameConfig`] and doubles as a command line flag,
//! so a deployment can reshape the arena without a rebuild. The defaults
//! reproduce the classic arena: a 3000 x 3000 map with a 100 unit lethal
//! border, 300 food pickups, a 50 ms tick and 15 segment spawns.

use shared::Vec2;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// Defaults are shared between the clap attributes and Default so the
// flag help text and test fixtures cannot drift apart.
pub const DEFAULT_MAP_WIDTH: f32 = 3000.0;
pub const DEFAULT_MAP_HEIGHT: f32 = 3000.0;
pub const DEFAULT_MAP_BORDER: f32 = 100.0;
pub const DEFAULT_FOOD_COUNT: usize = 300;
pub const DEFAULT_BASE_SPEED: f32 = 3.0;
pub const DEFAULT_MIN_SPEED: f32 = 1.5;
pub const DEFAULT_SPEED_DECAY: f32 = 0.005;
pub const DEFAULT_BOOST_MULTIPLIER: f32 = 2.0;
pub const DEFAULT_BOOST_DRAIN_UNIT_MS: u64 = 1000;
pub const DEFAULT_SEGMENT_SPACING: f32 = 10.0;
pub const DEFAULT_FOOD_PICKUP_RADIUS: f32 = 14.0;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;
pub const DEFAULT_SPAWN_MARGIN: f32 = 400.0;
pub const DEFAULT_SPAWN_SAFETY_RADIUS: f32 = 300.0;
pub const DEFAULT_SPAWN_ATTEMPTS: u32 = 50;
pub const DEFAULT_COLLISION_THRESHOLD: f32 = 8.0;
pub const DEFAULT_MIN_LENGTH: usize = 10;
pub const DEFAULT_INITIAL_LENGTH: usize = 15;
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 2000;
pub const DEFAULT_DEATH_FOOD_RATIO: f32 = 0.5;
pub const DEFAULT_FOOD_CAP_FACTOR: usize = 2;
pub const DEFAULT_FOOD_PRUNE_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_CORPSE_LINGER_MS: u64 = 100;
pub const DEFAULT_BOT_COUNT: usize = 4;
pub const DEFAULT_BOT_RESPAWN_DELAY_MS: u64 = 3000;
pub const DEFAULT_BOT_DECISION_INTERVAL_MS: u64 = 200;
pub const DEFAULT_WIRE_SEGMENT_LIMIT: usize = 100;
pub const DEFAULT_SELF_COLLISION: SelfCollisionPolicy = SelfCollisionPolicy::Disabled;

/// Whether a creature's head can die against its own trailing body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfCollisionPolicy {
    /// Own segments never kill (the classic behavior).
    Disabled,
    /// Own segments participate from the given index on, leaving the
    /// neck out so ordinary turns are not lethal.
    AfterSegment(usize),
}

impl FromStr for SelfCollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("disabled") {
            return Ok(SelfCollisionPolicy::Disabled);
        }
        if let Some(rest) = s.strip_prefix("after:") {
            return rest
                .parse::<usize>()
                .map(SelfCollisionPolicy::AfterSegment)
                .map_err(|_| format!("invalid segment offset in '{}'", s));
        }
        Err(format!(
            "expected 'disabled' or 'after:<segments>', got '{}'",
            s
        ))
    }
}

impl fmt::Display for SelfCollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelfCollisionPolicy::Disabled => write!(f, "disabled"),
            SelfCollisionPolicy::AfterSegment(n) => write!(f, "after:{}", n),
        }
    }
}

/// Simulation tunables, all overridable as startup flags.
#[derive(Debug, Clone, clap::Args)]
pub struct GameConfig {
    /// World width in map units
    #[clap(long, default_value_t = DEFAULT_MAP_WIDTH)]
    pub map_width: f32,
    /// World height in map units
    #[clap(long, default_value_t = DEFAULT_MAP_HEIGHT)]
    pub map_height: f32,
    /// Lethal inset from each map edge
    #[clap(long, default_value_t = DEFAULT_MAP_BORDER)]
    pub map_border: f32,
    /// Baseline number of food pickups kept in the arena
    #[clap(long, default_value_t = DEFAULT_FOOD_COUNT)]
    pub food_count: usize,
    /// Head displacement per tick before the size decay
    #[clap(long, default_value_t = DEFAULT_BASE_SPEED)]
    pub base_speed: f32,
    /// Speed floor after the size decay
    #[clap(long, default_value_t = DEFAULT_MIN_SPEED)]
    pub min_speed: f32,
    /// Speed lost per body segment
    #[clap(long, default_value_t = DEFAULT_SPEED_DECAY)]
    pub speed_decay: f32,
    /// Speed factor applied while boosting
    #[clap(long, default_value_t = DEFAULT_BOOST_MULTIPLIER)]
    pub boost_multiplier: f32,
    /// Wall-clock milliseconds of boosting that cost one segment
    #[clap(long, default_value_t = DEFAULT_BOOST_DRAIN_UNIT_MS)]
    pub boost_drain_unit_ms: u64,
    /// Distance between segments in a freshly laid out body
    #[clap(long, default_value_t = DEFAULT_SEGMENT_SPACING)]
    pub segment_spacing: f32,
    /// Head-to-food distance that counts as a pickup
    #[clap(long, default_value_t = DEFAULT_FOOD_PICKUP_RADIUS)]
    pub food_pickup_radius: f32,
    /// Simulation period in milliseconds
    #[clap(long, default_value_t = DEFAULT_TICK_INTERVAL_MS)]
    pub tick_interval_ms: u64,
    /// Interior margin that spawn samples must respect
    #[clap(long, default_value_t = DEFAULT_SPAWN_MARGIN)]
    pub spawn_margin: f32,
    /// Minimum distance between a spawn point and any living head
    #[clap(long, default_value_t = DEFAULT_SPAWN_SAFETY_RADIUS)]
    pub spawn_safety_radius: f32,
    /// Spawn samples tried before falling back to the map center
    #[clap(long, default_value_t = DEFAULT_SPAWN_ATTEMPTS)]
    pub spawn_attempts: u32,
    /// Head-to-segment distance that counts as a lethal collision
    #[clap(long, default_value_t = DEFAULT_COLLISION_THRESHOLD)]
    pub collision_threshold: f32,
    /// Segment count floor for every living creature
    #[clap(long, default_value_t = DEFAULT_MIN_LENGTH)]
    pub min_length: usize,
    /// Segments laid out behind the head at spawn
    #[clap(long, default_value_t = DEFAULT_INITIAL_LENGTH)]
    pub initial_length: usize,
    /// Post-spawn immunity window in milliseconds
    #[clap(long, default_value_t = DEFAULT_GRACE_PERIOD_MS)]
    pub grace_period_ms: u64,
    /// Fraction of a corpse converted back into food
    #[clap(long, default_value_t = DEFAULT_DEATH_FOOD_RATIO)]
    pub death_food_ratio: f32,
    /// Food prune/broadcast cap as a multiple of the baseline count
    #[clap(long, default_value_t = DEFAULT_FOOD_CAP_FACTOR)]
    pub food_cap_factor: usize,
    /// Wall-clock period of the food prune pass in milliseconds
    #[clap(long, default_value_t = DEFAULT_FOOD_PRUNE_INTERVAL_MS)]
    pub food_prune_interval_ms: u64,
    /// How long a dead creature stays tracked before deletion
    #[clap(long, default_value_t = DEFAULT_CORPSE_LINGER_MS)]
    pub corpse_linger_ms: u64,
    /// Bots spawned when the server starts
    #[clap(long, default_value_t = DEFAULT_BOT_COUNT)]
    pub bot_count: usize,
    /// Delay before a dead bot is replaced, in milliseconds
    #[clap(long, default_value_t = DEFAULT_BOT_RESPAWN_DELAY_MS)]
    pub bot_respawn_delay_ms: u64,
    /// How often bots re-evaluate their strategy, in milliseconds
    #[clap(long, default_value_t = DEFAULT_BOT_DECISION_INTERVAL_MS)]
    pub bot_decision_interval_ms: u64,
    /// Body length above which the wire form sends every other segment
    #[clap(long, default_value_t = DEFAULT_WIRE_SEGMENT_LIMIT)]
    pub wire_segment_limit: usize,
    /// Self-collision policy: 'disabled' or 'after:<segments>'
    #[clap(long, default_value_t = DEFAULT_SELF_COLLISION)]
    pub self_collision: SelfCollisionPolicy,
    /// Shared secret for admin logins; admin stays locked when unset
    #[clap(long)]
    pub admin_password: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            map_width: DEFAULT_MAP_WIDTH,
            map_height: DEFAULT_MAP_HEIGHT,
            map_border: DEFAULT_MAP_BORDER,
            food_count: DEFAULT_FOOD_COUNT,
            base_speed: DEFAULT_BASE_SPEED,
            min_speed: DEFAULT_MIN_SPEED,
            speed_decay: DEFAULT_SPEED_DECAY,
            boost_multiplier: DEFAULT_BOOST_MULTIPLIER,
            boost_drain_unit_ms: DEFAULT_BOOST_DRAIN_UNIT_MS,
            segment_spacing: DEFAULT_SEGMENT_SPACING,
            food_pickup_radius: DEFAULT_FOOD_PICKUP_RADIUS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            spawn_margin: DEFAULT_SPAWN_MARGIN,
            spawn_safety_radius: DEFAULT_SPAWN_SAFETY_RADIUS,
            spawn_attempts: DEFAULT_SPAWN_ATTEMPTS,
            collision_threshold: DEFAULT_COLLISION_THRESHOLD,
            min_length: DEFAULT_MIN_LENGTH,
            initial_length: DEFAULT_INITIAL_LENGTH,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            death_food_ratio: DEFAULT_DEATH_FOOD_RATIO,
            food_cap_factor: DEFAULT_FOOD_CAP_FACTOR,
            food_prune_interval_ms: DEFAULT_FOOD_PRUNE_INTERVAL_MS,
            corpse_linger_ms: DEFAULT_CORPSE_LINGER_MS,
            bot_count: DEFAULT_BOT_COUNT,
            bot_respawn_delay_ms: DEFAULT_BOT_RESPAWN_DELAY_MS,
            bot_decision_interval_ms: DEFAULT_BOT_DECISION_INTERVAL_MS,
            wire_segment_limit: DEFAULT_WIRE_SEGMENT_LIMIT,
            self_collision: DEFAULT_SELF_COLLISION,
            admin_password: None,
        }
    }
}

impl GameConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn boost_drain_unit(&self) -> Duration {
        Duration::from_millis(self.boost_drain_unit_ms)
    }

    pub fn food_prune_interval(&self) -> Duration {
        Duration::from_millis(self.food_prune_interval_ms)
    }

    pub fn corpse_linger(&self) -> Duration {
        Duration::from_millis(self.corpse_linger_ms)
    }

    pub fn bot_respawn_delay(&self) -> Duration {
        Duration::from_millis(self.bot_respawn_delay_ms)
    }

    pub fn bot_decision_interval(&self) -> Duration {
        Duration::from_millis(self.bot_decision_interval_ms)
    }

    /// Hard ceiling on the food collection and the broadcast slice.
    pub fn food_cap(&self) -> usize {
        self.food_cap_factor * self.food_count
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.map_width / 2.0, self.map_height / 2.0)
    }
}
