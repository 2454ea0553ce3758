use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Direction intents with a magnitude at or below this are treated as
/// stick noise and ignored by the server.
pub const DIRECTION_DEADZONE: f32 = 0.1;

///Represents a point or direction in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Vec2 {
        Vec2 { x, y }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the normalized vector. The zero vector normalizes to itself.
    pub fn normalize(&self) -> Vec2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vec2 { x: 0.0, y: 0.0 }
        } else {
            Vec2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vec2 {
        Vec2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vec2) -> Vec2 {
        Vec2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    ///Returns the difference of two vectors.
    pub fn sub(&self, other: &Vec2) -> Vec2 {
        Vec2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    ///Returns the distance between two points.
    pub fn distance(&self, other: &Vec2) -> f32 {
        self.sub(other).magnitude()
    }
}

/// All messages exchanged between clients and the arena server.
///
/// The first group is client -> server intents, the second group is
/// server -> client notifications. Everything travels bincode-encoded
/// in a single UDP datagram.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    /// Enter the arena under a display name. An empty name is allowed;
    /// the server substitutes a default.
    Join {
        name: String,
    },
    /// Steering intent. Vectors inside the dead-zone are dropped.
    ChangeDirection {
        direction: Vec2,
    },
    /// Boost intent. The server forces this off at the minimum length.
    Boost {
        active: bool,
    },
    /// Request admin rights for this session with the shared secret.
    AdminLogin {
        password: String,
    },
    /// Admin only: spawn one bot creature.
    AddBot,
    /// Admin only: retire one bot creature.
    RemoveBot,
    /// Admin only: grow (positive) or shrink (negative) a named creature.
    ModifyPlayer {
        target_name: String,
        amount: i32,
    },
    /// Process-level liveness probe, answered without a session.
    Health,
    Disconnect,

    /// Reply to a successful join, carrying the arena geometry the
    /// client needs before the first snapshot arrives.
    Init {
        creature_id: u32,
        map_width: f32,
        map_height: f32,
        map_border: f32,
    },
    /// Authoritative world snapshot, broadcast once per tick.
    GameState {
        tick: u32,
        timestamp: u64,
        creatures: HashMap<u32, CreatureState>,
        foods: Vec<FoodState>,
    },
    /// Sent once to the owning session when its creature dies.
    Death {
        final_score: u32,
    },
    AdminAccess {
        granted: bool,
    },
    BotCreated {
        creature_id: u32,
    },
    BotRemoved {
        creature_id: u32,
    },
    HealthReport {
        creatures: u32,
        players: u32,
        bots: u32,
    },
    Disconnected {
        reason: String,
    },
}

/// Wire form of one living creature inside a snapshot.
///
/// `segments` is head-first and may be down-sampled for large bodies;
/// `score` remains the authoritative segment count.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreatureState {
    pub name: String,
    pub segments: Vec<Vec2>,
    pub color: String,
    pub score: u32,
    pub boosting: bool,
}

/// Wire form of one food pickup.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FoodState {
    pub position: Vec2,
    pub color: String,
}
