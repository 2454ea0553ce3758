//! # Arena Server Library
//!
//! This library provides the authoritative server implementation for the
//! multiplayer snake arena. It owns the canonical world state, processes
//! client intents, drives the bots, and broadcasts snapshots so every
//! connected client renders the same arena.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the only version of the arena that counts. Movement,
//! growth, collisions and deaths are all resolved here; clients submit
//! intents and render whatever the next snapshot says happened.
//!
//! ### Session Management
//! Handles the complete lifecycle of client sessions including:
//! - Session establishment keyed by source address
//! - Binding sessions to the creatures they control
//! - Admin privilege tracking per session
//! - Timeout detection and cleanup of silent peers
//!
//! ### State Broadcasting
//! Every tick the server serializes the living creatures and the food
//! field into a snapshot and sends it to all open sessions. Snapshots
//! are fire-and-forget; lifecycle packets are re-sent across a few
//! ticks so a single lost datagram cannot strand a client.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! All packet handling and simulation runs sequentially on one loop.
//! Network receive, send and timeout sweeping happen on separate tasks
//! that communicate with the loop through channels, so the world state
//! itself is never shared across threads.
//!
//! ### UDP-Based Communication
//! Uses UDP sockets for low-latency communication. The protocol keeps
//! client intents tiny and pushes all the weight into the outbound
//! snapshot, which may down-sample long bodies to bound its size.
//!
//! ### Fixed Tick Pipeline
//! Each 50 ms tick runs the same phase order: bot decisions, steering,
//! movement and eating, the collision pass, death bookkeeping, corpse
//! expiry and the periodic food prune. A tick that overruns its slot
//! skips the missed deadlines rather than running catch-up ticks.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! Tracks connected peers and their privileges:
//! - Address-keyed session lookup and liveness refresh
//! - Creature bindings for join, death and disconnect flows
//! - Admin flag storage behind the shared secret check
//! - Timeout sweeps that return the dropped bindings
//!
//! ### World Module (`world`)
//! Owns everything that exists in the arena:
//! - Creature and food collections plus corpse bookkeeping
//! - Safe spawn placement away from living heads
//! - Identifier assignment and name lookup
//! - Snapshot assembly with wire down-sampling
//!
//! ### Game Module (`game`)
//! Advances the arena by exactly one tick per call:
//! - Bot decision cadence and steering application
//! - Movement, eating and the order-independent collision pass
//! - Death conversion into scattered food and respawn scheduling
//! - Tick events reported back to the network layer
//!
//! ### Bot Module (`bot`)
//! Implements the computer-controlled creatures:
//! - A priority ladder from border evasion down to food farming
//! - Periodic decisions held between evaluations
//! - Target projection and boost selection per strategy
//!
//! ### Network Module (`network`)
//! Handles all networking operations and protocol implementation:
//! - UDP socket management and packet processing
//! - Intent dispatch, admin gating and health queries
//! - Snapshot broadcasting and lifecycle re-sends
//! - Session timeout plumbing into the main loop
//!
//! The remaining modules are small and self-contained: `config` turns
//! every arena rule into a startup flag, `creature` holds the segment
//! body with its movement and boost accounting, `food` keeps the food
//! field with scatter and prune passes, and `collision` has the border
//! and body overlap predicates.
//!
//! ## Performance Characteristics
//!
//! ### Tick Rate
//! The server runs at a fixed 20 Hz by default. Each tick advances all
//! creatures, resolves collisions once, and emits one snapshot.
//!
//! ### Scalability
//! Designed for a few dozen concurrent creatures. The collision pass is
//! quadratic in segments, and snapshot size is bounded by the food cap
//! and the wire segment limit, so cost scales with arena population
//! rather than connection count.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::GameConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a server with default arena rules and room for 32 sessions
//!     let mut server = Server::new("127.0.0.1:8080", GameConfig::default(), 32).await?;
//!
//!     // Start the server - this runs the main loop which:
//!     // - Listens for client intents and admin commands
//!     // - Advances the arena simulation at the configured tick rate
//!     // - Broadcasts world snapshots to all open sessions
//!     // - Handles session timeouts and disconnections
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! The server uses an event-driven architecture with internal async tasks:
//! - **Network Receiver**: Continuously listens for incoming packets
//! - **Network Sender**: Processes outgoing packet queue and broadcasts
//! - **Timeout Checker**: Sweeps sessions that have gone silent
//! - **Main Loop**: Dispatches intents, runs ticks, and broadcasts state
//!
//! ## Security Considerations
//!
//! ### Intent Validation
//! Steering and boost intents only apply to the living creature bound to
//! the sender's session. Packets from unknown addresses or for dead
//! creatures are dropped without side effects.
//!
//! ### Admin Gating
//! Arena-shaping commands require a prior login against the configured
//! shared secret. The secret never appears in logs, and a server started
//! without one rejects every login.
//!
//! ### State Authority
//! Clients never report positions. The server derives all movement from
//! intents, so a modified client cannot teleport, grow, or survive a
//! collision the rules say it lost.

pub mod bot;
pub mod collision;
pub mod config;
pub mod creature;
pub mod food;
pub mod game;
pub mod network;
pub mod session;
pub mod world;

use rand::Rng;

/// Colors handed out to creatures and food, matching the client palette.
pub const PALETTE: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
];

/// Picks a random palette color.
pub fn random_color(rng: &mut impl Rng) -> String {
    PALETTE[rng.gen_range(0..PALETTE.len())].to_string()
}
