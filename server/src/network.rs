//! Server network layer handling UDP communications and the tick loop

use crate::config::GameConfig;
use crate::game::{self, TickEvent, TickReport};
use crate::session::{Session, SessionManager};
use crate::world::World;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// How many follow-up ticks re-send a lifecycle packet. Snapshots are
/// fire-and-forget, lifecycle packets are at-least-once by repetition.
const LIFECYCLE_REPEATS: u8 = 2;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    SessionTimeout {
        session: Session,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// A lifecycle packet scheduled for re-sending on upcoming ticks.
#[derive(Debug)]
struct RepeatSend {
    packet: Packet,
    addr: SocketAddr,
    remaining: u8,
}

/// Main server coordinating networking and the arena simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    sessions: Arc<RwLock<SessionManager>>,
    world: World,
    rng: StdRng,
    tick_duration: Duration,
    pending_repeats: Vec<RepeatSend>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        config: GameConfig,
        max_sessions: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        let tick_duration = config.tick_duration();
        let mut rng = StdRng::from_entropy();
        let world = World::new(config, Instant::now(), &mut rng);

        Ok(Server {
            socket,
            sessions: Arc::new(RwLock::new(SessionManager::new(max_sessions))),
            world,
            rng,
            tick_duration,
            pending_repeats: Vec::new(),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Local address of the bound socket, for tests that bind port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            // Client intents are small; snapshots only ever go outbound.
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let sessions = Arc::clone(&self.sessions);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let session_addrs = {
                            let sessions_guard = sessions.read().await;
                            sessions_guard.session_addrs()
                        };

                        for (session_id, addr) in session_addrs {
                            if Some(session_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to session {}: {}", session_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors session timeouts
    async fn spawn_timeout_checker(&self) {
        let sessions = Arc::clone(&self.sessions);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut sessions_guard = sessions.write().await;
                    sessions_guard.check_timeouts()
                };

                for session in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::SessionTimeout { session }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    async fn broadcast_packet(&self, packet: &Packet, exclude: Option<u32>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
            packet: packet.clone(),
            exclude,
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Sends a lifecycle packet now and schedules its re-sends. The
    /// message set is idempotent on the client, so duplicates are safe.
    async fn send_reliable(&mut self, packet: Packet, addr: SocketAddr) {
        self.send_packet(&packet, addr).await;
        self.pending_repeats.push(RepeatSend {
            packet,
            addr,
            remaining: LIFECYCLE_REPEATS,
        });
    }

    /// Sends a lifecycle packet reliably to every open session.
    async fn broadcast_reliable(&mut self, packet: Packet) {
        let addrs = {
            let sessions = self.sessions.read().await;
            sessions.session_addrs()
        };
        for (_, addr) in addrs {
            self.send_reliable(packet.clone(), addr).await;
        }
    }

    /// Re-sends every pending lifecycle packet once.
    async fn flush_repeats(&mut self) {
        for repeat in &self.pending_repeats {
            self.send_packet(&repeat.packet, repeat.addr).await;
        }
        for repeat in &mut self.pending_repeats {
            repeat.remaining -= 1;
        }
        self.pending_repeats.retain(|repeat| repeat.remaining > 0);
    }

    async fn sender_is_admin(&self, addr: SocketAddr) -> bool {
        let sessions = self.sessions.read().await;
        sessions
            .find_by_addr(addr)
            .map(|session_id| sessions.is_admin(session_id))
            .unwrap_or(false)
    }

    /// Creature the sender's session is currently bound to, if any.
    async fn creature_of(&self, addr: SocketAddr) -> Option<u32> {
        let sessions = self.sessions.read().await;
        sessions
            .find_by_addr(addr)
            .and_then(|session_id| sessions.get(&session_id))
            .and_then(|session| session.creature)
    }

    /// Processes incoming packets and updates world state
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Join { name } => {
                let session_id = {
                    let sessions = self.sessions.read().await;
                    sessions.find_by_addr(addr)
                };
                let session_id = match session_id {
                    Some(session_id) => Some(session_id),
                    None => self.sessions.write().await.add_session(addr),
                };

                if let Some(session_id) = session_id {
                    // A repeated join replaces the creature this session
                    // already controls.
                    let existing = {
                        let sessions = self.sessions.read().await;
                        sessions
                            .get(&session_id)
                            .and_then(|session| session.creature)
                    };
                    if let Some(old_id) = existing {
                        info!("Replacing creature {} for session {}", old_id, session_id);
                        self.world.remove_creature(old_id);
                    }

                    let creature_id = self.world.spawn_player(&name, Instant::now(), &mut self.rng);
                    {
                        self.sessions
                            .write()
                            .await
                            .bind_creature(session_id, creature_id);
                    }
                    if let Some(creature) = self.world.creatures.get(&creature_id) {
                        info!("{} joined as creature {}", creature.name, creature_id);
                    }

                    let response = Packet::Init {
                        creature_id,
                        map_width: self.world.config.map_width,
                        map_height: self.world.config.map_height,
                        map_border: self.world.config.map_border,
                    };
                    self.send_reliable(response, addr).await;
                } else {
                    let response = Packet::Disconnected {
                        reason: "Server full".to_string(),
                    };
                    self.send_packet(&response, addr).await;
                }
            }

            Packet::ChangeDirection { direction } => {
                if let Some(creature_id) = self.creature_of(addr).await {
                    if let Some(creature) = self.world.creatures.get_mut(&creature_id) {
                        if creature.alive {
                            creature.set_heading(direction);
                        }
                    }
                }
            }

            Packet::Boost { active } => {
                if let Some(creature_id) = self.creature_of(addr).await {
                    if let Some(creature) = self.world.creatures.get_mut(&creature_id) {
                        if creature.alive {
                            creature.set_boosting(active, &self.world.config, Instant::now());
                        }
                    }
                }
            }

            Packet::AdminLogin { password } => {
                let session_id = {
                    let sessions = self.sessions.read().await;
                    sessions.find_by_addr(addr)
                };
                let session_id = match session_id {
                    Some(session_id) => Some(session_id),
                    None => self.sessions.write().await.add_session(addr),
                };

                if let Some(session_id) = session_id {
                    let granted = self
                        .world
                        .config
                        .admin_password
                        .as_deref()
                        .map(|secret| secret == password)
                        .unwrap_or(false);

                    // The submitted secret itself is never logged.
                    if granted {
                        self.sessions.write().await.grant_admin(session_id);
                        info!("Admin access granted to session {}", session_id);
                    } else {
                        warn!("Admin login rejected for session {}", session_id);
                    }
                    self.send_reliable(Packet::AdminAccess { granted }, addr).await;
                } else {
                    self.send_packet(&Packet::AdminAccess { granted: false }, addr)
                        .await;
                }
            }

            Packet::AddBot => {
                if self.sender_is_admin(addr).await {
                    let creature_id = self.world.spawn_bot(Instant::now(), &mut self.rng);
                    info!("Admin added bot {}", creature_id);
                    self.broadcast_reliable(Packet::BotCreated { creature_id })
                        .await;
                } else {
                    warn!("Unauthorized addBot from {}", addr);
                }
            }

            Packet::RemoveBot => {
                if self.sender_is_admin(addr).await {
                    // Takes the longest-lived bot; nothing to do when
                    // none are left.
                    if let Some(creature_id) = self.world.oldest_bot() {
                        self.world.remove_creature(creature_id);
                        info!("Admin removed bot {}", creature_id);
                        self.broadcast_reliable(Packet::BotRemoved { creature_id })
                            .await;
                    }
                } else {
                    warn!("Unauthorized removeBot from {}", addr);
                }
            }

            Packet::ModifyPlayer {
                target_name,
                amount,
            } => {
                if self.sender_is_admin(addr).await {
                    let config = self.world.config.clone();
                    if let Some(creature) = self.world.find_by_name(&target_name) {
                        if amount >= 0 {
                            creature.grow(amount as usize);
                        } else {
                            creature.shrink(amount.unsigned_abs() as usize, &config);
                        }
                        info!("Admin adjusted {} by {} segments", target_name, amount);
                    }
                } else {
                    warn!("Unauthorized modifyPlayer from {}", addr);
                }
            }

            Packet::Health => {
                let report = Packet::HealthReport {
                    creatures: self.world.living_creatures() as u32,
                    players: self.world.living_players() as u32,
                    bots: self.world.living_bots() as u32,
                };
                self.send_packet(&report, addr).await;
            }

            Packet::Disconnect => {
                let removed = {
                    let mut sessions = self.sessions.write().await;
                    sessions
                        .find_by_addr(addr)
                        .and_then(|session_id| sessions.remove_session(&session_id))
                };
                if let Some(session) = removed {
                    if let Some(creature_id) = session.creature {
                        self.world.remove_creature(creature_id);
                        info!("Removed creature {} after disconnect", creature_id);
                    }
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Relays what a tick did to the sessions it concerns.
    async fn handle_tick_events(&mut self, report: TickReport) {
        for event in report.events {
            match event {
                TickEvent::CreatureDied { id, score } => {
                    let owner_addr = {
                        let mut sessions = self.sessions.write().await;
                        sessions.unbind_creature(id).and_then(|session_id| {
                            sessions.get(&session_id).map(|session| session.addr)
                        })
                    };
                    if let Some(addr) = owner_addr {
                        self.send_reliable(Packet::Death { final_score: score }, addr)
                            .await;
                    }
                }
                // Bot arrivals reach clients through the next snapshot.
                TickEvent::BotSpawned { .. } => {}
            }
        }
    }

    /// Broadcasts the current world snapshot to all connected clients
    async fn broadcast_snapshot(&mut self) {
        let session_count = {
            let sessions = self.sessions.read().await;
            sessions.len()
        };

        if session_count == 0 {
            return;
        }

        let (creatures, foods) = self.world.build_snapshot();

        // Take timestamp as close to transmission as possible
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis();
        let timestamp_safe = (timestamp.min(u64::MAX as u128)) as u64;

        let packet = Packet::GameState {
            tick: self.world.tick,
            timestamp: timestamp_safe,
            creatures,
            foods,
        };

        self.broadcast_packet(&packet, None).await;
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);
        // An overlong tick drops its missed deadlines instead of
        // running catch-up ticks back to back.
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            {
                                self.sessions.write().await.touch(addr);
                            }
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::SessionTimeout { session }) => {
                            if let Some(creature_id) = session.creature {
                                self.world.remove_creature(creature_id);
                                info!(
                                    "Removed creature {} after session {} timed out",
                                    creature_id, session.id
                                );
                            }
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let report = game::step(&mut self.world, now, &mut self.rng);
                    self.handle_tick_events(report).await;
                    self.flush_repeats().await;
                    self.broadcast_snapshot().await;

                    // Periodic performance monitoring
                    if self.world.tick % 60 == 0 {
                        let session_count = {
                            let sessions = self.sessions.read().await;
                            sessions.len()
                        };

                        if session_count > 0 {
                            debug!(
                                "Tick {}: {} sessions, {} creatures, {} food items",
                                self.world.tick,
                                session_count,
                                self.world.living_creatures(),
                                self.world.food.len()
                            );
                        }
                    }
                },
            }
        }

        Ok(())
    }
}
