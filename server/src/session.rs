//! Session management for the arena gateway
//!
//! This module handles the server-side bookkeeping of connected clients:
//! - Session lifecycle (open, close, timeout)
//! - The binding between a session and the creature it controls
//! - The admin capability granted through the shared-secret login
//! - Capacity enforcement and address tracking for broadcasts
//!
//! A session is the unit of trust: intents mutate only the creature the
//! sender's session is bound to, and admin operations require the admin
//! flag on the sending session itself.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// How long a silent session survives before the sweep closes it.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(5);

/// One connected client and what it is allowed to drive
///
/// Each session tracks:
/// - Connection metadata (ID, address, last activity)
/// - The creature this client currently controls, if any
/// - Whether the shared-secret login elevated it to admin
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Creature this session controls; None before join or after death
    pub creature: Option<u32>,
    /// True once an adminLogin with the right secret succeeded
    pub admin: bool,
}

impl Session {
    /// Creates a new session for the given network address
    ///
    /// The session starts recently active, controls no creature and
    /// carries no admin capability.
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            creature: None,
            admin: false,
        }
    }

    /// Checks if the session has exceeded the connection timeout
    ///
    /// Returns true if no packets have been received from this client
    /// within the given duration, indicating a likely disconnect.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected sessions
///
/// The SessionManager provides centralized control over who is
/// connected, enforces the capacity limit, answers reverse lookups
/// (address to session, creature to session) and sweeps out sessions
/// that went silent. All of its state is mutated from the single game
/// loop, so it needs no interior locking of its own.
pub struct SessionManager {
    /// Open sessions indexed by their unique ID
    sessions: HashMap<u32, Session>,
    /// Next available session ID for new connections
    next_session_id: u32,
    /// Maximum number of concurrent sessions allowed
    max_sessions: usize,
}

impl SessionManager {
    /// Creates a new session manager with the specified capacity limit
    ///
    /// Session IDs start from 1 and increment for each new connection;
    /// an ID is never handed out twice.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            next_session_id: 1,
            max_sessions,
        }
    }

    /// Attempts to open a session for a new address
    ///
    /// Returns Some(session_id) if successful, None if the server is at
    /// capacity. Logs the new connection for server monitoring.
    pub fn add_session(&mut self, addr: SocketAddr) -> Option<u32> {
        // Enforce server capacity limits
        if self.sessions.len() >= self.max_sessions {
            return None;
        }

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let session = Session::new(session_id, addr);
        info!("Session {} opened from {}", session_id, addr);
        self.sessions.insert(session_id, session);

        Some(session_id)
    }

    /// Closes a session and returns its final record
    ///
    /// The record is handed back rather than discarded so the caller
    /// can clean up the creature the session was bound to. Returns None
    /// if the session was already gone.
    pub fn remove_session(&mut self, session_id: &u32) -> Option<Session> {
        let session = self.sessions.remove(session_id);
        if let Some(session) = &session {
            info!("Session {} closed", session.id);
        }
        session
    }

    /// Finds a session ID by its network address
    ///
    /// Used to associate incoming packets with existing sessions.
    /// Returns None if no session is open for the given address.
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.sessions
            .iter()
            .find(|(_, session)| session.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Finds the session currently bound to a creature
    pub fn find_by_creature(&self, creature_id: u32) -> Option<u32> {
        self.sessions
            .iter()
            .find(|(_, session)| session.creature == Some(creature_id))
            .map(|(id, _)| *id)
    }

    /// Refreshes the activity timestamp of the session behind an address
    ///
    /// Called for every packet received, so only truly silent clients
    /// reach the timeout sweep. Returns the session ID when one exists.
    pub fn touch(&mut self, addr: SocketAddr) -> Option<u32> {
        let id = self.find_by_addr(addr)?;
        if let Some(session) = self.sessions.get_mut(&id) {
            session.last_seen = Instant::now();
        }
        Some(id)
    }

    pub fn get(&self, session_id: &u32) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn get_mut(&mut self, session_id: &u32) -> Option<&mut Session> {
        self.sessions.get_mut(session_id)
    }

    /// Binds a session to the creature it will control
    pub fn bind_creature(&mut self, session_id: u32, creature_id: u32) -> bool {
        if let Some(session) = self.sessions.get_mut(&session_id) {
            session.creature = Some(creature_id);
            true
        } else {
            false
        }
    }

    /// Clears the binding for a creature that no longer exists
    ///
    /// Returns the session that held it, so the caller can notify the
    /// owner. A creature is bound to at most one session.
    pub fn unbind_creature(&mut self, creature_id: u32) -> Option<u32> {
        let id = self.find_by_creature(creature_id)?;
        if let Some(session) = self.sessions.get_mut(&id) {
            session.creature = None;
        }
        Some(id)
    }

    /// Grants the admin capability to a session
    pub fn grant_admin(&mut self, session_id: u32) -> bool {
        if let Some(session) = self.sessions.get_mut(&session_id) {
            session.admin = true;
            true
        } else {
            false
        }
    }

    pub fn is_admin(&self, session_id: u32) -> bool {
        self.sessions
            .get(&session_id)
            .map(|session| session.admin)
            .unwrap_or(false)
    }

    /// Checks for and removes timed-out sessions
    ///
    /// Automatically closes sessions that haven't sent packets within
    /// the timeout threshold. The removed records are returned with
    /// their creature bindings intact so the game loop can delete the
    /// orphaned creatures as well.
    pub fn check_timeouts(&mut self) -> Vec<Session> {
        let timed_out: Vec<u32> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.is_timed_out(SESSION_TIMEOUT))
            .map(|(id, _)| *id)
            .collect();

        timed_out
            .iter()
            .filter_map(|session_id| self.remove_session(session_id))
            .collect()
    }

    /// Gets all session IDs and their network addresses
    ///
    /// Used for broadcasting snapshots to every connected client during
    /// the server's main game loop.
    pub fn session_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.sessions
            .iter()
            .map(|(id, session)| (*id, session.addr))
            .collect()
    }

    /// Returns the number of currently open sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no sessions are currently open
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
