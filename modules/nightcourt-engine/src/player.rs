//! Participants and the per-game registry of them.
//!
//! A player exists before it belongs to a game (the connection owns it until
//! `create`/`join`); afterwards the game's registry owns it and connection
//! tasks refer to it by id. Eliminated players stay in the registry, hidden
//! from every query except the with-out views, so the game-over broadcast
//! and reconnection can still reach them.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use nightcourt_common::{Action, Message, Role, Status};

/// Outbound buffer per connection. Producers never block on it; a full
/// buffer drops the message.
pub const OUTBOUND_BUFFER: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl PlayerId {
    pub fn random() -> Self {
        Self(rand::thread_rng().gen())
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub struct Player {
    id: PlayerId,
    name: String,
    role: Option<Role>,
    master: bool,
    out: bool,
    addr: Option<String>,
    created_at: DateTime<Utc>,
    tx: mpsc::Sender<Message>,
    last_sent: Option<Message>,
    last_received: Option<Message>,
}

impl Player {
    pub fn new(tx: mpsc::Sender<Message>) -> Self {
        Self {
            id: PlayerId::random(),
            name: String::new(),
            role: None,
            master: false,
            out: false,
            addr: None,
            created_at: Utc::now(),
            tx,
            last_sent: None,
            last_received: None,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = Some(role);
    }

    pub fn master(&self) -> bool {
        self.master
    }

    pub fn set_master(&mut self, master: bool) {
        self.master = master;
    }

    pub fn out(&self) -> bool {
        self.out
    }

    pub fn set_out(&mut self, out: bool) {
        self.out = out;
    }

    pub fn addr(&self) -> Option<&str> {
        self.addr.as_deref()
    }

    pub fn set_addr(&mut self, addr: impl Into<String>) {
        self.addr = Some(addr.into());
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_sent(&self) -> Option<&Message> {
        self.last_sent.as_ref()
    }

    pub fn last_received(&self) -> Option<&Message> {
        self.last_received.as_ref()
    }

    pub fn set_last_received(&mut self, msg: Message) {
        self.last_received = Some(msg);
    }

    /// Best-effort delivery to this player's connection.
    ///
    /// Non-error, non-vote messages are retained so a reconnecting client
    /// can be replayed into the current phase.
    pub fn send(&mut self, msg: &Message) {
        if msg.status != Some(Status::Err) && msg.action != Action::Vote {
            self.last_sent = Some(msg.clone());
        }

        if let Err(err) = self.tx.try_send(msg.clone()) {
            tracing::warn!(player = %self.id, action = %msg.action, error = %err, "dropping outbound message");
        }
    }

    /// Take over another player's identity. Used on reconnect: the fresh
    /// connection's player adopts everything except its own channel,
    /// address and creation time.
    pub fn adopt(&mut self, old: Player) {
        self.id = old.id;
        self.name = old.name;
        self.role = old.role;
        self.master = old.master;
        self.out = old.out;
        self.last_sent = old.last_sent;
        self.last_received = old.last_received;
    }
}

/// The `{username, id}` list sent with `players` messages.
pub fn roster<'a>(players: impl Iterator<Item = &'a Player>) -> Value {
    Value::Array(
        players
            .map(|p| json!({"username": p.name(), "id": p.id()}))
            .collect(),
    )
}

/// The ordered collection of a game's participants.
#[derive(Debug, Default)]
pub struct Players {
    data: Vec<Player>,
}

impl Players {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a player, re-rolling its id until unique within this game.
    /// Returns the id the player ended up with.
    pub fn add(&mut self, mut player: Player) -> PlayerId {
        while self.data.iter().any(|p| p.id == player.id) {
            player.id = PlayerId::random();
        }
        let id = player.id;
        self.data.push(player);
        id
    }

    /// Remove by id regardless of the out flag.
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let index = self.data.iter().position(|p| p.id == id)?;
        Some(self.data.remove(index))
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.data.iter().find(|p| p.id == id && !p.out)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.data.iter_mut().find(|p| p.id == id && !p.out)
    }

    pub fn get_with_out(&self, id: PlayerId) -> Option<&Player> {
        self.data.iter().find(|p| p.id == id)
    }

    pub fn get_with_out_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.data.iter_mut().find(|p| p.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Player> {
        self.data.iter().find(|p| p.name == name && !p.out)
    }

    pub fn one_by_role(&self, role: Role) -> Option<&Player> {
        self.data.iter().find(|p| p.role == Some(role) && !p.out)
    }

    pub fn role_count(&self, role: Role) -> usize {
        self.data
            .iter()
            .filter(|p| p.role == Some(role) && !p.out)
            .count()
    }

    pub fn active(&self) -> impl Iterator<Item = &Player> {
        self.data.iter().filter(|p| !p.out)
    }

    pub fn active_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.data.iter_mut().filter(|p| !p.out)
    }

    pub fn with_out(&self) -> impl Iterator<Item = &Player> {
        self.data.iter()
    }

    pub fn len_active(&self) -> usize {
        self.active().count()
    }

    pub fn ids_active(&self) -> Vec<PlayerId> {
        self.active().map(|p| p.id).collect()
    }

    pub fn ids_by_role(&self, role: Role) -> Vec<PlayerId> {
        self.active()
            .filter(|p| p.role == Some(role))
            .map(|p| p.id)
            .collect()
    }

    pub fn ids_with_out(&self) -> Vec<PlayerId> {
        self.data.iter().map(|p| p.id).collect()
    }

    pub fn broadcast_active(&mut self, msg: &Message) {
        for player in self.active_mut() {
            player.send(msg);
        }
    }

    pub fn broadcast_with_out(&mut self, msg: &Message) {
        for player in &mut self.data {
            player.send(msg);
        }
    }

    pub fn send_to_role(&mut self, role: Role, msg: &Message) {
        for player in self.active_mut().filter(|p| p.role() == Some(role)) {
            player.send(msg);
        }
    }

    /// Deliver to one player, eliminated or not. Silently a no-op when the
    /// id is unknown.
    pub fn send_to(&mut self, id: PlayerId, msg: &Message) {
        if let Some(player) = self.get_with_out_mut(id) {
            player.send(msg);
        }
    }
}
