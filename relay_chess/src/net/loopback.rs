//! In-process relay.
//!
//! Keeps every client in the same process without touching the network
//! stack. Used for local play and for tests. The hub behaves like the
//! hosted relay:
//!
//! - the first two subscribers of a room are seated, white then black,
//!   and both receive `settings` with the starting position once the
//!   second one arrives
//! - moves are forwarded to every other subscriber of the room
//! - `reset` goes to the whole room once both seated players asked for a
//!   rematch, and the seats swap colors
//! - anyone else is a spectator and never receives `settings`

use async_trait::async_trait;
use log::{debug, info};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::mpsc;

use super::{
    errors::RelayError,
    messages::{ClientEvent, RelayEvent, Settings},
    relay::{RelayChannel, RelayConnector, Result},
};
use crate::game::entities::{Color, Position, RoomId};

type MemberId = u64;

#[derive(Debug)]
struct Member {
    id: MemberId,
    sender: mpsc::UnboundedSender<RelayEvent>,
}

#[derive(Debug, Default)]
struct Room {
    members: Vec<Member>,
    seats: HashMap<Color, MemberId>,
    rematch_requests: HashSet<Color>,
}

impl Room {
    fn seat_of(&self, id: MemberId) -> Option<Color> {
        self.seats
            .iter()
            .find_map(|(color, seated)| (*seated == id).then_some(*color))
    }

    fn send_to(&self, id: MemberId, event: RelayEvent) {
        if let Some(member) = self.members.iter().find(|member| member.id == id) {
            // A closed receiver means the channel is being dropped; the
            // member is removed right after.
            let _ = member.sender.send(event);
        }
    }

    fn broadcast(&self, from: Option<MemberId>, event: &RelayEvent) {
        for member in &self.members {
            if Some(member.id) != from {
                let _ = member.sender.send(event.clone());
            }
        }
    }

    fn join(&mut self, member: Member) -> Option<Color> {
        let id = member.id;
        self.members.push(member);
        let color = [Color::White, Color::Black]
            .into_iter()
            .find(|color| !self.seats.contains_key(color))?;
        self.seats.insert(color, id);
        if self.seats.len() == 2 {
            self.start_game();
        }
        Some(color)
    }

    fn start_game(&mut self) {
        self.rematch_requests.clear();
        for (color, id) in &self.seats {
            self.send_to(
                *id,
                RelayEvent::Settings(Settings {
                    position: Position::initial(),
                    color: *color,
                }),
            );
        }
    }

    fn leave(&mut self, id: MemberId) {
        self.members.retain(|member| member.id != id);
        if let Some(color) = self.seat_of(id) {
            self.seats.remove(&color);
            self.rematch_requests.clear();
        }
    }

    fn handle(&mut self, from: MemberId, event: &ClientEvent) {
        match event {
            ClientEvent::Move(mv) => self.broadcast(Some(from), &RelayEvent::Move(mv.clone())),
            ClientEvent::RematchRequest(_) => {
                // Spectators can't ask for a rematch; the seat decides
                // which request this is, not the payload.
                let Some(color) = self.seat_of(from) else {
                    return;
                };
                self.rematch_requests.insert(color);
                if self.rematch_requests.len() == 2 {
                    self.rematch_requests.clear();
                    self.seats = self
                        .seats
                        .drain()
                        .map(|(color, id)| (color.opposite(), id))
                        .collect();
                    self.broadcast(None, &RelayEvent::Reset);
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct HubState {
    next_id: MemberId,
    rooms: HashMap<RoomId, Room>,
}

fn lock(hub: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
    hub.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-process relay hub. Cheap to clone; clones share the same rooms.
#[derive(Clone, Debug, Default)]
pub struct LoopbackRelay {
    hub: Arc<Mutex<HubState>>,
}

impl LoopbackRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions to `room_id`.
    #[must_use]
    pub fn subscriber_count(&self, room_id: &RoomId) -> usize {
        lock(&self.hub)
            .rooms
            .get(room_id)
            .map_or(0, |room| room.members.len())
    }

    /// Colors currently seated in `room_id`, white first.
    #[must_use]
    pub fn seated_colors(&self, room_id: &RoomId) -> Vec<Color> {
        let hub = lock(&self.hub);
        let mut colors: Vec<Color> = hub
            .rooms
            .get(room_id)
            .map(|room| room.seats.keys().copied().collect())
            .unwrap_or_default();
        colors.sort_by_key(|color| *color == Color::Black);
        colors
    }
}

#[async_trait]
impl RelayConnector for LoopbackRelay {
    type Channel = LoopbackChannel;

    async fn subscribe(&self, room_id: &RoomId) -> Result<LoopbackChannel> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut hub = lock(&self.hub);
        let id = hub.next_id;
        hub.next_id += 1;
        let room = hub.rooms.entry(room_id.clone()).or_default();
        match room.join(Member { id, sender }) {
            Some(color) => info!("loopback {room_id}: subscriber {id} seated as {color}"),
            None => info!("loopback {room_id}: subscriber {id} joined as spectator"),
        }
        Ok(LoopbackChannel {
            id,
            room_id: room_id.clone(),
            hub: Arc::clone(&self.hub),
            receiver,
            closed: false,
        })
    }
}

/// One subscription to a [`LoopbackRelay`] room.
#[derive(Debug)]
pub struct LoopbackChannel {
    id: MemberId,
    room_id: RoomId,
    hub: Arc<Mutex<HubState>>,
    receiver: mpsc::UnboundedReceiver<RelayEvent>,
    closed: bool,
}

impl LoopbackChannel {
    fn unsubscribe(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.receiver.close();
        let mut hub = lock(&self.hub);
        if let Some(room) = hub.rooms.get_mut(&self.room_id) {
            room.leave(self.id);
            if room.members.is_empty() {
                hub.rooms.remove(&self.room_id);
            }
        }
        debug!("loopback {}: subscriber {} left", self.room_id, self.id);
    }
}

#[async_trait]
impl RelayChannel for LoopbackChannel {
    async fn publish(&mut self, event: &ClientEvent) -> Result<()> {
        if self.closed {
            return Err(RelayError::Closed);
        }
        let mut hub = lock(&self.hub);
        let room = hub
            .rooms
            .get_mut(&self.room_id)
            .ok_or(RelayError::Closed)?;
        room.handle(self.id, event);
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<RelayEvent>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.receiver.recv().await)
    }

    async fn close(&mut self) -> Result<()> {
        self.unsubscribe();
        Ok(())
    }
}

impl Drop for LoopbackChannel {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
