use std::net::SocketAddrV4;
use std::time::{Duration, Instant};

pub const MAX_CLIENTS_LIMIT: u32 = 1024;
pub const DEFAULT_MAX_CLIENTS: u32 = 32;

#[derive(Debug, Clone)]
pub struct Peer {
    pub addr: SocketAddrV4,
    pub last_receive_time: Instant,
}

impl Peer {
    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_receive_time) > timeout
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_receive_time = now;
    }
}

/// Fixed-capacity slot arena. A slot's index is the client id seen on the
/// wire; `None` marks a free slot.
#[derive(Debug)]
pub struct PeerTable {
    slots: Vec<Option<Peer>>,
    count: usize,
    sweep_index: usize,
}

impl PeerTable {
    pub fn new(capacity: u32) -> Self {
        let capacity = capacity.clamp(1, MAX_CLIENTS_LIMIT) as usize;
        Self {
            slots: vec![None; capacity],
            count: 0,
            sweep_index: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, client_id: u32) -> Option<&Peer> {
        self.slots.get(client_id as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, client_id: u32) -> Option<&mut Peer> {
        self.slots.get_mut(client_id as usize).and_then(Option::as_mut)
    }

    pub fn find(&self, addr: &SocketAddrV4) -> Option<u32> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|peer| peer.addr == *addr))
            .map(|index| index as u32)
    }

    /// Claims the lowest free slot for `addr`.
    pub fn insert(&mut self, addr: SocketAddrV4, now: Instant) -> Option<u32> {
        let index = self.slots.iter().position(Option::is_none)?;
        self.slots[index] = Some(Peer {
            addr,
            last_receive_time: now,
        });
        self.count += 1;
        Some(index as u32)
    }

    pub fn remove(&mut self, client_id: u32) -> Option<Peer> {
        let peer = self.slots.get_mut(client_id as usize)?.take()?;
        self.count -= 1;
        Some(peer)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Peer)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|peer| (index as u32, peer)))
    }

    pub fn drain(&mut self) -> Vec<(u32, Peer)> {
        self.count = 0;
        self.sweep_index = 0;
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.take().map(|peer| (index as u32, peer)))
            .collect()
    }

    /// Continues the current sweep from where the last call stopped. Evicts
    /// and returns the first timed-out peer found, or returns `None` once the
    /// end of the table is reached, which also rewinds the cursor.
    pub fn sweep_next(&mut self, now: Instant, timeout: Duration) -> Option<u32> {
        while self.sweep_index < self.slots.len() {
            let index = self.sweep_index;
            self.sweep_index += 1;

            let expired = self.slots[index]
                .as_ref()
                .is_some_and(|peer| peer.is_timed_out(now, timeout));
            if expired {
                self.slots[index] = None;
                self.count -= 1;
                return Some(index as u32);
            }
        }

        self.sweep_index = 0;
        None
    }

    #[cfg(test)]
    pub fn sweep_position(&self) -> usize {
        self.sweep_index
    }
}
