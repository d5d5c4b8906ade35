use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use super::domain::{
    Gender, Hostel, HostelId, HostelSummary, HostelUpdate, NewHostel, NewRoom, Room, RoomId,
    RoomUpdate,
};
use super::error::AllocationError;

/// Owns hostel and room records, including the live occupancy counters.
///
/// Occupancy is mutated only through `increment_occupancy` /
/// `decrement_occupancy`, which are crate-private so the Allocation Ledger is
/// the single writer. The full-room check and the increment happen under one
/// write lock, which is what makes approval races for the last slot
/// serialize.
pub struct RoomRegistry {
    state: RwLock<RegistryState>,
    hostel_sequence: AtomicU64,
    room_sequence: AtomicU64,
}

#[derive(Default)]
struct RegistryState {
    hostels: HashMap<HostelId, Hostel>,
    rooms: HashMap<RoomId, Room>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            hostel_sequence: AtomicU64::new(1),
            room_sequence: AtomicU64::new(1),
        }
    }

    fn next_hostel_id(&self) -> HostelId {
        let id = self.hostel_sequence.fetch_add(1, Ordering::Relaxed);
        HostelId(format!("hst-{id:06}"))
    }

    fn next_room_id(&self) -> RoomId {
        let id = self.room_sequence.fetch_add(1, Ordering::Relaxed);
        RoomId(format!("room-{id:06}"))
    }

    pub fn create_hostel(&self, new_hostel: NewHostel) -> Result<Hostel, AllocationError> {
        let name = new_hostel.name.trim().to_string();
        if name.is_empty() {
            return Err(AllocationError::validation("name", "must not be empty"));
        }
        if new_hostel.capacity == 0 {
            return Err(AllocationError::validation(
                "capacity",
                "must be at least 1",
            ));
        }

        let hostel = Hostel {
            id: self.next_hostel_id(),
            name,
            gender: new_hostel.gender,
            declared_capacity: new_hostel.capacity,
            description: new_hostel.description,
            maintenance_count: 0,
        };

        let mut state = self.state.write().expect("registry lock poisoned");
        state.hostels.insert(hostel.id.clone(), hostel.clone());
        Ok(hostel)
    }

    pub fn update_hostel(
        &self,
        id: &HostelId,
        update: HostelUpdate,
    ) -> Result<Hostel, AllocationError> {
        let mut state = self.state.write().expect("registry lock poisoned");
        if !state.hostels.contains_key(id) {
            return Err(AllocationError::not_found("hostel", id));
        }

        if let Some(new_gender) = update.gender {
            let current = state.hostels.get(id).expect("presence checked above");
            let occupied = state
                .rooms
                .values()
                .any(|room| room.hostel_id == *id && room.occupied > 0);
            if new_gender != current.gender && occupied {
                return Err(AllocationError::conflict(format!(
                    "hostel {id} has occupants; gender type cannot change"
                )));
            }
        }

        let hostel = state.hostels.get_mut(id).expect("presence checked above");
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AllocationError::validation("name", "must not be empty"));
            }
            hostel.name = name;
        }
        if let Some(gender) = update.gender {
            hostel.gender = gender;
        }
        if let Some(description) = update.description {
            hostel.description = Some(description);
        }
        if let Some(count) = update.maintenance_count {
            hostel.maintenance_count = count;
        }

        Ok(hostel.clone())
    }

    /// Remove a hostel and its rooms. Refused while any room is occupied;
    /// the workflow layer additionally refuses while pending allocations
    /// still reference its rooms.
    pub fn delete_hostel(&self, id: &HostelId) -> Result<(), AllocationError> {
        let mut state = self.state.write().expect("registry lock poisoned");
        if !state.hostels.contains_key(id) {
            return Err(AllocationError::not_found("hostel", id));
        }

        if let Some(room) = state
            .rooms
            .values()
            .find(|room| room.hostel_id == *id && room.occupied > 0)
        {
            return Err(AllocationError::conflict(format!(
                "room {} in hostel {id} still has {} occupant(s)",
                room.room_number, room.occupied
            )));
        }

        state.rooms.retain(|_, room| room.hostel_id != *id);
        state.hostels.remove(id);
        Ok(())
    }

    pub fn add_room(&self, hostel_id: &HostelId, new_room: NewRoom) -> Result<Room, AllocationError> {
        let room_number = new_room.room_number.trim().to_string();
        if room_number.is_empty() {
            return Err(AllocationError::validation(
                "roomNumber",
                "must not be empty",
            ));
        }
        if new_room.capacity == 0 {
            return Err(AllocationError::validation(
                "capacity",
                "must be at least 1",
            ));
        }

        let mut state = self.state.write().expect("registry lock poisoned");
        if !state.hostels.contains_key(hostel_id) {
            return Err(AllocationError::not_found("hostel", hostel_id));
        }
        if state
            .rooms
            .values()
            .any(|room| room.hostel_id == *hostel_id && room.room_number == room_number)
        {
            return Err(AllocationError::conflict(format!(
                "room number {room_number} already exists in hostel {hostel_id}"
            )));
        }

        let room = Room {
            id: self.next_room_id(),
            hostel_id: hostel_id.clone(),
            room_number,
            room_type: new_room.room_type,
            capacity: new_room.capacity,
            occupied: 0,
        };
        state.rooms.insert(room.id.clone(), room.clone());
        Ok(room)
    }

    pub fn update_room(&self, id: &RoomId, update: RoomUpdate) -> Result<Room, AllocationError> {
        let mut state = self.state.write().expect("registry lock poisoned");
        let room = state
            .rooms
            .get_mut(id)
            .ok_or_else(|| AllocationError::not_found("room", id))?;

        if let Some(capacity) = update.capacity {
            if capacity == 0 {
                return Err(AllocationError::validation(
                    "capacity",
                    "must be at least 1",
                ));
            }
            if capacity < room.occupied {
                return Err(AllocationError::validation(
                    "capacity",
                    format!(
                        "cannot shrink below current occupancy ({} occupant(s))",
                        room.occupied
                    ),
                ));
            }
            room.capacity = capacity;
        }
        if let Some(room_type) = update.room_type {
            room.room_type = room_type;
        }

        Ok(room.clone())
    }

    pub fn delete_room(&self, id: &RoomId) -> Result<(), AllocationError> {
        let mut state = self.state.write().expect("registry lock poisoned");
        let room = state
            .rooms
            .get(id)
            .ok_or_else(|| AllocationError::not_found("room", id))?;
        if room.occupied > 0 {
            return Err(AllocationError::conflict(format!(
                "room {} still has {} occupant(s)",
                room.room_number, room.occupied
            )));
        }
        state.rooms.remove(id);
        Ok(())
    }

    pub fn get_hostel(&self, id: &HostelId) -> Result<Hostel, AllocationError> {
        let state = self.state.read().expect("registry lock poisoned");
        state
            .hostels
            .get(id)
            .cloned()
            .ok_or_else(|| AllocationError::not_found("hostel", id))
    }

    pub fn get_room(&self, id: &RoomId) -> Result<Room, AllocationError> {
        let state = self.state.read().expect("registry lock poisoned");
        state
            .rooms
            .get(id)
            .cloned()
            .ok_or_else(|| AllocationError::not_found("room", id))
    }

    /// Gender type of the hostel owning the given room.
    pub fn room_gender(&self, id: &RoomId) -> Result<Gender, AllocationError> {
        let state = self.state.read().expect("registry lock poisoned");
        let room = state
            .rooms
            .get(id)
            .ok_or_else(|| AllocationError::not_found("room", id))?;
        let hostel = state
            .hostels
            .get(&room.hostel_id)
            .ok_or_else(|| AllocationError::not_found("hostel", &room.hostel_id))?;
        Ok(hostel.gender)
    }

    pub fn list_hostels(&self) -> Vec<Hostel> {
        let state = self.state.read().expect("registry lock poisoned");
        let mut hostels: Vec<Hostel> = state.hostels.values().cloned().collect();
        hostels.sort_by(|a, b| a.id.cmp(&b.id));
        hostels
    }

    pub fn hostel_summaries(&self) -> Vec<HostelSummary> {
        let state = self.state.read().expect("registry lock poisoned");
        let mut summaries: Vec<HostelSummary> = state
            .hostels
            .values()
            .map(|hostel| {
                let rooms: Vec<&Room> = state
                    .rooms
                    .values()
                    .filter(|room| room.hostel_id == hostel.id)
                    .collect();
                let capacity: u32 = rooms.iter().map(|room| room.capacity).sum();
                let occupied: u32 = rooms.iter().map(|room| room.occupied).sum();
                // Before any room exists the declared intake figure is all we have.
                let capacity = if rooms.is_empty() {
                    hostel.declared_capacity
                } else {
                    capacity
                };

                HostelSummary {
                    id: hostel.id.clone(),
                    name: hostel.name.clone(),
                    gender: hostel.gender,
                    rooms: rooms.len(),
                    capacity,
                    occupied,
                    available: capacity.saturating_sub(occupied),
                    maintenance_count: hostel.maintenance_count,
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    pub fn rooms_in_hostel(&self, hostel_id: &HostelId) -> Result<Vec<Room>, AllocationError> {
        let state = self.state.read().expect("registry lock poisoned");
        if !state.hostels.contains_key(hostel_id) {
            return Err(AllocationError::not_found("hostel", hostel_id));
        }
        let mut rooms: Vec<Room> = state
            .rooms
            .values()
            .filter(|room| room.hostel_id == *hostel_id)
            .cloned()
            .collect();
        rooms.sort_by_key(|room| room_number_key(&room.room_number));
        Ok(rooms)
    }

    /// Rooms in the hostel with free slots, room-number ascending. The
    /// iterator is a snapshot: finite, restartable by calling again.
    pub fn available_rooms(
        &self,
        hostel_id: &HostelId,
    ) -> Result<impl Iterator<Item = Room>, AllocationError> {
        let rooms = self.rooms_in_hostel(hostel_id)?;
        Ok(rooms
            .into_iter()
            .filter(|room| room.occupied < room.capacity))
    }

    pub fn all_rooms(&self) -> Vec<Room> {
        let state = self.state.read().expect("registry lock poisoned");
        let mut rooms: Vec<Room> = state.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| {
            a.hostel_id
                .cmp(&b.hostel_id)
                .then_with(|| room_number_key(&a.room_number).cmp(&room_number_key(&b.room_number)))
        });
        rooms
    }

    pub fn hostel_count(&self) -> usize {
        self.state
            .read()
            .expect("registry lock poisoned")
            .hostels
            .len()
    }

    pub fn room_count(&self) -> usize {
        self.state
            .read()
            .expect("registry lock poisoned")
            .rooms
            .len()
    }

    /// Derived bed totals across all rooms: (capacity, occupied).
    pub fn bed_totals(&self) -> (u32, u32) {
        let state = self.state.read().expect("registry lock poisoned");
        state.rooms.values().fold((0, 0), |(capacity, occupied), room| {
            (capacity + room.capacity, occupied + room.occupied)
        })
    }

    /// Atomic check-and-increment of a room's occupancy. Called only by the
    /// Allocation Ledger on approval.
    pub(crate) fn increment_occupancy(&self, id: &RoomId) -> Result<u32, AllocationError> {
        let mut state = self.state.write().expect("registry lock poisoned");
        let room = state
            .rooms
            .get_mut(id)
            .ok_or_else(|| AllocationError::not_found("room", id))?;
        if room.occupied >= room.capacity {
            return Err(AllocationError::CapacityExceeded {
                room: room.room_number.clone(),
            });
        }
        room.occupied += 1;
        Ok(room.occupied)
    }

    /// Counterpart of `increment_occupancy`, called only on vacate.
    pub(crate) fn decrement_occupancy(&self, id: &RoomId) -> Result<u32, AllocationError> {
        let mut state = self.state.write().expect("registry lock poisoned");
        let room = state
            .rooms
            .get_mut(id)
            .ok_or_else(|| AllocationError::not_found("room", id))?;
        if room.occupied == 0 {
            return Err(AllocationError::conflict(format!(
                "room {} has no occupants to release",
                room.room_number
            )));
        }
        room.occupied -= 1;
        Ok(room.occupied)
    }
}

/// Sort key for room numbers: numeric ordering when the number parses,
/// lexicographic otherwise, numerics first.
fn room_number_key(number: &str) -> (u8, u32, String) {
    match number.parse::<u32>() {
        Ok(value) => (0, value, number.to_string()),
        Err(_) => (1, 0, number.to_string()),
    }
}
