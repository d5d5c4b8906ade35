use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::info;

use super::directory::StudentDirectory;
use super::domain::{
    paginate, Allocation, AllocationId, AllocationStatus, DerivedAllocationStatus, Page, Paginated,
    PersonalityTraits, ProfileUpdate, RoomId, StudentId,
};
use super::error::AllocationError;
use super::registry::RoomRegistry;

/// Allocation counts by lifecycle status, used by the dashboard summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub vacated: usize,
}

/// The allocation state machine and the registry's single occupancy writer.
///
/// All allocation state sits behind one mutex, which serializes the
/// per-student duplicate-application check. Occupancy changes go through the
/// registry's atomic check-and-increment while the allocation entry is still
/// locked, so a failed increment leaves the allocation pending with no
/// partial state. Lock order is always ledger, then registry or directory.
pub struct AllocationLedger {
    state: Mutex<HashMap<AllocationId, Allocation>>,
    registry: Arc<RoomRegistry>,
    directory: Arc<StudentDirectory>,
    sequence: AtomicU64,
    session: String,
}

impl AllocationLedger {
    pub fn new(
        registry: Arc<RoomRegistry>,
        directory: Arc<StudentDirectory>,
        session: impl Into<String>,
    ) -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            registry,
            directory,
            sequence: AtomicU64::new(1),
            session: session.into(),
        }
    }

    fn next_allocation_id(&self) -> AllocationId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        AllocationId(format!("alloc-{id:06}"))
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Create a pending allocation for a student's preferred room.
    ///
    /// Occupancy is untouched here: a room may accumulate pending applicants
    /// beyond its capacity, and approval is the scarce-resource grant.
    pub fn apply(
        &self,
        student_id: &StudentId,
        room_id: &RoomId,
        profile: ProfileUpdate,
        traits: Option<PersonalityTraits>,
    ) -> Result<Allocation, AllocationError> {
        let mut state = self.state.lock().expect("ledger lock poisoned");

        if let Some(existing) = state
            .values()
            .find(|allocation| allocation.student_id == *student_id && allocation.status.is_active())
        {
            return Err(AllocationError::conflict(format!(
                "student {student_id} already has a {} allocation ({})",
                existing.status.label(),
                existing.id
            )));
        }

        self.registry.get_room(room_id)?;

        self.directory.upsert_profile(student_id, profile)?;
        if let Some(traits) = traits {
            self.directory.set_personality_traits(student_id, traits)?;
        }

        let allocation = Allocation {
            id: self.next_allocation_id(),
            student_id: student_id.clone(),
            room_id: Some(room_id.clone()),
            status: AllocationStatus::Pending,
            applied_at: Utc::now(),
            allocated_at: None,
            session: self.session.clone(),
        };
        state.insert(allocation.id.clone(), allocation.clone());

        info!(allocation = %allocation.id, student = %student_id, room = %room_id, "application received");
        Ok(allocation)
    }

    /// Approve a pending allocation, incrementing the room's occupancy.
    ///
    /// `assigned_room` overrides the applied-for room when provided (the
    /// requested room may have filled up in the meantime). This is the only
    /// path that increments occupancy, which keeps
    /// `occupied == count(approved allocations)` a standing invariant.
    pub fn approve(
        &self,
        id: &AllocationId,
        assigned_room: Option<&RoomId>,
    ) -> Result<Allocation, AllocationError> {
        let mut state = self.state.lock().expect("ledger lock poisoned");

        let (student_id, applied_room) = match state.get(id) {
            Some(allocation) if allocation.status == AllocationStatus::Pending => {
                (allocation.student_id.clone(), allocation.room_id.clone())
            }
            // Missing and already-decided allocations look the same to the
            // caller: there is no pending allocation under this id.
            _ => return Err(AllocationError::not_found("pending allocation", id)),
        };

        let room_id = assigned_room
            .cloned()
            .or(applied_room)
            .ok_or_else(|| {
                AllocationError::validation("roomId", "a room must be assigned before approval")
            })?;

        let student = self.directory.get(&student_id)?;
        let hostel_gender = self.registry.room_gender(&room_id)?;
        if hostel_gender != student.profile.gender {
            return Err(AllocationError::validation(
                "roomId",
                format!(
                    "room {room_id} belongs to a {} hostel but student {} is {}",
                    hostel_gender.label(),
                    student.profile.matric_number,
                    student.profile.gender.label()
                ),
            ));
        }

        // A full room fails here and the allocation stays pending untouched.
        self.registry.increment_occupancy(&room_id)?;

        let allocation = state.get_mut(id).expect("pending allocation checked above");
        allocation.room_id = Some(room_id.clone());
        allocation.status = AllocationStatus::Approved;
        allocation.allocated_at = Some(Utc::now());

        info!(allocation = %id, student = %student_id, room = %room_id, "allocation approved");
        Ok(allocation.clone())
    }

    pub fn reject(&self, id: &AllocationId) -> Result<Allocation, AllocationError> {
        let mut state = self.state.lock().expect("ledger lock poisoned");
        let allocation = state
            .get_mut(id)
            .ok_or_else(|| AllocationError::not_found("allocation", id))?;
        if allocation.status != AllocationStatus::Pending {
            return Err(AllocationError::conflict(format!(
                "allocation {id} is already {}",
                allocation.status.label()
            )));
        }

        allocation.status = AllocationStatus::Rejected;
        info!(allocation = %id, student = %allocation.student_id, "allocation rejected");
        Ok(allocation.clone())
    }

    /// Release an approved allocation's slot. The student may reapply.
    pub fn vacate(&self, id: &AllocationId) -> Result<Allocation, AllocationError> {
        let mut state = self.state.lock().expect("ledger lock poisoned");
        let allocation = state
            .get_mut(id)
            .ok_or_else(|| AllocationError::not_found("allocation", id))?;
        if allocation.status != AllocationStatus::Approved {
            return Err(AllocationError::conflict(format!(
                "allocation {id} is {}, only approved allocations can be vacated",
                allocation.status.label()
            )));
        }

        let room_id = allocation
            .room_id
            .clone()
            .expect("approved allocation always has a room");
        self.registry.decrement_occupancy(&room_id)?;
        allocation.status = AllocationStatus::Vacated;

        info!(allocation = %id, student = %allocation.student_id, room = %room_id, "allocation vacated");
        Ok(allocation.clone())
    }

    pub fn get(&self, id: &AllocationId) -> Result<Allocation, AllocationError> {
        let state = self.state.lock().expect("ledger lock poisoned");
        state
            .get(id)
            .cloned()
            .ok_or_else(|| AllocationError::not_found("allocation", id))
    }

    /// FIFO review queue: appliedAt ascending, id as tie-break, so admins see
    /// the longest-waiting applicants first.
    pub fn list_by_status(
        &self,
        filter: Option<AllocationStatus>,
        page: Page,
    ) -> Paginated<Allocation> {
        let state = self.state.lock().expect("ledger lock poisoned");
        let mut allocations: Vec<Allocation> = state
            .values()
            .filter(|allocation| filter.map_or(true, |status| allocation.status == status))
            .cloned()
            .collect();
        drop(state);

        allocations.sort_by(|a, b| a.applied_at.cmp(&b.applied_at).then_with(|| a.id.cmp(&b.id)));
        paginate(allocations, page)
    }

    pub fn allocations_for_student(&self, student_id: &StudentId) -> Vec<Allocation> {
        let state = self.state.lock().expect("ledger lock poisoned");
        let mut allocations: Vec<Allocation> = state
            .values()
            .filter(|allocation| allocation.student_id == *student_id)
            .cloned()
            .collect();
        drop(state);

        allocations.sort_by(|a, b| a.applied_at.cmp(&b.applied_at).then_with(|| a.id.cmp(&b.id)));
        allocations
    }

    /// Allocation status from the student's side: the active allocation wins;
    /// otherwise the most recent decision (vacated derives to `none`).
    pub fn status_for(&self, student_id: &StudentId) -> DerivedAllocationStatus {
        let history = self.allocations_for_student(student_id);
        for allocation in &history {
            match allocation.status {
                AllocationStatus::Pending => return DerivedAllocationStatus::Pending,
                AllocationStatus::Approved => return DerivedAllocationStatus::Approved,
                _ => {}
            }
        }
        match history.last().map(|allocation| allocation.status) {
            Some(AllocationStatus::Rejected) => DerivedAllocationStatus::Rejected,
            _ => DerivedAllocationStatus::None,
        }
    }

    /// Students currently approved into the given room.
    pub fn occupants(&self, room_id: &RoomId) -> Vec<StudentId> {
        let state = self.state.lock().expect("ledger lock poisoned");
        let mut occupants: Vec<StudentId> = state
            .values()
            .filter(|allocation| {
                allocation.status == AllocationStatus::Approved
                    && allocation.room_id.as_ref() == Some(room_id)
            })
            .map(|allocation| allocation.student_id.clone())
            .collect();
        occupants.sort();
        occupants
    }

    /// Deletion guard: does any pending or approved allocation reference one
    /// of these rooms?
    pub fn has_active_for_rooms(&self, rooms: &[RoomId]) -> bool {
        let state = self.state.lock().expect("ledger lock poisoned");
        state.values().any(|allocation| {
            allocation.status.is_active()
                && allocation
                    .room_id
                    .as_ref()
                    .map_or(false, |room| rooms.contains(room))
        })
    }

    pub fn counts_by_status(&self) -> StatusCounts {
        let state = self.state.lock().expect("ledger lock poisoned");
        let mut counts = StatusCounts::default();
        for allocation in state.values() {
            match allocation.status {
                AllocationStatus::Pending => counts.pending += 1,
                AllocationStatus::Approved => counts.approved += 1,
                AllocationStatus::Rejected => counts.rejected += 1,
                AllocationStatus::Vacated => counts.vacated += 1,
            }
        }
        counts
    }

    /// Every allocation, oldest first. Used by the CSV export.
    pub fn all(&self) -> Vec<Allocation> {
        let state = self.state.lock().expect("ledger lock poisoned");
        let mut allocations: Vec<Allocation> = state.values().cloned().collect();
        drop(state);

        allocations.sort_by(|a, b| a.applied_at.cmp(&b.applied_at).then_with(|| a.id.cmp(&b.id)));
        allocations
    }
}
