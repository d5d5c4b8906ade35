use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::compatibility::{self, CompatibilityScore};
use super::directory::StudentDirectory;
use super::domain::{
    paginate, Allocation, AllocationId, AllocationStatus, DerivedAllocationStatus, HostelId, Page,
    Paginated, PersonalityTraits, Room, RoomId, Student, StudentId, StudentProfile,
};
use super::error::AllocationError;
use super::ledger::AllocationLedger;
use super::registry::RoomRegistry;
use super::reports::{self, DashboardSummary, ExportKind};

/// Transient failures are retried this many times before giving up.
const TRANSIENT_RETRIES: usize = 2;

/// Domain events emitted after a decision lands. Collaborators (notification
/// adapters, audit sinks) subscribe through `EventPublisher`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AllocationEvent {
    #[serde(rename_all = "camelCase")]
    AllocationApproved {
        allocation_id: AllocationId,
        student_id: StudentId,
        room_id: RoomId,
        at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    AllocationRejected {
        allocation_id: AllocationId,
        student_id: StudentId,
        at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    AllocationVacated {
        allocation_id: AllocationId,
        student_id: StudentId,
        room_id: RoomId,
        at: DateTime<Utc>,
    },
}

/// Outbound event hook (e.g. notification or audit adapters).
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: AllocationEvent) -> Result<(), AllocationError>;
}

/// A pending allocation joined with its applicant and gender-matched room
/// suggestions for the admin review queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReview {
    pub allocation: Allocation,
    pub student: Student,
    pub suggested_rooms: Vec<SuggestedRoom>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedRoom {
    #[serde(flatten)]
    pub room: Room,
    /// Mean compatibility with the room's current occupants, when both sides
    /// have recorded traits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roommate_fit: Option<u8>,
}

/// A compatibility-ranked roommate suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSuggestion {
    pub student: Student,
    pub compatibility: CompatibilityScore,
}

/// Student row joined with the ledger-derived allocation status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStanding {
    #[serde(flatten)]
    pub student: Student,
    pub allocation_status: DerivedAllocationStatus,
}

/// Orchestrates admin decisions over the ledger and registry, publishes
/// domain events, and keeps the cross-component guards (gender matching,
/// deletion constraints) in one place.
pub struct AdminWorkflowController<P> {
    registry: Arc<RoomRegistry>,
    directory: Arc<StudentDirectory>,
    ledger: Arc<AllocationLedger>,
    events: Arc<P>,
}

impl<P: EventPublisher> AdminWorkflowController<P> {
    pub fn new(
        registry: Arc<RoomRegistry>,
        directory: Arc<StudentDirectory>,
        ledger: Arc<AllocationLedger>,
        events: Arc<P>,
    ) -> Self {
        Self {
            registry,
            directory,
            ledger,
            events,
        }
    }

    /// Student-facing application entry point: resolves the applicant by
    /// matric number (registering on first application), then records the
    /// pending allocation.
    pub fn submit_application(
        &self,
        profile: StudentProfile,
        traits: PersonalityTraits,
        room_id: &RoomId,
    ) -> Result<Allocation, AllocationError> {
        let student = match self.directory.find_by_matric(&profile.matric_number) {
            Some(existing) => existing,
            None => self.directory.register(profile.clone())?,
        };

        self.ledger
            .apply(&student.id, room_id, profile.into(), Some(traits))
    }

    /// Approving is safe to retry on a transient failure: a repeated attempt
    /// finds the allocation no longer pending and stops there.
    pub fn approve(
        &self,
        id: &AllocationId,
        assigned_room: Option<&RoomId>,
    ) -> Result<Allocation, AllocationError> {
        let allocation = retry_transient(|| self.ledger.approve(id, assigned_room))?;

        let room_id = allocation
            .room_id
            .clone()
            .expect("approved allocation always has a room");
        self.publish(AllocationEvent::AllocationApproved {
            allocation_id: allocation.id.clone(),
            student_id: allocation.student_id.clone(),
            room_id,
            at: allocation.allocated_at.unwrap_or(allocation.applied_at),
        })?;

        Ok(allocation)
    }

    pub fn reject(&self, id: &AllocationId) -> Result<Allocation, AllocationError> {
        let allocation = retry_transient(|| self.ledger.reject(id))?;

        self.publish(AllocationEvent::AllocationRejected {
            allocation_id: allocation.id.clone(),
            student_id: allocation.student_id.clone(),
            at: Utc::now(),
        })?;

        Ok(allocation)
    }

    pub fn vacate(&self, id: &AllocationId) -> Result<Allocation, AllocationError> {
        let allocation = retry_transient(|| self.ledger.vacate(id))?;

        let room_id = allocation
            .room_id
            .clone()
            .expect("vacated allocation always has a room");
        self.publish(AllocationEvent::AllocationVacated {
            allocation_id: allocation.id.clone(),
            student_id: allocation.student_id.clone(),
            room_id,
            at: Utc::now(),
        })?;

        Ok(allocation)
    }

    fn publish(&self, event: AllocationEvent) -> Result<(), AllocationError> {
        retry_transient(|| self.events.publish(event.clone()))
    }

    /// The admin review queue: pending allocations oldest-first, each joined
    /// with available rooms in hostels matching the applicant's gender and
    /// annotated with the mean compatibility against current occupants.
    pub fn list_pending_with_suggested_rooms(
        &self,
        page: Page,
    ) -> Result<Paginated<PendingReview>, AllocationError> {
        let pending = self
            .ledger
            .list_by_status(Some(AllocationStatus::Pending), page);

        let mut reviews = Vec::with_capacity(pending.data.len());
        for allocation in pending.data {
            let student = self.directory.get(&allocation.student_id)?;
            let suggested_rooms = self.suggest_rooms(&student)?;
            reviews.push(PendingReview {
                allocation,
                student,
                suggested_rooms,
            });
        }

        Ok(Paginated {
            data: reviews,
            meta: pending.meta,
        })
    }

    fn suggest_rooms(&self, student: &Student) -> Result<Vec<SuggestedRoom>, AllocationError> {
        let mut suggestions = Vec::new();
        for hostel in self.registry.list_hostels() {
            if hostel.gender != student.profile.gender {
                continue;
            }
            for room in self.registry.available_rooms(&hostel.id)? {
                let roommate_fit = self.roommate_fit(student, &room.id);
                suggestions.push(SuggestedRoom { room, roommate_fit });
            }
        }
        Ok(suggestions)
    }

    /// Mean compatibility between the applicant and a room's occupants.
    /// `None` when either side has no recorded traits.
    fn roommate_fit(&self, student: &Student, room_id: &RoomId) -> Option<u8> {
        let traits = student.personality_traits.as_ref()?;

        let mut scores = Vec::new();
        for occupant_id in self.ledger.occupants(room_id) {
            let occupant = self.directory.get(&occupant_id).ok()?;
            if let Some(occupant_traits) = &occupant.personality_traits {
                scores.push(compatibility::score(traits, occupant_traits).score as u32);
            }
        }
        if scores.is_empty() {
            return None;
        }
        Some((scores.iter().sum::<u32>() / scores.len() as u32) as u8)
    }

    /// Compatibility-ranked peers for a student, highest score first with
    /// matric number as the deterministic tie-break.
    pub fn match_suggestions(
        &self,
        student_id: &StudentId,
        limit: usize,
    ) -> Result<Vec<MatchSuggestion>, AllocationError> {
        let student = self.directory.get(student_id)?;
        let traits = student.personality_traits.as_ref().ok_or_else(|| {
            AllocationError::validation(
                "personalityTraits",
                format!("student {student_id} has no recorded personality traits"),
            )
        })?;

        let mut suggestions: Vec<MatchSuggestion> = self
            .directory
            .all()
            .into_iter()
            .filter(|peer| peer.id != student.id && peer.profile.gender == student.profile.gender)
            .filter_map(|peer| {
                let peer_traits = peer.personality_traits.as_ref()?;
                let compatibility = compatibility::score(traits, peer_traits);
                Some(MatchSuggestion {
                    student: peer,
                    compatibility,
                })
            })
            .collect();

        suggestions.sort_by(|a, b| {
            b.compatibility
                .score
                .cmp(&a.compatibility.score)
                .then_with(|| {
                    a.student
                        .profile
                        .matric_number
                        .cmp(&b.student.profile.matric_number)
                })
        });
        suggestions.truncate(limit);
        Ok(suggestions)
    }

    pub fn allocation_status(
        &self,
        student_id: &StudentId,
    ) -> Result<DerivedAllocationStatus, AllocationError> {
        self.directory.get(student_id)?;
        Ok(self.ledger.status_for(student_id))
    }

    /// Students with no live allocation (derived status none or rejected),
    /// matric-number ascending.
    pub fn unallocated_students(&self, page: Page) -> Paginated<StudentStanding> {
        let unallocated: Vec<StudentStanding> = self
            .directory
            .all()
            .into_iter()
            .filter_map(|student| {
                let status = self.ledger.status_for(&student.id);
                match status {
                    DerivedAllocationStatus::None | DerivedAllocationStatus::Rejected => {
                        Some(StudentStanding {
                            student,
                            allocation_status: status,
                        })
                    }
                    _ => None,
                }
            })
            .collect();
        paginate(unallocated, page)
    }

    /// Hostel deletion is refused while any allocation still holds or awaits
    /// one of its rooms.
    pub fn delete_hostel(&self, id: &HostelId) -> Result<(), AllocationError> {
        let rooms: Vec<RoomId> = self
            .registry
            .rooms_in_hostel(id)?
            .into_iter()
            .map(|room| room.id)
            .collect();
        if self.ledger.has_active_for_rooms(&rooms) {
            return Err(AllocationError::conflict(format!(
                "hostel {id} has active allocations referencing its rooms"
            )));
        }
        self.registry.delete_hostel(id)
    }

    pub fn delete_student(&self, id: &StudentId) -> Result<Student, AllocationError> {
        match self.ledger.status_for(id) {
            DerivedAllocationStatus::Pending | DerivedAllocationStatus::Approved => {
                Err(AllocationError::conflict(format!(
                    "student {id} has an active allocation"
                )))
            }
            _ => self.directory.remove(id),
        }
    }

    pub fn dashboard_summary(&self) -> DashboardSummary {
        reports::summarize(&self.registry, &self.directory, &self.ledger)
    }

    pub fn export_csv(&self, kind: ExportKind) -> Result<String, AllocationError> {
        reports::export_csv(kind, &self.registry, &self.directory, &self.ledger)
    }
}

fn retry_transient<T>(
    mut op: impl FnMut() -> Result<T, AllocationError>,
) -> Result<T, AllocationError> {
    let mut attempt = 0;
    loop {
        match op() {
            Err(AllocationError::Transient(reason)) if attempt < TRANSIENT_RETRIES => {
                attempt += 1;
                warn!(%reason, attempt, "retrying after transient failure");
            }
            other => return other,
        }
    }
}
