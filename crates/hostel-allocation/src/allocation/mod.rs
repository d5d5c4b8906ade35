//! The hostel allocation core: room registry, student directory, allocation
//! ledger, compatibility scorer, and the admin workflow that ties them
//! together behind one HTTP router.
//!
//! The registry and ledger form a single transactional domain: approving an
//! allocation writes the status change and the occupancy increment as one
//! atomic step, so `occupied` always equals the count of approved
//! allocations for a room.

pub mod compatibility;
pub mod complaints;
pub mod directory;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod reports;
pub mod router;
pub mod workflow;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use compatibility::{score, CompatibilityScore, TraitDimension};
pub use complaints::ComplaintDesk;
pub use directory::StudentDirectory;
pub use domain::{
    paginate, Allocation, AllocationId, AllocationStatus, Complaint, ComplaintId, ComplaintStatus,
    DerivedAllocationStatus, Gender, Hostel, HostelId, HostelSummary, HostelUpdate, Level,
    NewComplaint, NewHostel, NewRoom, Page, PageMeta, Paginated, PersonalityTraits, ProfileUpdate,
    Room, RoomId, RoomType, RoomUpdate, SleepSchedule, SocialPreference, Student, StudentId,
    StudentProfile, StudyHabits, NoisePreference, VisitorFrequency,
};
pub use error::AllocationError;
pub use ledger::{AllocationLedger, StatusCounts};
pub use registry::RoomRegistry;
pub use reports::{DashboardSummary, ExportKind};
pub use router::{allocation_router, ApplyRequest};
pub use workflow::{
    AdminWorkflowController, AllocationEvent, EventPublisher, MatchSuggestion, PendingReview,
    StudentStanding, SuggestedRoom,
};

/// Assembled allocation core: every component wired with shared ownership.
pub struct AllocationCore<P> {
    pub registry: Arc<RoomRegistry>,
    pub directory: Arc<StudentDirectory>,
    pub ledger: Arc<AllocationLedger>,
    pub complaints: Arc<ComplaintDesk>,
    pub workflow: Arc<AdminWorkflowController<P>>,
}

impl<P: EventPublisher> AllocationCore<P> {
    pub fn new(session: impl Into<String>, events: Arc<P>) -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let directory = Arc::new(StudentDirectory::new());
        let ledger = Arc::new(AllocationLedger::new(
            registry.clone(),
            directory.clone(),
            session,
        ));
        let complaints = Arc::new(ComplaintDesk::new(directory.clone()));
        let workflow = Arc::new(AdminWorkflowController::new(
            registry.clone(),
            directory.clone(),
            ledger.clone(),
            events,
        ));

        Self {
            registry,
            directory,
            ledger,
            complaints,
            workflow,
        }
    }
}

impl<P> Clone for AllocationCore<P> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            directory: self.directory.clone(),
            ledger: self.ledger.clone(),
            complaints: self.complaints.clone(),
            workflow: self.workflow.clone(),
        }
    }
}
