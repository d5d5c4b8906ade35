use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::directory::StudentDirectory;
use super::domain::{Complaint, ComplaintId, ComplaintStatus, NewComplaint, StudentId};
use super::error::AllocationError;

/// Complaint intake and resolution. Independent of the allocation
/// invariants; it only leans on the directory for student identity.
pub struct ComplaintDesk {
    state: Mutex<HashMap<ComplaintId, Complaint>>,
    directory: Arc<StudentDirectory>,
    sequence: AtomicU64,
}

impl ComplaintDesk {
    pub fn new(directory: Arc<StudentDirectory>) -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            directory,
            sequence: AtomicU64::new(1),
        }
    }

    fn next_complaint_id(&self) -> ComplaintId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        ComplaintId(format!("cmp-{id:06}"))
    }

    pub fn submit(
        &self,
        student_id: &StudentId,
        submission: NewComplaint,
    ) -> Result<Complaint, AllocationError> {
        self.directory.get(student_id)?;

        if submission.complaint_type.trim().is_empty() {
            return Err(AllocationError::validation("type", "must not be empty"));
        }
        if submission.description.trim().is_empty() {
            return Err(AllocationError::validation(
                "description",
                "must not be empty",
            ));
        }

        let complaint = Complaint {
            id: self.next_complaint_id(),
            student_id: student_id.clone(),
            complaint_type: submission.complaint_type.trim().to_string(),
            description: submission.description.trim().to_string(),
            status: ComplaintStatus::Open,
            response: None,
            created_at: Utc::now(),
        };

        let mut state = self.state.lock().expect("complaint lock poisoned");
        state.insert(complaint.id.clone(), complaint.clone());
        Ok(complaint)
    }

    pub fn respond(
        &self,
        id: &ComplaintId,
        response: &str,
    ) -> Result<Complaint, AllocationError> {
        if response.trim().is_empty() {
            return Err(AllocationError::validation("response", "must not be empty"));
        }

        let mut state = self.state.lock().expect("complaint lock poisoned");
        let complaint = state
            .get_mut(id)
            .ok_or_else(|| AllocationError::not_found("complaint", id))?;
        if complaint.status == ComplaintStatus::Resolved {
            return Err(AllocationError::conflict(format!(
                "complaint {id} is already resolved"
            )));
        }

        complaint.response = Some(response.trim().to_string());
        Ok(complaint.clone())
    }

    pub fn resolve(&self, id: &ComplaintId) -> Result<Complaint, AllocationError> {
        let mut state = self.state.lock().expect("complaint lock poisoned");
        let complaint = state
            .get_mut(id)
            .ok_or_else(|| AllocationError::not_found("complaint", id))?;
        if complaint.status == ComplaintStatus::Resolved {
            return Err(AllocationError::conflict(format!(
                "complaint {id} is already resolved"
            )));
        }

        complaint.status = ComplaintStatus::Resolved;
        Ok(complaint.clone())
    }

    /// A student's complaints, newest first.
    pub fn for_student(&self, student_id: &StudentId) -> Result<Vec<Complaint>, AllocationError> {
        self.directory.get(student_id)?;

        let state = self.state.lock().expect("complaint lock poisoned");
        let mut complaints: Vec<Complaint> = state
            .values()
            .filter(|complaint| complaint.student_id == *student_id)
            .cloned()
            .collect();
        drop(state);

        complaints.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(complaints)
    }

    pub fn open_count(&self) -> usize {
        let state = self.state.lock().expect("complaint lock poisoned");
        state
            .values()
            .filter(|complaint| complaint.status == ComplaintStatus::Open)
            .count()
    }
}
