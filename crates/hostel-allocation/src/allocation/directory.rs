use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use super::domain::{
    paginate, Page, Paginated, PersonalityTraits, ProfileUpdate, Student, StudentId,
    StudentProfile,
};
use super::error::AllocationError;

pub const MAX_HOBBIES: usize = 3;
pub const MIN_CLEANLINESS: u8 = 1;
pub const MAX_CLEANLINESS: u8 = 5;

/// Owns student profiles and personality-trait records. Allocation status is
/// derived from the ledger and surfaced through the workflow layer; the
/// directory itself never reads allocation state.
pub struct StudentDirectory {
    state: RwLock<HashMap<StudentId, Student>>,
    sequence: AtomicU64,
}

impl Default for StudentDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl StudentDirectory {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(1),
        }
    }

    fn next_student_id(&self) -> StudentId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        StudentId(format!("stu-{id:06}"))
    }

    pub fn register(&self, profile: StudentProfile) -> Result<Student, AllocationError> {
        validate_profile(&profile)?;

        let mut state = self.state.write().expect("directory lock poisoned");
        ensure_unique(&state, &profile, None)?;

        let student = Student {
            id: self.next_student_id(),
            profile,
            personality_traits: None,
        };
        state.insert(student.id.clone(), student.clone());
        Ok(student)
    }

    /// Partial update; absent fields keep their current values.
    pub fn upsert_profile(
        &self,
        id: &StudentId,
        update: ProfileUpdate,
    ) -> Result<Student, AllocationError> {
        let mut state = self.state.write().expect("directory lock poisoned");
        let mut profile = state
            .get(id)
            .ok_or_else(|| AllocationError::not_found("student", id))?
            .profile
            .clone();

        if let Some(full_name) = update.full_name {
            profile.full_name = full_name;
        }
        if let Some(email) = update.email {
            profile.email = email;
        }
        if let Some(matric_number) = update.matric_number {
            profile.matric_number = matric_number;
        }
        if let Some(department) = update.department {
            profile.department = department;
        }
        if let Some(level) = update.level {
            profile.level = level;
        }
        if let Some(gender) = update.gender {
            profile.gender = gender;
        }
        if let Some(phone) = update.phone {
            profile.phone = Some(phone);
        }
        if let Some(emergency_contact) = update.emergency_contact {
            profile.emergency_contact = Some(emergency_contact);
        }

        validate_profile(&profile)?;
        ensure_unique(&state, &profile, Some(id))?;

        let student = state.get_mut(id).expect("presence checked above");
        student.profile = profile;
        Ok(student.clone())
    }

    pub fn set_personality_traits(
        &self,
        id: &StudentId,
        traits: PersonalityTraits,
    ) -> Result<Student, AllocationError> {
        let traits = validate_traits(traits)?;

        let mut state = self.state.write().expect("directory lock poisoned");
        let student = state
            .get_mut(id)
            .ok_or_else(|| AllocationError::not_found("student", id))?;
        student.personality_traits = Some(traits);
        Ok(student.clone())
    }

    pub fn get(&self, id: &StudentId) -> Result<Student, AllocationError> {
        let state = self.state.read().expect("directory lock poisoned");
        state
            .get(id)
            .cloned()
            .ok_or_else(|| AllocationError::not_found("student", id))
    }

    pub fn remove(&self, id: &StudentId) -> Result<Student, AllocationError> {
        let mut state = self.state.write().expect("directory lock poisoned");
        state
            .remove(id)
            .ok_or_else(|| AllocationError::not_found("student", id))
    }

    pub fn find_by_matric(&self, matric_number: &str) -> Option<Student> {
        let state = self.state.read().expect("directory lock poisoned");
        state
            .values()
            .find(|student| student.profile.matric_number == matric_number)
            .cloned()
    }

    pub fn list(&self, page: Page) -> Paginated<Student> {
        paginate(self.all(), page)
    }

    /// All students, matric-number ascending.
    pub fn all(&self) -> Vec<Student> {
        let state = self.state.read().expect("directory lock poisoned");
        let mut students: Vec<Student> = state.values().cloned().collect();
        students.sort_by(|a, b| a.profile.matric_number.cmp(&b.profile.matric_number));
        students
    }

    pub fn count(&self) -> usize {
        self.state.read().expect("directory lock poisoned").len()
    }
}

fn validate_profile(profile: &StudentProfile) -> Result<(), AllocationError> {
    if profile.full_name.trim().is_empty() {
        return Err(AllocationError::validation("fullName", "must not be empty"));
    }
    if !profile.email.contains('@') {
        return Err(AllocationError::validation(
            "email",
            "must be a valid email address",
        ));
    }
    if !is_digits(&profile.matric_number, 8) {
        return Err(AllocationError::validation(
            "matricNumber",
            "must be exactly 8 digits",
        ));
    }
    if let Some(phone) = &profile.phone {
        if !is_digits(phone, 11) {
            return Err(AllocationError::validation(
                "phone",
                "must be exactly 11 digits",
            ));
        }
    }
    if let Some(contact) = &profile.emergency_contact {
        if !is_digits(contact, 11) {
            return Err(AllocationError::validation(
                "emergencyContact",
                "must be exactly 11 digits",
            ));
        }
    }
    Ok(())
}

fn ensure_unique(
    state: &HashMap<StudentId, Student>,
    profile: &StudentProfile,
    exclude: Option<&StudentId>,
) -> Result<(), AllocationError> {
    for student in state.values() {
        if Some(&student.id) == exclude {
            continue;
        }
        if student
            .profile
            .email
            .eq_ignore_ascii_case(&profile.email)
        {
            return Err(AllocationError::conflict(format!(
                "email {} is already registered",
                profile.email
            )));
        }
        if student.profile.matric_number == profile.matric_number {
            return Err(AllocationError::conflict(format!(
                "matric number {} is already registered",
                profile.matric_number
            )));
        }
    }
    Ok(())
}

fn validate_traits(mut traits: PersonalityTraits) -> Result<PersonalityTraits, AllocationError> {
    if !(MIN_CLEANLINESS..=MAX_CLEANLINESS).contains(&traits.cleanliness_level) {
        return Err(AllocationError::validation(
            "cleanlinessLevel",
            format!("must be between {MIN_CLEANLINESS} and {MAX_CLEANLINESS}"),
        ));
    }

    let mut seen: Vec<String> = Vec::new();
    let mut hobbies: Vec<String> = Vec::new();
    for hobby in &traits.hobbies {
        let trimmed = hobby.trim();
        if trimmed.is_empty() {
            continue;
        }
        let folded = trimmed.to_lowercase();
        if !seen.contains(&folded) {
            seen.push(folded);
            hobbies.push(trimmed.to_string());
        }
    }
    if hobbies.len() > MAX_HOBBIES {
        return Err(AllocationError::validation(
            "hobbies",
            format!("at most {MAX_HOBBIES} hobbies may be selected"),
        ));
    }
    traits.hobbies = hobbies;
    Ok(traits)
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|byte| byte.is_ascii_digit())
}
