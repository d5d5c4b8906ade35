use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for hostels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostelId(pub String);

/// Identifier wrapper for rooms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub String);

/// Identifier wrapper for students.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for allocations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AllocationId(pub String);

/// Identifier wrapper for complaints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComplaintId(pub String);

impl fmt::Display for HostelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ComplaintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hostels are single-gender; a student may only be approved into a matching hostel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    Standard,
    Premium,
}

impl RoomType {
    pub const fn label(self) -> &'static str {
        match self {
            RoomType::Standard => "Standard",
            RoomType::Premium => "Premium",
        }
    }
}

/// A hostel block. `declared_capacity` is the intake figure supplied at
/// creation; occupancy math always derives from the rooms themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hostel {
    pub id: HostelId,
    pub name: String,
    pub gender: Gender,
    pub declared_capacity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub maintenance_count: u32,
}

/// Creation payload for a hostel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHostel {
    pub name: String,
    #[serde(alias = "type")]
    pub gender: Gender,
    pub capacity: u32,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update payload for a hostel.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostelUpdate {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub description: Option<String>,
    pub maintenance_count: Option<u32>,
}

/// Listing view joining a hostel with its derived room totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostelSummary {
    pub id: HostelId,
    pub name: String,
    pub gender: Gender,
    pub rooms: usize,
    pub capacity: u32,
    pub occupied: u32,
    pub available: u32,
    pub maintenance_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub hostel_id: HostelId,
    pub room_number: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub capacity: u32,
    pub occupied: u32,
}

impl Room {
    pub fn available_slots(&self) -> u32 {
        self.capacity.saturating_sub(self.occupied)
    }
}

/// Creation payload for a room within a hostel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoom {
    pub room_number: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub capacity: u32,
}

/// Partial update payload for a room.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdate {
    #[serde(rename = "type")]
    pub room_type: Option<RoomType>,
    pub capacity: Option<u32>,
}

/// Academic level, validated against the five-level degree structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "100")]
    L100,
    #[serde(rename = "200")]
    L200,
    #[serde(rename = "300")]
    L300,
    #[serde(rename = "400")]
    L400,
    #[serde(rename = "500")]
    L500,
}

impl Level {
    pub const fn label(self) -> &'static str {
        match self {
            Level::L100 => "100",
            Level::L200 => "200",
            Level::L300 => "300",
            Level::L400 => "400",
            Level::L500 => "500",
        }
    }
}

/// Full student profile as captured by the application form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub full_name: String,
    pub email: String,
    pub matric_number: String,
    pub department: String,
    pub level: Level,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub matric_number: Option<String>,
    pub department: Option<String>,
    pub level: Option<Level>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
}

impl From<StudentProfile> for ProfileUpdate {
    fn from(profile: StudentProfile) -> Self {
        Self {
            full_name: Some(profile.full_name),
            email: Some(profile.email),
            matric_number: Some(profile.matric_number),
            department: Some(profile.department),
            level: Some(profile.level),
            gender: Some(profile.gender),
            phone: profile.phone,
            emergency_contact: profile.emergency_contact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepSchedule {
    Early,
    Late,
    Flexible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyHabits {
    Quiet,
    Group,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPreference {
    Introvert,
    Balanced,
    Extrovert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoisePreference {
    Quiet,
    Tolerant,
    Noisy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitorFrequency {
    Rarely,
    Sometimes,
    Often,
}

/// Personality and preference record feeding the compatibility scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityTraits {
    pub sleep_schedule: SleepSchedule,
    pub study_habits: StudyHabits,
    pub cleanliness_level: u8,
    pub social_preference: SocialPreference,
    pub noise_preference: NoisePreference,
    #[serde(default)]
    pub hobbies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_preference: Option<String>,
    pub visitor_frequency: VisitorFrequency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    #[serde(flatten)]
    pub profile: StudentProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality_traits: Option<PersonalityTraits>,
}

/// Lifecycle status of an allocation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStatus {
    Pending,
    Approved,
    Rejected,
    Vacated,
}

impl AllocationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AllocationStatus::Pending => "pending",
            AllocationStatus::Approved => "approved",
            AllocationStatus::Rejected => "rejected",
            AllocationStatus::Vacated => "vacated",
        }
    }

    /// Pending and approved allocations block a new application.
    pub const fn is_active(self) -> bool {
        matches!(self, AllocationStatus::Pending | AllocationStatus::Approved)
    }
}

/// Allocation status as seen from the student's side, derived from the
/// ledger. A vacated allocation derives to `none` so the student may reapply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedAllocationStatus {
    None,
    Pending,
    Approved,
    Rejected,
}

impl DerivedAllocationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DerivedAllocationStatus::None => "none",
            DerivedAllocationStatus::Pending => "pending",
            DerivedAllocationStatus::Approved => "approved",
            DerivedAllocationStatus::Rejected => "rejected",
        }
    }
}

/// A request linking a student to a room, with a lifecycle status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub id: AllocationId,
    pub student_id: StudentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    pub status: AllocationStatus,
    pub applied_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_at: Option<DateTime<Utc>>,
    pub session: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplaintStatus {
    Open,
    Resolved,
}

impl ComplaintStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ComplaintStatus::Open => "Open",
            ComplaintStatus::Resolved => "Resolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: ComplaintId,
    pub student_id: StudentId,
    #[serde(rename = "type")]
    pub complaint_type: String,
    pub description: String,
    pub status: ComplaintStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Submission payload for a complaint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComplaint {
    #[serde(rename = "type")]
    pub complaint_type: String,
    pub description: String,
}

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One-based page request. Limits are clamped to [1, MAX_PAGE_LIMIT].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: u32,
    limit: u32,
}

impl Page {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn from_params(page: Option<u32>, limit: Option<u32>) -> Self {
        Self::new(page.unwrap_or(1), limit.unwrap_or(DEFAULT_PAGE_LIMIT))
    }

    pub fn page(self) -> u32 {
        self.page
    }

    pub fn limit(self) -> u32 {
        self.limit
    }

    fn offset(self) -> usize {
        ((self.page - 1) as usize).saturating_mul(self.limit as usize)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
}

/// Canonical paginated response envelope: `{ "data": [...], "meta": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Slice an already-ordered collection into one page.
pub fn paginate<T>(items: Vec<T>, page: Page) -> Paginated<T> {
    let total = items.len();
    let data = items
        .into_iter()
        .skip(page.offset())
        .take(page.limit() as usize)
        .collect();

    Paginated {
        data,
        meta: PageMeta {
            page: page.page(),
            limit: page.limit(),
            total,
        },
    }
}
