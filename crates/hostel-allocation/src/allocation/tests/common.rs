use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::allocation::domain::{
    Allocation, Gender, Hostel, Level, NewHostel, NewRoom, PersonalityTraits, Room, RoomId,
    RoomType, SleepSchedule, SocialPreference, StudentProfile, StudyHabits, NoisePreference,
    VisitorFrequency,
};
use crate::allocation::error::AllocationError;
use crate::allocation::workflow::{AllocationEvent, EventPublisher};
use crate::allocation::AllocationCore;

pub(super) fn core() -> AllocationCore<MemoryEvents> {
    AllocationCore::new("2025/2026", Arc::new(MemoryEvents::default()))
}

/// A male hostel with rooms 101 (capacity 2) and 102 (capacity 1), plus a
/// female hostel with room 201 (capacity 2).
pub(super) struct Seeded<P = MemoryEvents> {
    pub core: AllocationCore<P>,
    pub events: Arc<P>,
    pub male_hostel: Hostel,
    pub female_hostel: Hostel,
    pub room_101: Room,
    pub room_102: Room,
    pub room_201: Room,
}

pub(super) fn seeded() -> Seeded<MemoryEvents> {
    seeded_with(Arc::new(MemoryEvents::default()))
}

pub(super) fn seeded_with<P: EventPublisher + 'static>(events: Arc<P>) -> Seeded<P> {
    let core = AllocationCore::new("2025/2026", events.clone());

    let male_hostel = core
        .registry
        .create_hostel(NewHostel {
            name: "Kuti Hall".to_string(),
            gender: Gender::Male,
            capacity: 3,
            description: None,
        })
        .expect("male hostel");
    let female_hostel = core
        .registry
        .create_hostel(NewHostel {
            name: "Queen Amina Hall".to_string(),
            gender: Gender::Female,
            capacity: 2,
            description: None,
        })
        .expect("female hostel");

    let room_101 = core
        .registry
        .add_room(
            &male_hostel.id,
            NewRoom {
                room_number: "101".to_string(),
                room_type: RoomType::Standard,
                capacity: 2,
            },
        )
        .expect("room 101");
    let room_102 = core
        .registry
        .add_room(
            &male_hostel.id,
            NewRoom {
                room_number: "102".to_string(),
                room_type: RoomType::Premium,
                capacity: 1,
            },
        )
        .expect("room 102");
    let room_201 = core
        .registry
        .add_room(
            &female_hostel.id,
            NewRoom {
                room_number: "201".to_string(),
                room_type: RoomType::Standard,
                capacity: 2,
            },
        )
        .expect("room 201");

    Seeded {
        core,
        events,
        male_hostel,
        female_hostel,
        room_101,
        room_102,
        room_201,
    }
}

pub(super) fn profile(matric: &str, gender: Gender) -> StudentProfile {
    StudentProfile {
        full_name: format!("Student {matric}"),
        email: format!("{matric}@campus.edu"),
        matric_number: matric.to_string(),
        department: "Computer Science".to_string(),
        level: Level::L200,
        gender,
        phone: Some("08031234567".to_string()),
        emergency_contact: Some("08098765432".to_string()),
    }
}

pub(super) fn quiet_traits() -> PersonalityTraits {
    PersonalityTraits {
        sleep_schedule: SleepSchedule::Early,
        study_habits: StudyHabits::Quiet,
        cleanliness_level: 4,
        social_preference: SocialPreference::Introvert,
        noise_preference: NoisePreference::Quiet,
        hobbies: vec!["Reading".to_string(), "Art".to_string()],
        music_preference: Some("Headphones Only".to_string()),
        visitor_frequency: VisitorFrequency::Rarely,
    }
}

pub(super) fn lively_traits() -> PersonalityTraits {
    PersonalityTraits {
        sleep_schedule: SleepSchedule::Late,
        study_habits: StudyHabits::Group,
        cleanliness_level: 2,
        social_preference: SocialPreference::Extrovert,
        noise_preference: NoisePreference::Noisy,
        hobbies: vec!["Gaming".to_string(), "Sports".to_string()],
        music_preference: None,
        visitor_frequency: VisitorFrequency::Often,
    }
}

/// Submit an application through the workflow for a fresh student.
pub(super) fn apply<P: EventPublisher>(
    core: &AllocationCore<P>,
    matric: &str,
    gender: Gender,
    room: &RoomId,
) -> Result<Allocation, AllocationError> {
    core.workflow
        .submit_application(profile(matric, gender), quiet_traits(), room)
}

#[derive(Default)]
pub(super) struct MemoryEvents {
    events: Mutex<Vec<AllocationEvent>>,
}

impl MemoryEvents {
    pub(super) fn events(&self) -> Vec<AllocationEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for MemoryEvents {
    fn publish(&self, event: AllocationEvent) -> Result<(), AllocationError> {
        self.events.lock().expect("event mutex poisoned").push(event);
        Ok(())
    }
}

/// Publisher failing with a transient error a fixed number of times before
/// delivering, for exercising the retry path.
pub(super) struct FlakyEvents {
    failures_left: Mutex<usize>,
    delivered: Mutex<Vec<AllocationEvent>>,
}

impl FlakyEvents {
    pub(super) fn failing(times: usize) -> Self {
        Self {
            failures_left: Mutex::new(times),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn delivered(&self) -> Vec<AllocationEvent> {
        self.delivered.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for FlakyEvents {
    fn publish(&self, event: AllocationEvent) -> Result<(), AllocationError> {
        let mut failures = self.failures_left.lock().expect("event mutex poisoned");
        if *failures > 0 {
            *failures -= 1;
            return Err(AllocationError::Transient(
                "notification channel unavailable".to_string(),
            ));
        }
        drop(failures);
        self.delivered
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
