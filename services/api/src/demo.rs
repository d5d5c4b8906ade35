use clap::Args;
use hostel_allocation::allocation::{
    score, AllocationCore, Gender, Level, PersonalityTraits, RoomId, SleepSchedule,
    SocialPreference, StudentProfile, StudyHabits, NoisePreference, VisitorFrequency,
};
use hostel_allocation::error::AppError;

use std::sync::Arc;

use crate::infra::{parse_export_kind, seed_campus, LoggingEventPublisher};
use hostel_allocation::allocation::ExportKind;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Session label stamped on demo allocations
    #[arg(long, default_value = "2025/2026")]
    pub(crate) session: String,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Dataset to export: allocations, hostels, rooms, or students
    #[arg(long = "type", value_parser = parse_export_kind)]
    pub(crate) kind: ExportKind,
    /// Session label stamped on demo allocations
    #[arg(long, default_value = "2025/2026")]
    pub(crate) session: String,
}

fn demo_profile(name: &str, matric: &str) -> StudentProfile {
    StudentProfile {
        full_name: name.to_string(),
        email: format!("{matric}@campus.edu"),
        matric_number: matric.to_string(),
        department: "Computer Science".to_string(),
        level: Level::L200,
        gender: Gender::Male,
        phone: Some("08031234567".to_string()),
        emergency_contact: None,
    }
}

fn early_riser() -> PersonalityTraits {
    PersonalityTraits {
        sleep_schedule: SleepSchedule::Early,
        study_habits: StudyHabits::Quiet,
        cleanliness_level: 4,
        social_preference: SocialPreference::Balanced,
        noise_preference: NoisePreference::Quiet,
        hobbies: vec!["Reading".to_string(), "Chess".to_string()],
        music_preference: Some("Headphones Only".to_string()),
        visitor_frequency: VisitorFrequency::Rarely,
    }
}

fn night_owl() -> PersonalityTraits {
    PersonalityTraits {
        sleep_schedule: SleepSchedule::Late,
        study_habits: StudyHabits::Quiet,
        cleanliness_level: 3,
        social_preference: SocialPreference::Balanced,
        noise_preference: NoisePreference::Tolerant,
        hobbies: vec!["Reading".to_string(), "Gaming".to_string()],
        music_preference: None,
        visitor_frequency: VisitorFrequency::Sometimes,
    }
}

fn first_open_room(
    core: &AllocationCore<LoggingEventPublisher>,
    gender: Gender,
) -> Result<RoomId, AppError> {
    for hostel in core.registry.list_hostels() {
        if hostel.gender != gender {
            continue;
        }
        if let Some(room) = core.registry.available_rooms(&hostel.id)?.next() {
            return Ok(room.id);
        }
    }
    Err(hostel_allocation::allocation::AllocationError::not_found(
        "available room for gender",
        gender.label(),
    )
    .into())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let core = AllocationCore::new(&args.session, Arc::new(LoggingEventPublisher::default()));
    seed_campus(&core)?;

    println!("Hostel allocation demo (session {})", args.session);
    println!("\nSeeded hostels");
    for summary in core.registry.hostel_summaries() {
        println!(
            "- {} ({}) | rooms {} | capacity {} | available {}",
            summary.name,
            summary.gender.label(),
            summary.rooms,
            summary.capacity,
            summary.available
        );
    }

    let room = first_open_room(&core, Gender::Male)?;
    let first = core.workflow.submit_application(
        demo_profile("Ade Balogun", "20250001"),
        early_riser(),
        &room,
    )?;
    let second = core.workflow.submit_application(
        demo_profile("Chidi Okeke", "20250002"),
        night_owl(),
        &room,
    )?;
    println!("\nApplications");
    println!(
        "- {} applied for room {} ({})",
        first.student_id,
        room,
        first.status.label()
    );
    println!(
        "- {} applied for room {} ({})",
        second.student_id,
        room,
        second.status.label()
    );

    let fit = score(&early_riser(), &night_owl());
    println!("\nCompatibility between the applicants: {}/100", fit.score);
    println!(
        "- matched dimensions: {}",
        fit.matched_traits
            .iter()
            .map(|dimension| format!("{dimension:?}"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    if !fit.shared_hobbies.is_empty() {
        println!("- shared hobbies: {}", fit.shared_hobbies.join(", "));
    }

    core.workflow.approve(&first.id, None)?;
    let occupied = core.registry.get_room(&room)?.occupied;
    println!("\nApproved {} into room {room} (occupied {occupied})", first.id);

    let reviews = core
        .workflow
        .list_pending_with_suggested_rooms(Default::default())?;
    println!("\nPending review queue");
    for review in &reviews.data {
        println!(
            "- {} ({}) | {} suggested room(s)",
            review.allocation.id,
            review.student.profile.full_name,
            review.suggested_rooms.len()
        );
        for suggested in &review.suggested_rooms {
            match suggested.roommate_fit {
                Some(fit) => println!(
                    "  - room {} | {} free slot(s) | roommate fit {fit}/100",
                    suggested.room.room_number,
                    suggested.room.available_slots()
                ),
                None => println!(
                    "  - room {} | {} free slot(s)",
                    suggested.room.room_number,
                    suggested.room.available_slots()
                ),
            }
        }
    }

    core.workflow.approve(&second.id, None)?;

    let summary = core.workflow.dashboard_summary();
    println!("\nDashboard summary");
    println!(
        "- students {} | hostels {} | rooms {}",
        summary.totals.students, summary.totals.hostels, summary.totals.rooms
    );
    println!(
        "- allocations: {} pending, {} approved, {} rejected, {} vacated",
        summary.allocations.pending,
        summary.allocations.approved,
        summary.allocations.rejected,
        summary.allocations.vacated
    );
    println!(
        "- occupancy: {}/{} beds taken ({} available)",
        summary.occupancy.occupied, summary.occupancy.capacity, summary.occupancy.available
    );

    Ok(())
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let core = AllocationCore::new(&args.session, Arc::new(LoggingEventPublisher::default()));
    seed_campus(&core)?;

    // Give the export something to show beyond empty tables.
    let room = first_open_room(&core, Gender::Male)?;
    let allocation = core.workflow.submit_application(
        demo_profile("Ade Balogun", "20250001"),
        early_riser(),
        &room,
    )?;
    core.workflow.approve(&allocation.id, None)?;

    let csv = core.workflow.export_csv(args.kind)?;
    print!("{csv}");
    Ok(())
}
