use serde::{Deserialize, Serialize};

use super::directory::StudentDirectory;
use super::domain::DerivedAllocationStatus;
use super::error::AllocationError;
use super::ledger::{AllocationLedger, StatusCounts};
use super::registry::RoomRegistry;

/// Datasets offered by the admin CSV export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Allocations,
    Hostels,
    Rooms,
    Students,
}

impl ExportKind {
    pub const fn label(self) -> &'static str {
        match self {
            ExportKind::Allocations => "allocations",
            ExportKind::Hostels => "hostels",
            ExportKind::Rooms => "rooms",
            ExportKind::Students => "students",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub students: usize,
    pub hostels: usize,
    pub rooms: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OccupancySummary {
    pub capacity: u32,
    pub occupied: u32,
    pub available: u32,
}

/// Counts object backing the admin dashboard stat cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub totals: Totals,
    pub allocations: StatusCounts,
    pub occupancy: OccupancySummary,
    pub unallocated_students: usize,
}

pub fn summarize(
    registry: &RoomRegistry,
    directory: &StudentDirectory,
    ledger: &AllocationLedger,
) -> DashboardSummary {
    let (capacity, occupied) = registry.bed_totals();
    let unallocated_students = directory
        .all()
        .iter()
        .filter(|student| {
            matches!(
                ledger.status_for(&student.id),
                DerivedAllocationStatus::None | DerivedAllocationStatus::Rejected
            )
        })
        .count();

    DashboardSummary {
        totals: Totals {
            students: directory.count(),
            hostels: registry.hostel_count(),
            rooms: registry.room_count(),
        },
        allocations: ledger.counts_by_status(),
        occupancy: OccupancySummary {
            capacity,
            occupied,
            available: capacity.saturating_sub(occupied),
        },
        unallocated_students,
    }
}

/// Render one dataset as CSV for the admin report download.
pub fn export_csv(
    kind: ExportKind,
    registry: &RoomRegistry,
    directory: &StudentDirectory,
    ledger: &AllocationLedger,
) -> Result<String, AllocationError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    match kind {
        ExportKind::Allocations => {
            writer
                .write_record([
                    "id",
                    "studentId",
                    "matricNumber",
                    "roomId",
                    "status",
                    "appliedAt",
                    "allocatedAt",
                    "session",
                ])
                .map_err(csv_error)?;
            for allocation in ledger.all() {
                let matric = directory
                    .get(&allocation.student_id)
                    .map(|student| student.profile.matric_number)
                    .unwrap_or_default();
                writer
                    .write_record([
                        allocation.id.0.as_str(),
                        allocation.student_id.0.as_str(),
                        matric.as_str(),
                        allocation
                            .room_id
                            .as_ref()
                            .map(|room| room.0.as_str())
                            .unwrap_or(""),
                        allocation.status.label(),
                        allocation.applied_at.to_rfc3339().as_str(),
                        allocation
                            .allocated_at
                            .map(|at| at.to_rfc3339())
                            .unwrap_or_default()
                            .as_str(),
                        allocation.session.as_str(),
                    ])
                    .map_err(csv_error)?;
            }
        }
        ExportKind::Hostels => {
            writer
                .write_record([
                    "id",
                    "name",
                    "gender",
                    "rooms",
                    "capacity",
                    "occupied",
                    "available",
                    "maintenanceCount",
                ])
                .map_err(csv_error)?;
            for summary in registry.hostel_summaries() {
                writer
                    .write_record([
                        summary.id.0.as_str(),
                        summary.name.as_str(),
                        summary.gender.label(),
                        summary.rooms.to_string().as_str(),
                        summary.capacity.to_string().as_str(),
                        summary.occupied.to_string().as_str(),
                        summary.available.to_string().as_str(),
                        summary.maintenance_count.to_string().as_str(),
                    ])
                    .map_err(csv_error)?;
            }
        }
        ExportKind::Rooms => {
            writer
                .write_record([
                    "id",
                    "hostelId",
                    "roomNumber",
                    "type",
                    "capacity",
                    "occupied",
                    "available",
                ])
                .map_err(csv_error)?;
            for room in registry.all_rooms() {
                writer
                    .write_record([
                        room.id.0.as_str(),
                        room.hostel_id.0.as_str(),
                        room.room_number.as_str(),
                        room.room_type.label(),
                        room.capacity.to_string().as_str(),
                        room.occupied.to_string().as_str(),
                        room.available_slots().to_string().as_str(),
                    ])
                    .map_err(csv_error)?;
            }
        }
        ExportKind::Students => {
            writer
                .write_record([
                    "id",
                    "fullName",
                    "email",
                    "matricNumber",
                    "department",
                    "level",
                    "gender",
                    "phone",
                    "allocationStatus",
                ])
                .map_err(csv_error)?;
            for student in directory.all() {
                let status = ledger.status_for(&student.id);
                writer
                    .write_record([
                        student.id.0.as_str(),
                        student.profile.full_name.as_str(),
                        student.profile.email.as_str(),
                        student.profile.matric_number.as_str(),
                        student.profile.department.as_str(),
                        student.profile.level.label(),
                        student.profile.gender.label(),
                        student.profile.phone.as_deref().unwrap_or(""),
                        status.label(),
                    ])
                    .map_err(csv_error)?;
            }
        }
    }

    let bytes = writer.into_inner().map_err(|err| csv_error_inner(&err))?;
    String::from_utf8(bytes)
        .map_err(|err| AllocationError::Transient(format!("csv output was not utf-8: {err}")))
}

fn csv_error(err: csv::Error) -> AllocationError {
    AllocationError::Transient(format!("csv export failed: {err}"))
}

fn csv_error_inner(err: &csv::IntoInnerError<csv::Writer<Vec<u8>>>) -> AllocationError {
    AllocationError::Transient(format!("csv export failed: {err}"))
}
