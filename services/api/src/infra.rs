use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use hostel_allocation::allocation::{
    AllocationCore, AllocationError, AllocationEvent, EventPublisher, ExportKind, Gender,
    NewHostel, NewRoom, RoomType,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Event sink for the running service: logs each decision and keeps the
/// recent history around for inspection.
#[derive(Default)]
pub(crate) struct LoggingEventPublisher {
    events: Arc<Mutex<Vec<AllocationEvent>>>,
}

impl LoggingEventPublisher {
    #[allow(dead_code)]
    pub(crate) fn events(&self) -> Vec<AllocationEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for LoggingEventPublisher {
    fn publish(&self, event: AllocationEvent) -> Result<(), AllocationError> {
        info!(?event, "allocation event");
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

/// Two sample hostels with a handful of rooms, used by `--seed` and the demo.
pub(crate) fn seed_campus(
    core: &AllocationCore<LoggingEventPublisher>,
) -> Result<(), AllocationError> {
    let male = core.registry.create_hostel(NewHostel {
        name: "Eni Njoku Hall".to_string(),
        gender: Gender::Male,
        capacity: 8,
        description: Some("Lagoon front block".to_string()),
    })?;
    let female = core.registry.create_hostel(NewHostel {
        name: "Queen Amina Hall".to_string(),
        gender: Gender::Female,
        capacity: 6,
        description: None,
    })?;

    for (number, room_type, capacity) in [
        ("101", RoomType::Standard, 4),
        ("102", RoomType::Standard, 2),
        ("103", RoomType::Premium, 2),
    ] {
        core.registry.add_room(
            &male.id,
            NewRoom {
                room_number: number.to_string(),
                room_type,
                capacity,
            },
        )?;
    }
    for (number, room_type, capacity) in [
        ("201", RoomType::Standard, 4),
        ("202", RoomType::Premium, 2),
    ] {
        core.registry.add_room(
            &female.id,
            NewRoom {
                room_number: number.to_string(),
                room_type,
                capacity,
            },
        )?;
    }

    info!(hostels = 2, rooms = 5, "seeded sample campus");
    Ok(())
}

pub(crate) fn parse_export_kind(raw: &str) -> Result<ExportKind, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "allocations" => Ok(ExportKind::Allocations),
        "hostels" => Ok(ExportKind::Hostels),
        "rooms" => Ok(ExportKind::Rooms),
        "students" => Ok(ExportKind::Students),
        other => Err(format!(
            "unknown export type '{other}' (expected allocations, hostels, rooms, or students)"
        )),
    }
}
