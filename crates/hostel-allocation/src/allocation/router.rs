use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    AllocationId, AllocationStatus, ComplaintId, ComplaintStatus, HostelId, HostelUpdate,
    NewComplaint, NewHostel, NewRoom, Page, PersonalityTraits, ProfileUpdate, RoomId, RoomUpdate,
    StudentId, StudentProfile,
};
use super::error::AllocationError;
use super::reports::ExportKind;
use super::workflow::EventPublisher;
use super::AllocationCore;

/// Router exposing the allocation core over JSON HTTP.
pub fn allocation_router<P>(core: Arc<AllocationCore<P>>) -> Router
where
    P: EventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/allocations/apply", post(apply_handler::<P>))
        .route(
            "/api/v1/allocations/:student_id/status",
            get(allocation_status_handler::<P>),
        )
        .route(
            "/api/v1/allocations/:student_id/match-suggestions",
            get(match_suggestions_handler::<P>),
        )
        .route("/api/v1/hostels", get(list_hostels_handler::<P>))
        .route(
            "/api/v1/hostels/:hostel_id/rooms",
            get(list_rooms_handler::<P>),
        )
        .route(
            "/api/v1/students/:student_id/personality",
            put(set_personality_handler::<P>),
        )
        .route(
            "/api/v1/complaints/:id",
            post(submit_complaint_handler::<P>)
                .get(list_complaints_handler::<P>)
                .patch(update_complaint_handler::<P>),
        )
        .route(
            "/api/v1/admin/allocations",
            get(list_allocations_handler::<P>),
        )
        .route(
            "/api/v1/admin/allocations/pending-review",
            get(pending_review_handler::<P>),
        )
        .route(
            "/api/v1/admin/allocations/:id",
            patch(decide_allocation_handler::<P>),
        )
        .route(
            "/api/v1/admin/allocations/:id/vacate",
            post(vacate_allocation_handler::<P>),
        )
        .route(
            "/api/v1/admin/students",
            get(list_students_handler::<P>).post(register_student_handler::<P>),
        )
        .route(
            "/api/v1/admin/students/unallocated",
            get(unallocated_students_handler::<P>),
        )
        .route(
            "/api/v1/admin/students/:id",
            patch(update_student_handler::<P>).delete(delete_student_handler::<P>),
        )
        .route(
            "/api/v1/admin/hostels",
            get(list_hostels_handler::<P>).post(create_hostel_handler::<P>),
        )
        .route(
            "/api/v1/admin/hostels/:id",
            patch(update_hostel_handler::<P>).delete(delete_hostel_handler::<P>),
        )
        .route(
            "/api/v1/admin/hostels/:hostel_id/rooms",
            get(list_rooms_handler::<P>).post(add_room_handler::<P>),
        )
        .route(
            "/api/v1/admin/rooms/:id",
            patch(update_room_handler::<P>).delete(delete_room_handler::<P>),
        )
        .route(
            "/api/v1/admin/reports/summary",
            get(report_summary_handler::<P>),
        )
        .route(
            "/api/v1/admin/reports/export",
            get(report_export_handler::<P>),
        )
        .with_state(core)
}

/// Canonical single-value envelope: `{ "data": ... }`.
fn envelope<T: Serialize>(status: StatusCode, value: T) -> Response {
    (status, Json(json!({ "data": value }))).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub profile: StudentProfile,
    pub personality_traits: PersonalityTraits,
    pub room_id: RoomId,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DecisionStatus {
    Approved,
    Rejected,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecisionRequest {
    status: DecisionStatus,
    #[serde(default)]
    room_id: Option<RoomId>,
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

impl PageQuery {
    fn page(&self) -> Page {
        Page::from_params(self.page, self.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListAllocationsQuery {
    status: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MatchQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    #[serde(rename = "type")]
    kind: ExportKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComplaintUpdateRequest {
    #[serde(default)]
    status: Option<ComplaintStatus>,
    #[serde(default)]
    response: Option<String>,
}

fn status_filter(raw: Option<&str>) -> Result<Option<AllocationStatus>, AllocationError> {
    match raw {
        None | Some("") => Ok(None),
        Some("pending") => Ok(Some(AllocationStatus::Pending)),
        Some("approved") => Ok(Some(AllocationStatus::Approved)),
        Some("rejected") => Ok(Some(AllocationStatus::Rejected)),
        Some("vacated") => Ok(Some(AllocationStatus::Vacated)),
        Some(other) => Err(AllocationError::validation(
            "status",
            format!("unknown allocation status '{other}'"),
        )),
    }
}

async fn apply_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Json(request): Json<ApplyRequest>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let allocation = core.workflow.submit_application(
        request.profile,
        request.personality_traits,
        &request.room_id,
    )?;
    Ok(envelope(StatusCode::CREATED, allocation))
}

async fn allocation_status_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(student_id): Path<String>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let student_id = StudentId(student_id);
    let status = core.workflow.allocation_status(&student_id)?;
    Ok(envelope(
        StatusCode::OK,
        json!({ "studentId": student_id, "status": status }),
    ))
}

async fn match_suggestions_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(student_id): Path<String>,
    Query(query): Query<MatchQuery>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let suggestions = core
        .workflow
        .match_suggestions(&StudentId(student_id), query.limit.unwrap_or(5))?;
    Ok(envelope(StatusCode::OK, suggestions))
}

async fn list_hostels_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    Ok(envelope(StatusCode::OK, core.registry.hostel_summaries()))
}

async fn list_rooms_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(hostel_id): Path<String>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let rooms = core.registry.rooms_in_hostel(&HostelId(hostel_id))?;
    Ok(envelope(StatusCode::OK, rooms))
}

async fn set_personality_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(student_id): Path<String>,
    Json(traits): Json<PersonalityTraits>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let student = core
        .directory
        .set_personality_traits(&StudentId(student_id), traits)?;
    Ok(envelope(StatusCode::OK, student))
}

async fn submit_complaint_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(student_id): Path<String>,
    Json(submission): Json<NewComplaint>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let complaint = core
        .complaints
        .submit(&StudentId(student_id), submission)?;
    Ok(envelope(StatusCode::CREATED, complaint))
}

async fn list_complaints_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(student_id): Path<String>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let complaints = core.complaints.for_student(&StudentId(student_id))?;
    Ok(envelope(StatusCode::OK, complaints))
}

async fn update_complaint_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(id): Path<String>,
    Json(update): Json<ComplaintUpdateRequest>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let id = ComplaintId(id);

    if update.status.is_none() && update.response.is_none() {
        return Err(AllocationError::validation(
            "status",
            "nothing to update: provide a response or status",
        ));
    }

    let mut complaint = None;
    if let Some(response) = &update.response {
        complaint = Some(core.complaints.respond(&id, response)?);
    }
    match update.status {
        Some(ComplaintStatus::Resolved) => {
            complaint = Some(core.complaints.resolve(&id)?);
        }
        Some(ComplaintStatus::Open) => {
            return Err(AllocationError::validation(
                "status",
                "complaints can only be moved to Resolved",
            ));
        }
        None => {}
    }

    let complaint = complaint.expect("at least one mutation ran");
    Ok(envelope(StatusCode::OK, complaint))
}

async fn list_allocations_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Query(query): Query<ListAllocationsQuery>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let filter = status_filter(query.status.as_deref())?;
    let page = Page::from_params(query.page, query.limit);
    let allocations = core.ledger.list_by_status(filter, page);
    Ok(Json(allocations).into_response())
}

async fn pending_review_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let reviews = core
        .workflow
        .list_pending_with_suggested_rooms(query.page())?;
    Ok(Json(reviews).into_response())
}

async fn decide_allocation_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let id = AllocationId(id);
    let allocation = match request.status {
        DecisionStatus::Approved => core.workflow.approve(&id, request.room_id.as_ref())?,
        DecisionStatus::Rejected => core.workflow.reject(&id)?,
    };
    Ok(envelope(StatusCode::OK, allocation))
}

async fn vacate_allocation_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(id): Path<String>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let allocation = core.workflow.vacate(&AllocationId(id))?;
    Ok(envelope(StatusCode::OK, allocation))
}

async fn list_students_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    Ok(Json(core.directory.list(query.page())).into_response())
}

async fn register_student_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Json(profile): Json<StudentProfile>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let student = core.directory.register(profile)?;
    Ok(envelope(StatusCode::CREATED, student))
}

async fn unallocated_students_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let students = core.workflow.unallocated_students(query.page());
    Ok(Json(students).into_response())
}

async fn update_student_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(id): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let student = core.directory.upsert_profile(&StudentId(id), update)?;
    Ok(envelope(StatusCode::OK, student))
}

async fn delete_student_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(id): Path<String>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let student = core.workflow.delete_student(&StudentId(id))?;
    Ok(envelope(StatusCode::OK, student))
}

async fn create_hostel_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Json(new_hostel): Json<NewHostel>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let hostel = core.registry.create_hostel(new_hostel)?;
    Ok(envelope(StatusCode::CREATED, hostel))
}

async fn update_hostel_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(id): Path<String>,
    Json(update): Json<HostelUpdate>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let hostel = core.registry.update_hostel(&HostelId(id), update)?;
    Ok(envelope(StatusCode::OK, hostel))
}

async fn delete_hostel_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(id): Path<String>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    core.workflow.delete_hostel(&HostelId(id))?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn add_room_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(hostel_id): Path<String>,
    Json(new_room): Json<NewRoom>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let room = core.registry.add_room(&HostelId(hostel_id), new_room)?;
    Ok(envelope(StatusCode::CREATED, room))
}

async fn update_room_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(id): Path<String>,
    Json(update): Json<RoomUpdate>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let room = core.registry.update_room(&RoomId(id), update)?;
    Ok(envelope(StatusCode::OK, room))
}

async fn delete_room_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Path(id): Path<String>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    core.registry.delete_room(&RoomId(id))?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn report_summary_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    Ok(envelope(StatusCode::OK, core.workflow.dashboard_summary()))
}

async fn report_export_handler<P>(
    State(core): State<Arc<AllocationCore<P>>>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AllocationError>
where
    P: EventPublisher + 'static,
{
    let body = core.workflow.export_csv(query.kind)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv")],
        body,
    )
        .into_response())
}
