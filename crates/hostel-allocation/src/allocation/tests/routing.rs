use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::allocation::domain::Gender;
use crate::allocation::router::allocation_router;

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn apply_body(matric: &str, gender: &str, room_id: &str) -> Value {
    json!({
        "profile": {
            "fullName": format!("Student {matric}"),
            "email": format!("{matric}@campus.edu"),
            "matricNumber": matric,
            "department": "Computer Science",
            "level": "200",
            "gender": gender,
            "phone": "08031234567"
        },
        "personalityTraits": {
            "sleepSchedule": "early",
            "studyHabits": "quiet",
            "cleanlinessLevel": 4,
            "socialPreference": "introvert",
            "noisePreference": "quiet",
            "hobbies": ["Reading"],
            "visitorFrequency": "rarely"
        },
        "roomId": room_id
    })
}

#[tokio::test]
async fn apply_returns_created_allocation_in_the_envelope() {
    let seeded = seeded();
    let router = allocation_router(Arc::new(seeded.core.clone()));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/allocations/apply",
            apply_body("20240001", "male", &seeded.room_101.id.0),
        ))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    let data = payload.get("data").expect("data envelope");
    assert_eq!(data.get("status"), Some(&json!("pending")));
    assert_eq!(data.get("roomId"), Some(&json!(seeded.room_101.id.0)));
    assert_eq!(data.get("session"), Some(&json!("2025/2026")));
}

#[tokio::test]
async fn duplicate_application_maps_to_conflict() {
    let seeded = seeded();
    let router = allocation_router(Arc::new(seeded.core.clone()));

    let first = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/allocations/apply",
            apply_body("20240001", "male", &seeded.room_101.id.0),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = router
        .oneshot(json_request(
            "POST",
            "/api/v1/allocations/apply",
            apply_body("20240001", "male", &seeded.room_102.id.0),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let payload = read_json_body(second).await;
    assert_eq!(
        payload.pointer("/error/code"),
        Some(&json!("conflict"))
    );
}

#[tokio::test]
async fn invalid_profile_maps_to_bad_request() {
    let seeded = seeded();
    let router = allocation_router(Arc::new(seeded.core.clone()));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/allocations/apply",
            apply_body("12345", "male", &seeded.room_101.id.0),
        ))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.pointer("/error/code"),
        Some(&json!("validation_failed"))
    );
}

#[tokio::test]
async fn patch_decides_an_allocation() {
    let seeded = seeded();
    let allocation = apply(&seeded.core, "20240001", Gender::Male, &seeded.room_101.id).unwrap();
    let router = allocation_router(Arc::new(seeded.core.clone()));

    let response = router
        .oneshot(json_request(
            "PATCH",
            &format!("/api/v1/admin/allocations/{}", allocation.id.0),
            json!({ "status": "approved" }),
        ))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.pointer("/data/status"), Some(&json!("approved")));
    assert_eq!(
        seeded.core.registry.get_room(&seeded.room_101.id).unwrap().occupied,
        1
    );
}

#[tokio::test]
async fn full_room_surfaces_the_capacity_exceeded_code() {
    let seeded = seeded();
    let first = apply(&seeded.core, "20240001", Gender::Male, &seeded.room_102.id).unwrap();
    let second = apply(&seeded.core, "20240002", Gender::Male, &seeded.room_102.id).unwrap();
    seeded.core.workflow.approve(&first.id, None).unwrap();

    let router = allocation_router(Arc::new(seeded.core.clone()));
    let response = router
        .oneshot(json_request(
            "PATCH",
            &format!("/api/v1/admin/allocations/{}", second.id.0),
            json!({ "status": "approved" }),
        ))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.pointer("/error/code"),
        Some(&json!("capacity_exceeded"))
    );
    let message = payload
        .pointer("/error/message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    assert!(message.contains("filled while you were reviewing"));
}

#[tokio::test]
async fn approval_accepts_a_room_override() {
    let seeded = seeded();
    let allocation = apply(&seeded.core, "20240001", Gender::Male, &seeded.room_102.id).unwrap();

    let router = allocation_router(Arc::new(seeded.core.clone()));
    let response = router
        .oneshot(json_request(
            "PATCH",
            &format!("/api/v1/admin/allocations/{}", allocation.id.0),
            json!({ "status": "approved", "roomId": seeded.room_101.id.0 }),
        ))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.pointer("/data/roomId"),
        Some(&json!(seeded.room_101.id.0))
    );
}

#[tokio::test]
async fn allocation_list_paginates_with_meta() {
    let seeded = seeded();
    for matric in ["20240001", "20240002", "20240003"] {
        apply(&seeded.core, matric, Gender::Male, &seeded.room_101.id).unwrap();
    }

    let router = allocation_router(Arc::new(seeded.core.clone()));
    let response = router
        .oneshot(get_request(
            "/api/v1/admin/allocations?status=pending&page=1&limit=2",
        ))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("data").and_then(Value::as_array).map(Vec::len),
        Some(2)
    );
    assert_eq!(payload.pointer("/meta/total"), Some(&json!(3)));
    assert_eq!(payload.pointer("/meta/page"), Some(&json!(1)));
}

#[tokio::test]
async fn unknown_status_filter_is_rejected() {
    let seeded = seeded();
    let router = allocation_router(Arc::new(seeded.core.clone()));

    let response = router
        .oneshot(get_request("/api/v1/admin/allocations?status=archived"))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn allocation_status_endpoint_reports_derived_state() {
    let seeded = seeded();
    let allocation = apply(&seeded.core, "20240001", Gender::Male, &seeded.room_101.id).unwrap();

    let router = allocation_router(Arc::new(seeded.core.clone()));
    let response = router
        .oneshot(get_request(&format!(
            "/api/v1/allocations/{}/status",
            allocation.student_id.0
        )))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.pointer("/data/status"), Some(&json!("pending")));
}

#[tokio::test]
async fn hostel_and_room_administration_round_trip() {
    let core = core();
    let router = allocation_router(Arc::new(core.clone()));

    let created = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/admin/hostels",
            json!({ "name": "Unity Hall", "gender": "male", "capacity": 12 }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(created.status(), StatusCode::CREATED);
    let hostel = read_json_body(created).await;
    let hostel_id = hostel
        .pointer("/data/id")
        .and_then(Value::as_str)
        .expect("hostel id")
        .to_string();

    let room = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/admin/hostels/{hostel_id}/rooms"),
            json!({ "roomNumber": "12", "type": "Premium", "capacity": 2 }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(room.status(), StatusCode::CREATED);

    let duplicate = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/admin/hostels/{hostel_id}/rooms"),
            json!({ "roomNumber": "12", "type": "Standard", "capacity": 4 }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let listed = router
        .oneshot(get_request(&format!("/api/v1/hostels/{hostel_id}/rooms")))
        .await
        .expect("router dispatch");
    let payload = read_json_body(listed).await;
    assert_eq!(
        payload.get("data").and_then(Value::as_array).map(Vec::len),
        Some(1)
    );
}

#[tokio::test]
async fn export_returns_csv() {
    let seeded = seeded();
    apply(&seeded.core, "20240001", Gender::Male, &seeded.room_101.id).unwrap();

    let router = allocation_router(Arc::new(seeded.core.clone()));
    let response = router
        .oneshot(get_request("/api/v1/admin/reports/export?type=students"))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok()),
        Some("text/csv")
    );
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    let text = String::from_utf8(body.to_vec()).expect("utf-8 csv");
    assert!(text.starts_with("id,fullName,email,matricNumber"));
    assert!(text.contains("20240001"));
}

#[tokio::test]
async fn complaint_lifecycle_over_http() {
    let seeded = seeded();
    let student = seeded
        .core
        .directory
        .register(profile("20240001", Gender::Male))
        .unwrap();

    let router = allocation_router(Arc::new(seeded.core.clone()));

    let submitted = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/complaints/{}", student.id.0),
            json!({ "type": "Maintenance", "description": "Broken window latch" }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(submitted.status(), StatusCode::CREATED);
    let complaint = read_json_body(submitted).await;
    let complaint_id = complaint
        .pointer("/data/id")
        .and_then(Value::as_str)
        .expect("complaint id")
        .to_string();

    let responded = router
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/v1/complaints/{complaint_id}"),
            json!({ "response": "Scheduled for Friday", "status": "Resolved" }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(responded.status(), StatusCode::OK);
    let payload = read_json_body(responded).await;
    assert_eq!(payload.pointer("/data/status"), Some(&json!("Resolved")));

    let again = router
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/v1/complaints/{complaint_id}"),
            json!({ "status": "Resolved" }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let listed = router
        .oneshot(get_request(&format!(
            "/api/v1/complaints/{}",
            student.id.0
        )))
        .await
        .expect("router dispatch");
    let payload = read_json_body(listed).await;
    assert_eq!(
        payload.get("data").and_then(Value::as_array).map(Vec::len),
        Some(1)
    );
}

#[tokio::test]
async fn unallocated_students_endpoint_joins_status() {
    let seeded = seeded();
    let allocation = apply(&seeded.core, "20240001", Gender::Male, &seeded.room_101.id).unwrap();
    seeded.core.workflow.reject(&allocation.id).unwrap();

    let router = allocation_router(Arc::new(seeded.core.clone()));
    let response = router
        .oneshot(get_request("/api/v1/admin/students/unallocated"))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let data = payload.get("data").and_then(Value::as_array).expect("data");
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].get("allocationStatus"), Some(&json!("rejected")));
    assert_eq!(data[0].get("matricNumber"), Some(&json!("20240001")));
}

#[tokio::test]
async fn summary_endpoint_returns_counts() {
    let seeded = seeded();
    apply(&seeded.core, "20240001", Gender::Male, &seeded.room_101.id).unwrap();

    let router = allocation_router(Arc::new(seeded.core.clone()));
    let response = router
        .oneshot(get_request("/api/v1/admin/reports/summary"))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.pointer("/data/totals/hostels"), Some(&json!(2)));
    assert_eq!(
        payload.pointer("/data/allocations/pending"),
        Some(&json!(1))
    );
    assert_eq!(payload.pointer("/data/occupancy/capacity"), Some(&json!(5)));
}
