mod common;

use common::{png_bytes, TestApp, TestAppOptions};
use doctormate_service::config::DoctorMateApiConfig;
use doctormate_service::services::referral::{DoctorMateClient, DERMATOLOGY, NEUROLOGY};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn specialties_body() -> Value {
    json!({
        "data": [
            {"id": DERMATOLOGY, "name": "Dermatology", "description": "Skin", "imageUrl": "https://img/derm.png"},
            {"id": NEUROLOGY, "name": "Neurology", "description": "Nerves", "imageUrl": null}
        ]
    })
}

fn doctors_body(count: usize) -> Value {
    let doctors: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": format!("doc-{}", i),
                "fullName": format!("Dr. {}", i),
                "imageUrl": null,
                "consultationFee": 250,
                "address": "Cairo",
                "workingTime": [{"day": "Mon", "from": "09:00", "to": "17:00"}],
                "qualifications": ["MBBCh"]
            })
        })
        .collect();
    json!({"data": {"doctors": doctors, "totalCount": count}})
}

async fn directory() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/Specialties"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(specialties_body()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/Specialties/{}/doctors", DERMATOLOGY)))
        .and(query_param("page", "1"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doctors_body(5)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/Specialties/{}/doctors", NEUROLOGY)))
        .respond_with(ResponseTemplate::new(200).set_body_json(doctors_body(1)))
        .mount(&server)
        .await;

    server
}

fn client_for(server: &MockServer) -> DoctorMateClient {
    DoctorMateClient::new(&DoctorMateApiConfig {
        base_url: format!("{}/api", server.uri()),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn client_finds_specialty_by_id() {
    let server = directory().await;
    let client = client_for(&server);

    let specialty = client.specialty(NEUROLOGY, "user-token").await.unwrap().unwrap();
    assert_eq!(specialty.name.as_deref(), Some("Neurology"));

    let missing = client.specialty("no-such-id", "user-token").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn client_truncates_doctors_to_limit() {
    let server = directory().await;
    let client = client_for(&server);

    let doctors = client
        .recommended_doctors(DERMATOLOGY, "user-token", 3)
        .await
        .unwrap();

    assert_eq!(doctors.len(), 3);
    assert_eq!(doctors[0].full_name.as_deref(), Some("Dr. 0"));
}

#[tokio::test]
async fn malformed_directory_entries_are_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/Specialties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": null, "name": "Broken"},
                {"id": 7, "name": "Numbered"},
                {"id": DERMATOLOGY, "name": "Dermatology"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/Specialties/{}/doctors", DERMATOLOGY)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"doctors": [
                {"id": 42, "fullName": "Dr. Numeric"},
                {"fullName": "Dr. Nobody"},
                {"id": "doc-1", "fullName": "Dr. Text"}
            ]}
        })))
        .mount(&server)
        .await;

    let referral = client_for(&server).referral_for(DERMATOLOGY, "user-token").await;

    let specialty = referral.specialty.unwrap();
    assert_eq!(specialty.name.as_deref(), Some("Dermatology"));

    let ids: Vec<&str> = referral
        .recommended_doctors
        .iter()
        .map(|d| d.id.as_str())
        .collect();
    assert_eq!(ids, ["42", "doc-1"]);
}

#[tokio::test]
async fn upstream_errors_degrade_to_empty_referral() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let referral = client_for(&server).referral_for(DERMATOLOGY, "user-token").await;

    assert!(referral.specialty.is_none());
    assert!(referral.recommended_doctors.is_empty());
}

#[tokio::test]
async fn skin_check_with_token_includes_referral() {
    let server = directory().await;
    let app = TestApp::spawn_with(TestAppOptions {
        doctormate_url: format!("{}/api", server.uri()),
        ..Default::default()
    })
    .await;

    let response = app.post_image(png_bytes(40, 40), Some("user-token")).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    let data = &body["data"];
    assert_eq!(data["specialty"]["id"], DERMATOLOGY);
    assert_eq!(data["specialty"]["imageUrl"], "https://img/derm.png");
    assert_eq!(data["recommended_doctors"].as_array().unwrap().len(), 3);
    assert_eq!(data["recommended_doctors"][0]["consultationFee"], 250);
}

#[tokio::test]
async fn skin_check_without_token_skips_referral() {
    let server = directory().await;
    let app = TestApp::spawn_with(TestAppOptions {
        doctormate_url: format!("{}/api", server.uri()),
        ..Default::default()
    })
    .await;

    let body: Value = app.post_image(png_bytes(40, 40), None).await.json().await.unwrap();

    assert!(body["data"].get("specialty").is_none());
    assert!(body["data"].get("recommended_doctors").is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn symptoms_referral_follows_keywords() {
    let server = directory().await;
    let app = TestApp::spawn_with(TestAppOptions {
        doctormate_url: format!("{}/api", server.uri()),
        ..Default::default()
    })
    .await;

    let response = app
        .post_symptoms(json!({"symptoms": "pounding headache"}), Some("user-token"))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["specialty"]["name"], "Neurology");
    assert_eq!(body["data"]["recommended_doctors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unreachable_directory_does_not_fail_analysis() {
    // default options point at a closed port
    let app = TestApp::spawn().await;

    let response = app
        .post_symptoms(json!({"symptoms": "pounding headache"}), Some("user-token"))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["specialty"], Value::Null);
    assert_eq!(body["data"]["recommended_doctors"], json!([]));
}
