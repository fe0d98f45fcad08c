// tests/api_tests.rs

use std::sync::Arc;

use academic_records::{
    config::Config,
    grading::GradeScale,
    routes,
    services::Academics,
    state::AppState,
    store::{MemoryDirectory, MemoryStore},
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};

const JWT_SECRET: &str = "test_secret_for_integration_tests";
const CLASS: &str = "class-7c";
const ADMIN: &str = "admin-7c";

struct TestApp {
    address: String,
    client: reqwest::Client,
}

/// Helper function to spawn the app on a random port for testing.
/// The engine runs on the in-memory store with one class of two students.
async fn spawn_app() -> TestApp {
    let directory = Arc::new(MemoryDirectory::new());
    directory.add_class(CLASS, "school-9", ADMIN);
    directory.enroll(CLASS, "pupil-1");
    directory.enroll(CLASS, "pupil-2");

    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        grade_scale: GradeScale::Extended,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    };
    let academics = Academics::new(
        Arc::new(MemoryStore::new()),
        directory,
        config.grade_scale,
    );

    let state = AppState { academics, config };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}/api/classes/{}", port, CLASS),
        client: reqwest::Client::new(),
    }
}

fn token(caller: &str, role: &str) -> String {
    sign_jwt(caller, role, JWT_SECRET, 600).expect("Failed to sign token")
}

impl TestApp {
    async fn post(&self, path: &str, caller: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(token(caller, "teacher"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn put(&self, path: &str, caller: &str, body: Value) -> reqwest::Response {
        self.client
            .put(format!("{}{}", self.address, path))
            .bearer_auth(token(caller, "teacher"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn get(&self, path: &str, caller: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(token(caller, "student"))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Subject with a teacher plus an exam over it. Returns (subject_id, exam_id).
    async fn seed_exam(&self, teacher: &str, full_marks: f64) -> (String, String) {
        let subject: Value = self
            .post(
                "/subjects",
                ADMIN,
                json!({ "name": "Chemistry", "code": "CHEM", "teacher_id": teacher }),
            )
            .await
            .json()
            .await
            .unwrap();
        let subject_id = subject["subjectId"].as_str().unwrap().to_string();

        let created: Value = self
            .post(
                "/exams",
                ADMIN,
                json!({
                    "exam_name": "Unit Test 1",
                    "exam_code": "UT1",
                    "exam_date": "2025-04-02",
                    "duration": 45,
                    "subjects": [{ "subject_id": subject_id, "full_marks": full_marks }]
                }),
            )
            .await
            .json()
            .await
            .unwrap();
        let exam_id = created["exam"]["examId"].as_str().unwrap().to_string();
        (subject_id, exam_id)
    }
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/../../random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/subjects", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .get(format!("{}/subjects", app.address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_adds_subjects_and_others_may_not() {
    let app = spawn_app().await;

    let response = app
        .post("/subjects", ADMIN, json!({ "name": "Biology", "code": "BIO" }))
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let subject: Value = response.json().await.unwrap();
    assert_eq!(subject["credits"], 1);
    assert!(subject["teacherId"].is_null());

    let response = app
        .post("/subjects", ADMIN, json!({ "name": "bIOLOGY", "code": "BIO2" }))
        .await;
    assert_eq!(response.status().as_u16(), 409);

    let response = app
        .post("/subjects", "teacher-x", json!({ "name": "Art", "code": "ART" }))
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .post("/subjects", ADMIN, json!({ "name": "", "code": "EMPTY" }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let subjects: Value = app.get("/subjects", ADMIN).await.json().await.unwrap();
    assert_eq!(subjects.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn exam_creation_seeds_marks_for_the_class() {
    let app = spawn_app().await;
    let (_, exam_id) = app.seed_exam("chem-teacher", 60.0).await;

    let exams: Value = app.get("/exams", ADMIN).await.json().await.unwrap();
    assert_eq!(exams.as_array().unwrap().len(), 1);
    assert_eq!(exams[0]["examDate"], "2025-04-02");

    let record: Value = app
        .get("/students/pupil-2/marks", "pupil-2")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(record["exams"][0]["examId"], exam_id.as_str());
    assert!(record["exams"][0]["subjects"][0]["marksScored"].is_null());
}

#[tokio::test]
async fn submit_marks_checks_teacher_and_bounds() {
    let app = spawn_app().await;
    let (subject_id, exam_id) = app.seed_exam("chem-teacher", 60.0).await;
    let path = format!("/exams/{}/marks/pupil-1/{}", exam_id, subject_id);

    let response = app
        .put(&path, "chem-teacher", json!({ "marks_scored": 48.5 }))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let mark: Value = response.json().await.unwrap();
    assert_eq!(mark["marksScored"], 48.5);
    assert_eq!(mark["scoredBy"], "chem-teacher");

    let response = app
        .put(&path, "chem-teacher", json!({ "marks_scored": 61 }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .put(&path, "someone-else", json!({ "marks_scored": 10 }))
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .put(
            &format!("/exams/{}/marks/ghost/{}", exam_id, subject_id),
            "chem-teacher",
            json!({ "marks_scored": 10 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn reassignment_moves_permission_to_the_new_teacher() {
    let app = spawn_app().await;
    let (subject_id, exam_id) = app.seed_exam("old-teacher", 100.0).await;
    let path = format!("/exams/{}/marks/pupil-1/{}", exam_id, subject_id);

    app.put(&path, "old-teacher", json!({ "marks_scored": 82 }))
        .await;

    let response = app
        .put(
            &format!("/subjects/{}/teacher", subject_id),
            ADMIN,
            json!({ "teacher_id": "new-teacher" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let change: Value = response.json().await.unwrap();
    assert_eq!(change["subject"]["teacherId"], "new-teacher");
    assert!(change["propagation"]["warnings"].as_array().unwrap().is_empty());

    let response = app.post("/sync", ADMIN, json!({})).await;
    assert_eq!(response.status().as_u16(), 200);

    let exam: Value = app
        .get(&format!("/exams/{}", exam_id), ADMIN)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(exam["subjects"][0]["teacherId"], "new-teacher");

    let response = app
        .put(&path, "old-teacher", json!({ "marks_scored": 90 }))
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .put(&path, "new-teacher", json!({ "marks_scored": 101 }))
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn reports_are_limited_to_the_class() {
    let app = spawn_app().await;
    let (subject_id, exam_id) = app.seed_exam("chem-teacher", 50.0).await;
    app.put(
        &format!("/exams/{}/marks/pupil-1/{}", exam_id, subject_id),
        "chem-teacher",
        json!({ "marks_scored": 45 }),
    )
    .await;

    let response = app.get("/students/pupil-1/report", "pupil-1").await;
    assert_eq!(response.status().as_u16(), 200);
    let report: Value = response.json().await.unwrap();
    assert_eq!(report["exams"][0]["grade"], "A+");
    assert_eq!(report["exams"][0]["percentage"], 90.0);

    let response = app.get("/students/pupil-1/report", "pupil-2").await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .get(&format!("/exams/{}/results", exam_id), "chem-teacher")
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let results: Value = response.json().await.unwrap();
    assert_eq!(results["students"].as_array().unwrap().len(), 2);

    let response = app
        .get(
            &format!("/exams/{}/subjects/{}/statistics", exam_id, subject_id),
            "chem-teacher",
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let stats: Value = response.json().await.unwrap();
    assert_eq!(stats["scoredCount"], 1);
    assert_eq!(stats["highest"]["studentId"], "pupil-1");
}

#[tokio::test]
async fn oversized_teacher_id_is_a_bad_request() {
    let app = spawn_app().await;
    let (subject_id, _) = app.seed_exam("chem-teacher", 50.0).await;

    let response = app
        .put(
            &format!("/subjects/{}/teacher", subject_id),
            ADMIN,
            json!({ "teacher_id": "x".repeat(5000) }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .post(
            "/subjects",
            ADMIN,
            json!({ "name": "Physics", "code": "PHY", "teacher_id": "x".repeat(5000) }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let subjects: Value = app.get("/subjects", ADMIN).await.json().await.unwrap();
    assert_eq!(subjects[0]["teacherId"], "chem-teacher");
}

#[tokio::test]
async fn duplicate_exam_codes_conflict() {
    let app = spawn_app().await;
    let (subject_id, _) = app.seed_exam("chem-teacher", 50.0).await;

    let response = app
        .post(
            "/exams",
            ADMIN,
            json!({
                "exam_name": "Unit Test 2",
                "exam_code": "ut1",
                "exam_date": "2025-05-02",
                "duration": 45,
                "subjects": [{ "subject_id": subject_id, "full_marks": 50 }]
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);
}
