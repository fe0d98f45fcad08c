// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{exams, marks, reports, subjects},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Every academic route lives under `/api/classes/{class_id}` and requires a bearer token.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (engine + config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let subject_routes = Router::new()
        .route("/init", post(subjects::init_assignment))
        .route("/", get(subjects::list_subjects).post(subjects::add_subject))
        .route("/{subject_id}", delete(subjects::remove_subject))
        .route(
            "/{subject_id}/teacher",
            put(subjects::assign_teacher).delete(subjects::remove_teacher),
        );

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams).post(exams::create_exam))
        .route("/{exam_id}", get(exams::get_exam).delete(exams::delete_exam))
        .route("/{exam_id}/subjects", post(exams::add_exam_subjects))
        .route(
            "/{exam_id}/subjects/{subject_id}",
            delete(exams::remove_exam_subject),
        )
        .route(
            "/{exam_id}/subjects/{subject_id}/statistics",
            get(reports::subject_statistics),
        )
        .route("/{exam_id}/marks/init", post(exams::initialize_marks))
        .route(
            "/{exam_id}/marks/{student_id}/{subject_id}",
            put(marks::submit_marks),
        )
        .route("/{exam_id}/results", get(reports::exam_results));

    let student_routes = Router::new()
        .route("/{student_id}/marks", get(marks::get_mark_record))
        .route("/{student_id}/report", get(reports::student_report));

    let class_routes = Router::new()
        .nest("/subjects", subject_routes)
        .nest("/exams", exam_routes)
        .nest("/students", student_routes)
        .route("/sync", post(subjects::sync_assignments))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/classes/{class_id}", class_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
