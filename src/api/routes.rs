//! API routes

use crate::api::handlers::{
    add_student, add_teacher, assign_teacher_bulk, delete_student, delete_teacher, get_stats,
    get_student, health_check, list_students, list_teachers, students_by_teacher,
    students_with_teachers, update_student, AppState,
};
use crate::api::middleware::{admin_key_middleware, AdminKey};
use crate::auth::handlers::{add_address, get_my_profile, login, register, update_my_profile};
use crate::auth::middleware::authenticate;
use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::{delete, get, patch, post},
    Router,
};

/// Build the API routes
pub fn build_api_routes(state: AppState) -> Router {
    let admin_key = AdminKey::new(state.config.security.admin_api_key.clone());

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/register", post(register))
        .route("/login", post(login));

    // Routes gated by a bearer token; role checks happen in the handlers
    let account_routes = Router::new()
        .route("/my_profile", get(get_my_profile).patch(update_my_profile))
        .route("/my_profile/addresses", post(add_address))
        .route("/students", get(list_students))
        .route("/students/:username", get(get_student))
        .route("/teachers", get(list_teachers))
        .route("/students_with_teachers", get(students_with_teachers))
        .route("/students_by_teacher/:teacher_id", get(students_by_teacher))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    // Routes gated by the admin key
    let admin_routes = Router::new()
        .route("/admin/add_student", post(add_student))
        .route("/admin/add_teacher", post(add_teacher))
        .route("/admin/assign_teacher_bulk", post(assign_teacher_bulk))
        .route(
            "/admin/students/:username",
            patch(update_student).delete(delete_student),
        )
        .route("/admin/teachers/:username", delete(delete_teacher))
        .route("/admin/stats", get(get_stats))
        .route_layer(middleware::from_fn(move |mut req: Request, next: Next| {
            let admin_key = admin_key.clone();
            async move {
                req.extensions_mut().insert(admin_key);
                admin_key_middleware(req, next).await
            }
        }));

    Router::new()
        .merge(public_routes)
        .merge(account_routes)
        .merge(admin_routes)
        .with_state(state)
}
