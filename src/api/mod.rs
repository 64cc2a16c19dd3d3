pub mod availability;
pub mod category;
pub mod company;
pub mod error;
pub mod event;
pub mod health;
pub mod material;
pub mod park;
pub mod person;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Availability
        .route("/availability", post(availability::check_availability))
        // Events
        .route("/events", get(event::list_events).post(event::create_event))
        .route("/events/trash", delete(event::purge_events))
        .route(
            "/events/:id",
            get(event::get_event)
                .put(event::update_event)
                .delete(event::delete_event),
        )
        .route("/events/:id/restore", put(event::restore_event))
        .route("/events/:id/duplicate", post(event::duplicate_event))
        .route(
            "/events/:id/missing-materials",
            get(event::missing_materials),
        )
        .route("/events/:id/return", put(event::record_return))
        // Materials
        .route(
            "/materials",
            get(material::list_materials).post(material::create_material),
        )
        .route(
            "/materials/:id",
            get(material::get_material)
                .put(material::update_material)
                .delete(material::delete_material),
        )
        .route("/materials/:id/restore", put(material::restore_material))
        .route("/materials/:id/units", post(material::add_unit))
        .route(
            "/materials/:id/units/:unit_id",
            put(material::update_unit).delete(material::remove_unit),
        )
        .route("/unit-states", get(material::list_unit_states))
        // Directory
        .route(
            "/persons",
            get(person::list_persons).post(person::create_person),
        )
        .route(
            "/persons/:id",
            get(person::get_person).delete(person::delete_person),
        )
        .route(
            "/companies",
            get(company::list_companies).post(company::create_company),
        )
        .route(
            "/companies/:id",
            get(company::get_company).delete(company::delete_company),
        )
        .route("/parks", get(park::list_parks).post(park::create_park))
        .route("/parks/:id", get(park::get_park).delete(park::delete_park))
        .route(
            "/categories",
            get(category::list_categories).post(category::create_category),
        )
        .route(
            "/categories/:id",
            get(category::get_category).delete(category::delete_category),
        )
        .route(
            "/categories/:id/sub-categories",
            post(category::create_sub_category),
        )
        .with_state(state)
}
