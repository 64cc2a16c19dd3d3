use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::availability::check_availability,
        api::event::list_events,
        api::event::create_event,
        api::event::get_event,
        api::event::update_event,
        api::event::duplicate_event,
        api::event::delete_event,
        api::event::missing_materials,
        api::event::record_return,
        api::material::list_materials,
        api::material::create_material,
        api::material::get_material,
        api::material::list_unit_states,
    ),
    tags(
        (name = "robert2", description = "Robert2 rental API")
    )
)]
pub struct ApiDoc;
