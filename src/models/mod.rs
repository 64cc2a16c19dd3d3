pub mod category;
pub mod company;
pub mod event;
pub mod event_assignee;
pub mod event_beneficiary;
pub mod event_material;
pub mod event_material_unit;
pub mod material;
pub mod material_unit;
pub mod park;
pub mod person;
pub mod sub_category;
