pub mod entities;
pub mod errors;
pub mod lifecycle;
pub mod repositories;
pub mod schema;
pub mod spending;
pub mod value_objects;
