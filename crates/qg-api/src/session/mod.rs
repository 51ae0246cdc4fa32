pub mod model;
pub mod registry;
pub mod routes;

pub use registry::{SessionEntry, SessionHandle, SessionRegistry};
pub use routes::routes;
