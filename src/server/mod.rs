mod admin;
pub mod dto;
pub mod flash;
pub mod page;
pub mod response;
mod router;
mod site;
pub mod validation;

pub use admin::admin_router;
pub use router::{AppState, create_router};
pub use site::site_router;
