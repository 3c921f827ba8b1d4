//! Shared wire types for the narrator and appearance clients.

pub mod error;
pub mod id;
pub mod models;
pub mod operation;
pub mod registry;
pub mod requests;
pub mod responses;

pub use error::*;
pub use id::*;
pub use models::*;
pub use operation::*;
pub use registry::*;
pub use requests::*;
pub use responses::*;
