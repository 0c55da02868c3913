mod error;
mod handler;
mod policy;
mod router;

pub use error::recover_error;
pub use policy::*;
pub use router::routes;
