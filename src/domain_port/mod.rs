mod member_repo;
mod token_store;

pub use member_repo::*;
pub use token_store::*;
