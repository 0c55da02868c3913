mod member_repo_memory;
mod token_store_memory;

pub use member_repo_memory::*;
pub use token_store_memory::*;
