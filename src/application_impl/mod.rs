mod auth_service_impl;
mod credential_hasher_impl;
mod member_service_impl;
mod token_codec_impl;

pub use auth_service_impl::*;
pub use credential_hasher_impl::*;
pub use member_service_impl::*;
pub use token_codec_impl::*;
