pub mod admin;
pub mod security;
pub mod trace;

pub use admin::*;
pub use security::*;
pub use trace::*;
