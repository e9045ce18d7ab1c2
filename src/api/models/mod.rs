pub mod admin;
pub mod common;
pub mod students;

pub use admin::*;
pub use common::*;
pub use students::*;
