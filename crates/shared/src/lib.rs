pub mod custom_id;
pub mod domain;
pub mod error;
pub mod protocol;
