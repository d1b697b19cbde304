pub mod api;
pub mod domain;
pub mod time;
