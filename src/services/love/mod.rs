pub mod billing;
pub mod couple_service;
pub mod sessions;
