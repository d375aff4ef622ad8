pub mod billing;
pub mod clan_service;
