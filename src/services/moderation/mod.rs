pub mod duration;
pub mod expiry;
pub mod mod_log;
pub mod punishment_service;
