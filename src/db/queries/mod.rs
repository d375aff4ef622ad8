pub mod account;
pub mod active_mute;
pub mod clan;
pub mod custom_role;
pub mod discipline;
pub mod love;
pub mod shop;
pub mod temp_role;
pub mod ticket;
pub mod voice_presence;
