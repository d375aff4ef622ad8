pub mod clans;
pub mod discipline;
pub mod economy;
pub mod love;
pub mod moderation;
pub mod tickets;
