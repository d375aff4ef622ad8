pub mod economy;
pub mod embeds;
pub mod timeouts;
