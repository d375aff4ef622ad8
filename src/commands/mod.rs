pub mod clan;
pub mod custom_role;
pub mod discipline;
pub mod economy;
pub mod help;
pub mod love;
pub mod moderation;
pub mod shop;
pub mod ticket;
