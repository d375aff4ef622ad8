pub mod activity;
pub mod custom_roles;
pub mod levels;
pub mod reminders;
pub mod rewards;
pub mod robbery;
pub mod shop;
pub mod wallet;
