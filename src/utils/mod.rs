pub mod formatting;
pub mod notify;
pub mod permissions;
