// handlers/auth/mod.rs - /api/v1/auth/*

mod account;
mod reset;
mod session;

pub use account::{me, update_details, update_password};
pub use reset::{forgot_password, reset_password};
pub use session::{login, logout, register};
