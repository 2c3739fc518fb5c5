mod appointment;
mod auth;
mod chat;

pub use appointment::*;
pub use auth::*;
pub use chat::*;
