pub mod appointment;
pub mod chat_message;
pub mod document;
pub mod user;

pub use appointment::Appointment;
pub use chat_message::{ChatMessage, Sender};
pub use document::{Document, ExtractedContent};
pub use user::{Role, User};
