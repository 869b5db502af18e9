//! Domain entities

mod message;
mod room;
mod user;

pub use message::{MessageRecord, MessageSender, PublicMessage};
pub use room::Room;
pub use user::User;
