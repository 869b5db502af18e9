//! Gateway protocol definitions
//!
//! Every WebSocket text frame, in either direction, is an [`EventFrame`]:
//! `{ "event": <name>, "data": <payload> }`.

mod close_codes;
mod events;
mod frame;

pub use close_codes::CloseCode;
pub use events::{
    ClientEvent, ErrorPayload, JoinPayload, MessagePayload, PayloadError, ServerEvent,
    ERROR_EVENT, JOIN_EVENT, MESSAGE_EVENT, ROOM_EVENT,
};
pub use frame::EventFrame;
