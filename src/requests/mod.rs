pub mod send_push;

pub use send_push::{SendPushRequest, ValidationErrors};
