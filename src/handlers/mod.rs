pub mod health;
pub mod push;

pub use health::health_check;
pub use push::send_push;
