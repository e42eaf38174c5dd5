pub mod channel;
pub mod negotiator;

pub use channel::{with_deadline, ControlChannel};
