pub mod chat;
pub mod noop;
pub mod remote;
