pub mod password;
pub mod policy;
pub mod session;
pub mod totp;

pub use policy::{authorize, Action, Actor, Denied};
