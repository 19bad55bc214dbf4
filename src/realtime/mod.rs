pub mod hub;

pub use hub::{ChatEvent, ChatHub};
