pub mod account;
pub mod analytics;
pub mod batch;
pub mod chat;
pub mod common;
pub mod demo;
pub mod payment;
pub mod student;
pub mod subscription;

pub use account::*;
pub use analytics::*;
pub use batch::*;
pub use chat::*;
pub use common::*;
pub use demo::*;
pub use payment::*;
pub use student::*;
pub use subscription::*;

pub use crate::utils::pagination::{PaginatedResponse, PaginationInfo, PaginationParams};
