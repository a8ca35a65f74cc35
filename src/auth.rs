//! Identity-domain identifiers, provider error codes, session users, and token models.

pub mod code;
pub mod id;
pub mod token;
pub mod user;

pub use code::*;
pub use id::*;
pub use token::{record::*, secret::*};
pub use user::*;
