//! Authentication: provider login, sessions, group policy and bearer tokens

pub mod extract;
pub mod groups;
pub mod identity;
pub mod session;
pub mod token;
