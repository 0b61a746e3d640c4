//! Session and group membership configuration

use confique::Config;

/// Longest accepted session lifetime, one year
pub const MAX_SESSION_TTL: u64 = 365 * 24 * 60 * 60;

/// Login session settings
#[derive(Debug, Config, Clone)]
pub struct SessionConfig {
    /// Session lifetime in seconds (default: 86400 = 1 day)
    #[config(env = "SESSION_TTL", default = 86400)]
    pub ttl: u64,

    /// Mark the session cookie `Secure` (default: true)
    #[config(env = "SESSION_COOKIE_SECURE", default = true)]
    pub cookie_secure: bool,

    /// Group whose members may issue tokens for any group (default: 1)
    #[config(env = "ADMIN_GROUP_ID", default = 1)]
    pub admin_group_id: i32,

    /// Group memberships as `group=member,member;group=member`
    #[config(env = "GROUP_MEMBERS", default = "")]
    pub group_members: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: 86400,
            cookie_secure: true,
            admin_group_id: 1,
            group_members: String::new(),
        }
    }
}
