//! Password and request limit for newly created accounts.
//!
//! A password is the configured base followed by a suffix. The suffix comes
//! from the user's policy override when it sets one, otherwise from the first
//! server (in contribution order) that reported the user. Request limits
//! resolve the same way, falling back to the configured default.

use crate::config::{PasswordBase, ServerConfig};
use crate::identity::UnifiedUser;
use crate::policy::PolicyOverride;

/// Append `suffix` to `base`.
pub fn compose_password(base: &str, suffix: &str) -> String {
    let mut password = String::with_capacity(base.len() + suffix.len());
    password.push_str(base);
    password.push_str(suffix);
    password
}

/// Resolves per-account settings against the servers of the current pass.
#[derive(Debug, Clone, Copy)]
pub struct AccountDefaults<'a> {
    servers: &'a [ServerConfig],
    password_base: &'a PasswordBase,
    default_request_limit: Option<u32>,
}

impl<'a> AccountDefaults<'a> {
    pub fn new(
        servers: &'a [ServerConfig],
        password_base: &'a PasswordBase,
        default_request_limit: Option<u32>,
    ) -> Self {
        Self {
            servers,
            password_base,
            default_request_limit,
        }
    }

    fn contributing_servers<'u>(
        &self,
        user: &'u UnifiedUser,
    ) -> impl Iterator<Item = &'a ServerConfig> + use<'a, 'u> {
        let servers = self.servers;
        user.source_servers
            .iter()
            .filter_map(move |id| servers.iter().find(|server| &server.id == id))
    }

    pub fn password_suffix(&self, user: &UnifiedUser, policy: &PolicyOverride) -> String {
        if let Some(suffix) = policy.effective_password_suffix() {
            return suffix.to_string();
        }
        self.contributing_servers(user)
            .map(|server| server.password_suffix.as_str())
            .find(|suffix| !suffix.is_empty())
            .unwrap_or_default()
            .to_string()
    }

    pub fn password_for(&self, user: &UnifiedUser, policy: &PolicyOverride) -> String {
        let base = match self.password_base {
            PasswordBase::Username => user.display_username.as_str(),
            PasswordBase::Secret(secret) => secret.as_str(),
        };
        compose_password(base, &self.password_suffix(user, policy))
    }

    pub fn request_limit_for(&self, user: &UnifiedUser, policy: &PolicyOverride) -> Option<u32> {
        policy
            .request_limit
            .or_else(|| {
                self.contributing_servers(user)
                    .find_map(|server| server.request_limit)
            })
            .or(self.default_request_limit)
    }
}
