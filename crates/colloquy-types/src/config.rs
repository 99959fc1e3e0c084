//! Session configuration and domain profiles.
//!
//! `SessionConfig` arrives pre-validated from the upstream CLI/validation
//! layer; this crate never parses raw command-line text. The domain
//! profile table maps well-known expert names to their domain, know-how
//! and info subjects, with a default profile for unknown names.

use serde::{Deserialize, Serialize};

/// Name of the privileged participant.
pub const SUDO_NAME: &str = "admin";
/// Profile key for the default human participant.
pub const DEFAULT_EXPERT: &str = "user";

/// Width to which message text is reflowed for table display.
pub const TABLE_WIDTH: usize = 80;
/// Width to which protected code-block lines are wrapped.
pub const INNER_WIDTH: usize = 70;

/// Pre-validated runtime configuration for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Model identifier passed through to the backend.
    pub model: String,
    pub temperature: f64,
    /// Display verbosity, 0-3.
    pub verbosity: u8,
    /// Show tag markers in rendered instructions.
    pub use_tags: bool,
    /// Show speaker names in rendered chats.
    pub use_names: bool,
    /// Collapse the turn list into one aggregated message per request.
    pub single_shot: bool,
    /// Info subjects injected into instruction templates.
    pub infos: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            temperature: 0.0,
            verbosity: 1,
            use_tags: true,
            use_names: true,
            single_shot: false,
            infos: Vec::new(),
        }
    }
}

/// Domain profile of one expert: what they work on and which info
/// subjects their instruction template receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertProfile {
    pub domain: String,
    pub know_how: Vec<String>,
    pub infos: Vec<String>,
}

impl ExpertProfile {
    fn new(domain: &str, know_how: &[&str], infos: &[&str]) -> Self {
        Self {
            domain: domain.to_string(),
            know_how: know_how.iter().map(|s| s.to_string()).collect(),
            infos: infos.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Look up the domain profile for an expert name, falling back to the
/// default human profile for unknown names.
pub fn profile_for(name: &str) -> ExpertProfile {
    builtin_profiles()
        .into_iter()
        .find(|(n, _)| *n == name.to_lowercase())
        .map(|(_, p)| p)
        .unwrap_or_else(|| {
            builtin_profiles()
                .into_iter()
                .find(|(n, _)| *n == DEFAULT_EXPERT)
                .map(|(_, p)| p)
                .expect("default profile present")
        })
}

fn builtin_profiles() -> Vec<(&'static str, ExpertProfile)> {
    vec![
        (
            SUDO_NAME,
            ExpertProfile::new(
                "admin",
                &["network", "os", "project", "communication"],
                &["network", "project", "os"],
            ),
        ),
        (
            DEFAULT_EXPERT,
            ExpertProfile::new(
                "programmer",
                &["linux", "project", "open_source", "system"],
                &["python", "os", "project"],
            ),
        ),
        (
            "architect",
            ExpertProfile::new(
                "architect",
                &["software architecture", "design patterns", "microservices"],
                &["project", "os", "network", "docker"],
            ),
        ),
        (
            "devops",
            ExpertProfile::new(
                "devops",
                &["continuous_delivery", "automation", "ci/cd"],
                &["docker", "os", "project"],
            ),
        ),
        (
            "kernel",
            ExpertProfile::new(
                "system_linux",
                &["linux", "kernel", "open_source"],
                &["os", "network"],
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.temperature, 0.0);
        assert!(config.use_tags);
        assert!(config.use_names);
        assert!(!config.single_shot);
    }

    #[test]
    fn test_config_partial_toml() {
        let config: SessionConfig = toml::from_str("verbosity = 3\nuse_tags = false").unwrap();
        assert_eq!(config.verbosity, 3);
        assert!(!config.use_tags);
        // untouched fields keep their defaults
        assert!(config.use_names);
    }

    #[test]
    fn test_profile_lookup_known() {
        let profile = profile_for("Admin");
        assert_eq!(profile.domain, "admin");
    }

    #[test]
    fn test_profile_lookup_unknown_falls_back() {
        let profile = profile_for("nobody_special");
        assert_eq!(profile, profile_for(DEFAULT_EXPERT));
    }
}
