use serde::{Deserialize, Serialize};

/// Forge authentication and path-selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeAuthConfig {
    /// `GITHUB_TOKEN` or App-derived credential.
    #[serde(default)]
    pub token: String,

    /// Root URL the compound (`/graphql`) and fine-grained (`/rest`) paths
    /// are built against. Overridable via `GITHUB_API_URL` for forge
    /// deployments other than github.com (GHES).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// `USE_COMPOUND_QUERIES` — toggles the compound path in the Hybrid
    /// Forge Client. Default true.
    #[serde(default = "default_true")]
    pub use_compound_queries: bool,

    /// Per-call timeout ceiling in seconds (spec §5: recommended 15s).
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl Default for ForgeAuthConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: default_base_url(),
            use_compound_queries: default_true(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_call_timeout() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = ForgeAuthConfig::default();
        assert!(config.use_compound_queries);
        assert_eq!(config.call_timeout_secs, 15);
    }
}
