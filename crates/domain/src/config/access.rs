use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Principals (static-token authenticator)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccessConfig {
    #[serde(default)]
    pub principals: Vec<PrincipalConfig>,
}

/// One principal known to the static-token authenticator.
///
/// The bearer token is read from `token_env` once at startup; only its
/// SHA-256 digest is kept in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalConfig {
    pub id: String,
    #[serde(default = "d_role")]
    pub role: String,
    pub token_env: String,
    #[serde(default)]
    pub banned: bool,
    #[serde(default = "d_true")]
    pub active: bool,
}

fn d_role() -> String {
    "user".into()
}
fn d_true() -> bool {
    true
}
