//! Bearer-token authentication.
//!
//! Tokens are read from the environment once at startup and only their
//! SHA-256 digests are kept. A presented token is hashed and compared in
//! constant time against every known digest.

use sb_domain::config::AccessConfig;
use sb_domain::error::{Error, Result};
use sb_domain::principal::Principal;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve a credential to a principal allowed to connect.
    ///
    /// Unknown, empty, banned and inactive credentials all fail with the
    /// same `AuthFailure`.
    async fn verify(&self, token: &str) -> Result<Principal>;
}

struct TokenEntry {
    digest: [u8; 32],
    principal: Principal,
}

#[derive(Default)]
pub struct TokenAuthenticator {
    entries: Vec<TokenEntry>,
}

fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

impl TokenAuthenticator {
    pub fn from_config(config: &AccessConfig) -> Self {
        let mut auth = Self::default();
        for pc in &config.principals {
            match std::env::var(&pc.token_env) {
                Ok(token) if !token.is_empty() => {
                    let principal = Principal {
                        id: pc.id.clone(),
                        role: pc.role.clone(),
                        banned: pc.banned,
                        active: pc.active,
                    };
                    auth.insert(principal, &token);
                }
                _ => {
                    tracing::warn!(
                        principal_id = %pc.id,
                        env_var = %pc.token_env,
                        "token env var unset or empty, principal cannot authenticate"
                    );
                }
            }
        }
        tracing::info!(count = auth.entries.len(), "loaded principals");
        auth
    }

    pub fn with_token(mut self, principal: Principal, token: &str) -> Self {
        self.insert(principal, token);
        self
    }

    fn insert(&mut self, principal: Principal, token: &str) {
        self.entries.push(TokenEntry {
            digest: digest(token),
            principal,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl Authenticator for TokenAuthenticator {
    async fn verify(&self, token: &str) -> Result<Principal> {
        if token.is_empty() {
            return Err(Error::AuthFailure);
        }
        let presented = digest(token);
        let found = self
            .entries
            .iter()
            .find(|e| bool::from(e.digest[..].ct_eq(&presented[..])));

        match found {
            Some(entry) if entry.principal.may_connect() => Ok(entry.principal.clone()),
            Some(entry) => {
                tracing::debug!(principal_id = %entry.principal.id, "principal may not connect");
                Err(Error::AuthFailure)
            }
            None => Err(Error::AuthFailure),
        }
    }
}
