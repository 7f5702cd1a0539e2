//! Factory credential checks.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`Argon2Authenticator`] -- the poll-time [`Authenticator`] over stored hashes.

pub mod password;

use async_trait::async_trait;
use shotserver_core::dispatch::model::Factory;
use shotserver_core::dispatch::{AuthError, Authenticator};

/// Verifies the poll password against the factory's stored Argon2id hash.
///
/// Hashing is CPU-bound, so it runs on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Authenticator;

#[async_trait]
impl Authenticator for Argon2Authenticator {
    async fn verify(&self, factory: &Factory, credentials: &str) -> Result<(), AuthError> {
        let plain = credentials.to_string();
        let hash = factory.password_hash.clone();

        let verified = tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if verified {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials(factory.name.clone()))
        }
    }
}
