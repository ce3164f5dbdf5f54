//! Staff credential and the shared-secret authorizer.

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use uniform_kernel::PortalError;

/// Opaque staff credential passed with every admin call. `Debug` output is
/// redacted.
#[derive(Debug)]
pub struct Credential(SecretString);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(SecretString::from(secret.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Decides whether a credential may run staff operations.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, credential: &Credential) -> Result<(), PortalError>;
}

/// One shared password compared in constant time.
pub struct SharedSecretAuthorizer {
    secret: SecretString,
}

impl SharedSecretAuthorizer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
        }
    }
}

impl Authorizer for SharedSecretAuthorizer {
    fn authorize(&self, credential: &Credential) -> Result<(), PortalError> {
        let expected = self.secret.expose_secret().as_bytes();
        let given = credential.expose().as_bytes();
        if expected.is_empty() || !bool::from(expected.ct_eq(given)) {
            return Err(PortalError::Unauthorized);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_the_exact_secret() {
        let auth = SharedSecretAuthorizer::new("kts-staff");
        assert!(auth.authorize(&Credential::from("kts-staff")).is_ok());
        assert_eq!(
            auth.authorize(&Credential::from("kts-staf")),
            Err(PortalError::Unauthorized)
        );
        assert_eq!(
            auth.authorize(&Credential::from("")),
            Err(PortalError::Unauthorized)
        );
    }

    #[test]
    fn empty_configured_secret_locks_everyone_out() {
        let auth = SharedSecretAuthorizer::new("");
        assert_eq!(
            auth.authorize(&Credential::from("")),
            Err(PortalError::Unauthorized)
        );
    }

    #[test]
    fn debug_output_is_redacted() {
        let rendered = format!("{:?}", Credential::from("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
