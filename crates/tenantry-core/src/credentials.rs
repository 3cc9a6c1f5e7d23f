use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::SysAdminConfig;
use crate::error::ProvisionError;

type HmacSha256 = Hmac<Sha256>;

/// Credentials of the system administrator account on one tenant server.
///
/// Returned once to the caller of a deploy; never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AdminCredentials {
    /// Credentials for the tenant at `subdomain`.
    ///
    /// Uses the configured password when there is one; otherwise derives a
    /// stable password from the credential secret so every deploy of the same
    /// tenant logs in with the account the first deploy created.
    pub fn for_tenant(config: &SysAdminConfig, subdomain: &str) -> Result<Self, ProvisionError> {
        let password = match &config.password {
            Some(password) => password.clone(),
            None => derive_password(&config.credential_secret, subdomain)?,
        };

        Ok(Self {
            email: config.email.clone(),
            username: config.username.clone(),
            password,
        })
    }
}

fn derive_password(secret: &str, subdomain: &str) -> Result<String, ProvisionError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ProvisionError::Internal(format!("Invalid credential secret: {}", e)))?;
    mac.update(subdomain.as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());

    // Remote password rules require an uppercase letter, a digit and a symbol.
    Ok(format!("Tn-{}!A9", &digest[..24]))
}
