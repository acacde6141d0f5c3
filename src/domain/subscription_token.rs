use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const TOKEN_BYTES: usize = 32;

fn generate_raw_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn is_well_formed(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= 128
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Raw confirmation token as it travels inside the confirmation link.
/// Only its [`TokenHash`] is ever persisted.
pub struct ConfirmationToken(String);

impl ConfirmationToken {
    pub fn generate() -> ConfirmationToken {
        Self(generate_raw_token())
    }

    /// Checks the shape of a token received from a client. Anything that could never
    /// have been issued is rejected before touching the store.
    pub fn parse(token: String) -> Result<ConfirmationToken, String> {
        if !is_well_formed(&token) {
            return Err("Confirmation token is malformed".to_string());
        }

        Ok(Self(token))
    }

    pub fn hash(&self) -> TokenHash {
        let digest = Sha256::digest(self.0.as_bytes());
        TokenHash(URL_SAFE_NO_PAD.encode(digest))
    }
}

impl AsRef<str> for ConfirmationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Tokens are credentials, keep them out of logs.
impl std::fmt::Debug for ConfirmationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ConfirmationToken(REDACTED)")
    }
}

/// SHA-256 of a confirmation token, URL-safe base64 encoded.
#[derive(Debug, Clone, Eq)]
pub struct TokenHash(String);

impl TokenHash {
    /// Wraps a hash read back from the store.
    pub fn from_stored(hash: String) -> TokenHash {
        Self(hash)
    }
}

impl PartialEq for TokenHash {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl AsRef<str> for TokenHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Long-lived token embedded in every email sent to a subscriber.
#[derive(Clone, Eq)]
pub struct UnsubscribeToken(String);

impl UnsubscribeToken {
    pub fn generate() -> UnsubscribeToken {
        Self(generate_raw_token())
    }

    pub fn parse(token: String) -> Result<UnsubscribeToken, String> {
        if !is_well_formed(&token) {
            return Err("Unsubscribe token is malformed".to_string());
        }

        Ok(Self(token))
    }
}

impl PartialEq for UnsubscribeToken {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl AsRef<str> for UnsubscribeToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for UnsubscribeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UnsubscribeToken(REDACTED)")
    }
}
