//! Secure credential handling using the secrecy crate
//!
//! Bearer credentials live in memory for the whole run, so they are wrapped
//! in `Secret<SecretValue>`: memory is zeroed on drop, Debug output is
//! redacted, and access requires an explicit `expose_secret()` call.
//!
//! # Example
//!
//! ```rust
//! use meridian::config::{SecretString, SecretValue};
//! use secrecy::{ExposeSecret, Secret};
//!
//! let token: SecretString = Secret::new(SecretValue::from("bearer-token".to_string()));
//! assert_eq!(token.expose_secret().as_ref(), "bearer-token");
//! println!("{:?}", token); // Prints: Secret([REDACTED])
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Newtype wrapper for String that implements the traits Secret requires
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl From<SecretValue> for String {
    fn from(mut s: SecretValue) -> Self {
        std::mem::take(&mut s.0)
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Check if the secret value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Secret string type used for credentials throughout the configuration
pub type SecretString = Secret<SecretValue>;
