use alloy::primitives::Address;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    hash::{
        Hash,
        Hasher,
    },
};

/// Opaque handle for a wallet account or contract address.
///
/// Addresses are hex strings whose canonical form ignores letter case, so two
/// handles compare equal when they differ only in case. The original spelling
/// (e.g. an EIP-55 checksummed address) is preserved for display.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into an EVM address. Checksum casing is not enforced.
    pub fn to_address(&self) -> Option<Address> {
        self.0.parse().ok()
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Account {}

impl Hash for Account {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Account {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<Address> for Account {
    fn from(address: Address) -> Self {
        Self(address.to_checksum(None))
    }
}

impl From<String> for Account {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}
