//! Schema version marker for persistent storage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural version of the persistent store.
///
/// Version 0 is an uninitialized store. Versions only ever increase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion(u32);

impl SchemaVersion {
    pub const UNINITIALIZED: Self = Self(0);

    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    pub const fn get(&self) -> u32 {
        self.0
    }

    pub fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u32> for SchemaVersion {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
