//! Serde helper for patch fields where `null` means "clear" and absence means "keep".
//!
//! Use with `#[serde(default, deserialize_with = "crate::nullable::deserialize")]`.

use serde::{Deserialize, Deserializer};

pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
