// ── Core identity types ──
//
// ProjectId and ConnectionId key every shared map in the core.
// MacAddress is parsed once at the edge and carried as raw octets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::error::CoreError;

pub type DeviceId = i64;
pub type InterfaceId = i64;
pub type LinkId = i64;

// ── ProjectId ───────────────────────────────────────────────────────

/// Identifier of a project held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

impl ProjectId {
    /// Pseudo project addressed by the system-wide discovery job.
    pub const SYSTEM: Self = Self(40404);
    /// Listeners not bound to any project.
    pub const UNKNOWN: Self = Self(-1);

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<i64> for ProjectId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ── ConnectionId ────────────────────────────────────────────────────

/// Identifier of a registered listener connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, displayed upper-case and dash-separated (AA-BB-CC-DD-EE-FF).
///
/// Accepts colon or dash separators with one or two hex digits per octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Placeholder address meaning "not assigned yet".
    pub const ZERO: Self = Self([0; 6]);
    pub const BROADCAST: Self = Self([0xFF; 6]);

    pub const fn from_octets(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Group bit (least significant bit of the first octet).
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}-{b:02X}-{c:02X}-{d:02X}-{e:02X}-{g:02X}")
    }
}

impl FromStr for MacAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::bad_request(format!("The MAC address({s}) is invalid"));

        let mut octets = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for octet in &mut octets {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || part.len() > 2 {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

// ── Unique id allocation ────────────────────────────────────────────

/// First id handed out by [`generate_unique_id`].
pub const FIRST_ASSIGNED_ID: i64 = 50_001;

/// Candidates past this value wrap back to [`FIRST_ASSIGNED_ID`].
pub const ID_WRAP_THRESHOLD: i64 = i32::MAX as i64;

/// Attempts before giving up.
pub const ID_MAX_ATTEMPTS: u32 = u16::MAX as u32;

/// Pick the next free id after `last_assigned`.
///
/// `contains` reports whether a candidate is taken. On success the chosen
/// id is written back to `last_assigned`.
pub fn generate_unique_id(
    last_assigned: &mut i64,
    contains: impl Fn(i64) -> bool,
) -> Result<i64, CoreError> {
    let mut id = last_assigned.saturating_add(1).max(FIRST_ASSIGNED_ID);

    for _ in 0..ID_MAX_ATTEMPTS {
        if id > ID_WRAP_THRESHOLD {
            id = FIRST_ASSIGNED_ID;
        }
        if !contains(id) {
            *last_assigned = id;
            return Ok(id);
        }
        id += 1;
    }

    Err(CoreError::bad_request("Cannot get an available unique id"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn mac_address_normalizes_colons_and_case() {
        let mac: MacAddress = "01:0e:cf:0:0:1".parse().unwrap();
        assert_eq!(mac.to_string(), "01-0E-CF-00-00-01");
        assert!(mac.is_multicast());
    }

    #[test]
    fn mac_address_rejects_garbage() {
        assert!("01-0E-CF-00-00".parse::<MacAddress>().is_err());
        assert!("01-0E-CF-00-00-01-02".parse::<MacAddress>().is_err());
        assert!("01-0E-CF-00-00-GG".parse::<MacAddress>().is_err());
        assert!("".parse::<MacAddress>().is_err());
    }

    #[test]
    fn mac_address_serde_roundtrips_through_string() {
        let mac: MacAddress = serde_json::from_str("\"00-11-22-33-44-55\"").unwrap();
        assert!(!mac.is_multicast());
        assert_eq!(serde_json::to_string(&mac).unwrap(), "\"00-11-22-33-44-55\"");
    }

    #[test]
    fn unique_id_starts_at_floor() {
        let mut last = -1;
        let id = generate_unique_id(&mut last, |_| false).unwrap();
        assert_eq!(id, FIRST_ASSIGNED_ID);
        assert_eq!(last, FIRST_ASSIGNED_ID);
    }

    #[test]
    fn unique_id_skips_taken_values() {
        let mut last = FIRST_ASSIGNED_ID;
        let taken = [FIRST_ASSIGNED_ID + 1, FIRST_ASSIGNED_ID + 2];
        let id = generate_unique_id(&mut last, |c| taken.contains(&c)).unwrap();
        assert_eq!(id, FIRST_ASSIGNED_ID + 3);
    }

    #[test]
    fn unique_id_wraps_past_threshold() {
        let mut last = ID_WRAP_THRESHOLD;
        let id = generate_unique_id(&mut last, |_| false).unwrap();
        assert_eq!(id, FIRST_ASSIGNED_ID);
    }

    #[test]
    fn unique_id_fails_when_exhausted() {
        let mut last = 0;
        let err = generate_unique_id(&mut last, |_| true).unwrap_err();
        assert_eq!(err.to_string(), "Cannot get an available unique id");
        assert_eq!(last, 0);
    }
}
