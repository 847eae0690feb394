//! IEEE 802.15.4 extended addresses.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Length of an extended (EUI-64) link-layer address in bytes.
pub const LINK_ADDR_LEN: usize = 8;

/// Prefix used by the simulator when deriving addresses from node ids.
const SIM_PREFIX: [u8; 3] = [0x00, 0x12, 0x4b];

/// Errors produced when parsing a [`LinkAddr`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkAddrError {
    /// The input did not decode to exactly eight bytes.
    #[error("expected {LINK_ADDR_LEN} address bytes, got {0}")]
    Length(usize),

    /// The input contained something other than hex digits and colons.
    #[error("invalid hex in link address: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Link-layer address of a mesh neighbor.
///
/// This is only ever used as a key for negotiation calls. The controller
/// holds no other data about the neighbor it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkAddr([u8; LINK_ADDR_LEN]);

impl LinkAddr {
    /// Create an address from raw bytes.
    pub const fn new(bytes: [u8; LINK_ADDR_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive the address of a simulated node.
    ///
    /// Node ids occupy the two low bytes, so `from_node_id(2)` is
    /// `00:12:4b:00:00:00:00:02`.
    pub const fn from_node_id(id: u16) -> Self {
        let [hi, lo] = id.to_be_bytes();
        Self([SIM_PREFIX[0], SIM_PREFIX[1], SIM_PREFIX[2], 0, 0, 0, hi, lo])
    }

    /// Raw address bytes.
    pub const fn as_bytes(&self) -> &[u8; LINK_ADDR_LEN] {
        &self.0
    }

    /// The node id encoded in the low two bytes.
    pub const fn node_id(&self) -> u16 {
        u16::from_be_bytes([self.0[6], self.0[7]])
    }
}

impl From<[u8; LINK_ADDR_LEN]> for LinkAddr {
    fn from(bytes: [u8; LINK_ADDR_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for LinkAddr {
    type Err = LinkAddrError;

    /// Accepts `00:12:4b:00:00:00:00:02` or `00124b0000000002`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.trim().chars().filter(|&c| c != ':').collect();
        let bytes = hex::decode(&digits)?;
        let bytes: [u8; LINK_ADDR_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| LinkAddrError::Length(bytes.len()))?;
        Ok(Self(bytes))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for LinkAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for LinkAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
