use std::fmt;
use std::str::FromStr;

use cid::{Cid, Version};
use datastore::Key;
use multibase::Base;

use crate::error::BlocklistError;

/// Multicodec code for dag-pb, the codec every CIDv0 implicitly carries.
pub const DAG_PB: u64 = 0x70;

/// Parse a CID from its string form.
pub fn parse_cid(raw: &str) -> Result<Cid, BlocklistError> {
    Cid::try_from(raw.trim()).map_err(|e| BlocklistError::InvalidIdentifier(format!("{raw}: {e}")))
}

/// Canonical storage key for a content identifier.
///
/// All entries are stored under their CIDv1 form, so a CIDv0 is rewrapped as
/// a dag-pb CIDv1 over the same multihash. A v0 and a v1 reference to the
/// same hash therefore resolve to the same key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentKey(Cid);

impl ContentKey {
    pub fn cid(&self) -> &Cid {
        &self.0
    }

    /// Key used by the key-value backend and by `purge`.
    ///
    /// This is the layout IPFS datastores use: the CID bytes in unpadded
    /// upper-case base32, without a multibase prefix.
    pub fn datastore_key(&self) -> Key {
        let encoded = multibase::encode(Base::Base32Upper, self.0.to_bytes());
        Key::root().child(&encoded[1..])
    }
}

impl From<&Cid> for ContentKey {
    fn from(id: &Cid) -> Self {
        match id.version() {
            Version::V0 => Self(Cid::new_v1(DAG_PB, *id.hash())),
            Version::V1 => Self(*id),
        }
    }
}

impl From<Cid> for ContentKey {
    fn from(id: Cid) -> Self {
        Self::from(&id)
    }
}

impl FromStr for ContentKey {
    type Err = BlocklistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cid(s).map(Self::from)
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({})", self.0)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
