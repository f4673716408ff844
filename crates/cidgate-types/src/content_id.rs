use std::fmt;
use std::str::FromStr;

use cid::multihash::Multihash;
use cid::Cid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// Multicodec codes used when identifiers are minted locally.
pub mod codec {
    /// Raw binary leaf.
    pub const RAW: u64 = 0x55;
    /// Protobuf-encoded directory node.
    pub const DAG_PB: u64 = 0x70;
    /// BLAKE3 multihash.
    pub const BLAKE3: u64 = 0x1e;
}

/// Canonical content identifier.
///
/// A `ContentId` is always the result of a successful decode, so holding one
/// is proof that the text it came from was a well-formed CID. Two values are
/// equal exactly when their canonical string forms (see [`fmt::Display`])
/// are equal: CIDv0 renders in base58btc, CIDv1 in lowercase base32,
/// regardless of the multibase the input used.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentId(Cid);

impl ContentId {
    /// Decode identifier text into its canonical form.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        Cid::try_from(input)
            .map(Self)
            .map_err(|e| ParseError::new(input, e))
    }

    /// Mint a CIDv1 for `data` using a BLAKE3 multihash and the given codec.
    pub fn from_blake3(codec: u64, data: &[u8]) -> Self {
        let digest = blake3::hash(data);
        let hash = Multihash::<64>::wrap(codec::BLAKE3, digest.as_bytes())
            .expect("32-byte digest always fits a 64-byte multihash");
        Self(Cid::new_v1(codec, hash))
    }

    /// The wrapped [`Cid`].
    pub fn as_cid(&self) -> &Cid {
        &self.0
    }

    /// The multicodec of the addressed content.
    pub fn codec(&self) -> u64 {
        self.0.codec()
    }
}

impl From<Cid> for ContentId {
    fn from(cid: Cid) -> Self {
        Self(cid)
    }
}

impl FromStr for ContentId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serializes as a DAG-JSON link: `{"/": "<cid>"}`.
impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("/", &self.to_string())?;
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Link {
        #[serde(rename = "/")]
        link: String,
    },
    Plain(String),
}

/// Accepts either the DAG-JSON link form or a bare string.
impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = match Repr::deserialize(deserializer)? {
            Repr::Link { link } => link,
            Repr::Plain(s) => s,
        };
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
