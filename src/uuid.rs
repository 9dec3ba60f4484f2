/*!

Object identifiers. An identifier is 16 random bytes; its canonical wire form
is a fixed-width, lower-case, 32-character hexadecimal string. Configuration
files and API responses both rely on the two forms round-tripping losslessly.

A legacy 31-bit "short" form (the first four bytes, sign bit cleared) exists
for numeric-id consumers; it is only unique within a root class, and only when
the owning object asked for that guarantee at registration time.

*/

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

use rand::RngCore;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TvCoreError;

/// Length of the binary form in bytes.
pub const UUID_BIN_SIZE: usize = 16;
/// Length of the hex wire form in characters.
pub const UUID_HEX_SIZE: usize = UUID_BIN_SIZE * 2;

/// A 16-byte object identifier.
///
/// `Ord` compares byte-wise, so ordered indices keyed by `Uuid` enumerate in
/// identifier order.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uuid([u8; UUID_BIN_SIZE]);

fn hexnibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Uuid {
    /// Draws a fresh identifier from the supplied generator.
    pub fn random(rng: &mut dyn RngCore) -> Self {
        let mut bin = [0u8; UUID_BIN_SIZE];
        rng.fill_bytes(&mut bin);
        Uuid(bin)
    }

    pub const fn from_bin(bin: [u8; UUID_BIN_SIZE]) -> Self {
        Uuid(bin)
    }

    /// Parses the hex wire form. Validation is strict: exactly 32 characters,
    /// hex alphabet only. Both nibble cases are accepted on input; output is
    /// always lower-case.
    pub fn from_hex(s: &str) -> Result<Self, TvCoreError> {
        let bytes = s.as_bytes();
        if bytes.len() != UUID_HEX_SIZE {
            return Err(TvCoreError::InvalidUuid(s.to_string()));
        }
        let mut bin = [0u8; UUID_BIN_SIZE];
        for (i, pair) in bytes.chunks_exact(2).enumerate() {
            let hi = hexnibble(pair[0]).ok_or_else(|| TvCoreError::InvalidUuid(s.to_string()))?;
            let lo = hexnibble(pair[1]).ok_or_else(|| TvCoreError::InvalidUuid(s.to_string()))?;
            bin[i] = hi << 4 | lo;
        }
        Ok(Uuid(bin))
    }

    /// The canonical wire form: lower-case, fixed 32 characters.
    pub fn hex(&self) -> String {
        const ALPHABET: &[u8; 16] = b"0123456789abcdef";
        let mut out = String::with_capacity(UUID_HEX_SIZE);
        for b in self.0 {
            out.push(ALPHABET[usize::from(b >> 4)] as char);
            out.push(ALPHABET[usize::from(b & 0xf)] as char);
        }
        out
    }

    /// The legacy 31-bit numeric form: the first four bytes, big-endian, with
    /// the sign bit cleared.
    pub fn short(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]) & 0x7fff_ffff
    }

    pub const fn as_bin(&self) -> &[u8; UUID_BIN_SIZE] {
        &self.0
    }
}

/// The all-zero identifier, the "not yet registered" placeholder.
impl Default for Uuid {
    fn default() -> Self {
        Uuid([0; UUID_BIN_SIZE])
    }
}

impl Display for Uuid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

impl Debug for Uuid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Uuid").field(&self.hex()).finish()
    }
}

impl FromStr for Uuid {
    type Err = TvCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_hex(s)
    }
}

// On the wire an identifier is its hex string, nothing more.
impl Serialize for Uuid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

struct UuidVisitor;

impl Visitor<'_> for UuidVisitor {
    type Value = Uuid;

    fn expecting(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "a {UUID_HEX_SIZE}-character hex string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Uuid, E> {
        Uuid::from_hex(v).map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for Uuid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(UuidVisitor)
    }
}
