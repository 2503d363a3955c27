use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const GUID_STRING_LENGTH: usize = 36;
const HYPHENS: [usize; 4] = [8, 13, 18, 23];

/// A GUID in its on-disk mixed-endian form.
///
/// The first three fields (4, 2 and 2 bytes) are stored little-endian and the remaining 8 bytes
/// are stored in the order they appear in the string form.
///
/// # Examples
///
/// ```
/// use gpt_image::Guid;
///
/// let guid: Guid = "C12A7328-F81F-11D2-BA4B-00A0C93EC93B".parse().unwrap();
///
/// assert_eq!(guid, Guid::EFI_SYSTEM_PARTITION);
/// assert_eq!(guid.to_string(), "c12a7328-f81f-11d2-ba4b-00a0c93ec93b");
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    /// The all-zero GUID. As a partition type it marks an unused entry.
    pub const NULL: Guid = Guid([0; 16]);

    /// EFI System Partition (`C12A7328-F81F-11D2-BA4B-00A0C93EC93B`).
    pub const EFI_SYSTEM_PARTITION: Guid = Guid([
        0x28, 0x73, 0x2a, 0xc1, 0x1f, 0xf8, 0xd2, 0x11, 0xba, 0x4b, 0x00, 0xa0, 0xc9, 0x3e, 0xc9,
        0x3b,
    ]);

    /// Returns `true` if every byte of the GUID is zero.
    pub fn is_null(&self) -> bool {
        *self == Guid::NULL
    }

    /// Returns the raw on-disk bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<[u8; 16]> for Guid {
    fn from(bytes: [u8; 16]) -> Guid {
        Guid(bytes)
    }
}

impl FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Guid> {
        let invalid = || Error::InvalidGuid(s.to_string());
        let bytes = s.as_bytes();

        if bytes.len() != GUID_STRING_LENGTH {
            return Err(invalid());
        }

        for (i, c) in bytes.iter().enumerate() {
            let valid = if HYPHENS.contains(&i) {
                *c == b'-'
            } else {
                c.is_ascii_hexdigit()
            };
            if !valid {
                return Err(invalid());
            }
        }

        // NOTE: every character is now known to be ASCII, slicing cannot split a code point
        let data1 = u32::from_str_radix(&s[0..8], 16).map_err(|_| invalid())?;
        let data2 = u16::from_str_radix(&s[9..13], 16).map_err(|_| invalid())?;
        let data3 = u16::from_str_radix(&s[14..18], 16).map_err(|_| invalid())?;

        let mut guid = [0; 16];
        guid[0..4].copy_from_slice(&data1.to_le_bytes());
        guid[4..6].copy_from_slice(&data2.to_le_bytes());
        guid[6..8].copy_from_slice(&data3.to_le_bytes());

        let tail = s[19..23].chars().chain(s[24..].chars()).collect::<String>();
        for (i, x) in guid[8..].iter_mut().enumerate() {
            *x = u8::from_str_radix(&tail[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }

        Ok(Guid(guid))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let g = &self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-",
            u32::from_le_bytes([g[0], g[1], g[2], g[3]]),
            u16::from_le_bytes([g[4], g[5]]),
            u16::from_le_bytes([g[6], g[7]]),
            g[8],
            g[9],
        )?;
        for x in &g[10..] {
            write!(f, "{:02x}", x)?;
        }

        Ok(())
    }
}
