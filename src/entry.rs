use crate::crc32;
use crate::guid::Guid;
use crate::layout::Extent;
use crate::{Error, Result};
use crate::{NUMBER_OF_PARTITION_ENTRIES, SIZE_OF_PARTITION_ENTRY};
use bincode::{deserialize_from, serialize_into};
use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::Read;
use std::ops::Index;

const NAME_CODE_UNITS: usize = 36;

/// A partition's name, stored on disk as 36 UTF-16LE code units padded with zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionName(String);

impl PartitionName {
    /// Make a partition name.
    ///
    /// # Errors
    ///
    /// Fails with `Error::PartitionNameTooLong` if the name does not fit in 36 UTF-16 code units.
    ///
    /// # Examples
    ///
    /// ```
    /// let name = gpt_image::PartitionName::new("EFI System").unwrap();
    /// assert_eq!(name.as_str(), "EFI System");
    ///
    /// assert!(gpt_image::PartitionName::new(&"x".repeat(37)).is_err());
    /// ```
    pub fn new(name: &str) -> Result<PartitionName> {
        let len = name.encode_utf16().count();
        if len > NAME_CODE_UNITS {
            return Err(Error::PartitionNameTooLong(len));
        }

        Ok(PartitionName(name.to_string()))
    }

    /// Extracts a string slice containing the entire `PartitionName`.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct UTF16LEVisitor;

impl<'de> Visitor<'de> for UTF16LEVisitor {
    type Value = PartitionName;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("36 UTF-16LE code units (72 bytes)")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<PartitionName, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut v = Vec::new();
        let mut end = false;
        while let Some(x) = seq.next_element::<u16>()? {
            match x {
                0 => end = true,
                x if !end => v.push(x),
                _ => {}
            }
        }

        Ok(PartitionName(String::from_utf16_lossy(&v)))
    }
}

impl<'de> Deserialize<'de> for PartitionName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_tuple(NAME_CODE_UNITS, UTF16LEVisitor)
    }
}

impl Serialize for PartitionName {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_tuple(NAME_CODE_UNITS)?;
        for x in self
            .0
            .encode_utf16()
            .chain(std::iter::repeat(0))
            .take(NAME_CODE_UNITS)
        {
            seq.serialize_element(&x)?;
        }
        seq.end()
    }
}

/// A GPT partition's entry in the partition array.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct GPTPartitionEntry {
    /// The partition's type. The null GUID marks an unused entry.
    pub partition_type_guid: Guid,
    /// The partition's own GUID.
    pub unique_partition_guid: Guid,
    /// The position (in sectors) of the first sector (used) of the partition.
    pub starting_lba: u64,
    /// The position (in sectors) of the last sector (used) of the partition.
    pub ending_lba: u64,
    /// The attribute bits.
    pub attribute_bits: u64,
    /// The partition name.
    pub partition_name: PartitionName,
}

impl GPTPartitionEntry {
    /// Creates an empty partition entry.
    pub fn empty() -> GPTPartitionEntry {
        GPTPartitionEntry::default()
    }

    /// Read a partition entry from the reader at the current position.
    pub fn read_from<R: ?Sized>(mut reader: &mut R) -> Result<GPTPartitionEntry>
    where
        R: Read,
    {
        Ok(deserialize_from(&mut reader)?)
    }

    /// Returns `true` if the partition entry is not used (null type GUID).
    pub fn is_unused(&self) -> bool {
        self.partition_type_guid.is_null()
    }

    /// Returns `true` if the partition entry is used.
    pub fn is_used(&self) -> bool {
        !self.is_unused()
    }

    /// The sectors covered by this entry.
    pub fn extent(&self) -> Extent {
        Extent {
            starting_lba: self.starting_lba,
            ending_lba: self.ending_lba,
        }
    }
}

/// The fixed array of 128 partition entries, 128 bytes each.
///
/// Entries keep the order in which they were given; the slots after the last one are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntryArray {
    entries: Vec<GPTPartitionEntry>,
}

impl PartitionEntryArray {
    /// Place the given entries at the start of the array.
    ///
    /// # Errors
    ///
    /// Fails with `Error::TooManyPartitions` if more than 128 entries are given.
    pub fn new<I>(entries: I) -> Result<PartitionEntryArray>
    where
        I: IntoIterator<Item = GPTPartitionEntry>,
    {
        let mut array = Vec::new();
        array.try_reserve_exact(NUMBER_OF_PARTITION_ENTRIES as usize)?;
        array.extend(entries);
        if array.len() > NUMBER_OF_PARTITION_ENTRIES as usize {
            return Err(Error::TooManyPartitions(array.len()));
        }
        array.resize_with(NUMBER_OF_PARTITION_ENTRIES as usize, GPTPartitionEntry::empty);

        Ok(PartitionEntryArray { entries: array })
    }

    /// Read the whole array from the reader at the current position.
    pub fn read_from<R: ?Sized>(reader: &mut R) -> Result<PartitionEntryArray>
    where
        R: Read,
    {
        let mut entries = Vec::new();
        entries.try_reserve_exact(NUMBER_OF_PARTITION_ENTRIES as usize)?;
        for _ in 0..NUMBER_OF_PARTITION_ENTRIES {
            entries.push(GPTPartitionEntry::read_from(reader)?);
        }

        Ok(PartitionEntryArray { entries })
    }

    /// Encode the array into its 16384 bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let len = (NUMBER_OF_PARTITION_ENTRIES * SIZE_OF_PARTITION_ENTRY) as usize;
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        for entry in &self.entries {
            serialize_into(&mut data, entry)?;
        }
        debug_assert_eq!(data.len(), len);

        Ok(data)
    }

    /// Generate the CRC32 checksum of the encoded array.
    pub fn crc32(&self) -> Result<u32> {
        Ok(crc32::checksum(&self.to_bytes()?))
    }

    /// Iterate over all the 128 slots, used or not. Partition numbers start at 1.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &GPTPartitionEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, x)| (i as u32 + 1, x))
    }

    /// Iterate over the used entries only.
    pub fn used(&self) -> impl Iterator<Item = (u32, &GPTPartitionEntry)> {
        self.iter().filter(|(_, x)| x.is_used())
    }
}

impl Index<u32> for PartitionEntryArray {
    type Output = GPTPartitionEntry;

    fn index(&self, i: u32) -> &GPTPartitionEntry {
        assert!(i != 0, "invalid partition index: 0");
        &self.entries[i as usize - 1]
    }
}
