use crate::crc32;
use crate::guid::Guid;
use crate::layout::Layout;
use crate::{Error, Result};
use crate::{
    HEADER_SIZE, NUMBER_OF_PARTITION_ENTRIES, PRIMARY_PARTITION_ENTRY_LBA, SECTOR_SIZE,
    SIZE_OF_PARTITION_ENTRY,
};
use bincode::{deserialize_from, serialize, serialize_into};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::ops::Deref;

const SIGNATURE: [u8; 8] = *b"EFI PART";
const REVISION: [u8; 4] = [0x00, 0x00, 0x01, 0x00];

/// A GUID Partition Table header as describe on
/// [Wikipedia's page](https://en.wikipedia.org/wiki/GUID_Partition_Table#Partition_table_header_(LBA_1)).
///
/// A header that is part of an image is always a [`SealedHeader`]: it can only be obtained
/// through [`GPTHeaderBuilder::seal`] or by reading and validating an existing header.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GPTHeader {
    /// GPT signature (must be "EFI PART").
    pub signature: [u8; 8],
    /// GPT revision (must be 00 00 01 00).
    pub revision: [u8; 4],
    /// GPT header size (must be 92).
    pub header_size: u32,
    /// CRC32 checksum of the header.
    pub crc32_checksum: u32,
    /// Reserved bytes of the header.
    pub reserved: [u8; 4],
    /// Location (in sectors) of this header.
    pub primary_lba: u64,
    /// Location (in sectors) of the other copy of this header.
    pub backup_lba: u64,
    /// Location (in sectors) of the first usable sector.
    pub first_usable_lba: u64,
    /// Location (in sectors) of the last usable sector.
    pub last_usable_lba: u64,
    /// GUID of the disk.
    pub disk_guid: Guid,
    /// Location (in sectors) of the partition entries array.
    pub partition_entry_lba: u64,
    /// Number of partition entries in the array.
    pub number_of_partition_entries: u32,
    /// Size (in bytes) of a partition entry.
    pub size_of_partition_entry: u32,
    /// CRC32 checksum of the partition array.
    pub partition_entry_array_crc32: u32,
}

impl GPTHeader {
    /// Generate the CRC32 checksum of the header, computed with the checksum field set to zero.
    pub fn generate_crc32_checksum(&self) -> Result<u32> {
        let mut clone = self.clone();
        clone.crc32_checksum = 0;
        let data = serialize(&clone)?;
        debug_assert_eq!(data.len() as u32, HEADER_SIZE);

        Ok(crc32::checksum(&data))
    }

    /// Attempt to read a GPT header from a reader and validate it.
    pub fn read_from<R: ?Sized>(mut reader: &mut R) -> Result<SealedHeader>
    where
        R: Read,
    {
        let gpt: GPTHeader = deserialize_from(&mut reader)?;

        if gpt.signature != SIGNATURE {
            return Err(Error::InvalidSignature);
        }

        if gpt.revision != REVISION {
            return Err(Error::InvalidRevision);
        }

        if gpt.header_size != HEADER_SIZE {
            return Err(Error::InvalidHeaderSize);
        }

        let sum = gpt.generate_crc32_checksum()?;
        if gpt.crc32_checksum != sum {
            return Err(Error::InvalidChecksum(gpt.crc32_checksum, sum));
        }

        Ok(SealedHeader(gpt))
    }

    /// Returns `true` if the header is the primary copy (located at the beginning of the disk).
    pub fn is_primary(&self) -> bool {
        self.primary_lba == 1
    }

    /// Returns `true` if the header is the backup copy (located at the end of the disk).
    pub fn is_backup(&self) -> bool {
        !self.is_primary()
    }
}

/// Builds a GPT header field by field. The checksum is only computed by [`seal`](Self::seal),
/// once every other field is final.
#[derive(Debug, Clone)]
pub struct GPTHeaderBuilder {
    header: GPTHeader,
}

impl GPTHeaderBuilder {
    /// Start a header with the fixed fields filled and everything else zeroed.
    pub fn new(disk_guid: Guid) -> GPTHeaderBuilder {
        GPTHeaderBuilder {
            header: GPTHeader {
                signature: SIGNATURE,
                revision: REVISION,
                header_size: HEADER_SIZE,
                crc32_checksum: 0,
                reserved: [0; 4],
                primary_lba: 0,
                backup_lba: 0,
                first_usable_lba: 0,
                last_usable_lba: 0,
                disk_guid,
                partition_entry_lba: 0,
                number_of_partition_entries: NUMBER_OF_PARTITION_ENTRIES,
                size_of_partition_entry: SIZE_OF_PARTITION_ENTRY,
                partition_entry_array_crc32: 0,
            },
        }
    }

    /// Make the builder of the primary header of a layout.
    pub fn primary(
        disk_guid: Guid,
        layout: &Layout,
        partition_entry_array_crc32: u32,
    ) -> GPTHeaderBuilder {
        GPTHeaderBuilder::new(disk_guid)
            .usable_lbas(layout.first_usable_lba, layout.last_usable_lba)
            .partition_entry_array_crc32(partition_entry_array_crc32)
            .location(layout.primary_lba(), layout.backup_lba)
            .partition_entry_lba(PRIMARY_PARTITION_ENTRY_LBA)
    }

    /// Set the first and last usable sectors.
    pub fn usable_lbas(mut self, first_usable_lba: u64, last_usable_lba: u64) -> Self {
        self.header.first_usable_lba = first_usable_lba;
        self.header.last_usable_lba = last_usable_lba;
        self
    }

    /// Set the location of this header and of its other copy.
    pub fn location(mut self, current_lba: u64, backup_lba: u64) -> Self {
        self.header.primary_lba = current_lba;
        self.header.backup_lba = backup_lba;
        self
    }

    /// Set the location of the partition entry array described by this header.
    pub fn partition_entry_lba(mut self, lba: u64) -> Self {
        self.header.partition_entry_lba = lba;
        self
    }

    /// Set the checksum of the partition entry array.
    pub fn partition_entry_array_crc32(mut self, crc32: u32) -> Self {
        self.header.partition_entry_array_crc32 = crc32;
        self
    }

    /// Compute the header's checksum and freeze it.
    pub fn seal(mut self) -> Result<SealedHeader> {
        self.header.crc32_checksum = 0;
        self.header.crc32_checksum = self.header.generate_crc32_checksum()?;

        Ok(SealedHeader(self.header))
    }
}

/// A GPT header whose checksum matches its content. It can't be modified anymore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedHeader(GPTHeader);

impl SealedHeader {
    /// Make the mirrored copy of this header: both locations are swapped and the partition entry
    /// array is moved next to the other copy. The result has its own checksum.
    pub fn mirror(&self) -> Result<SealedHeader> {
        let partition_entry_lba = if self.0.is_primary() {
            self.0.last_usable_lba + 1
        } else {
            PRIMARY_PARTITION_ENTRY_LBA
        };

        GPTHeaderBuilder {
            header: self.0.clone(),
        }
        .location(self.0.backup_lba, self.0.primary_lba)
        .partition_entry_lba(partition_entry_lba)
        .seal()
    }

    /// Encode the header followed by zeros up to the end of the sector.
    pub fn to_sector(&self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        data.try_reserve_exact(SECTOR_SIZE as usize)?;
        serialize_into(&mut data, &self.0)?;
        data.resize(SECTOR_SIZE as usize, 0);

        Ok(data)
    }

    /// Write the header sector at the current position of the writer.
    pub fn write_into<W: ?Sized>(&self, writer: &mut W) -> Result<()>
    where
        W: Write,
    {
        writer.write_all(&self.to_sector()?)?;

        Ok(())
    }

    /// Returns `true` if the stored checksum matches the header's content.
    pub fn is_valid(&self) -> Result<bool> {
        Ok(self.0.generate_crc32_checksum()? == self.0.crc32_checksum)
    }
}

impl Deref for SealedHeader {
    type Target = GPTHeader;

    fn deref(&self) -> &GPTHeader {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io;

    fn primary() -> SealedHeader {
        let layout = Layout::allocate(vec![600, 10_000]).unwrap();
        GPTHeaderBuilder::primary(Guid([1; 16]), &layout, 0xdead_beef)
            .seal()
            .unwrap()
    }

    #[test]
    fn header_encoding() {
        let header = primary();
        let data = header.to_sector().unwrap();

        assert_eq!(data.len(), 512);
        assert_eq!(&data[0..8], b"EFI PART");
        assert_eq!(&data[8..12], &0x0001_0000u32.to_le_bytes());
        assert_eq!(&data[12..16], &92u32.to_le_bytes());
        assert_eq!(&data[16..20], &header.crc32_checksum.to_le_bytes());
        assert_eq!(&data[24..32], &1u64.to_le_bytes());
        assert_eq!(&data[32..40], &header.backup_lba.to_le_bytes());
        assert_eq!(&data[40..48], &34u64.to_le_bytes());
        assert_eq!(&data[48..56], &header.last_usable_lba.to_le_bytes());
        assert_eq!(&data[56..72], &[1; 16]);
        assert_eq!(&data[72..80], &2u64.to_le_bytes());
        assert_eq!(&data[80..84], &128u32.to_le_bytes());
        assert_eq!(&data[84..88], &128u32.to_le_bytes());
        assert_eq!(&data[88..92], &0xdead_beefu32.to_le_bytes());
        assert!(data[92..].iter().all(|x| *x == 0));
    }

    #[test]
    fn checksum_covers_the_header_with_a_zeroed_checksum_field() {
        let header = primary();
        let mut data = header.to_sector().unwrap();
        data.truncate(92);
        data[16..20].copy_from_slice(&[0; 4]);

        assert_eq!(crc32::checksum(&data), header.crc32_checksum);
        assert!(header.is_valid().unwrap());
    }

    #[test]
    fn primary_fields() {
        let header = primary();
        // 600 bytes => 2 sectors, 10000 bytes => 20 sectors
        assert_eq!(header.last_usable_lba, 34 + 2 + 20 - 1);
        assert_eq!(header.backup_lba, header.last_usable_lba + 33);
        assert_eq!(header.partition_entry_lba, 2);
        assert!(header.is_primary());
    }

    #[test]
    fn mirrored_header() {
        let primary = primary();
        let backup = primary.mirror().unwrap();

        assert!(backup.is_backup());
        assert_eq!(backup.primary_lba, primary.backup_lba);
        assert_eq!(backup.backup_lba, primary.primary_lba);
        assert_eq!(backup.partition_entry_lba, primary.last_usable_lba + 1);
        assert_eq!(backup.partition_entry_lba + 32, backup.primary_lba);
        assert_eq!(backup.disk_guid, primary.disk_guid);
        assert_eq!(
            backup.partition_entry_array_crc32,
            primary.partition_entry_array_crc32
        );
        assert_ne!(backup.crc32_checksum, primary.crc32_checksum);
        assert!(primary.is_valid().unwrap());
        assert!(backup.is_valid().unwrap());

        assert_eq!(backup.mirror().unwrap(), primary);
    }

    #[test]
    fn read_back() {
        let header = primary();
        let mut cur = io::Cursor::new(header.to_sector().unwrap());
        assert_eq!(GPTHeader::read_from(&mut cur).unwrap(), header);
    }

    #[test]
    fn read_invalid_headers() {
        let data = primary().to_sector().unwrap();

        let mut corrupted = data.clone();
        corrupted[0] = b'X';
        match GPTHeader::read_from(&mut io::Cursor::new(corrupted)) {
            Err(Error::InvalidSignature) => {}
            x => panic!("unexpected result: {:?}", x),
        }

        let mut corrupted = data.clone();
        corrupted[10] = 2;
        match GPTHeader::read_from(&mut io::Cursor::new(corrupted)) {
            Err(Error::InvalidRevision) => {}
            x => panic!("unexpected result: {:?}", x),
        }

        let mut corrupted = data.clone();
        corrupted[12] = 93;
        match GPTHeader::read_from(&mut io::Cursor::new(corrupted)) {
            Err(Error::InvalidHeaderSize) => {}
            x => panic!("unexpected result: {:?}", x),
        }

        let mut corrupted = data;
        corrupted[40] = 35;
        match GPTHeader::read_from(&mut io::Cursor::new(corrupted)) {
            Err(Error::InvalidChecksum(_, _)) => {}
            x => panic!("unexpected result: {:?}", x),
        }
    }
}
