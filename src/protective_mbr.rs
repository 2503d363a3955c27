use crate::{Error, Result, SECTOR_SIZE};
use bincode::{deserialize_from, serialize_into};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

const PARTITION_RECORD_OFFSET: usize = 446;
const GPT_PROTECTIVE: u8 = 0xee;
const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xaa];

/// One of the four partition records of a legacy MBR.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct MBRPartitionRecord {
    /// Boot indicator.
    pub status: u8,
    /// CHS address of the first absolute sector.
    pub starting_chs: [u8; 3],
    /// Partition type.
    pub partition_type: u8,
    /// CHS address of the last absolute sector.
    pub ending_chs: [u8; 3],
    /// LBA of the first absolute sector.
    pub starting_lba: u32,
    /// Number of sectors in the partition.
    pub sector_count: u32,
}

/// A protective MBR: a single partition of type `0xEE` covering the disk after LBA 0, so legacy
/// tools see the disk as used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectiveMBR {
    /// The partition record covering the GPT disk.
    pub partition: MBRPartitionRecord,
}

impl ProtectiveMBR {
    /// Make the protective MBR of a disk whose last sector is `backup_lba`.
    ///
    /// The sector count saturates at `0xFFFFFFFF` when the disk is too big to be described with
    /// 32 bits.
    pub fn new(backup_lba: u64) -> ProtectiveMBR {
        let sector_count = if backup_lba > u64::from(u32::max_value()) {
            u32::max_value()
        } else {
            backup_lba as u32
        };

        ProtectiveMBR {
            partition: MBRPartitionRecord {
                status: 0x00,
                starting_chs: [0x00, 0x02, 0x00],
                partition_type: GPT_PROTECTIVE,
                ending_chs: [0xff, 0xff, 0xff],
                starting_lba: 1,
                sector_count,
            },
        }
    }

    /// Encode the whole 512 bytes sector. The boot code and the other partition records are
    /// zeroed.
    pub fn to_sector(&self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        data.try_reserve_exact(SECTOR_SIZE as usize)?;
        data.resize(PARTITION_RECORD_OFFSET, 0);
        // partition 1
        serialize_into(&mut data, &self.partition)?;
        // partitions 2, 3 and 4
        data.resize(PARTITION_RECORD_OFFSET + 4 * 16, 0);
        data.extend_from_slice(&BOOT_SIGNATURE);
        debug_assert_eq!(data.len(), SECTOR_SIZE as usize);

        Ok(data)
    }

    /// Write the sector at the current position of the writer.
    pub fn write_into<W: ?Sized>(&self, writer: &mut W) -> Result<()>
    where
        W: Write,
    {
        writer.write_all(&self.to_sector()?)?;

        Ok(())
    }

    /// Read a sector and check it is a protective MBR.
    pub fn read_from<R: ?Sized>(reader: &mut R) -> Result<ProtectiveMBR>
    where
        R: Read,
    {
        let mut data = vec![0; SECTOR_SIZE as usize];
        reader.read_exact(&mut data)?;

        if data[510..] != BOOT_SIGNATURE {
            return Err(Error::InvalidMbr);
        }

        let partition: MBRPartitionRecord =
            deserialize_from(&data[PARTITION_RECORD_OFFSET..PARTITION_RECORD_OFFSET + 16])?;
        if partition.partition_type != GPT_PROTECTIVE || partition.starting_lba != 1 {
            return Err(Error::InvalidMbr);
        }

        Ok(ProtectiveMBR { partition })
    }
}
