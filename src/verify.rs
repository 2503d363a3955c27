use crate::entry::PartitionEntryArray;
use crate::header::{GPTHeader, SealedHeader};
use crate::protective_mbr::ProtectiveMBR;
use crate::{Error, Result};
use crate::{PRIMARY_HEADER_LBA, SECTOR_SIZE};
use log::debug;
use std::io::{Read, Seek, SeekFrom};

/// The partition table of an image that passed [`verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedImage {
    /// The protective MBR.
    pub mbr: ProtectiveMBR,
    /// The primary GPT header.
    pub header: SealedHeader,
    /// The backup GPT header.
    pub backup: SealedHeader,
    /// The partition entries.
    pub partitions: PartitionEntryArray,
}

/// Seek to a sector read from the image itself, which must lie within the image.
fn seek_to_lba<R: ?Sized>(reader: &mut R, lba: u64, image_len: u64) -> Result<()>
where
    R: Seek,
{
    match lba.checked_mul(SECTOR_SIZE) {
        Some(offset) if offset < image_len => {
            reader.seek(SeekFrom::Start(offset))?;
            Ok(())
        }
        _ => Err(Error::InvalidLba(lba)),
    }
}

fn read_table<R: ?Sized>(
    reader: &mut R,
    lba: u64,
    image_len: u64,
) -> Result<(SealedHeader, PartitionEntryArray)>
where
    R: Read + Seek,
{
    seek_to_lba(reader, lba, image_len)?;
    let header = GPTHeader::read_from(reader)?;

    seek_to_lba(reader, header.partition_entry_lba, image_len)?;
    let partitions = PartitionEntryArray::read_from(reader)?;

    let sum = partitions.crc32()?;
    if header.partition_entry_array_crc32 != sum {
        return Err(Error::InvalidPartitionEntryArrayChecksum(
            header.partition_entry_array_crc32,
            sum,
        ));
    }

    Ok((header, partitions))
}

/// Read an image back and check its protective MBR and both copies of its partition table.
///
/// The backup header must mirror the primary header: same content except for the swapped
/// locations, a partition entry array located right before it and its own checksum. Both partition
/// entry arrays must be identical.
///
/// # Errors
///
/// Fails with `Error::InvalidLba` when a header points outside of the image.
pub fn verify<R: ?Sized>(reader: &mut R) -> Result<VerifiedImage>
where
    R: Read + Seek,
{
    let image_len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;
    let mbr = ProtectiveMBR::read_from(reader)?;

    let (header, partitions) = read_table(reader, PRIMARY_HEADER_LBA, image_len)?;
    debug!("primary GPT header is valid");
    let (backup, backup_partitions) = read_table(reader, header.backup_lba, image_len)?;
    debug!("backup GPT header is valid");

    if backup != header.mirror()? || backup_partitions != partitions {
        return Err(Error::MismatchedBackup);
    }

    if image_len / SECTOR_SIZE != header.backup_lba + 1 {
        return Err(Error::MismatchedBackup);
    }

    Ok(VerifiedImage {
        mbr,
        header,
        backup,
        partitions,
    })
}
