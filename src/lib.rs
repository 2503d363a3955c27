//! A library that builds disk images with a GUID partition table.
//!
//! The image starts with a protective MBR, followed by the primary GPT header and partition entry
//! array, the content of every partition packed one after the other, and finally the backup
//! partition entry array and GPT header.
//!
//! # Examples
//!
//! Building an image with a single EFI System partition:
//!
//! ```
//! use gpt_image::{Guid, ImageBuilder, PartitionRequest};
//! use std::io::Cursor;
//!
//! let esp = vec![0; 600];
//! let disk_guid: Guid = "12345678-6969-0420-b00b-deadbeefcafe".parse()
//!     .expect("invalid GUID");
//!
//! let mut image = ImageBuilder::new(disk_guid);
//! image.add_partition(
//!     PartitionRequest::from_reader("esp.img", Cursor::new(esp), 600)
//!         .partition_type_guid(Guid::EFI_SYSTEM_PARTITION)
//!         .partition_name("EFI System")
//!         .expect("invalid name"),
//! ).expect("could not add partition");
//!
//! let mut disk = Cursor::new(Vec::new());
//! let layout = image.write_into(&mut disk).expect("could not write image");
//!
//! assert_eq!(layout.extents[0].starting_lba, 34);
//! assert_eq!(layout.extents[0].ending_lba, 35);
//! assert_eq!(disk.get_ref().len() as u64, (layout.backup_lba + 1) * 512);
//! ```
//!
//! Reading the partition table of an image back:
//!
//! ```
//! # use gpt_image::{Guid, ImageBuilder};
//! # use std::io::Cursor;
//! # let mut disk = Cursor::new(Vec::new());
//! # ImageBuilder::new(Guid::NULL).write_into(&mut disk).unwrap();
//! let image = gpt_image::verify(&mut disk).expect("invalid image");
//!
//! println!("Disk GUID: {}", image.header.disk_guid);
//!
//! for (i, p) in image.partitions.used() {
//!     println!("Partition #{}: type = {}, starting lba = {}",
//!         i,
//!         p.partition_type_guid,
//!         p.starting_lba);
//! }
//! ```

#![deny(missing_docs)]

use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub mod crc32;
mod entry;
mod guid;
mod header;
mod image;
mod layout;
mod protective_mbr;
mod request;
mod verify;

pub use entry::{GPTPartitionEntry, PartitionEntryArray, PartitionName};
pub use guid::Guid;
pub use header::{GPTHeader, GPTHeaderBuilder, SealedHeader};
pub use image::ImageBuilder;
pub use layout::{sector_count, Extent, Layout};
pub use protective_mbr::{MBRPartitionRecord, ProtectiveMBR};
pub use request::PartitionRequest;
pub use verify::{verify, VerifiedImage};

/// Size of a sector in bytes.
pub const SECTOR_SIZE: u64 = 512;
/// Maximum number of partitions in an image.
pub const MAX_PARTITIONS: usize = 128;
/// Location of the primary GPT header.
pub const PRIMARY_HEADER_LBA: u64 = 1;
/// Location of the primary partition entry array.
pub const PRIMARY_PARTITION_ENTRY_LBA: u64 = 2;
/// Number of sectors of a partition entry array.
pub const PARTITION_ENTRY_ARRAY_SECTORS: u64 =
    (NUMBER_OF_PARTITION_ENTRIES as u64 * SIZE_OF_PARTITION_ENTRY as u64) / SECTOR_SIZE;
/// First sector available to partitions: right after the MBR, the primary header and the primary
/// partition entry array.
pub const FIRST_USABLE_LBA: u64 = PRIMARY_PARTITION_ENTRY_LBA + PARTITION_ENTRY_ARRAY_SECTORS;

const HEADER_SIZE: u32 = 92;
const NUMBER_OF_PARTITION_ENTRIES: u32 = 128;
const SIZE_OF_PARTITION_ENTRY: u32 = 128;

/// An error that can be produced while building or reading a disk image.
#[derive(Debug, Error)]
pub enum Error {
    /// Serialization errors.
    #[error("serialization failed")]
    Serialize(#[from] bincode::Error),
    /// I/O errors.
    #[error("generic I/O error: {0}")]
    Io(#[from] io::Error),
    /// An error that occurs when a partition's source could not be opened or read.
    #[error("could not read partition image {path:?}: {source}")]
    Source {
        /// Path of the partition image.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// An error that occurs when the output image could not be created or written.
    #[error("could not write image {path:?}: {source}")]
    Output {
        /// Path of the output image.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// An error that occurs when a partition's source ends before its announced size.
    #[error("partition image {path:?} is too short ({actual} bytes read, {expected} expected)")]
    ShortRead {
        /// Path of the partition image.
        path: PathBuf,
        /// Number of bytes that should have been read.
        expected: u64,
        /// Number of bytes actually read.
        actual: u64,
    },
    /// An error that occurs when memory could not be allocated.
    #[error("could not allocate memory")]
    Allocation(#[from] TryReserveError),
    /// An error that occurs when a GUID is not in the `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX` form.
    #[error("invalid GUID format: {0:?}")]
    InvalidGuid(String),
    /// An error that occurs when more than 128 partitions are requested.
    #[error("too many partitions: {0} (maximum is 128)")]
    TooManyPartitions(usize),
    /// An error that occurs when a partition name takes more than 36 UTF-16 code units.
    #[error("partition name too long: {0} UTF-16 code units (maximum is 36)")]
    PartitionNameTooLong(usize),
    /// An error that occurs when no output path has been given.
    #[error("missing output path")]
    MissingOutputPath,
    /// An error that occurs when the signature of the GPT isn't what would be expected ("EFI
    /// PART").
    #[error("invalid signature")]
    InvalidSignature,
    /// An error that occurs when the revision of the GPT isn't what would be expected (00 00 01
    /// 00).
    #[error("invalid revision")]
    InvalidRevision,
    /// An error that occurs when the header's size (in bytes) isn't what would be expected (92).
    #[error("invalid header size")]
    InvalidHeaderSize,
    /// An error that occurs when the CRC32 checksum of the header doesn't match the expected
    /// checksum for the actual header.
    #[error("corrupted CRC32 checksum ({0} != {1})")]
    InvalidChecksum(u32, u32),
    /// An error that occurs when the CRC32 checksum of the partition entries array doesn't match
    /// the expected checksum for the actual partition entries array.
    #[error("corrupted partition entry array CRC32 checksum ({0} != {1})")]
    InvalidPartitionEntryArrayChecksum(u32, u32),
    /// An error that occurs when the partitions don't fit in an image addressable with 64-bit byte
    /// offsets.
    #[error("image too large")]
    ImageTooLarge,
    /// An error that occurs when a header points to a sector outside of the image.
    #[error("LBA {0} is outside of the image")]
    InvalidLba(u64),
    /// An error that occurs when the first sector is not a protective MBR.
    #[error("invalid protective MBR")]
    InvalidMbr,
    /// An error that occurs when the backup partition table doesn't mirror the primary one.
    #[error("backup partition table doesn't match the primary partition table")]
    MismatchedBackup,
}

impl Error {
    /// Returns `true` if the error comes from invalid input, detected before anything is written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidGuid(_)
                | Error::TooManyPartitions(_)
                | Error::PartitionNameTooLong(_)
                | Error::MissingOutputPath
                | Error::ImageTooLarge
        )
    }
}

/// The result of building or reading a disk image.
pub type Result<T> = std::result::Result<T, Error>;
