use crate::{Error, Result};
use crate::{
    FIRST_USABLE_LBA, MAX_PARTITIONS, PARTITION_ENTRY_ARRAY_SECTORS, PRIMARY_HEADER_LBA,
    SECTOR_SIZE,
};
use log::debug;

/// Returns the number of sectors needed to hold `byte_length` bytes.
///
/// A partition always occupies at least one sector, even when its source is empty.
///
/// # Examples
///
/// ```
/// assert_eq!(gpt_image::sector_count(0), 1);
/// assert_eq!(gpt_image::sector_count(512), 1);
/// assert_eq!(gpt_image::sector_count(513), 2);
/// ```
pub fn sector_count(byte_length: u64) -> u64 {
    if byte_length == 0 {
        1
    } else {
        (byte_length - 1) / SECTOR_SIZE + 1
    }
}

/// The sectors allocated to one partition. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    /// The first sector of the partition.
    pub starting_lba: u64,
    /// The last sector of the partition.
    pub ending_lba: u64,
}

impl Extent {
    /// Number of sectors covered by the extent.
    pub fn sectors(&self) -> u64 {
        self.ending_lba - self.starting_lba + 1
    }

    /// Returns `true` if both extents share at least one sector.
    pub fn overlaps(&self, other: &Extent) -> bool {
        self.starting_lba <= other.ending_lba && other.starting_lba <= self.ending_lba
    }
}

/// The placement of every structure of the image, in sectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// One extent per partition, in the order the partitions were requested.
    pub extents: Vec<Extent>,
    /// First sector available to partitions.
    pub first_usable_lba: u64,
    /// Last sector used by a partition (or `first_usable_lba` when there is none).
    pub last_usable_lba: u64,
    /// Location of the backup GPT header, which is also the last sector of the image.
    pub backup_lba: u64,
}

impl Layout {
    /// Pack partitions of the given byte lengths one after the other, starting at the first usable
    /// LBA.
    ///
    /// # Errors
    ///
    /// Fails with `Error::TooManyPartitions` when more than 128 lengths are given. Nothing is
    /// allocated in that case. Fails with `Error::ImageTooLarge` when the byte offset of the end of
    /// the image doesn't fit in a `u64`.
    ///
    /// # Examples
    ///
    /// ```
    /// let layout = gpt_image::Layout::allocate(vec![600, 0]).unwrap();
    ///
    /// assert_eq!(layout.extents[0].starting_lba, 34);
    /// assert_eq!(layout.extents[0].ending_lba, 35);
    /// assert_eq!(layout.extents[1].starting_lba, 36);
    /// assert_eq!(layout.last_usable_lba, 36);
    /// assert_eq!(layout.backup_lba, 69);
    /// ```
    pub fn allocate<I>(byte_lengths: I) -> Result<Layout>
    where
        I: IntoIterator<Item = u64>,
    {
        let byte_lengths = byte_lengths.into_iter().collect::<Vec<_>>();
        if byte_lengths.len() > MAX_PARTITIONS {
            return Err(Error::TooManyPartitions(byte_lengths.len()));
        }

        let mut extents = Vec::new();
        extents.try_reserve_exact(byte_lengths.len())?;

        let mut offset = FIRST_USABLE_LBA;
        for len in byte_lengths {
            let extent = Extent {
                starting_lba: offset,
                ending_lba: offset
                    .checked_add(sector_count(len) - 1)
                    .ok_or(Error::ImageTooLarge)?,
            };
            debug!(
                "partition #{}: {} bytes at {}-{}",
                extents.len() + 1,
                len,
                extent.starting_lba,
                extent.ending_lba
            );
            offset = extent
                .ending_lba
                .checked_add(1)
                .ok_or(Error::ImageTooLarge)?;
            extents.push(extent);
        }

        let last_usable_lba = extents
            .iter()
            .map(|x| x.ending_lba)
            .max()
            .unwrap_or(FIRST_USABLE_LBA);

        let backup_lba = last_usable_lba
            .checked_add(PARTITION_ENTRY_ARRAY_SECTORS + 1)
            .ok_or(Error::ImageTooLarge)?;
        // every byte offset of the image, up to its end, must be addressable
        backup_lba
            .checked_add(1)
            .and_then(|x| x.checked_mul(SECTOR_SIZE))
            .ok_or(Error::ImageTooLarge)?;

        Ok(Layout {
            extents,
            first_usable_lba: FIRST_USABLE_LBA,
            last_usable_lba,
            backup_lba,
        })
    }

    /// Location of the primary GPT header.
    pub fn primary_lba(&self) -> u64 {
        PRIMARY_HEADER_LBA
    }

    /// Location of the backup partition entry array, right before the backup header.
    pub fn backup_partition_entry_lba(&self) -> u64 {
        self.last_usable_lba + 1
    }

    /// Total size of the image in bytes.
    pub fn image_len(&self) -> u64 {
        (self.backup_lba + 1) * SECTOR_SIZE
    }
}
