use crate::entry::{GPTPartitionEntry, PartitionName};
use crate::guid::Guid;
use crate::layout::Extent;
use crate::{Error, Result};
use log::debug;
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// A partition to embed in the image, along with the source of its content.
///
/// The source is owned by the request and released as soon as the request is dropped: after its
/// content has been copied, or when the build fails.
///
/// # Examples
///
/// ```
/// use gpt_image::{Guid, PartitionRequest};
///
/// let request = PartitionRequest::from_reader("boot.img", std::io::Cursor::new(vec![0; 600]), 600)
///     .partition_type_guid(Guid::EFI_SYSTEM_PARTITION)
///     .partition_name("EFI System")
///     .unwrap();
///
/// assert_eq!(request.byte_length(), 600);
/// assert_eq!(request.name().as_str(), "EFI System");
/// ```
pub struct PartitionRequest {
    source: PathBuf,
    reader: Box<dyn Read>,
    byte_length: u64,
    partition_type_guid: Guid,
    unique_partition_guid: Guid,
    partition_name: PartitionName,
    attribute_bits: u64,
}

impl PartitionRequest {
    /// Open a partition image. Its size is taken from the file's metadata.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<PartitionRequest> {
        let path = path.as_ref();
        let source_error = |source: io::Error| Error::Source {
            path: path.to_path_buf(),
            source,
        };

        let file = fs::File::open(path).map_err(source_error)?;
        let byte_length = file.metadata().map_err(source_error)?.len();
        debug!("opened {:?} ({} bytes)", path, byte_length);

        Ok(PartitionRequest::from_reader(path, file, byte_length))
    }

    /// Use any reader as the partition's content. Exactly `byte_length` bytes will be read from
    /// it; `source` is only used to report errors.
    pub fn from_reader<P, R>(source: P, reader: R, byte_length: u64) -> PartitionRequest
    where
        P: Into<PathBuf>,
        R: Read + 'static,
    {
        PartitionRequest {
            source: source.into(),
            reader: Box::new(reader),
            byte_length,
            partition_type_guid: Guid::NULL,
            unique_partition_guid: Guid::NULL,
            partition_name: PartitionName::default(),
            attribute_bits: 0,
        }
    }

    /// Set the partition's type.
    pub fn partition_type_guid(mut self, guid: Guid) -> Self {
        self.partition_type_guid = guid;
        self
    }

    /// Set the partition's own GUID.
    pub fn unique_partition_guid(mut self, guid: Guid) -> Self {
        self.unique_partition_guid = guid;
        self
    }

    /// Set the partition's name.
    ///
    /// # Errors
    ///
    /// Fails with `Error::PartitionNameTooLong` if the name does not fit in 36 UTF-16 code units.
    pub fn partition_name(mut self, name: &str) -> Result<Self> {
        self.partition_name = PartitionName::new(name)?;
        Ok(self)
    }

    /// Set the partition's attribute bits.
    pub fn attribute_bits(mut self, bits: u64) -> Self {
        self.attribute_bits = bits;
        self
    }

    /// Where the content comes from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Size of the content in bytes.
    pub fn byte_length(&self) -> u64 {
        self.byte_length
    }

    /// The partition's name.
    pub fn name(&self) -> &PartitionName {
        &self.partition_name
    }

    pub(crate) fn reader(&mut self) -> &mut dyn Read {
        &mut *self.reader
    }

    /// Make the partition entry describing this request once it has been placed.
    pub fn to_entry(&self, extent: &Extent) -> GPTPartitionEntry {
        GPTPartitionEntry {
            partition_type_guid: self.partition_type_guid,
            unique_partition_guid: self.unique_partition_guid,
            starting_lba: extent.starting_lba,
            ending_lba: extent.ending_lba,
            attribute_bits: self.attribute_bits,
            partition_name: self.partition_name.clone(),
        }
    }
}

impl fmt::Debug for PartitionRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PartitionRequest")
            .field("source", &self.source)
            .field("byte_length", &self.byte_length)
            .field("partition_type_guid", &self.partition_type_guid)
            .field("unique_partition_guid", &self.unique_partition_guid)
            .field("partition_name", &self.partition_name)
            .field("attribute_bits", &self.attribute_bits)
            .finish()
    }
}
