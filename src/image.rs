use crate::crc32;
use crate::entry::PartitionEntryArray;
use crate::guid::Guid;
use crate::header::GPTHeaderBuilder;
use crate::layout::Layout;
use crate::protective_mbr::ProtectiveMBR;
use crate::request::PartitionRequest;
use crate::{Error, Result};
use crate::{MAX_PARTITIONS, SECTOR_SIZE};
use log::{debug, info};
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;

const COPY_CHUNK_SIZE: usize = 128 * SECTOR_SIZE as usize;

/// Collects partition requests and writes them as a GPT disk image.
///
/// # Examples
///
/// ```
/// use gpt_image::{Guid, ImageBuilder, PartitionRequest};
/// use std::io::Cursor;
///
/// let mut image = ImageBuilder::new(Guid([0xff; 16]));
/// image
///     .add_partition(
///         PartitionRequest::from_reader("esp.img", Cursor::new(vec![0xaa; 600]), 600)
///             .partition_type_guid(Guid::EFI_SYSTEM_PARTITION)
///             .partition_name("EFI System")
///             .unwrap(),
///     )
///     .unwrap();
///
/// let mut disk = Cursor::new(Vec::new());
/// let layout = image.write_into(&mut disk).unwrap();
///
/// assert_eq!(disk.get_ref().len() as u64, layout.image_len());
/// assert_eq!(&disk.get_ref()[512..520], b"EFI PART");
/// ```
#[derive(Debug)]
pub struct ImageBuilder {
    disk_guid: Guid,
    partitions: Vec<PartitionRequest>,
}

impl ImageBuilder {
    /// Make a new image without any partition.
    pub fn new(disk_guid: Guid) -> ImageBuilder {
        ImageBuilder {
            disk_guid,
            partitions: Vec::new(),
        }
    }

    /// Append a partition after the ones already added.
    ///
    /// # Errors
    ///
    /// Fails with `Error::TooManyPartitions` if the image already holds 128 partitions. The
    /// request is dropped in that case.
    pub fn add_partition(&mut self, request: PartitionRequest) -> Result<()> {
        if self.partitions.len() >= MAX_PARTITIONS {
            return Err(Error::TooManyPartitions(self.partitions.len() + 1));
        }
        self.partitions.try_reserve(1)?;
        self.partitions.push(request);

        Ok(())
    }

    /// The partitions in the order they have been added.
    pub fn partitions(&self) -> &[PartitionRequest] {
        &self.partitions
    }

    /// Compute where everything will be placed, without writing anything.
    pub fn layout(&self) -> Result<Layout> {
        Layout::allocate(self.partitions.iter().map(|x| x.byte_length()))
    }

    /// Write the complete image into a writer, starting at offset 0.
    ///
    /// The sources of the partitions are consumed and released as soon as they have been copied.
    pub fn write_into<W: ?Sized>(self, writer: &mut W) -> Result<Layout>
    where
        W: Write + Seek,
    {
        let layout = self.layout()?;

        let entries = PartitionEntryArray::new(
            self.partitions
                .iter()
                .zip(layout.extents.iter())
                .map(|(request, extent)| request.to_entry(extent)),
        )?;
        let entries_data = entries.to_bytes()?;
        let entries_crc32 = crc32::checksum(&entries_data);

        let primary = GPTHeaderBuilder::primary(self.disk_guid, &layout, entries_crc32).seal()?;
        let backup = primary.mirror()?;
        let mbr = ProtectiveMBR::new(layout.backup_lba);

        writer.seek(SeekFrom::Start(0))?;
        mbr.write_into(writer)?;
        debug!("protective MBR has been written");

        writer.seek(SeekFrom::Start(primary.primary_lba * SECTOR_SIZE))?;
        primary.write_into(writer)?;
        writer.seek(SeekFrom::Start(primary.partition_entry_lba * SECTOR_SIZE))?;
        writer.write_all(&entries_data)?;
        debug!(
            "primary GPT header and partition entry array have been written at {}",
            primary.primary_lba
        );

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(COPY_CHUNK_SIZE)?;
        buffer.resize(COPY_CHUNK_SIZE, 0);
        for (mut request, extent) in self.partitions.into_iter().zip(layout.extents.iter()) {
            writer.seek(SeekFrom::Start(extent.starting_lba * SECTOR_SIZE))?;
            copy_partition(&mut request, writer, &mut buffer)?;
            debug!(
                "partition {:?} has been copied at {}-{}",
                request.source(),
                extent.starting_lba,
                extent.ending_lba
            );
        }

        writer.seek(SeekFrom::Start(backup.partition_entry_lba * SECTOR_SIZE))?;
        writer.write_all(&entries_data)?;
        writer.seek(SeekFrom::Start(backup.primary_lba * SECTOR_SIZE))?;
        backup.write_into(writer)?;
        debug!(
            "backup GPT header and partition entry array have been written at {}",
            backup.primary_lba
        );

        writer.flush()?;
        info!(
            "image of {} bytes written with {} partition(s)",
            layout.image_len(),
            layout.extents.len()
        );

        Ok(layout)
    }

    /// Write the image to a file.
    ///
    /// The image is first written to a temporary file in the same directory, which is then renamed
    /// to `path`. A failed build never leaves a partial file at `path`.
    pub fn write_to_path<P: AsRef<Path>>(self, path: P) -> Result<Layout> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::MissingOutputPath);
        }

        let output_error = |source: io::Error| Error::Output {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(x) if !x.as_os_str().is_empty() => x,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(output_error)?;
        debug!("writing image to temporary file {:?}", tmp.path());
        let layout = self.write_output(path, tmp.as_file_mut())?;
        tmp.as_file().sync_all().map_err(output_error)?;
        tmp.persist(path).map_err(|err| output_error(err.error))?;
        info!("image written to {:?}", path);

        Ok(layout)
    }

    /// Like `write_into`, but failures of the writer are reported against the output `path`.
    fn write_output<W: ?Sized>(self, path: &Path, writer: &mut W) -> Result<Layout>
    where
        W: Write + Seek,
    {
        self.write_into(writer).map_err(|err| match err {
            Error::Io(source) => Error::Output {
                path: path.to_path_buf(),
                source,
            },
            err => err,
        })
    }
}

/// Copy exactly `byte_length` bytes of the request's source, zero padded up to the next sector.
fn copy_partition<W: ?Sized>(
    request: &mut PartitionRequest,
    writer: &mut W,
    buffer: &mut [u8],
) -> Result<()>
where
    W: Write,
{
    let expected = request.byte_length();
    let mut copied: u64 = 0;

    while copied < expected {
        let len = (buffer.len() as u64).min(expected - copied) as usize;
        let read = read_full(request.reader(), &mut buffer[..len]).map_err(|source| {
            Error::Source {
                path: request.source().to_path_buf(),
                source,
            }
        })?;
        if read < len {
            return Err(Error::ShortRead {
                path: request.source().to_path_buf(),
                expected,
                actual: copied + read as u64,
            });
        }

        let padded = ((len - 1) / SECTOR_SIZE as usize + 1) * SECTOR_SIZE as usize;
        buffer[len..padded].iter_mut().for_each(|x| *x = 0);
        writer.write_all(&buffer[..padded])?;
        copied += len as u64;
    }

    Ok(())
}

/// Like `read_exact` but returns how many bytes could be read before the end of the reader.
fn read_full<R: ?Sized>(reader: &mut R, mut buf: &mut [u8]) -> io::Result<usize>
where
    R: Read,
{
    let mut total = 0;
    while !buf.is_empty() {
        match reader.read(buf) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                buf = &mut buf[n..];
            }
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }

    Ok(total)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entry::GPTPartitionEntry;
    use crate::header::GPTHeader;
    use std::fs;
    use std::io::Cursor;

    fn request(name: &str, data: Vec<u8>) -> PartitionRequest {
        let len = data.len() as u64;
        PartitionRequest::from_reader(name, Cursor::new(data), len)
            .partition_type_guid(Guid::EFI_SYSTEM_PARTITION)
            .unique_partition_guid(Guid([name.len() as u8; 16]))
            .partition_name(name)
            .unwrap()
    }

    fn build(partitions: Vec<PartitionRequest>) -> (Layout, Vec<u8>) {
        let mut image = ImageBuilder::new(Guid([0x42; 16]));
        for p in partitions {
            image.add_partition(p).unwrap();
        }
        let mut cur = Cursor::new(Vec::new());
        let layout = image.write_into(&mut cur).unwrap();
        (layout, cur.into_inner())
    }

    fn sector(data: &[u8], lba: u64) -> &[u8] {
        &data[(lba * SECTOR_SIZE) as usize..((lba + 1) * SECTOR_SIZE) as usize]
    }

    #[test]
    fn single_partition_image() {
        let (layout, data) = build(vec![request("EFI System", vec![0xaa; 600])]);

        assert_eq!(data.len() as u64, (layout.backup_lba + 1) * 512);
        assert_eq!(data[450], 0xee);
        assert_eq!(&data[510..512], &[0x55, 0xaa]);
        assert_eq!(&data[512..520], b"EFI PART");

        // payload: 600 bytes then zeros up to the end of the second sector
        assert!(data[34 * 512..34 * 512 + 600].iter().all(|x| *x == 0xaa));
        assert!(data[34 * 512 + 600..36 * 512].iter().all(|x| *x == 0));
        assert_eq!(layout.last_usable_lba, 35);
        assert_eq!(layout.backup_lba, 68);
    }

    #[test]
    fn empty_image() {
        let (layout, data) = build(Vec::new());

        assert_eq!(layout.last_usable_lba, 34);
        assert_eq!(data.len(), 68 * 512);
        assert!(data[2 * 512..34 * 512].iter().all(|x| *x == 0));

        let header = GPTHeader::read_from(&mut Cursor::new(sector(&data, 1))).unwrap();
        assert_eq!(header.first_usable_lba, 34);
        assert_eq!(header.last_usable_lba, 34);
        assert_eq!(header.partition_entry_array_crc32, crc32::checksum(&[0; 16384]));
    }

    #[test]
    fn primary_and_backup_are_mirrored() {
        let (layout, data) = build(vec![
            request("one", vec![1; 512]),
            request("two", vec![2; 513]),
            request("three", Vec::new()),
        ]);

        let primary = GPTHeader::read_from(&mut Cursor::new(sector(&data, 1))).unwrap();
        let backup =
            GPTHeader::read_from(&mut Cursor::new(sector(&data, layout.backup_lba))).unwrap();

        assert_eq!(backup.primary_lba, primary.backup_lba);
        assert_eq!(backup.backup_lba, primary.primary_lba);
        assert_eq!(backup.partition_entry_lba, layout.backup_lba - 32);
        assert_eq!(backup.disk_guid, Guid([0x42; 16]));

        let primary_array = &data[2 * 512..34 * 512];
        let start = (backup.partition_entry_lba * 512) as usize;
        let backup_array = &data[start..start + 16384];
        assert_eq!(primary_array, backup_array);
        assert_eq!(
            crc32::checksum(primary_array),
            primary.partition_entry_array_crc32
        );
        assert_eq!(
            primary.partition_entry_array_crc32,
            backup.partition_entry_array_crc32
        );

        // the sectors of a header hold nothing after the header itself
        assert!(sector(&data, 1)[92..].iter().all(|x| *x == 0));
        assert!(sector(&data, layout.backup_lba)[92..]
            .iter()
            .all(|x| *x == 0));
    }

    #[test]
    fn entries_follow_the_layout() {
        let (layout, data) = build(vec![request("one", vec![1; 1024]), request("two", vec![2; 1])]);

        let mut cur = Cursor::new(&data[2 * 512..]);
        let first = GPTPartitionEntry::read_from(&mut cur).unwrap();
        let second = GPTPartitionEntry::read_from(&mut cur).unwrap();
        let third = GPTPartitionEntry::read_from(&mut cur).unwrap();

        assert_eq!(first.extent(), layout.extents[0]);
        assert_eq!(first.partition_name.as_str(), "one");
        assert_eq!(second.extent(), layout.extents[1]);
        assert_eq!(second.partition_name.as_str(), "two");
        assert!(third.is_unused());
        assert_eq!(sector(&data, 36)[0], 2);
    }

    #[test]
    fn large_payload_is_copied_in_chunks() {
        let payload = (0..COPY_CHUNK_SIZE * 2 + 700)
            .map(|x| (x % 251) as u8)
            .collect::<Vec<_>>();
        let (layout, data) = build(vec![request("big", payload.clone())]);

        let start = (layout.extents[0].starting_lba * 512) as usize;
        assert_eq!(&data[start..start + payload.len()], &payload[..]);
        assert_eq!(
            layout.extents[0].sectors(),
            (payload.len() as u64 - 1) / 512 + 1
        );
    }

    #[test]
    fn short_read() {
        let mut image = ImageBuilder::new(Guid::NULL);
        image
            .add_partition(PartitionRequest::from_reader(
                "short.img",
                Cursor::new(vec![0; 100]),
                1000,
            ))
            .unwrap();

        match image.write_into(&mut Cursor::new(Vec::new())) {
            Err(Error::ShortRead {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 1000);
                assert_eq!(actual, 100);
            }
            x => panic!("unexpected result: {:?}", x),
        }
    }

    #[test]
    fn too_many_partitions() {
        let mut image = ImageBuilder::new(Guid::NULL);
        for _ in 0..128 {
            image.add_partition(request("x", vec![0])).unwrap();
        }
        match image.add_partition(request("x", vec![0])) {
            Err(Error::TooManyPartitions(129)) => {}
            x => panic!("unexpected result: {:?}", x),
        }
        assert_eq!(image.partitions().len(), 128);
    }

    #[test]
    fn write_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let source = dir.path().join("esp.img");
        fs::write(&source, vec![0xaa; 600]).unwrap();

        let mut image = ImageBuilder::new(Guid([1; 16]));
        image
            .add_partition(PartitionRequest::open(&source).unwrap())
            .unwrap();
        let layout = image.write_to_path(&path).unwrap();

        let data = fs::read(&path).unwrap();
        assert_eq!(data.len() as u64, layout.image_len());
        assert_eq!(&data[512..520], b"EFI PART");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn failed_build_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");

        let mut image = ImageBuilder::new(Guid::NULL);
        image
            .add_partition(PartitionRequest::from_reader(
                "short.img",
                Cursor::new(vec![0; 10]),
                600,
            ))
            .unwrap();

        assert!(image.write_to_path(&path).is_err());
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_output_path() {
        match ImageBuilder::new(Guid::NULL).write_to_path("") {
            Err(Error::MissingOutputPath) => {}
            x => panic!("unexpected result: {:?}", x),
        }
    }

    /// Stops accepting writes once `limit` bytes have been written.
    struct FullDisk {
        inner: Cursor<Vec<u8>>,
        limit: u64,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.inner.position() + buf.len() as u64 > self.limit {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "No space left on device",
                ));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for FullDisk {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn output_errors_name_the_output() {
        let mut image = ImageBuilder::new(Guid::NULL);
        image.add_partition(request("big", vec![1; 4096])).unwrap();
        let mut disk = FullDisk {
            inner: Cursor::new(Vec::new()),
            limit: 34 * SECTOR_SIZE,
        };

        let err = image
            .write_output(Path::new("out/disk.img"), &mut disk)
            .unwrap_err();
        match &err {
            Error::Output { path, source } => {
                assert_eq!(path, Path::new("out/disk.img"));
                assert_eq!(source.to_string(), "No space left on device");
            }
            x => panic!("unexpected result: {:?}", x),
        }
        let message = err.to_string();
        assert!(message.contains("out/disk.img"));
        assert!(message.contains("No space left on device"));
    }

    #[test]
    fn source_errors_are_not_output_errors() {
        let mut image = ImageBuilder::new(Guid::NULL);
        image
            .add_partition(PartitionRequest::from_reader(
                "short.img",
                Cursor::new(vec![0; 10]),
                600,
            ))
            .unwrap();

        match image.write_output(Path::new("disk.img"), &mut Cursor::new(Vec::new())) {
            Err(Error::ShortRead { .. }) => {}
            x => panic!("unexpected result: {:?}", x),
        }
    }
}
