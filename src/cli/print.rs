use crate::display_bytes::DisplayBytes;
use crate::table::Table;
use crate::types::PartitionTypeGUID;
use gpt_image::{PartitionEntryArray, SealedHeader, SECTOR_SIZE};
use std::path::Path;

pub fn print(path: &Path, header: &SealedHeader, partitions: &PartitionEntryArray) {
    let len = (header.backup_lba.max(header.primary_lba) + 1) * SECTOR_SIZE;
    let usable = header.last_usable_lba - header.first_usable_lba + 1;

    println!("Image: {}", path.display());
    println!("Sector size: {} bytes", SECTOR_SIZE);
    println!("Disk size: {} ({} bytes)", DisplayBytes::new(len), len);
    println!(
        "Usable sectors: {}-{} ({} sectors)",
        header.first_usable_lba, header.last_usable_lba, usable,
    );
    println!("Disk identifier: {}", header.disk_guid);
    println!();

    let mut table = Table::new(&[
        "#",
        ">Start",
        ">End",
        ">Sectors",
        ">Size",
        "Type",
        "GUID",
        ">Attributes",
        "Name",
    ]);
    for (i, p) in partitions.used() {
        let sectors = p.extent().sectors();
        table.add_row(vec![
            i.to_string(),
            p.starting_lba.to_string(),
            p.ending_lba.to_string(),
            sectors.to_string(),
            DisplayBytes::new(sectors * SECTOR_SIZE).to_string(),
            p.partition_type_guid.display_partition_type_guid(),
            p.unique_partition_guid.to_string(),
            format!("{:#x}", p.attribute_bits),
            p.partition_name.to_string(),
        ]);
    }
    print!("{}", table);
}
