mod display_bytes;
mod error;
mod opt;
mod print;
mod table;
mod types;
mod uuid;

use self::error::*;
use self::opt::*;
use self::print::print;
use self::uuid::generate_random_uuid;
use clap::Parser;
use gpt_image::{ImageBuilder, PartitionRequest, MAX_PARTITIONS};
use log::{debug, info};
use std::fs;

macro_rules! main_unwrap {
    ($e:expr) => {{
        match $e {
            Ok(x) => x,
            Err(err) => {
                eprintln!("{}", err);
                std::process::exit(1);
            }
        }
    }};
}

fn main() {
    let opt = Opt::parse();

    env_logger::init();

    main_unwrap!(build(&opt));

    if opt.verify || opt.print {
        main_unwrap!(verify_and_print(&opt));
    }
}

fn build(opt: &Opt) -> Result<()> {
    let disk_guid = opt.disk_guid.unwrap_or_else(generate_random_uuid);
    debug!("disk GUID: {}", disk_guid);

    if opt.partitions.len() > MAX_PARTITIONS {
        return Err(gpt_image::Error::TooManyPartitions(opt.partitions.len()).into());
    }
    if opt.output.as_os_str().is_empty() {
        return Err(gpt_image::Error::MissingOutputPath.into());
    }

    let mut image = ImageBuilder::new(disk_guid);
    for part in &opt.partitions {
        let request = PartitionRequest::open(&part.path)?
            .partition_type_guid(part.partition_type_guid)
            .unique_partition_guid(
                part.unique_partition_guid
                    .unwrap_or_else(generate_random_uuid),
            )
            .partition_name(part.partition_name.as_str())?
            .attribute_bits(part.attribute_bits);
        debug!("partition request: {:?}", request);
        image.add_partition(request)?;
    }

    let layout = image.write_to_path(&opt.output)?;
    info!(
        "{} partition(s), last usable LBA {}, backup LBA {}",
        layout.extents.len(),
        layout.last_usable_lba,
        layout.backup_lba
    );
    println!("Output image at {}", opt.output.display());

    Ok(())
}

fn verify_and_print(opt: &Opt) -> Result<()> {
    let mut f = fs::File::open(&opt.output)?;
    let image = gpt_image::verify(&mut f)?;

    if opt.verify {
        println!("Partition tables are valid");
    }

    if opt.print {
        print(&opt.output, &image.header, &image.partitions);
    }

    Ok(())
}
