use crate::error::Error;
use crate::types::parse_partition_type;
use clap::Parser;
use gpt_image::{Guid, PartitionName};
use std::path::PathBuf;
use std::str::FromStr;

/// A partition given on the command line: `PATH[,type=TYPE][,name=NAME][,guid=GUID][,attrs=BITS]`
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionArg {
    pub path: PathBuf,
    pub partition_type_guid: Guid,
    pub partition_name: PartitionName,
    pub unique_partition_guid: Option<Guid>,
    pub attribute_bits: u64,
}

impl FromStr for PartitionArg {
    type Err = Error;

    fn from_str(s: &str) -> Result<PartitionArg, Error> {
        let mut it = s.split(',');
        let path = match it.next() {
            Some(x) if !x.is_empty() => PathBuf::from(x),
            _ => return Err("missing partition image path".into()),
        };

        let mut arg = PartitionArg {
            path,
            partition_type_guid: Guid::NULL,
            partition_name: PartitionName::default(),
            unique_partition_guid: None,
            attribute_bits: 0,
        };

        for option in it {
            let (key, value) = match option.find('=') {
                Some(i) => (&option[..i], &option[i + 1..]),
                None => return Err(Error::new(&format!("invalid option: {:?}", option))),
            };
            match key {
                "type" => arg.partition_type_guid = parse_partition_type(value)?,
                "name" => arg.partition_name = PartitionName::new(value)?,
                "guid" => arg.unique_partition_guid = Some(value.parse()?),
                "attrs" => {
                    arg.attribute_bits = value
                        .parse()
                        .map_err(|err| Error::new(&format!("invalid attributes: {}", err)))?
                }
                x => return Err(Error::new(&format!("unknown option: {:?}", x))),
            }
        }

        Ok(arg)
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Create disk image files with valid GUID Partition Tables")]
pub struct Opt {
    /// write the output disk image file to this path
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// create a partition from an image: PATH[,type=GUID|system|null|bios|linux|swap|data]
    /// [,name=NAME][,guid=GUID][,attrs=BITS]
    #[arg(short = 'p', long = "part", alias = "partition", value_parser = parse_partition_arg)]
    pub partitions: Vec<PartitionArg>,

    /// disk GUID (default: random)
    #[arg(long = "disk-guid", value_parser = parse_guid)]
    pub disk_guid: Option<Guid>,

    /// display the partitions of the image once written
    #[arg(short = 'l', long = "list")]
    pub print: bool,

    /// read the image back and check its partition tables once written
    #[arg(long = "verify")]
    pub verify: bool,
}

fn parse_partition_arg(s: &str) -> Result<PartitionArg, String> {
    s.parse().map_err(|err: Error| err.to_string())
}

fn parse_guid(s: &str) -> Result<Guid, String> {
    s.parse().map_err(|err: gpt_image::Error| err.to_string())
}
