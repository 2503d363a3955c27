use gpt_image::Guid;
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// Partition types that can be given by name, with a human-readable description.
    pub static ref PRESETS: HashMap<&'static str, (Guid, &'static str)> = {
        fn guid(s: &str) -> Guid {
            s.parse().expect("invalid preset GUID")
        }

        let mut m = HashMap::new();
        m.insert("null", (Guid::NULL, "Unused entry"));
        m.insert(
            "system",
            (Guid::EFI_SYSTEM_PARTITION, "EFI System partition"),
        );
        m.insert(
            "bios",
            (
                guid("21686148-6449-6E6F-744E-656564454649"),
                "BIOS boot partition",
            ),
        );
        m.insert(
            "linux",
            (
                guid("0FC63DAF-8483-4772-8E79-3D69D8477DE4"),
                "Linux filesystem data",
            ),
        );
        m.insert(
            "swap",
            (
                guid("0657FD6D-A4AB-43C4-84E5-0933C84B4F4F"),
                "Linux swap partition",
            ),
        );
        m.insert(
            "data",
            (
                guid("EBD0A0A2-B9E5-4433-87C0-68B6B72699C7"),
                "Basic data partition",
            ),
        );

        m
    };
}

/// Resolve a preset name or a GUID string.
pub fn parse_partition_type(s: &str) -> gpt_image::Result<Guid> {
    match PRESETS.get(s) {
        Some((guid, _)) => Ok(*guid),
        None => s.parse(),
    }
}

pub trait PartitionTypeGUID {
    fn display_partition_type_guid(&self) -> String;
}

impl PartitionTypeGUID for Guid {
    fn display_partition_type_guid(&self) -> String {
        PRESETS
            .values()
            .find(|(guid, _)| guid == self)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| self.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(
            parse_partition_type("system").unwrap(),
            Guid::EFI_SYSTEM_PARTITION
        );
        assert_eq!(parse_partition_type("null").unwrap(), Guid::NULL);
        assert_eq!(
            parse_partition_type("c12a7328-f81f-11d2-ba4b-00a0c93ec93b").unwrap(),
            Guid::EFI_SYSTEM_PARTITION
        );
        assert!(parse_partition_type("efi").is_err());
    }

    #[test]
    fn display_names() {
        assert_eq!(
            Guid::EFI_SYSTEM_PARTITION.display_partition_type_guid(),
            "EFI System partition"
        );
        assert_eq!(
            Guid([1; 16]).display_partition_type_guid(),
            "01010101-0101-0101-0101-010101010101"
        );
    }
}
