use gpt_image::Guid;

/// Generate a random (version 4) GUID.
pub fn generate_random_uuid() -> Guid {
    let mut guid: [u8; 16] = rand::random();
    // the version is the high nibble of the third field, stored little-endian
    guid[7] = (guid[7] & 0x0f) | 0x40;
    guid[8] = (guid[8] & 0x3f) | 0x80;

    Guid(guid)
}
