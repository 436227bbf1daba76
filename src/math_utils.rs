use glam::Vec3;

/// Converts a `0xRRGGBB` sRGB color into linear RGB in the range [0, 1].
///
/// Colors authored as hex values are assumed to be sRGB encoded, while the
/// shader does all lighting math in linear space.
pub fn color_from_hex(hex: u32) -> Vec3 {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xFF) as f32 / 255.0);
    Vec3::new(channel(16), channel(8), channel(0))
}

/// sRGB transfer function, decoding direction.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
