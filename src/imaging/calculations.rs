//! Pure calculation functions for image dimensions and sizes.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Rotation;

/// Dimensions after applying a rotation.
///
/// 90° and 270° swap the axes; 0° and 180° keep them.
pub fn rotated_dimensions(dims: (u32, u32), rotation: Rotation) -> (u32, u32) {
    if rotation.swaps_axes() {
        (dims.1, dims.0)
    } else {
        dims
    }
}

/// Height that preserves the source aspect ratio at `target_width`.
///
/// `round(target_width * height / width)`, never below 1px.
///
/// # Examples
/// ```
/// # use simple_shrink::imaging::scaled_height;
/// assert_eq!(scaled_height((4000, 3000), 1000), 750);
/// assert_eq!(scaled_height((3000, 4000), 1000), 1333);
/// ```
pub fn scaled_height(source: (u32, u32), target_width: u32) -> u32 {
    let (w, h) = source;
    if w == 0 {
        return 1;
    }
    let height = (target_width as f64 * h as f64 / w as f64).round() as u32;
    height.max(1)
}

/// Original byte size divided by shrunk byte size.
pub fn size_ratio(original_bytes: u64, shrunk_bytes: u64) -> f64 {
    original_bytes as f64 / shrunk_bytes.max(1) as f64
}

/// Human-readable savings string, e.g. `"12.4x smaller"`.
pub fn format_savings(original_bytes: u64, shrunk_bytes: u64) -> String {
    format!("{:.1}x smaller", size_ratio(original_bytes, shrunk_bytes))
}

/// Resolution string used in reports, e.g. `"3000x4000"`.
pub fn format_resolution(dims: (u32, u32)) -> String {
    format!("{}x{}", dims.0, dims.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // rotated_dimensions
    // =========================================================================

    #[test]
    fn quarter_turns_swap_axes() {
        assert_eq!(rotated_dimensions((4000, 3000), Rotation::Cw90), (3000, 4000));
        assert_eq!(rotated_dimensions((4000, 3000), Rotation::Cw270), (3000, 4000));
    }

    #[test]
    fn half_turn_and_none_keep_axes() {
        assert_eq!(rotated_dimensions((4000, 3000), Rotation::Cw180), (4000, 3000));
        assert_eq!(rotated_dimensions((4000, 3000), Rotation::None), (4000, 3000));
    }

    // =========================================================================
    // scaled_height
    // =========================================================================

    #[test]
    fn landscape_height() {
        assert_eq!(scaled_height((4000, 3000), 1000), 750);
    }

    #[test]
    fn portrait_height_rounds() {
        // 1000 * 4000 / 3000 = 1333.33
        assert_eq!(scaled_height((3000, 4000), 1000), 1333);
    }

    #[test]
    fn rounds_half_up() {
        // 3 * 5 / 2 = 7.5
        assert_eq!(scaled_height((2, 5), 3), 8);
    }

    #[test]
    fn extreme_panorama_never_collapses() {
        assert_eq!(scaled_height((10000, 10), 100), 1);
    }

    #[test]
    fn upscaling_width_is_allowed() {
        assert_eq!(scaled_height((100, 50), 400), 200);
    }

    #[test]
    fn matches_rounding_property() {
        for &(w, h) in &[(640, 480), (1920, 1080), (333, 777), (1, 1)] {
            for width in [1u32, 7, 100, 1280] {
                let expected = ((width as f64) * (h as f64) / (w as f64)).round().max(1.0) as u32;
                assert_eq!(scaled_height((w, h), width), expected, "{w}x{h} @ {width}");
            }
        }
    }

    // =========================================================================
    // savings / resolution formatting
    // =========================================================================

    #[test]
    fn savings_one_decimal() {
        assert_eq!(format_savings(1_000_000, 80_000), "12.5x smaller");
        assert_eq!(format_savings(300, 100), "3.0x smaller");
    }

    #[test]
    fn savings_with_empty_shrunk_does_not_divide_by_zero() {
        assert_eq!(format_savings(10, 0), "10.0x smaller");
    }

    #[test]
    fn resolution_string() {
        assert_eq!(format_resolution((3000, 4000)), "3000x4000");
    }
}
