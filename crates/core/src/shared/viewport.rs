use crate::shared::bounding_box::BoundingBox;

/// Maps source-frame pixel coordinates into a destination view using an
/// aspect-preserving fit.
///
/// The source is scaled uniformly until it fills the destination on one
/// axis; the remainder on the other axis is split evenly, so content stays
/// centered with letterbox bands rather than stretching.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportTransform {
    scale: f32,
    x_offset: f32,
    y_offset: f32,
}

impl ViewportTransform {
    /// Fits `source` (width, height) inside `dest` (width, height).
    ///
    /// A degenerate source or destination yields the identity transform.
    pub fn aspect_fit(source: (f32, f32), dest: (f32, f32)) -> Self {
        let (src_w, src_h) = source;
        let (dst_w, dst_h) = dest;
        if src_w <= 0.0 || src_h <= 0.0 || dst_w <= 0.0 || dst_h <= 0.0 {
            return Self::identity();
        }

        let source_aspect = src_w / src_h;
        let dest_aspect = dst_w / dst_h;

        if source_aspect > dest_aspect {
            // Source is wider: width fills, height is letterboxed.
            let scale = dst_w / src_w;
            Self {
                scale,
                x_offset: 0.0,
                y_offset: (dst_h - src_h * scale) / 2.0,
            }
        } else {
            // Source is taller or equal: height fills, width is letterboxed.
            let scale = dst_h / src_h;
            Self {
                scale,
                x_offset: (dst_w - src_w * scale) / 2.0,
                y_offset: 0.0,
            }
        }
    }

    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            x_offset: 0.0,
            y_offset: 0.0,
        }
    }

    pub fn map(&self, b: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x: b.x * self.scale + self.x_offset,
            y: b.y * self.scale + self.y_offset,
            width: b.width * self.scale,
            height: b.height * self.scale,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offsets(&self) -> (f32, f32) {
        (self.x_offset, self.y_offset)
    }
}

/// Normalizes a captured frame size to display orientation.
///
/// Capture hardware reports sensor-native sizes, so a rotated portrait
/// stream still arrives as landscape dimensions. Overlay space is always
/// portrait; a landscape size (width > height) is reported swapped.
pub fn oriented_size(width: u32, height: u32) -> (u32, u32) {
    if width > height {
        (height, width)
    } else {
        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    // ── Aspect fit ───────────────────────────────────────────────────

    #[test]
    fn test_taller_dest_letterboxes_vertically() {
        // Same width, taller view: content is centered with equal bands
        // above and below.
        let t = ViewportTransform::aspect_fit((1080.0, 1920.0), (1080.0, 2280.0));
        assert_relative_eq!(t.scale(), 1.0);
        assert_relative_eq!(t.offsets().0, 0.0);
        assert_relative_eq!(t.offsets().1, 180.0);

        let mapped = t.map(&BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        assert_relative_eq!(mapped.x, 0.0);
        assert_relative_eq!(mapped.y, 180.0);
        assert_relative_eq!(mapped.width, 100.0);
        assert_relative_eq!(mapped.height, 100.0);
    }

    #[test]
    fn test_wider_dest_letterboxes_horizontally() {
        // Source 100x100 into 400x200: height fills (scale 2), width gets
        // (400 - 200) / 2 = 100 on each side.
        let t = ViewportTransform::aspect_fit((100.0, 100.0), (400.0, 200.0));
        assert_relative_eq!(t.scale(), 2.0);
        assert_relative_eq!(t.offsets().0, 100.0);
        assert_relative_eq!(t.offsets().1, 0.0);

        let mapped = t.map(&BoundingBox::new(10.0, 10.0, 20.0, 30.0));
        assert_relative_eq!(mapped.x, 120.0);
        assert_relative_eq!(mapped.y, 20.0);
        assert_relative_eq!(mapped.width, 40.0);
        assert_relative_eq!(mapped.height, 60.0);
    }

    #[test]
    fn test_wider_source_scales_down() {
        // Source 200x100 into 100x100: width fills (scale 0.5),
        // y offset = (100 - 50) / 2 = 25.
        let t = ViewportTransform::aspect_fit((200.0, 100.0), (100.0, 100.0));
        assert_relative_eq!(t.scale(), 0.5);
        assert_relative_eq!(t.offsets().0, 0.0);
        assert_relative_eq!(t.offsets().1, 25.0);
    }

    #[test]
    fn test_matching_aspect_has_no_offsets() {
        let t = ViewportTransform::aspect_fit((1080.0, 1920.0), (540.0, 960.0));
        assert_relative_eq!(t.scale(), 0.5);
        assert_relative_eq!(t.offsets().0, 0.0);
        assert_relative_eq!(t.offsets().1, 0.0);
    }

    #[rstest]
    #[case::zero_source_width((0.0, 1920.0), (1080.0, 2280.0))]
    #[case::zero_source_height((1080.0, 0.0), (1080.0, 2280.0))]
    #[case::zero_dest((1080.0, 1920.0), (0.0, 0.0))]
    fn test_degenerate_sizes_yield_identity(#[case] source: (f32, f32), #[case] dest: (f32, f32)) {
        let t = ViewportTransform::aspect_fit(source, dest);
        assert_eq!(t, ViewportTransform::identity());
    }

    #[test]
    fn test_identity_maps_unchanged() {
        let b = BoundingBox::new(5.0, 6.0, 7.0, 8.0);
        assert_eq!(ViewportTransform::identity().map(&b), b);
    }

    // ── Orientation ──────────────────────────────────────────────────

    #[rstest]
    #[case::landscape_swaps(1920, 1080, (1080, 1920))]
    #[case::portrait_unchanged(1080, 1920, (1080, 1920))]
    #[case::square_unchanged(416, 416, (416, 416))]
    fn test_oriented_size(#[case] w: u32, #[case] h: u32, #[case] expected: (u32, u32)) {
        assert_eq!(oriented_size(w, h), expected);
    }
}
