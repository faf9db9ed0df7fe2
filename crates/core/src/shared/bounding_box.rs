/// Axis-aligned rectangle in pixel coordinates.
///
/// Boxes start out in source-frame space as produced by the engine and are
/// mapped into display space by a [`ViewportTransform`].
///
/// [`ViewportTransform`]: crate::shared::viewport::ViewportTransform
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_edges() {
        let b = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
        assert_relative_eq!(b.right(), 110.0);
        assert_relative_eq!(b.bottom(), 70.0);
    }
}
