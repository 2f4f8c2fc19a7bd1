//! Integer axis-aligned rectangles.

/// An axis-aligned rectangle in texel coordinates.
///
/// The origin is the top-left corner; `x` grows right and `y` grows down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// X coordinate of the top-left corner.
    pub x: u32,
    /// Y coordinate of the top-left corner.
    pub y: u32,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle at the origin with the given size.
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Area in texels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns true if the rectangle covers no texels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns true if `other` lies fully inside this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns true if the two rectangles share at least one texel.
    ///
    /// Empty rectangles never intersect anything.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        (self.x as u64) < other.right()
            && (other.x as u64) < self.right()
            && (self.y as u64) < other.bottom()
            && (other.y as u64) < self.bottom()
    }

    /// Shrink the rectangle by `border` on all four sides.
    ///
    /// Returns `None` if the border does not fit inside the rectangle.
    pub fn shrink(&self, border: u32) -> Option<Rect> {
        let padding = border.checked_mul(2)?;
        Some(Rect {
            x: self.x.checked_add(border)?,
            y: self.y.checked_add(border)?,
            width: self.width.checked_sub(padding)?,
            height: self.height.checked_sub(padding)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_and_area() {
        let rect = Rect::new(2, 3, 10, 20);
        assert_eq!(rect.right(), 12);
        assert_eq!(rect.bottom(), 23);
        assert_eq!(rect.area(), 200);
        assert!(!rect.is_empty());
    }

    #[test]
    fn test_contains_rect() {
        let outer = Rect::from_size(100, 100);
        assert!(outer.contains_rect(&Rect::new(0, 0, 100, 100)));
        assert!(outer.contains_rect(&Rect::new(10, 10, 5, 5)));
        assert!(!outer.contains_rect(&Rect::new(90, 90, 20, 5)));
    }

    #[test]
    fn test_intersects() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.intersects(&Rect::new(5, 5, 10, 10)));
        // Touching edges do not overlap.
        assert!(!a.intersects(&Rect::new(10, 0, 10, 10)));
        assert!(!a.intersects(&Rect::new(0, 10, 10, 10)));
        assert!(!a.intersects(&Rect::new(3, 3, 0, 4)));
    }

    #[test]
    fn test_shrink() {
        let rect = Rect::new(0, 44, 44, 44);
        assert_eq!(rect.shrink(2), Some(Rect::new(2, 46, 40, 40)));
        assert_eq!(rect.shrink(0), Some(rect));
        assert_eq!(Rect::from_size(3, 3).shrink(2), None);
    }
}
