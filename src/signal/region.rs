use crate::EPS;

/// Axis-aligned spatial footprint in the format (x, y, width, height).
///
/// The region is the per-frame spatial signal of an object localization. A
/// region with non-positive width or height is empty; `SpatialRegion::EMPTY`
/// is the canonical shared empty value and must never be replaced by a
/// mutated copy.
///
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpatialRegion {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl SpatialRegion {
    pub const EMPTY: SpatialRegion = SpatialRegion {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width as f64 * self.height as f64
        }
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);

        if right <= left || bottom <= top {
            Self::EMPTY
        } else {
            Self::new(left, top, right - left, bottom - top)
        }
    }

    pub fn intersection_area(&self, other: &Self) -> f64 {
        self.intersection(other).area()
    }

    pub fn union_area(&self, other: &Self) -> f64 {
        self.area() + other.area() - self.intersection_area(other)
    }

    /// Intersection over union; 0.0 when both regions are empty.
    pub fn iou(&self, other: &Self) -> f64 {
        let union = self.union_area(other);
        if union <= 0.0 {
            0.0
        } else {
            self.intersection_area(other) / union
        }
    }

    /// The smallest region covering both operands. An empty operand does not
    /// extend the hull.
    ///
    pub fn hull(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self.x - other.x).abs() < eps
            && (self.y - other.y).abs() < eps
            && (self.width - other.width).abs() < eps
            && (self.height - other.height).abs() < eps
    }
}

#[allow(dead_code)]
pub(crate) fn approx(left: f64, right: f64) -> bool {
    (left - right).abs() < EPS as f64
}

#[cfg(test)]
mod spatial_region_tests {
    use crate::signal::region::{approx, SpatialRegion};

    #[test]
    fn empty_region_has_zero_area() {
        assert!(SpatialRegion::EMPTY.is_empty());
        assert_eq!(SpatialRegion::EMPTY.area(), 0.0);
        assert!(SpatialRegion::new(1.0, 1.0, 0.0, 5.0).is_empty());
    }

    #[test]
    fn intersection_of_overlapping_regions() {
        let a = SpatialRegion::new(0.0, 0.0, 10.0, 10.0);
        let b = SpatialRegion::new(5.0, 5.0, 10.0, 10.0);
        let i = a.intersection(&b);
        assert!(i.almost_same(&SpatialRegion::new(5.0, 5.0, 5.0, 5.0), 1e-6));
        assert!(approx(a.intersection_area(&b), 25.0));
        assert!(approx(a.union_area(&b), 175.0));
        assert!(approx(a.iou(&b), 25.0 / 175.0));
    }

    #[test]
    fn disjoint_regions_have_zero_iou() {
        let a = SpatialRegion::new(0.0, 0.0, 10.0, 10.0);
        let b = SpatialRegion::new(100.0, 100.0, 10.0, 10.0);
        assert!(a.intersection(&b).is_empty());
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn identical_regions_have_unit_iou() {
        let a = SpatialRegion::new(3.0, 4.0, 7.0, 2.0);
        assert!(approx(a.iou(&a), 1.0));
    }

    #[test]
    fn hull_ignores_empty_operands() {
        let a = SpatialRegion::new(0.0, 0.0, 10.0, 10.0);
        let h = a.hull(&SpatialRegion::EMPTY);
        assert!(h.almost_same(&a, 1e-6));

        let b = SpatialRegion::new(20.0, 20.0, 5.0, 5.0);
        let h = a.hull(&b);
        assert!(h.almost_same(&SpatialRegion::new(0.0, 0.0, 25.0, 25.0), 1e-6));
    }
}
