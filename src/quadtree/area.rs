use core::fmt;

use crate::Coord;

/// One of the four equal partitions of an [`Area`] about its center.
///
/// ```notrust
///      |
///   NW | NE   x
///  ----+---->
///   SW | SE
///      |
///      v y
/// ```
///
/// The discriminant is the child slot of a node, built from an east bit (`2`) and a south bit
/// (`1`).
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NW = 0,
    SW = 1,
    NE = 2,
    SE = 3,
}

impl Quadrant {
    /// Every quadrant, in child slot order.
    pub const ALL: [Quadrant; 4] = [Quadrant::NW, Quadrant::SW, Quadrant::NE, Quadrant::SE];

    const SOUTH: usize = 1;
    const EAST: usize = 2;

    fn from_bits(east: bool, south: bool) -> Self {
        let bits = (if east { Self::EAST } else { 0 }) | (if south { Self::SOUTH } else { 0 });

        Self::ALL[bits]
    }

    /// Child slot of this quadrant.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn is_east(self) -> bool {
        self as usize & Self::EAST != 0
    }

    pub const fn is_south(self) -> bool {
        self as usize & Self::SOUTH != 0
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Quadrant::NW => "NW",
            Quadrant::SW => "SW",
            Quadrant::NE => "NE",
            Quadrant::SE => "SE",
        };

        f.write_str(s)
    }
}

/// Axis-aligned integer rectangle covering `[x, x + w) × [y, y + h)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Area {
    pub x: Coord,
    pub y: Coord,
    pub w: Coord,
    pub h: Coord,
}

impl Area {
    pub const fn new(x: Coord, y: Coord, w: Coord, h: Coord) -> Self {
        Area { x, y, w, h }
    }

    /// The `1x1` cell at `(x, y)`.
    pub const fn unit(x: Coord, y: Coord) -> Self {
        Area::new(x, y, 1, 1)
    }

    /// Whether `(px, py)` lies inside the area. Never overflows, whatever the inputs.
    pub fn contains(&self, px: Coord, py: Coord) -> bool {
        // a failed subtraction means the distance exceeds `Coord::MAX`, hence any extent
        let inside = |p: Coord, origin: Coord, extent: Coord| {
            p >= origin && p.checked_sub(origin).is_some_and(|d| d < extent)
        };

        inside(px, self.x, self.w) && inside(py, self.y, self.h)
    }

    /// Whether both the origin corner and the far corner of `other` lie inside this area.
    ///
    /// The far corner is exclusive to `other`, so an area does not contain itself.
    pub fn contains_area(&self, other: &Area) -> bool {
        let far = other
            .x
            .checked_add(other.w)
            .zip(other.y.checked_add(other.h));

        match far {
            Some((fx, fy)) => self.contains(other.x, other.y) && self.contains(fx, fy),
            None => false,
        }
    }

    pub fn center(&self) -> (Coord, Coord) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }

    /// Classify `(px, py)` into the quadrant holding it, or `None` if it is outside the area.
    pub fn quadrant(&self, px: Coord, py: Coord) -> Option<Quadrant> {
        if !self.contains(px, py) {
            return None;
        }

        let (cx, cy) = self.center();

        Some(Quadrant::from_bits(px >= cx, py >= cy))
    }

    /// The area covered by quadrant `q`: half the width and height, anchored in `q`'s corner.
    pub fn quadrant_area(&self, q: Quadrant) -> Area {
        let (hw, hh) = (self.w / 2, self.h / 2);
        let x = if q.is_east() { self.x + hw } else { self.x };
        let y = if q.is_south() { self.y + hh } else { self.y };

        Area::new(x, y, hw, hh)
    }

    pub fn is_unit(&self) -> bool {
        self.w == 1 && self.h == 1
    }

    /// Whether this is exactly the unit cell at `(x, y)`. This is the leaf condition of the tree.
    pub fn is_unit_at(&self, x: Coord, y: Coord) -> bool {
        self.is_unit() && self.x == x && self.y == y
    }

    /// Whether halving this area repeatedly ends cleanly at unit cells: a square with a power of
    /// two side, whose far edges are representable.
    pub fn is_subdividable(&self) -> bool {
        self.w > 0
            && self.w == self.h
            && (self.w as u64).is_power_of_two()
            && self.x.checked_add(self.w).is_some()
            && self.y.checked_add(self.h).is_some()
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.w, self.h)
    }
}
