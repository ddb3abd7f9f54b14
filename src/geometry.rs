//! Grid geometry: points, Euclidean distance, triangle containment and line rasterization.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Side length of the square play area.
pub const GRID_SIZE: i32 = 19;

/// Largest valid row or column index.
pub const GRID_MAX: i32 = GRID_SIZE - 1;

/// A cell on the grid, addressed as `(row, col)`.
///
/// Rows grow southwards and columns grow eastwards, so `(0, 0)` is the
/// north-west corner and `(18, 18)` the south-east one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPoint {
    pub row: i32,
    pub col: i32,
}

impl GridPoint {
    /// Create a point without bounds checking.
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Create a point, validating it lies on the 19x19 map.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::PointOutOfBounds`] if either coordinate is outside `0..=18`.
    pub fn checked(row: i32, col: i32) -> crate::Result<Self> {
        let point = Self::new(row, col);
        if point.in_bounds() {
            Ok(point)
        } else {
            Err(crate::Error::PointOutOfBounds { row, col })
        }
    }

    /// Whether the point lies on the map.
    pub fn in_bounds(&self) -> bool {
        (0..=GRID_MAX).contains(&self.row) && (0..=GRID_MAX).contains(&self.col)
    }

    /// Offset this point by the given deltas.
    pub fn offset(&self, d_row: i32, d_col: i32) -> Self {
        Self::new(self.row + d_row, self.col + d_col)
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: GridPoint) -> f64 {
        distance(*self, other)
    }
}

impl From<(i32, i32)> for GridPoint {
    fn from((row, col): (i32, i32)) -> Self {
        Self::new(row, col)
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

impl FromStr for GridPoint {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || crate::Error::InvalidConfiguration {
            message: format!("invalid grid point '{s}' (expected 'row,col')"),
        };
        let (row, col) = s.split_once(',').ok_or_else(invalid)?;
        let row = row.trim().parse::<i32>().map_err(|_| invalid())?;
        let col = col.trim().parse::<i32>().map_err(|_| invalid())?;
        GridPoint::checked(row, col)
    }
}

/// Euclidean distance between two points.
pub fn distance(p1: GridPoint, p2: GridPoint) -> f64 {
    let d_row = f64::from(p1.row - p2.row);
    let d_col = f64::from(p1.col - p2.col);
    (d_row * d_row + d_col * d_col).sqrt()
}

fn cross_sign(p1: GridPoint, p2: GridPoint, p3: GridPoint) -> i64 {
    i64::from(p1.row - p3.row) * i64::from(p2.col - p3.col)
        - i64::from(p2.row - p3.row) * i64::from(p1.col - p3.col)
}

/// Whether `pt` lies inside or on the boundary of the triangle `(v1, v2, v3)`.
///
/// Points on an edge or vertex count as inside.
pub fn point_in_triangle(pt: GridPoint, v1: GridPoint, v2: GridPoint, v3: GridPoint) -> bool {
    let d1 = cross_sign(pt, v1, v2);
    let d2 = cross_sign(pt, v2, v3);
    let d3 = cross_sign(pt, v3, v1);

    let has_neg = d1 < 0 || d2 < 0 || d3 < 0;
    let has_pos = d1 > 0 || d2 > 0 || d3 > 0;

    !(has_neg && has_pos)
}

/// Integer cells along the segment from `from` to `to`, both endpoints included.
///
/// Uses Bresenham's algorithm, so consecutive cells are 8-connected.
pub fn line_points(from: GridPoint, to: GridPoint) -> Vec<GridPoint> {
    let d_row = (to.row - from.row).abs();
    let d_col = (to.col - from.col).abs();
    let step_row = if from.row < to.row { 1 } else { -1 };
    let step_col = if from.col < to.col { 1 } else { -1 };

    let mut points = Vec::with_capacity((d_row.max(d_col) + 1) as usize);
    let mut current = from;
    let mut err = d_row - d_col;

    loop {
        points.push(current);
        if current == to {
            break;
        }
        let e2 = 2 * err;
        if e2 > -d_col {
            err -= d_col;
            current.row += step_row;
        }
        if e2 < d_row {
            err += d_row;
            current.col += step_col;
        }
    }

    points
}
