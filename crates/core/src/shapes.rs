//! Shapes module - shape templates and pivot rotation with wall kicks
//!
//! Templates are grouped by cell count (1-8). The first offset of every template
//! is the pivot `(0, 0)`; it becomes the piece's primary cell, the only one that
//! may carry a special type. Rotation turns all offsets 90° clockwise about the
//! pivot and falls back to the horizontal kicks in [`KICK_OFFSETS`].

use arrayvec::ArrayVec;

use crate::error::ConfigError;
use crate::types::{Pos, KICK_OFFSETS, MAX_PIECE_CELLS};

/// Offsets of a piece relative to its pivot
pub type Offsets = ArrayVec<Pos, MAX_PIECE_CELLS>;

/// Built-in templates: (name, offsets), pivot first
const STANDARD_SHAPES: &[(&str, &[Pos])] = &[
    ("mono", &[(0, 0)]),
    ("domino", &[(0, 0), (1, 0)]),
    ("tri_line", &[(0, 0), (1, 0), (2, 0)]),
    ("tri_corner", &[(0, 0), (1, 0), (0, 1)]),
    ("square", &[(0, 0), (1, 0), (0, 1), (1, 1)]),
    ("line4", &[(0, 0), (1, 0), (2, 0), (3, 0)]),
    ("tee", &[(0, 0), (-1, 0), (1, 0), (0, 1)]),
    ("ell", &[(0, 0), (0, 1), (0, 2), (1, 2)]),
    ("ess", &[(0, 0), (1, 0), (0, 1), (-1, 1)]),
    ("plus", &[(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)]),
    ("pent_l", &[(0, 0), (0, 1), (0, 2), (0, 3), (1, 3)]),
    ("pent_p", &[(0, 0), (1, 0), (0, 1), (1, 1), (0, 2)]),
    ("pent_u", &[(0, 0), (-1, 0), (1, 0), (-1, -1), (1, -1)]),
    ("hex_rect", &[(0, 0), (1, 0), (0, 1), (1, 1), (0, 2), (1, 2)]),
    ("hex_t", &[(0, 0), (-1, 0), (1, 0), (0, 1), (0, 2), (0, 3)]),
    ("hex_s", &[(0, 0), (1, 0), (2, 0), (-1, 1), (0, 1), (1, 1)]),
    (
        "hept_h",
        &[(0, 0), (-1, 0), (1, 0), (-1, -1), (-1, 1), (1, -1), (1, 1)],
    ),
    (
        "hept_bar",
        &[(0, 0), (1, 0), (0, 1), (1, 1), (0, 2), (1, 2), (0, 3)],
    ),
    (
        "oct_ring",
        &[(0, 0), (1, 0), (2, 0), (0, 1), (2, 1), (0, 2), (1, 2), (2, 2)],
    ),
    (
        "oct_rect",
        &[(0, 0), (1, 0), (0, 1), (1, 1), (0, 2), (1, 2), (0, 3), (1, 3)],
    ),
];

/// A named shape template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeTemplate {
    pub name: String,
    pub offsets: Vec<Pos>,
}

impl ShapeTemplate {
    pub fn new(name: impl Into<String>, offsets: Vec<Pos>) -> Self {
        Self {
            name: name.into(),
            offsets,
        }
    }

    pub fn cells(&self) -> usize {
        self.offsets.len()
    }

    /// Check pivot, duplicates, size and 4-connectivity
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.offsets.len();
        if n == 0 || n > MAX_PIECE_CELLS {
            return Err(ConfigError::ShapeSize {
                name: self.name.clone(),
                expected: n.clamp(1, MAX_PIECE_CELLS),
                actual: n,
            });
        }
        if self.offsets[0] != (0, 0) {
            return Err(ConfigError::ShapePivot {
                name: self.name.clone(),
            });
        }
        for (i, a) in self.offsets.iter().enumerate() {
            if self.offsets[i + 1..].contains(a) {
                return Err(ConfigError::ShapeDuplicateOffset {
                    name: self.name.clone(),
                });
            }
        }

        let mut reached = vec![false; n];
        reached[0] = true;
        let mut stack = vec![0usize];
        while let Some(i) = stack.pop() {
            let (x, y) = self.offsets[i];
            for (j, &(ox, oy)) in self.offsets.iter().enumerate() {
                if !reached[j] && (x - ox).abs() + (y - oy).abs() == 1 {
                    reached[j] = true;
                    stack.push(j);
                }
            }
        }
        if reached.iter().any(|r| !r) {
            return Err(ConfigError::ShapeDisconnected {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    pub fn to_offsets(&self) -> Offsets {
        self.offsets.iter().copied().collect()
    }
}

/// Immutable catalog of templates grouped by cell count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeCatalog {
    /// Index `n - 1` holds the templates with `n` cells
    groups: Vec<Vec<ShapeTemplate>>,
}

impl ShapeCatalog {
    /// The built-in catalog, one or more templates for every size 1-8
    pub fn standard() -> Self {
        Self::group(
            STANDARD_SHAPES
                .iter()
                .map(|(name, offsets)| ShapeTemplate::new(*name, offsets.to_vec()))
                .collect(),
        )
    }

    /// Build a catalog from custom templates, validating each one
    pub fn new(templates: Vec<ShapeTemplate>) -> Result<Self, ConfigError> {
        for t in &templates {
            t.validate()?;
        }
        Ok(Self::group(templates))
    }

    fn group(templates: Vec<ShapeTemplate>) -> Self {
        let mut groups = vec![Vec::new(); MAX_PIECE_CELLS];
        for t in templates {
            let n = t.cells();
            if (1..=MAX_PIECE_CELLS).contains(&n) {
                groups[n - 1].push(t);
            }
        }
        Self { groups }
    }

    /// Templates with exactly `cells` cells
    pub fn templates(&self, cells: usize) -> &[ShapeTemplate] {
        match cells.checked_sub(1).and_then(|i| self.groups.get(i)) {
            Some(group) => group,
            None => &[],
        }
    }

    /// Fail if no template exists for `cells`
    pub fn require(&self, cells: usize) -> Result<(), ConfigError> {
        if self.templates(cells).is_empty() {
            return Err(ConfigError::MissingShapes { cells });
        }
        Ok(())
    }
}

impl Default for ShapeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Rotate offsets 90° clockwise about the pivot (screen coordinates, y down)
pub fn rotate_cw(offsets: &[Pos]) -> Offsets {
    offsets.iter().map(|&(dx, dy)| (-dy, dx)).collect()
}

/// Bounding box `(min_x, min_y, max_x, max_y)` of a set of offsets
pub fn bounds(offsets: &[Pos]) -> (i8, i8, i8, i8) {
    offsets.iter().fold(
        (i8::MAX, i8::MAX, i8::MIN, i8::MIN),
        |(min_x, min_y, max_x, max_y), &(x, y)| {
            (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
        },
    )
}

/// Try to rotate a piece with wall kicks
///
/// Returns the rotated offsets and the horizontal kick applied, or None if the
/// in-place rotation and every kick are blocked. Single-cell pieces never rotate.
pub fn try_rotate(
    offsets: &[Pos],
    x: i8,
    y: i8,
    is_valid: impl Fn(i8, i8) -> bool,
) -> Option<(Offsets, i8)> {
    if offsets.len() <= 1 {
        return None;
    }

    let rotated = rotate_cw(offsets);
    std::iter::once(0)
        .chain(KICK_OFFSETS)
        .find(|&kick| {
            rotated
                .iter()
                .all(|&(dx, dy)| is_valid(x + kick + dx, y + dy))
        })
        .map(|kick| (rotated, kick))
}
