use serde::{Deserialize, Serialize};

use crate::error::{QuadtreeError, QuadtreeResult};
use crate::geometry::Rectangle;

pub const DEFAULT_CAPACITY: usize = 4;

/// Depth at which leaves stop subdividing and start overflowing.
pub const DEFAULT_MAX_DEPTH: u8 = 32;

/// Construction parameters for a [`Quadtree`](crate::Quadtree).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadtreeConfig {
    pub boundary: Rectangle,
    pub capacity: usize,
    pub max_depth: u8,
}

impl Default for QuadtreeConfig {
    fn default() -> Self {
        Self {
            boundary: Rectangle::new(500.0, 500.0, 1000.0, 1000.0),
            capacity: DEFAULT_CAPACITY,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl QuadtreeConfig {
    pub fn new(boundary: Rectangle, capacity: usize) -> Self {
        Self {
            boundary,
            capacity,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn validate(&self) -> QuadtreeResult<()> {
        if self.capacity == 0 {
            return Err(QuadtreeError::InvalidCapacity(self.capacity));
        }
        if !self.boundary.is_valid() {
            return Err(QuadtreeError::InvalidBoundary);
        }
        Ok(())
    }
}
