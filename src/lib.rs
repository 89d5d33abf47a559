//! A point quadtree for 2D points carrying arbitrary attributes.
//!
//! Supports rectangular range queries, branch-and-bound nearest-neighbour
//! search and filtering by attribute value. Points are stored in an index
//! arena; nodes refer to them by [`PointId`].
//!
//! ```
//! use point_quadtree::{Point, Quadtree, Rectangle};
//!
//! let mut qt = Quadtree::new(Rectangle::new(500.0, 500.0, 1000.0, 1000.0), 4);
//! qt.insert(Point::new(100.0, 100.0).with_attribute("category", "Restaurant"));
//! qt.insert(Point::new(200.0, 200.0).with_attribute("category", "Hospital"));
//! assert!(!qt.insert(Point::new(1200.0, 10.0)));
//!
//! let near = qt.nearest_neighbor(&Point::new(180.0, 180.0)).unwrap();
//! assert_eq!((near.x, near.y), (200.0, 200.0));
//! assert_eq!(qt.count_by_attribute("category", "Restaurant"), 1);
//! ```

mod attribute;
mod config;
mod error;
mod geometry;
mod list;
mod quadtree;

pub mod command;
pub mod records;

/// Receives the nodes and points of a [`Quadtree`] during
/// [`Quadtree::traverse`], e.g. to draw node outlines.
pub trait QuadtreeVisitor {
    fn point(&mut self, _id: PointId, _point: &Point) {}
    fn leaf(&mut self, depth: u8, boundary: &Rectangle, len: usize);
    fn branch(&mut self, depth: u8, boundary: &Rectangle);
}

pub use attribute::*;
pub use config::*;
pub use error::*;
pub use geometry::*;
pub use quadtree::*;
