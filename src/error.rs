use std::io;

use thiserror::Error;

pub type QuadtreeResult<T> = Result<T, QuadtreeError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuadtreeError {
    #[error("point ({x}, {y}) lies outside the index boundary")]
    OutOfBounds { x: f64, y: f64 },

    #[error("capacity must be a positive integer, got {0}")]
    InvalidCapacity(usize),

    #[error("boundary must have finite edges and a non-negative size")]
    InvalidBoundary,
}

/// Failures of the JSON batch loader and exporter.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of records")]
    NotAnArray,

    #[error("record needs numeric x and y fields")]
    MissingCoordinates,
}

/// Failures parsing a REPL command line.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("expected a number, got {0:?}")]
    InvalidNumber(String),
}
