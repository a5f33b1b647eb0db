use std::fmt;

use serde::{Deserialize, Serialize};

/// Pointer position in overlay coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle drawn by the user, in overlay (display) coordinates.
///
/// Always normalized: `width` and `height` are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SelectionRect {
    /// Build a normalized rectangle from two opposite corners, in any drag direction
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Logical screen area the overlay is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl DisplayGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Selection mapped into captured bitmap pixels, clipped to the bitmap bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SourceRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Opaque selector of a recognition engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(String);

impl BackendId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BackendId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    /// Stays visible until the user acts on it
    Persistent,
}

/// User-facing notification handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Info)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Warning)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_normalized_in_every_direction() {
        let expected = SelectionRect {
            x: 10.0,
            y: 20.0,
            width: 30.0,
            height: 40.0,
        };

        let corners = [
            (Point::new(10.0, 20.0), Point::new(40.0, 60.0)),
            (Point::new(40.0, 60.0), Point::new(10.0, 20.0)),
            (Point::new(40.0, 20.0), Point::new(10.0, 60.0)),
            (Point::new(10.0, 60.0), Point::new(40.0, 20.0)),
        ];

        for (a, b) in corners {
            assert_eq!(SelectionRect::from_corners(a, b), expected);
        }
    }

    #[test]
    fn test_click_is_degenerate() {
        let p = Point::new(5.0, 5.0);
        assert!(SelectionRect::from_corners(p, p).is_degenerate());
        assert!(SelectionRect::from_corners(p, Point::new(50.0, 5.0)).is_degenerate());
    }

    #[test]
    fn test_backend_id_serializes_as_plain_string() {
        let id = BackendId::from("tesseract");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tesseract\"");
    }
}
