//! Value Types
//!
//! Every port carries a fixed [`ValueType`]. Two ports can be connected only
//! when their types match exactly; there is no implicit conversion.
//!
//! A port's current value lives in an `Option<Value>` slot. An empty slot
//! means "no data yet" (never evaluated, or the edge that fed it was removed).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The kind of data a port can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// A single floating point number.
    Numeric,

    /// A single-channel image buffer.
    Image,

    /// Carries nothing. A `None` port never holds a value.
    None,
}

impl ValueType {
    /// Whether a port of this type may be connected to a port of `other`.
    pub fn is_compatible(self, other: ValueType) -> bool {
        self == other
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Numeric => "numeric",
            ValueType::Image => "image",
            ValueType::None => "none",
        };
        f.write_str(name)
    }
}

/// Whether a port consumes or produces data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// A single-channel image.
///
/// Pixel storage is shared, so copying an image value along fan-out edges
/// does not duplicate the buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Arc<[f32]>,
}

impl Image {
    /// Create an image from row-major samples.
    ///
    /// Returns `None` if `pixels.len()` is not `width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<f32>) -> Option<Self> {
        let expected = (width as usize).checked_mul(height as usize)?;
        if pixels.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// An image with every sample set to `fill`.
    ///
    /// Returns `None` if `width * height` does not fit in `usize`.
    pub fn filled(width: u32, height: u32, fill: f32) -> Option<Self> {
        let len = (width as usize).checked_mul(height as usize)?;
        Some(Self {
            width,
            height,
            pixels: vec![fill; len].into(),
        })
    }

    /// Width in samples.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in samples.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major sample buffer.
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Sample at `(x, y)`, or `None` when out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

/// A value held in a port slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Numeric(f64),
    Image(Image),
}

impl Value {
    /// The type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Numeric(_) => ValueType::Numeric,
            Value::Image(_) => ValueType::Image,
        }
    }

    /// The number held, if this is a numeric value.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    /// The image held, if this is an image value.
    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Value::Image(image) => Some(image),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Numeric(n)
    }
}

impl From<Image> for Value {
    fn from(image: Image) -> Self {
        Value::Image(image)
    }
}
