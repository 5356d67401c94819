//! Accessor component types and attribute shapes.
//!
//! This module provides the numeric vocabulary of glTF accessors: the six
//! component types identified by their GL enum codes, the seven attribute
//! shapes, and the [`Component`] trait used by the converters to read one
//! little-endian component out of a byte window.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use num_traits::{Bounded, ToPrimitive};

/// Component type of an accessor.
///
/// The discriminants are the GL enum values used by the `componentType`
/// field of a glTF accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ComponentType {
    /// 8-bit signed integer (`BYTE`)
    Int8 = 5120,
    /// 8-bit unsigned integer (`UNSIGNED_BYTE`)
    UInt8 = 5121,
    /// 16-bit signed integer (`SHORT`)
    Int16 = 5122,
    /// 16-bit unsigned integer (`UNSIGNED_SHORT`)
    UInt16 = 5123,
    /// 32-bit unsigned integer (`UNSIGNED_INT`)
    UInt32 = 5125,
    /// 32-bit floating point number (`FLOAT`)
    Float32 = 5126,
}

impl ComponentType {
    /// Maps a GL enum code to a component type.
    ///
    /// # Examples
    /// ```
    /// use glb_core::component_type::ComponentType;
    /// assert_eq!(ComponentType::from_gl(5123), Some(ComponentType::UInt16));
    /// assert_eq!(ComponentType::from_gl(5124), None); // INT is not a glTF type
    /// ```
    pub const fn from_gl(code: u32) -> Option<Self> {
        match code {
            5120 => Some(ComponentType::Int8),
            5121 => Some(ComponentType::UInt8),
            5122 => Some(ComponentType::Int16),
            5123 => Some(ComponentType::UInt16),
            5125 => Some(ComponentType::UInt32),
            5126 => Some(ComponentType::Float32),
            _ => None,
        }
    }

    /// Returns the GL enum code of this component type.
    pub const fn gl_code(self) -> u32 {
        self as u32
    }

    /// Returns the size of one component in bytes.
    pub const fn size(self) -> usize {
        match self {
            ComponentType::Int8 | ComponentType::UInt8 => 1,
            ComponentType::Int16 | ComponentType::UInt16 => 2,
            ComponentType::UInt32 | ComponentType::Float32 => 4,
        }
    }

    /// Returns the name of this component type as a string
    pub const fn name(self) -> &'static str {
        match self {
            ComponentType::Int8 => "int8",
            ComponentType::UInt8 => "uint8",
            ComponentType::Int16 => "int16",
            ComponentType::UInt16 => "uint16",
            ComponentType::UInt32 => "uint32",
            ComponentType::Float32 => "float32",
        }
    }

    /// Returns true for every integer component type.
    pub const fn is_integral(self) -> bool {
        !matches!(self, ComponentType::Float32)
    }

    /// Returns true if this is a signed integer type
    pub const fn is_signed_integer(self) -> bool {
        matches!(self, ComponentType::Int8 | ComponentType::Int16)
    }

    /// Returns true if this is an unsigned integer type
    pub const fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            ComponentType::UInt8 | ComponentType::UInt16 | ComponentType::UInt32
        )
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Element shape of an accessor (`SCALAR`, `VEC2`, ..., `MAT4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeShape {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl AttributeShape {
    /// Parses the `type` string of a glTF accessor.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SCALAR" => Some(AttributeShape::Scalar),
            "VEC2" => Some(AttributeShape::Vec2),
            "VEC3" => Some(AttributeShape::Vec3),
            "VEC4" => Some(AttributeShape::Vec4),
            "MAT2" => Some(AttributeShape::Mat2),
            "MAT3" => Some(AttributeShape::Mat3),
            "MAT4" => Some(AttributeShape::Mat4),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            AttributeShape::Scalar => "SCALAR",
            AttributeShape::Vec2 => "VEC2",
            AttributeShape::Vec3 => "VEC3",
            AttributeShape::Vec4 => "VEC4",
            AttributeShape::Mat2 => "MAT2",
            AttributeShape::Mat3 => "MAT3",
            AttributeShape::Mat4 => "MAT4",
        }
    }

    /// Number of components in one element.
    pub const fn num_components(self) -> usize {
        match self {
            AttributeShape::Scalar => 1,
            AttributeShape::Vec2 => 2,
            AttributeShape::Vec3 => 3,
            AttributeShape::Vec4 | AttributeShape::Mat2 => 4,
            AttributeShape::Mat3 => 9,
            AttributeShape::Mat4 => 16,
        }
    }

    pub const fn is_matrix(self) -> bool {
        matches!(
            self,
            AttributeShape::Mat2 | AttributeShape::Mat3 | AttributeShape::Mat4
        )
    }
}

impl fmt::Display for AttributeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Size in bytes of one element of `shape` made of `component_type` values.
pub const fn element_size(shape: AttributeShape, component_type: ComponentType) -> usize {
    shape.num_components() * component_type.size()
}

// =============================================================================
// Component reading
// =============================================================================

/// A numeric type that can appear as an accessor component.
///
/// Implemented for the Rust counterpart of each [`ComponentType`]. The
/// converters are generic over this trait so every table cell gets its own
/// monomorphized routine.
pub trait Component: Copy + Bounded + ToPrimitive + Send + Sync + 'static {
    const TYPE: ComponentType;

    /// Reads one value from the first `TYPE.size()` bytes of `bytes`.
    fn read_le(bytes: &[u8]) -> Self;

    /// Value cast to `f32` without rescaling.
    #[inline]
    fn to_f32_lossy(self) -> f32 {
        self.to_f32().unwrap_or(0.0)
    }

    /// Normalized value: `v / MAX` for unsigned types, `max(v / MAX, -1)` for
    /// signed types.
    #[inline]
    fn normalized(self) -> f32 {
        let max = Self::max_value().to_f32_lossy();
        let value = self.to_f32_lossy() / max;
        if Self::TYPE.is_signed_integer() {
            value.clamp(-1.0, 1.0)
        } else {
            value
        }
    }
}

impl Component for i8 {
    const TYPE: ComponentType = ComponentType::Int8;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }
}

impl Component for u8 {
    const TYPE: ComponentType = ComponentType::UInt8;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl Component for i16 {
    const TYPE: ComponentType = ComponentType::Int16;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_i16(bytes)
    }
}

impl Component for u16 {
    const TYPE: ComponentType = ComponentType::UInt16;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_u16(bytes)
    }
}

impl Component for u32 {
    const TYPE: ComponentType = ComponentType::UInt32;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_u32(bytes)
    }
}

impl Component for f32 {
    const TYPE: ComponentType = ComponentType::Float32;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_f32(bytes)
    }

    #[inline]
    fn normalized(self) -> f32 {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gl_codes_roundtrip() {
        for ct in [
            ComponentType::Int8,
            ComponentType::UInt8,
            ComponentType::Int16,
            ComponentType::UInt16,
            ComponentType::UInt32,
            ComponentType::Float32,
        ] {
            assert_eq!(ComponentType::from_gl(ct.gl_code()), Some(ct));
        }
        assert_eq!(ComponentType::from_gl(5124), None);
        assert_eq!(ComponentType::from_gl(0), None);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(ComponentType::Int8.size(), 1);
        assert_eq!(ComponentType::UInt16.size(), 2);
        assert_eq!(ComponentType::Float32.size(), 4);
        assert_eq!(element_size(AttributeShape::Vec3, ComponentType::UInt16), 6);
        assert_eq!(element_size(AttributeShape::Mat4, ComponentType::Float32), 64);
        assert_eq!(AttributeShape::Mat2.num_components(), 4);
        assert_eq!(AttributeShape::Mat3.num_components(), 9);
    }

    #[test]
    fn test_shape_names() {
        assert_eq!(AttributeShape::from_name("VEC4"), Some(AttributeShape::Vec4));
        assert_eq!(AttributeShape::from_name("vec4"), None);
        assert_eq!(AttributeShape::Mat3.to_string(), "MAT3");
    }

    #[test]
    fn test_normalized_extremes() {
        assert_eq!(i8::MIN.normalized(), -1.0);
        assert_eq!(i8::MAX.normalized(), 1.0);
        assert_eq!(u8::MIN.normalized(), 0.0);
        assert_eq!(u8::MAX.normalized(), 1.0);
        assert_eq!(i16::MIN.normalized(), -1.0);
        assert_eq!(u16::MAX.normalized(), 1.0);
        assert_eq!(0.25f32.normalized(), 0.25);
    }

    #[test]
    fn test_read_le() {
        assert_eq!(u16::read_le(&[0x34, 0x12]), 0x1234);
        assert_eq!(i16::read_le(&[0xFF, 0xFF]), -1);
        assert_eq!(i8::read_le(&[0x80]), -128);
        assert_eq!(u32::read_le(&[1, 0, 0, 0]), 1);
        assert_eq!(f32::read_le(&1.5f32.to_le_bytes()), 1.5);
    }
}
