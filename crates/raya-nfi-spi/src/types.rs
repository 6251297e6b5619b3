//! Native scalar type tags
//!
//! The closed, ordered set of primitive native types understood by NFI
//! backends. Consumers size per-type tables with `NativeSimpleType::COUNT`
//! and index them with `ordinal()`.

use std::fmt;

/// Primitive native data type
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NativeSimpleType {
    /// No value
    Void = 0,
    /// Unsigned 8-bit integer
    Uint8,
    /// Signed 8-bit integer
    Sint8,
    /// Unsigned 16-bit integer
    Uint16,
    /// Signed 16-bit integer
    Sint16,
    /// Unsigned 32-bit integer
    Uint32,
    /// Signed 32-bit integer
    Sint32,
    /// Unsigned 64-bit integer
    Uint64,
    /// Signed 64-bit integer
    Sint64,
    /// 32-bit IEEE float
    Float,
    /// 64-bit IEEE float
    Double,
    /// Raw native pointer
    Pointer,
    /// NUL-terminated string, passed as a pointer
    String,
    /// Opaque guest object handle
    Object,
    /// Pointer that may be null, passed through untouched
    Nullable,
}

impl NativeSimpleType {
    /// Number of tags
    pub const COUNT: usize = 15;

    /// Every tag in ordinal order
    pub const ALL: [NativeSimpleType; Self::COUNT] = [
        NativeSimpleType::Void,
        NativeSimpleType::Uint8,
        NativeSimpleType::Sint8,
        NativeSimpleType::Uint16,
        NativeSimpleType::Sint16,
        NativeSimpleType::Uint32,
        NativeSimpleType::Sint32,
        NativeSimpleType::Uint64,
        NativeSimpleType::Sint64,
        NativeSimpleType::Float,
        NativeSimpleType::Double,
        NativeSimpleType::Pointer,
        NativeSimpleType::String,
        NativeSimpleType::Object,
        NativeSimpleType::Nullable,
    ];

    /// Position of this tag in `ALL`
    #[inline]
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Tag for an ordinal, if in range
    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }

    /// Size in bytes of one value of this type
    pub fn size(self) -> usize {
        match self {
            NativeSimpleType::Void => 0,
            NativeSimpleType::Uint8 | NativeSimpleType::Sint8 => 1,
            NativeSimpleType::Uint16 | NativeSimpleType::Sint16 => 2,
            NativeSimpleType::Uint32 | NativeSimpleType::Sint32 | NativeSimpleType::Float => 4,
            NativeSimpleType::Uint64 | NativeSimpleType::Sint64 | NativeSimpleType::Double => 8,
            NativeSimpleType::Pointer
            | NativeSimpleType::String
            | NativeSimpleType::Object
            | NativeSimpleType::Nullable => std::mem::size_of::<usize>(),
        }
    }

    /// Alignment in bytes; `Void` reports 1
    pub fn align(self) -> usize {
        self.size().max(1)
    }

    /// Lowercase name, as written in native signatures
    pub fn name(self) -> &'static str {
        match self {
            NativeSimpleType::Void => "void",
            NativeSimpleType::Uint8 => "uint8",
            NativeSimpleType::Sint8 => "sint8",
            NativeSimpleType::Uint16 => "uint16",
            NativeSimpleType::Sint16 => "sint16",
            NativeSimpleType::Uint32 => "uint32",
            NativeSimpleType::Sint32 => "sint32",
            NativeSimpleType::Uint64 => "uint64",
            NativeSimpleType::Sint64 => "sint64",
            NativeSimpleType::Float => "float",
            NativeSimpleType::Double => "double",
            NativeSimpleType::Pointer => "pointer",
            NativeSimpleType::String => "string",
            NativeSimpleType::Object => "object",
            NativeSimpleType::Nullable => "nullable",
        }
    }
}

impl fmt::Display for NativeSimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_match_all() {
        for (i, tag) in NativeSimpleType::ALL.iter().enumerate() {
            assert_eq!(tag.ordinal(), i);
            assert_eq!(NativeSimpleType::from_ordinal(i), Some(*tag));
        }
        assert_eq!(NativeSimpleType::from_ordinal(NativeSimpleType::COUNT), None);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(NativeSimpleType::Void.size(), 0);
        assert_eq!(NativeSimpleType::Void.align(), 1);
        assert_eq!(NativeSimpleType::Sint16.size(), 2);
        assert_eq!(NativeSimpleType::Float.size(), 4);
        assert_eq!(NativeSimpleType::Double.size(), 8);
        assert_eq!(NativeSimpleType::Pointer.size(), std::mem::size_of::<usize>());
    }

    #[test]
    fn test_display() {
        assert_eq!(NativeSimpleType::Uint32.to_string(), "uint32");
    }
}
