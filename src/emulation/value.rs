//! Runtime values of the reference interpreter.

use std::fmt;

use crate::ir::{Constant, TypeDesc, ValueKind};

/// Handle of an object on the [`crate::emulation::ManagedHeap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapRef(pub(crate) u32);

impl HeapRef {
    /// Creates a handle from a raw id.
    #[must_use]
    pub fn new(id: u32) -> Self {
        HeapRef(id)
    }

    /// The raw id.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A value on the operand stack or in a local.
///
/// Narrow integral types (`boolean`, `byte`, `char`, `short`) are widened to [`EmValue::Int`]
/// exactly like their load and return instructions are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmValue {
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// The null reference
    Null,
    /// A heap object
    Ref(HeapRef),
}

impl EmValue {
    /// Boolean as pushed by `iconst_0` / `iconst_1`.
    #[must_use]
    pub fn from_bool(value: bool) -> Self {
        EmValue::Int(i32::from(value))
    }

    /// The computational kind of the value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            EmValue::Int(_) => ValueKind::Int,
            EmValue::Long(_) => ValueKind::Long,
            EmValue::Float(_) => ValueKind::Float,
            EmValue::Double(_) => ValueKind::Double,
            EmValue::Null | EmValue::Ref(_) => ValueKind::Reference,
        }
    }

    /// The zero value of `kind`.
    #[must_use]
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Int => EmValue::Int(0),
            ValueKind::Long => EmValue::Long(0),
            ValueKind::Float => EmValue::Float(0.0),
            ValueKind::Double => EmValue::Double(0.0),
            ValueKind::Reference => EmValue::Null,
        }
    }

    /// The zero value of a declared type, `None` for `void`.
    #[must_use]
    pub fn default_for_type(desc: &TypeDesc) -> Option<Self> {
        desc.value_kind().map(Self::default_for)
    }

    /// Converts a non-string constant.
    #[must_use]
    pub fn from_constant(constant: &Constant) -> Option<Self> {
        match constant {
            Constant::Null => Some(EmValue::Null),
            Constant::Int(v) => Some(EmValue::Int(*v)),
            Constant::Long(v) => Some(EmValue::Long(*v)),
            Constant::Float(v) => Some(EmValue::Float(*v)),
            Constant::Double(v) => Some(EmValue::Double(*v)),
            Constant::String(_) => None,
        }
    }

    /// The integer payload.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            EmValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The long payload.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            EmValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// The float payload.
    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            EmValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The double payload.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            EmValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer payload interpreted as a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_i32().map(|v| v != 0)
    }

    /// The referenced object, `None` for null and primitives.
    #[must_use]
    pub fn as_heap_ref(&self) -> Option<HeapRef> {
        match self {
            EmValue::Ref(r) => Some(*r),
            _ => None,
        }
    }

    /// Returns `true` for the null reference.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, EmValue::Null)
    }
}

impl fmt::Display for EmValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmValue::Int(v) => write!(f, "{v}"),
            EmValue::Long(v) => write!(f, "{v}L"),
            EmValue::Float(v) => write!(f, "{v}F"),
            EmValue::Double(v) => write!(f, "{v}D"),
            EmValue::Null => write!(f, "null"),
            EmValue::Ref(r) => write!(f, "{r}"),
        }
    }
}
