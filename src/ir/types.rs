//! Type and method descriptors for the instruction-sequence model.
//!
//! Method bodies handled by the engine use the compact descriptor grammar of class-file based
//! targets: `I` for `int`, `Ljava/lang/String;` for a reference type, `[J` for a `long` array and
//! `(IZ)V` for a method taking an `int` and a `boolean` and returning nothing. This module provides
//! the typed representation of those descriptors together with a bounds-checked parser and the
//! inverse encoding.
//!
//! # Key Components
//!
//! - [`TypeDesc`] - A single field/parameter/return type
//! - [`ValueKind`] - The computational kind of a value on the operand stack
//! - [`MethodSignature`] - Parameter list and return type of a method
//! - [`DescriptorParser`] - Cursor based descriptor parser
//!
//! # Usage Examples
//!
//! ```rust
//! use eventscope::ir::{MethodSignature, TypeDesc};
//!
//! let signature = MethodSignature::parse("(ILjava/lang/String;[J)Z")?;
//! assert_eq!(signature.params.len(), 3);
//! assert_eq!(signature.ret, TypeDesc::Boolean);
//! assert_eq!(signature.args_size(), 3);
//! assert_eq!(signature.to_string(), "(ILjava/lang/String;[J)Z");
//! # Ok::<(), eventscope::Error>(())
//! ```

use std::fmt;

use strum::Display;

use crate::Result;

/// Maximum number of array dimensions accepted by the parser
const MAX_ARRAY_DIMENSIONS: usize = 255;

/// Internal name of the root reference type.
pub const OBJECT_CLASS: &str = "java/lang/Object";

/// Internal name of the string type.
pub const STRING_CLASS: &str = "java/lang/String";

/// Computational kind of a value on the operand stack or in a local slot.
///
/// `boolean`, `byte`, `char`, `short` and `int` all share the [`ValueKind::Int`] kind, as do
/// their load, store and return instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ValueKind {
    /// 32-bit integer (and all narrower integral types)
    #[strum(serialize = "i")]
    Int,
    /// 64-bit integer
    #[strum(serialize = "l")]
    Long,
    /// 32-bit float
    #[strum(serialize = "f")]
    Float,
    /// 64-bit float
    #[strum(serialize = "d")]
    Double,
    /// Object reference (including arrays and `null`)
    #[strum(serialize = "a")]
    Reference,
}

impl ValueKind {
    /// Number of stack / local slots a value of this kind occupies.
    #[must_use]
    pub const fn slots(self) -> u16 {
        match self {
            ValueKind::Long | ValueKind::Double => 2,
            _ => 1,
        }
    }
}

/// A field, parameter or return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// No value (`V`), only valid as a return type
    Void,
    /// `Z`
    Boolean,
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `S`
    Short,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// `L<internal name>;`
    Object(String),
    /// `[<component>`
    Array(Box<TypeDesc>),
}

impl TypeDesc {
    /// Parses a single type descriptor such as `I` or `Ljava/lang/String;`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the descriptor is invalid or has trailing data.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let mut parser = DescriptorParser::new(descriptor);
        let desc = parser.parse_type()?;
        if parser.has_more_data() {
            return Err(malformed_error!(
                "Trailing data in type descriptor '{}' at {}",
                descriptor,
                parser.pos()
            ));
        }
        Ok(desc)
    }

    /// Creates a reference type, normalising `.` separators to `/`.
    #[must_use]
    pub fn object(internal_name: &str) -> Self {
        TypeDesc::Object(internal_name.replace('.', "/"))
    }

    /// Returns the stack kind of this type, `None` for [`TypeDesc::Void`].
    #[must_use]
    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            TypeDesc::Void => None,
            TypeDesc::Boolean
            | TypeDesc::Byte
            | TypeDesc::Char
            | TypeDesc::Short
            | TypeDesc::Int => Some(ValueKind::Int),
            TypeDesc::Long => Some(ValueKind::Long),
            TypeDesc::Float => Some(ValueKind::Float),
            TypeDesc::Double => Some(ValueKind::Double),
            TypeDesc::Object(_) | TypeDesc::Array(_) => Some(ValueKind::Reference),
        }
    }

    /// Number of slots the type occupies (0 for void, 2 for `long`/`double`).
    #[must_use]
    pub fn slots(&self) -> u16 {
        self.value_kind().map_or(0, ValueKind::slots)
    }

    /// Returns `true` for [`TypeDesc::Void`].
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, TypeDesc::Void)
    }

    /// Returns `true` for object and array types.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeDesc::Object(_) | TypeDesc::Array(_))
    }

    /// The name used by `new` / `checkcast` for this type.
    ///
    /// Objects use their internal name, arrays their full descriptor; primitives have none.
    #[must_use]
    pub fn internal_name(&self) -> Option<String> {
        match self {
            TypeDesc::Object(name) => Some(name.clone()),
            TypeDesc::Array(_) => Some(self.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Void => write!(f, "V"),
            TypeDesc::Boolean => write!(f, "Z"),
            TypeDesc::Byte => write!(f, "B"),
            TypeDesc::Char => write!(f, "C"),
            TypeDesc::Short => write!(f, "S"),
            TypeDesc::Int => write!(f, "I"),
            TypeDesc::Long => write!(f, "J"),
            TypeDesc::Float => write!(f, "F"),
            TypeDesc::Double => write!(f, "D"),
            TypeDesc::Object(name) => write!(f, "L{name};"),
            TypeDesc::Array(component) => write!(f, "[{component}"),
        }
    }
}

/// Upper bound on the parameter slots of a parsed method descriptor.
pub const MAX_PARAMETER_SLOTS: u16 = 255;

/// Parameter list and return type of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    /// Declared parameters, excluding the implicit receiver
    pub params: Vec<TypeDesc>,
    /// Return type
    pub ret: TypeDesc,
}

impl MethodSignature {
    /// Creates a signature from its parts.
    #[must_use]
    pub fn new(params: Vec<TypeDesc>, ret: TypeDesc) -> Self {
        MethodSignature { params, ret }
    }

    /// Parses a method descriptor such as `(ILjava/lang/String;)V`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the descriptor is invalid, declares a `void`
    /// parameter, declares more than [`MAX_PARAMETER_SLOTS`] parameter slots, or has trailing
    /// data.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let mut parser = DescriptorParser::new(descriptor);
        let signature = parser.parse_method()?;
        if parser.has_more_data() {
            return Err(malformed_error!(
                "Trailing data in method descriptor '{}' at {}",
                descriptor,
                parser.pos()
            ));
        }
        Ok(signature)
    }

    /// Total slot size of the declared parameters.
    ///
    /// Parsed descriptors never exceed [`MAX_PARAMETER_SLOTS`]; signatures assembled through
    /// [`MethodSignature::new`] saturate at `u16::MAX`.
    #[must_use]
    pub fn args_size(&self) -> u16 {
        self.params
            .iter()
            .map(TypeDesc::slots)
            .fold(0u16, u16::saturating_add)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for param in &self.params {
            write!(f, "{param}")?;
        }
        write!(f, "){}", self.ret)
    }
}

/// Cursor based parser for type and method descriptors.
///
/// # Example
///
/// ```rust
/// use eventscope::ir::{DescriptorParser, TypeDesc};
///
/// let mut parser = DescriptorParser::new("[[Ljava/util/List;");
/// let desc = parser.parse_type()?;
/// assert!(matches!(desc, TypeDesc::Array(_)));
/// assert!(!parser.has_more_data());
/// # Ok::<(), eventscope::Error>(())
/// ```
pub struct DescriptorParser<'a> {
    data: &'a [u8],
    source: &'a str,
    pos: usize,
}

impl<'a> DescriptorParser<'a> {
    /// Creates a parser positioned at the start of `descriptor`.
    #[must_use]
    pub fn new(descriptor: &'a str) -> Self {
        DescriptorParser {
            data: descriptor.as_bytes(),
            source: descriptor,
            pos: 0,
        }
    }

    /// Current byte position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns `true` if unparsed input remains.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.pos < self.data.len()
    }

    fn next_byte(&mut self) -> Result<u8> {
        let byte = self.data.get(self.pos).copied().ok_or_else(|| {
            malformed_error!("Unexpected end of descriptor '{}'", self.source)
        })?;
        self.pos += 1;
        Ok(byte)
    }

    /// Parses one type descriptor, `V` included.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] on invalid input.
    pub fn parse_type(&mut self) -> Result<TypeDesc> {
        let mut dimensions = 0usize;
        loop {
            let start = self.pos;
            let tag = self.next_byte()?;
            let element = match tag {
                b'V' => TypeDesc::Void,
                b'Z' => TypeDesc::Boolean,
                b'B' => TypeDesc::Byte,
                b'C' => TypeDesc::Char,
                b'S' => TypeDesc::Short,
                b'I' => TypeDesc::Int,
                b'J' => TypeDesc::Long,
                b'F' => TypeDesc::Float,
                b'D' => TypeDesc::Double,
                b'L' => {
                    let rest = &self.data[self.pos..];
                    let end = rest.iter().position(|&b| b == b';').ok_or_else(|| {
                        malformed_error!(
                            "Unterminated class name in '{}' at {}",
                            self.source,
                            start
                        )
                    })?;
                    if end == 0 {
                        return Err(malformed_error!(
                            "Empty class name in '{}' at {}",
                            self.source,
                            start
                        ));
                    }
                    let name = &self.source[self.pos..self.pos + end];
                    self.pos += end + 1;
                    TypeDesc::Object(name.to_string())
                }
                b'[' => {
                    dimensions += 1;
                    if dimensions > MAX_ARRAY_DIMENSIONS {
                        return Err(malformed_error!(
                            "Too many array dimensions in '{}'",
                            self.source
                        ));
                    }
                    continue;
                }
                other => {
                    return Err(malformed_error!(
                        "Invalid descriptor tag '{}' in '{}' at {}",
                        char::from(other),
                        self.source,
                        start
                    ))
                }
            };

            if dimensions > 0 && element.is_void() {
                return Err(malformed_error!("Array of void in '{}'", self.source));
            }

            let mut desc = element;
            for _ in 0..dimensions {
                desc = TypeDesc::Array(Box::new(desc));
            }
            return Ok(desc);
        }
    }

    /// Parses a method descriptor `(<params>)<return>`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] on invalid input.
    pub fn parse_method(&mut self) -> Result<MethodSignature> {
        if self.next_byte()? != b'(' {
            return Err(malformed_error!(
                "Method descriptor '{}' must start with '('",
                self.source
            ));
        }

        let mut params = Vec::new();
        let mut slots = 0u16;
        while self.data.get(self.pos) != Some(&b')') {
            let param = self.parse_type()?;
            if param.is_void() {
                return Err(malformed_error!(
                    "Void parameter in method descriptor '{}'",
                    self.source
                ));
            }
            slots = slots
                .checked_add(param.slots())
                .filter(|total| *total <= MAX_PARAMETER_SLOTS)
                .ok_or_else(|| {
                    malformed_error!(
                        "Method descriptor '{}' exceeds {} parameter slots",
                        self.source,
                        MAX_PARAMETER_SLOTS
                    )
                })?;
            params.push(param);
        }
        self.pos += 1;

        let ret = self.parse_type()?;
        Ok(MethodSignature { params, ret })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_primitives_and_objects() {
        assert_eq!(TypeDesc::parse("I").unwrap(), TypeDesc::Int);
        assert_eq!(TypeDesc::parse("J").unwrap().slots(), 2);
        assert_eq!(
            TypeDesc::parse("Ljava/lang/String;").unwrap(),
            TypeDesc::Object(STRING_CLASS.to_string())
        );
        assert_eq!(
            TypeDesc::parse("[[D").unwrap(),
            TypeDesc::Array(Box::new(TypeDesc::Array(Box::new(TypeDesc::Double))))
        );
    }

    #[test]
    fn parse_method_signature() {
        let sig = MethodSignature::parse("(IJLjava/lang/Object;D)V").unwrap();
        assert_eq!(sig.params.len(), 4);
        assert_eq!(sig.args_size(), 6);
        assert!(sig.ret.is_void());
        assert_eq!(sig.to_string(), "(IJLjava/lang/Object;D)V");
    }

    #[test]
    fn parameter_slots_are_bounded() {
        let longs = |count: usize| format!("({})V", "J".repeat(count));
        let widest = MethodSignature::parse(&longs(127)).unwrap();
        assert_eq!(widest.args_size(), 254);
        assert!(MethodSignature::parse(&format!("({}I)V", "J".repeat(127))).is_ok());

        assert!(MethodSignature::parse(&longs(128)).is_err());
        assert!(MethodSignature::parse(&longs(32768)).is_err());
    }

    #[test]
    fn args_size_saturates_for_built_signatures() {
        let sig = MethodSignature::new(vec![TypeDesc::Long; 40_000], TypeDesc::Void);
        assert_eq!(sig.args_size(), u16::MAX);
    }

    #[test]
    fn parse_empty_parameter_list() {
        let sig = MethodSignature::parse("()Z").unwrap();
        assert!(sig.params.is_empty());
        assert_eq!(sig.ret, TypeDesc::Boolean);
    }

    #[test]
    fn reject_malformed_descriptors() {
        assert!(TypeDesc::parse("").is_err());
        assert!(TypeDesc::parse("Q").is_err());
        assert!(TypeDesc::parse("Ljava/lang/String").is_err());
        assert!(TypeDesc::parse("L;").is_err());
        assert!(TypeDesc::parse("[V").is_err());
        assert!(TypeDesc::parse("II").is_err());
        assert!(MethodSignature::parse("I)V").is_err());
        assert!(MethodSignature::parse("(V)V").is_err());
        assert!(MethodSignature::parse("(I").is_err());
        assert!(MethodSignature::parse("(I)").is_err());
        assert!(MethodSignature::parse("()VV").is_err());
    }

    #[test]
    fn array_dimension_limit() {
        let deep = format!("{}I", "[".repeat(MAX_ARRAY_DIMENSIONS + 1));
        assert!(TypeDesc::parse(&deep).is_err());
        let ok = format!("{}I", "[".repeat(MAX_ARRAY_DIMENSIONS));
        assert!(TypeDesc::parse(&ok).is_ok());
    }

    #[test]
    fn value_kinds() {
        assert_eq!(TypeDesc::Boolean.value_kind(), Some(ValueKind::Int));
        assert_eq!(TypeDesc::Char.value_kind(), Some(ValueKind::Int));
        assert_eq!(TypeDesc::Double.value_kind(), Some(ValueKind::Double));
        assert_eq!(
            TypeDesc::object("java.util.List").value_kind(),
            Some(ValueKind::Reference)
        );
        assert_eq!(TypeDesc::Void.value_kind(), None);
        assert_eq!(TypeDesc::object("a.b.C"), TypeDesc::Object("a/b/C".into()));
    }

    #[test]
    fn internal_names() {
        assert_eq!(
            TypeDesc::object("a/B").internal_name().as_deref(),
            Some("a/B")
        );
        assert_eq!(
            TypeDesc::parse("[La/B;").unwrap().internal_name().as_deref(),
            Some("[La/B;")
        );
        assert!(TypeDesc::Int.internal_name().is_none());
    }
}
