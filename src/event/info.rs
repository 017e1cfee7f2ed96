//! The wrapper passed to every dispatch routine.
//!
//! Injected code constructs one wrapper per invocation, carrying the event name, the receiver
//! (or `null` for static methods) and the cancellable flag. Listeners cancel through it and,
//! for non-void methods, store the value the rewritten method returns when cancelled.
//!
//! Void methods use [`EVENT_INFO_CLASS`]; every other return type uses
//! [`RETURN_EVENT_INFO_CLASS`], which adds one typed accessor per return category.

use crate::ir::{MethodRef, MethodSignature, TypeDesc, ValueKind, OBJECT_CLASS, STRING_CLASS};

/// Wrapper type for void methods.
pub const EVENT_INFO_CLASS: &str = "eventscope/event/EventInfo";

/// Wrapper type for methods with a return value.
pub const RETURN_EVENT_INFO_CLASS: &str = "eventscope/event/ReturnEventInfo";

/// Constructor name shared by every type.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Name of the cancellation query.
pub const IS_CANCELLED: &str = "isCancelled";

/// Name of the cancellation request.
pub const CANCEL: &str = "cancel";

/// Name of the generic override accessor.
pub const GET_RETURN_VALUE: &str = "getReturnValue";

/// Name of the override setter (overloaded per type).
pub const SET_RETURN_VALUE: &str = "setReturnValue";

/// The two wrapper types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperType {
    /// Carries cancellation state only
    EventInfo,
    /// Also carries an override return value
    ReturnEventInfo,
}

impl WrapperType {
    /// The wrapper needed by a method returning `ret`.
    #[must_use]
    pub fn for_return(ret: &TypeDesc) -> Self {
        if ret.is_void() {
            WrapperType::EventInfo
        } else {
            WrapperType::ReturnEventInfo
        }
    }

    /// Internal name of the wrapper type.
    #[must_use]
    pub fn class_name(self) -> &'static str {
        match self {
            WrapperType::EventInfo => EVENT_INFO_CLASS,
            WrapperType::ReturnEventInfo => RETURN_EVENT_INFO_CLASS,
        }
    }

    /// Maps an internal name back to a wrapper type.
    #[must_use]
    pub fn from_class_name(name: &str) -> Option<Self> {
        match name {
            EVENT_INFO_CLASS => Some(WrapperType::EventInfo),
            RETURN_EVENT_INFO_CLASS => Some(WrapperType::ReturnEventInfo),
            _ => None,
        }
    }

    /// Reference type of the wrapper.
    #[must_use]
    pub fn type_desc(self) -> TypeDesc {
        TypeDesc::object(self.class_name())
    }

    /// `<init>(String name, Object source, boolean cancellable)`.
    #[must_use]
    pub fn constructor(self) -> MethodRef {
        MethodRef::new(
            self.class_name(),
            CONSTRUCTOR_NAME,
            MethodSignature::new(
                vec![
                    TypeDesc::object(STRING_CLASS),
                    TypeDesc::object(OBJECT_CLASS),
                    TypeDesc::Boolean,
                ],
                TypeDesc::Void,
            ),
        )
    }

    /// `isCancelled()Z`.
    #[must_use]
    pub fn is_cancelled(self) -> MethodRef {
        MethodRef::new(
            self.class_name(),
            IS_CANCELLED,
            MethodSignature::new(Vec::new(), TypeDesc::Boolean),
        )
    }

    /// `cancel()V`.
    #[must_use]
    pub fn cancel(self) -> MethodRef {
        MethodRef::new(
            self.class_name(),
            CANCEL,
            MethodSignature::new(Vec::new(), TypeDesc::Void),
        )
    }
}

/// How the override value of a cancelled wrapper is read back for one return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnAccessor {
    /// The accessor on [`RETURN_EVENT_INFO_CLASS`]
    pub method: MethodRef,
    /// Narrowing cast applied to the generic reference accessor
    pub cast: Option<String>,
    /// Kind of the final return instruction
    pub kind: ValueKind,
}

/// Accessor name for a primitive return type, e.g. `getReturnValueJ` for `long`.
#[must_use]
pub fn typed_accessor_name(ret: &TypeDesc) -> Option<String> {
    match ret {
        TypeDesc::Void | TypeDesc::Object(_) | TypeDesc::Array(_) => None,
        primitive => Some(format!("{GET_RETURN_VALUE}{primitive}")),
    }
}

/// The accessor used to return the override value from a method returning `ret`.
///
/// Primitive categories each have their own accessor; reference types share the generic
/// `getReturnValue()Ljava/lang/Object;` followed by a cast. Void methods have none.
#[must_use]
pub fn return_accessor(ret: &TypeDesc) -> Option<ReturnAccessor> {
    let kind = ret.value_kind()?;
    if ret.is_reference() {
        return Some(ReturnAccessor {
            method: MethodRef::new(
                RETURN_EVENT_INFO_CLASS,
                GET_RETURN_VALUE,
                MethodSignature::new(Vec::new(), TypeDesc::object(OBJECT_CLASS)),
            ),
            cast: ret.internal_name().filter(|name| name != OBJECT_CLASS),
            kind,
        });
    }
    let name = typed_accessor_name(ret)?;
    Some(ReturnAccessor {
        method: MethodRef::new(
            RETURN_EVENT_INFO_CLASS,
            &name,
            MethodSignature::new(Vec::new(), ret.clone()),
        ),
        cast: None,
        kind,
    })
}
