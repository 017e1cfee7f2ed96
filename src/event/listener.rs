use std::fmt;

use crate::{
    ir::{MethodSignature, TypeDesc},
    Result,
};

/// An external callback invoked when an event fires.
///
/// Without an explicit signature the listener is assumed to accept exactly what its dispatch
/// routine receives: the wrapper followed by every argument of the instrumented method.
///
/// # Example
///
/// ```rust
/// use eventscope::event::ListenerRef;
///
/// let listener = ListenerRef::parse("mods.example.Hooks.onTick")?;
/// assert_eq!(listener.owner, "mods/example/Hooks");
/// assert_eq!(listener.method, "onTick");
/// assert!(listener.signature.is_none());
/// # Ok::<(), eventscope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerRef {
    /// Internal name of the declaring type
    pub owner: String,
    /// Method name
    pub method: String,
    /// Explicit signature, inferred from the dispatch routine when absent
    pub signature: Option<MethodSignature>,
}

impl ListenerRef {
    /// Creates a listener with an inferred signature.
    #[must_use]
    pub fn new(owner: &str, method: &str) -> Self {
        ListenerRef {
            owner: owner.replace('.', "/"),
            method: method.to_string(),
            signature: None,
        }
    }

    /// Parses `owner.method`, the owner in dotted or slashed form.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if either part is empty.
    pub fn parse(qualified: &str) -> Result<Self> {
        match qualified.rsplit_once('.') {
            Some((owner, method)) if !owner.is_empty() && !method.is_empty() => {
                Ok(ListenerRef::new(owner, method))
            }
            _ => Err(config_error!(
                "Listener '{}' must have the form owner.method",
                qualified
            )),
        }
    }

    /// Sets an explicit signature.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `descriptor` is invalid.
    pub fn with_signature(mut self, descriptor: &str) -> Result<Self> {
        self.signature = Some(MethodSignature::parse(descriptor)?);
        Ok(self)
    }

    /// The signature to call this listener with from a routine with signature `routine`.
    ///
    /// Returns `None` if the explicit signature does not fit: a listener must return `void` and
    /// accept a prefix of the routine's parameters.
    #[must_use]
    pub fn resolve(&self, routine: &MethodSignature) -> Option<MethodSignature> {
        match &self.signature {
            None => Some(MethodSignature::new(routine.params.clone(), TypeDesc::Void)),
            Some(explicit) => {
                let fits =
                    explicit.ret.is_void() && routine.params.starts_with(&explicit.params);
                fits.then(|| explicit.clone())
            }
        }
    }
}

impl fmt::Display for ListenerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.method)?;
        if let Some(signature) = &self.signature {
            write!(f, "{signature}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routine() -> MethodSignature {
        MethodSignature::parse("(Leventscope/event/EventInfo;IJ)V").unwrap()
    }

    #[test]
    fn inferred_signature_mirrors_routine() {
        let listener = ListenerRef::new("a.Hooks", "onTick");
        assert_eq!(listener.resolve(&routine()), Some(routine()));
        assert_eq!(listener.to_string(), "a/Hooks.onTick");
    }

    #[test]
    fn explicit_prefix_is_accepted() {
        let listener = ListenerRef::new("a/Hooks", "onTick")
            .with_signature("(Leventscope/event/EventInfo;)V")
            .unwrap();
        assert!(listener.resolve(&routine()).is_some());
    }

    #[test]
    fn incompatible_signatures_are_rejected() {
        let returns = ListenerRef::new("a/Hooks", "onTick")
            .with_signature("(Leventscope/event/EventInfo;)Z")
            .unwrap();
        assert!(returns.resolve(&routine()).is_none());

        let wrong_param = ListenerRef::new("a/Hooks", "onTick")
            .with_signature("(Leventscope/event/EventInfo;J)V")
            .unwrap();
        assert!(wrong_param.resolve(&routine()).is_none());

        let too_long = ListenerRef::new("a/Hooks", "onTick")
            .with_signature("(Leventscope/event/EventInfo;IJI)V")
            .unwrap();
        assert!(too_long.resolve(&routine()).is_none());
    }

    #[test]
    fn parse_requires_both_parts() {
        assert!(ListenerRef::parse("onTick").is_err());
        assert!(ListenerRef::parse("a.").is_err());
        assert_eq!(
            ListenerRef::parse("a/b/Hooks.onTick").unwrap().owner,
            "a/b/Hooks"
        );
    }
}
