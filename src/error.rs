use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! config_error {
    ($msg:expr) => {
        crate::Error::Configuration($msg.to_string())
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Configuration(format!($fmt, $($arg)*))
    };
}

macro_rules! synthesis_error {
    ($method:expr, $msg:expr) => {
        crate::Error::Synthesis {
            method: $method.to_string(),
            message: $msg.to_string(),
        }
    };

    ($method:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::Synthesis {
            method: $method.to_string(),
            message: format!($fmt, $($arg)*),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Configuration Errors (fatal)
/// - [`Error::Configuration`] - Invalid registration input (empty names, missing aliases, ...)
/// - [`Error::DuplicateEvent`] - An event was redefined with an incompatible cancellable flag
/// - [`Error::UnknownEvent`] - An event handle does not belong to this context
/// - [`Error::EventAlreadyAttached`] - Attach without a preceding detach
/// - [`Error::EventNotAttached`] - Inject/detach on an unattached event
///
/// These indicate a programming mistake in registration code and are never recovered
/// from automatically. See [`Error::is_configuration`].
///
/// ## Structural Errors (fatal for one method only)
/// - [`Error::Synthesis`] - Stack/locals bookkeeping could not be reconciled
/// - [`Error::Malformed`] - A descriptor or instruction sequence is invalid
///
/// ## Emulation Errors
/// - [`Error::Emulation`] - Generic execution failure of the reference interpreter
/// - [`Error::InstructionLimit`] / [`Error::CallDepthLimit`] - Execution limits exceeded
/// - [`Error::StackOverflow`] - A body used more stack than it declared
/// - [`Error::MissingMethod`] - An unguarded call could not be resolved
///
/// # Examples
///
/// ```rust
/// use eventscope::{EngineContext, Error};
///
/// let context = EngineContext::default();
/// context.define_event("onTick", false, 0)?;
///
/// match context.define_event("ONTICK", true, 0) {
///     Err(Error::DuplicateEvent { name, .. }) => assert_eq!(name, "ONTICK"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// # Ok::<(), eventscope::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Input could not be parsed.
    ///
    /// Raised for malformed type or method descriptors and for instruction sequences
    /// whose label structure is broken. Carries the source location where the
    /// malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Registration input is inconsistent.
    #[error("Configuration error - {0}")]
    Configuration(String),

    /// An event name was redefined with a different cancellable flag.
    #[error("Event '{name}' is already defined with cancellable={existing}, requested cancellable={requested}")]
    DuplicateEvent {
        /// The requested event name
        name: String,
        /// Cancellable flag of the existing definition
        existing: bool,
        /// Cancellable flag of the rejected definition
        requested: bool,
    },

    /// The event is not registered in this context.
    #[error("Event '{0}' is not registered")]
    UnknownEvent(String),

    /// The event is still attached to a method body.
    ///
    /// Every attach must be paired with a detach before the event can be attached again.
    #[error("Event '{event}' cannot be attached to {requested}, it is still attached to {attached}")]
    EventAlreadyAttached {
        /// Name of the event
        event: String,
        /// The method the event is currently attached to
        attached: String,
        /// The method that requested the attachment
        requested: String,
    },

    /// The event is not attached (or attached to a different body).
    #[error("Event '{0}' is not attached to the requested method")]
    EventNotAttached(String),

    /// Synthesizing the injected code failed for one method.
    ///
    /// The method is left unmodified. Other methods continue to be processed.
    #[error("Failed to synthesize injection in {method}: {message}")]
    Synthesis {
        /// The method that could not be rewritten
        method: String,
        /// Description of the failure
        message: String,
    },

    /// Generic emulation failure.
    #[error("Emulation - {0}")]
    Emulation(String),

    /// The configured instruction budget was exhausted.
    #[error("Instruction limit of {0} reached")]
    InstructionLimit(u64),

    /// The configured call depth was exceeded.
    #[error("Call depth limit of {0} reached")]
    CallDepthLimit(usize),

    /// A method body pushed more stack slots than it declared.
    #[error("Stack overflow in {method}: depth {depth} exceeds max_stack {max_stack}")]
    StackOverflow {
        /// The offending method
        method: String,
        /// The depth that was reached
        depth: usize,
        /// The declared maximum
        max_stack: u16,
    },

    /// An unguarded call could not be resolved.
    #[error("Unable to resolve {0}")]
    MissingMethod(String),

    /// Failed to lock target.
    #[error("Failed to lock target")]
    LockError,

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns `true` for errors that indicate an inconsistent event model.
    ///
    /// Hosts should refuse to start when one of these surfaces, while any other error
    /// only degrades functionality.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_)
                | Error::DuplicateEvent { .. }
                | Error::UnknownEvent(_)
                | Error::EventAlreadyAttached { .. }
                | Error::EventNotAttached(_)
        )
    }
}
