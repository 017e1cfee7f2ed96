//! Method descriptors carrying one alias per naming epoch.

use std::fmt;

use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    ir::{MethodBody, MethodRef, MethodSignature},
    Result,
};

/// One of the parallel symbol-naming schemes of the host program.
///
/// Releases of the host rename its symbols; the same method is known under a readable name, an
/// intermediate (stable across releases) name and the obfuscated name of the shipped binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
pub enum NamingEpoch {
    /// Readable, development-time names
    Deobfuscated,
    /// Stable intermediate names
    Intermediate,
    /// Names of the shipped binary
    Obfuscated,
}

impl NamingEpoch {
    /// Position of the epoch in alias arrays.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            NamingEpoch::Deobfuscated => 0,
            NamingEpoch::Intermediate => 1,
            NamingEpoch::Obfuscated => 2,
        }
    }

    /// The default resolution order, obfuscated names first.
    #[must_use]
    pub fn default_order() -> Vec<NamingEpoch> {
        vec![
            NamingEpoch::Obfuscated,
            NamingEpoch::Intermediate,
            NamingEpoch::Deobfuscated,
        ]
    }
}

/// The identity of a method under one naming epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodAlias {
    /// Internal name of the declaring type
    pub owner: String,
    /// Method name
    pub name: String,
    /// Signature, expressed with this epoch's type names
    pub signature: MethodSignature,
}

impl MethodAlias {
    /// Returns `true` if this alias names `method`.
    #[must_use]
    pub fn matches_ref(&self, method: &MethodRef) -> bool {
        self.owner == method.owner && self.name == method.name && self.signature == method.signature
    }

    /// Returns `true` if this alias names `body`.
    #[must_use]
    pub fn matches_body(&self, body: &MethodBody) -> bool {
        self.owner == body.owner && self.name == body.name && self.signature == body.signature
    }
}

impl fmt::Display for MethodAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.signature)
    }
}

/// Identifies a target method across every known naming epoch.
///
/// A descriptor matches a method if any of its aliases does. Descriptors are immutable once
/// built.
///
/// # Example
///
/// ```rust
/// use eventscope::descriptor::{MethodDescriptor, NamingEpoch};
///
/// let start_game = MethodDescriptor::builder()
///     .alias(NamingEpoch::Deobfuscated, "net/minecraft/client/Minecraft", "startGame", "()V")?
///     .alias(NamingEpoch::Obfuscated, "bao", "aj", "()V")?
///     .build()?;
///
/// assert!(start_game.alias(NamingEpoch::Obfuscated).is_some());
/// assert!(start_game.alias(NamingEpoch::Intermediate).is_none());
/// # Ok::<(), eventscope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    aliases: [Option<MethodAlias>; NamingEpoch::COUNT],
}

impl MethodDescriptor {
    /// Starts building a descriptor.
    #[must_use]
    pub fn builder() -> MethodDescriptorBuilder {
        MethodDescriptorBuilder::default()
    }

    /// Shorthand for a descriptor known under a single, deobfuscated name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `descriptor` is invalid.
    pub fn new(owner: &str, name: &str, descriptor: &str) -> Result<Self> {
        Self::builder()
            .alias(NamingEpoch::Deobfuscated, owner, name, descriptor)?
            .build()
    }

    /// The alias for `epoch`, if known.
    #[must_use]
    pub fn alias(&self, epoch: NamingEpoch) -> Option<&MethodAlias> {
        self.aliases[epoch.index()].as_ref()
    }

    /// Iterates the known aliases in epoch declaration order.
    pub fn aliases(&self) -> impl Iterator<Item = (NamingEpoch, &MethodAlias)> {
        NamingEpoch::iter().filter_map(|epoch| self.alias(epoch).map(|alias| (epoch, alias)))
    }

    /// The first alias in declaration order, used for display purposes.
    #[must_use]
    pub fn primary(&self) -> Option<&MethodAlias> {
        self.aliases.iter().flatten().next()
    }

    /// Returns the first epoch in `order` whose alias names `body`.
    #[must_use]
    pub fn resolve_body(&self, body: &MethodBody, order: &[NamingEpoch]) -> Option<NamingEpoch> {
        order.iter().copied().find(|epoch| {
            self.alias(*epoch)
                .is_some_and(|alias| alias.matches_body(body))
        })
    }

    /// Returns `true` if any alias names `method`.
    #[must_use]
    pub fn matches_ref(&self, method: &MethodRef) -> bool {
        self.aliases
            .iter()
            .flatten()
            .any(|alias| alias.matches_ref(method))
    }

    /// Returns `true` if any alias is declared by `owner`.
    #[must_use]
    pub fn has_owner(&self, owner: &str) -> bool {
        self.aliases.iter().flatten().any(|alias| alias.owner == owner)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.primary() {
            Some(alias) => write!(f, "{alias}"),
            None => write!(f, "<empty descriptor>"),
        }
    }
}

/// Builder for [`MethodDescriptor`].
#[derive(Debug, Default)]
pub struct MethodDescriptorBuilder {
    aliases: [Option<MethodAlias>; NamingEpoch::COUNT],
}

impl MethodDescriptorBuilder {
    /// Sets the alias for `epoch`. Owner names may use `.` or `/` separators.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `descriptor` is invalid, and
    /// [`crate::Error::Configuration`] if `owner` or `name` is empty.
    pub fn alias(
        mut self,
        epoch: NamingEpoch,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<Self> {
        if owner.is_empty() || name.is_empty() {
            return Err(config_error!(
                "Alias for epoch {} needs an owner and a name",
                epoch
            ));
        }
        self.aliases[epoch.index()] = Some(MethodAlias {
            owner: owner.replace('.', "/"),
            name: name.to_string(),
            signature: MethodSignature::parse(descriptor)?,
        });
        Ok(self)
    }

    /// Finishes the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if no alias was given.
    pub fn build(self) -> Result<MethodDescriptor> {
        if self.aliases.iter().all(Option::is_none) {
            return Err(config_error!("A method descriptor needs at least one alias"));
        }
        Ok(MethodDescriptor {
            aliases: self.aliases,
        })
    }
}
