//! Injection-point search strategies.
//!
//! Locators scan an [`InstructionList`] and report where an event should be injected, without
//! relying on fixed offsets: the code of the host program changes between releases, so sites
//! are described by what the surrounding instructions do (the first instruction, each return,
//! a call to a given method, ...).
//!
//! Every locator takes the sequence by shared reference and can therefore never mutate it.
//! Locators are independent of method resolution and can be tested against synthetic
//! sequences.
//!
//! # Key Components
//!
//! - [`InjectionPoint`] - The locator trait
//! - [`InjectionSite`] / [`Placement`] - A located site and its side of the matched instruction
//! - [`Head`], [`BeforeReturn`], [`BeforeCall`], [`BeforeCallWithConstant`] - Core strategies
//! - [`BeforeFieldAccess`], [`BeforeNew`], [`BeforeJump`] - Additional strategies
//! - [`Shift`], [`And`], [`Or`] - Combinators
//!
//! # Usage Examples
//!
//! ```rust
//! use eventscope::descriptor::MethodDescriptor;
//! use eventscope::event::Event;
//! use eventscope::ir::{CallKind, Constant, Instruction, InstructionList, MethodRef, MethodSignature};
//! use eventscope::locator::{BeforeCall, InjectionPoint, Placement, Shift};
//!
//! let render = MethodRef::parse("game/Renderer", "render", "(F)V")?;
//! let list = InstructionList::from(vec![
//!     Instruction::Const(Constant::Float(1.0)),
//!     Instruction::Call { kind: CallKind::Static, method: render.clone() },
//!     Instruction::Return(None),
//! ]);
//!
//! let locator = Shift::after(BeforeCall::new(MethodDescriptor::new(
//!     "game/Renderer",
//!     "render",
//!     "(F)V",
//! )?));
//! let event = Event::new("onRender", false, 0, 0);
//! let sites = locator.find(&MethodSignature::parse("()V")?, &list, &event);
//!
//! assert_eq!(sites.len(), 1);
//! assert_eq!(sites[0].placement, Placement::After);
//! assert_eq!(sites[0].insertion_index(), 2);
//! # Ok::<(), eventscope::Error>(())
//! ```

use std::fmt;

use crate::{
    event::Event,
    ir::{InstructionList, MethodSignature},
};

mod composite;
mod field;
mod head;
mod invoke;
mod jump;
mod new;
mod returns;
mod shift;

pub use composite::{And, Or};
pub use field::BeforeFieldAccess;
pub use head::Head;
pub use invoke::{BeforeCall, BeforeCallWithConstant};
pub use jump::BeforeJump;
pub use new::BeforeNew;
pub use returns::BeforeReturn;
pub use shift::Shift;

/// Side of the matched instruction at which code is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Placement {
    /// Immediately before the matched instruction
    Before,
    /// Immediately after the matched instruction
    After,
}

/// A located insertion point inside one instruction sequence.
///
/// Sites order by matched instruction first, then by placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InjectionSite {
    /// Index of the matched instruction
    pub index: usize,
    /// Side of the matched instruction
    pub placement: Placement,
}

impl InjectionSite {
    /// A site immediately before instruction `index`.
    #[must_use]
    pub fn before(index: usize) -> Self {
        InjectionSite {
            index,
            placement: Placement::Before,
        }
    }

    /// A site immediately after instruction `index`.
    #[must_use]
    pub fn after(index: usize) -> Self {
        InjectionSite {
            index,
            placement: Placement::After,
        }
    }

    /// Position at which the synthesized instructions are spliced in.
    #[must_use]
    pub fn insertion_index(&self) -> usize {
        match self.placement {
            Placement::Before => self.index,
            Placement::After => self.index + 1,
        }
    }
}

impl fmt::Display for InjectionSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.placement {
            Placement::Before => write!(f, "before #{}", self.index),
            Placement::After => write!(f, "after #{}", self.index),
        }
    }
}

/// A strategy that finds injection sites in an instruction sequence.
///
/// `find` must return its sites sorted and without duplicates; [`normalize`] does both.
/// Implementations are pure: the same inputs always yield the same sites.
pub trait InjectionPoint: Send + Sync + fmt::Debug {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Finds every site in `instructions`, the body of a method with `signature`, at which
    /// `event` should be injected.
    fn find(
        &self,
        signature: &MethodSignature,
        instructions: &InstructionList,
        event: &Event,
    ) -> Vec<InjectionSite>;
}

impl<T: InjectionPoint + ?Sized> InjectionPoint for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn find(
        &self,
        signature: &MethodSignature,
        instructions: &InstructionList,
        event: &Event,
    ) -> Vec<InjectionSite> {
        (**self).find(signature, instructions, event)
    }
}

/// Sorts `sites` and removes duplicates.
#[must_use]
pub fn normalize(mut sites: Vec<InjectionSite>) -> Vec<InjectionSite> {
    sites.sort_unstable();
    sites.dedup();
    sites
}

/// Turns the matching instruction indices into `Before` sites, keeping only the `ordinal`-th
/// (0-based) match when an ordinal is given.
pub(crate) fn select_ordinal<I>(matches: I, ordinal: Option<usize>) -> Vec<InjectionSite>
where
    I: IntoIterator<Item = usize>,
{
    let mut matches = matches.into_iter();
    match ordinal {
        Some(ordinal) => matches.nth(ordinal).map(InjectionSite::before).into_iter().collect(),
        None => matches.map(InjectionSite::before).collect(),
    }
}
