use crate::{
    event::Event,
    ir::{InstructionList, MethodSignature},
    locator::{normalize, InjectionPoint, InjectionSite, Placement},
};

/// Moves every site of an inner locator to one side of its matched instruction.
///
/// `Shift::after(BeforeCall::new(..))` injects right after the call returns.
#[derive(Debug)]
pub struct Shift<L> {
    /// The wrapped locator
    pub inner: L,
    /// Side of the matched instruction to move to
    pub placement: Placement,
}

impl<L: InjectionPoint> Shift<L> {
    /// Moves the sites of `inner` after their matched instruction.
    #[must_use]
    pub fn after(inner: L) -> Self {
        Shift {
            inner,
            placement: Placement::After,
        }
    }

    /// Moves the sites of `inner` before their matched instruction.
    #[must_use]
    pub fn before(inner: L) -> Self {
        Shift {
            inner,
            placement: Placement::Before,
        }
    }
}

impl<L: InjectionPoint> InjectionPoint for Shift<L> {
    fn name(&self) -> &'static str {
        "Shift"
    }

    fn find(
        &self,
        signature: &MethodSignature,
        instructions: &InstructionList,
        event: &Event,
    ) -> Vec<InjectionSite> {
        normalize(
            self.inner
                .find(signature, instructions, event)
                .into_iter()
                .map(|site| InjectionSite {
                    index: site.index,
                    placement: self.placement,
                })
                .collect(),
        )
    }
}
