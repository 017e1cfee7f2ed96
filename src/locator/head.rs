use crate::{
    event::Event,
    ir::{InstructionList, MethodSignature},
    locator::{InjectionPoint, InjectionSite},
};

/// Yields exactly one site, before the first instruction of the body.
///
/// Branches back to the first label of the body do not pass through code injected here.
#[derive(Debug, Clone, Copy, Default)]
pub struct Head;

impl InjectionPoint for Head {
    fn name(&self) -> &'static str {
        "Head"
    }

    fn find(
        &self,
        _signature: &MethodSignature,
        _instructions: &InstructionList,
        _event: &Event,
    ) -> Vec<InjectionSite> {
        vec![InjectionSite::before(0)]
    }
}
