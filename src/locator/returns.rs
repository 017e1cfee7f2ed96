use crate::{
    event::Event,
    ir::{InstructionList, MethodSignature},
    locator::{select_ordinal, InjectionPoint, InjectionSite},
};

/// Yields a site immediately before each return instruction.
///
/// With an ordinal only the `ordinal`-th return (0-based, in sequence order) is selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeforeReturn {
    /// Selects a single occurrence
    pub ordinal: Option<usize>,
}

impl BeforeReturn {
    /// Every return.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the `ordinal`-th return.
    #[must_use]
    pub fn nth(ordinal: usize) -> Self {
        BeforeReturn {
            ordinal: Some(ordinal),
        }
    }
}

impl InjectionPoint for BeforeReturn {
    fn name(&self) -> &'static str {
        "BeforeReturn"
    }

    fn find(
        &self,
        _signature: &MethodSignature,
        instructions: &InstructionList,
        _event: &Event,
    ) -> Vec<InjectionSite> {
        let matches = instructions
            .iter()
            .enumerate()
            .filter(|(_, insn)| insn.is_return())
            .map(|(index, _)| index);
        select_ordinal(matches, self.ordinal)
    }
}
