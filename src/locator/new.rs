use crate::{
    event::Event,
    ir::{Instruction, InstructionList, MethodSignature},
    locator::{select_ordinal, InjectionPoint, InjectionSite},
};

/// Yields a site before each allocation of `class`.
#[derive(Debug, Clone)]
pub struct BeforeNew {
    /// Internal name of the allocated type
    pub class: String,
    /// Selects a single occurrence (0-based)
    pub ordinal: Option<usize>,
}

impl BeforeNew {
    /// Every allocation of `class`.
    #[must_use]
    pub fn new(class: &str) -> Self {
        BeforeNew {
            class: class.replace('.', "/"),
            ordinal: None,
        }
    }

    /// Restricts the locator to the `ordinal`-th match.
    #[must_use]
    pub fn with_ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = Some(ordinal);
        self
    }
}

impl InjectionPoint for BeforeNew {
    fn name(&self) -> &'static str {
        "BeforeNew"
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
            .filter(|(_, insn)| matches!(insn, Instruction::New(class) if *class == self.class))
            .map(|(index, _)| index);
        select_ordinal(matches, self.ordinal)
    }
}
