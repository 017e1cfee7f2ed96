use crate::{
    event::Event,
    ir::{Instruction, InstructionList, JumpCondition, MethodSignature},
    locator::{select_ordinal, InjectionPoint, InjectionSite},
};

/// Yields a site before each branch instruction, optionally only those with one condition.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeforeJump {
    /// Condition filter
    pub condition: Option<JumpCondition>,
    /// Selects a single occurrence (0-based)
    pub ordinal: Option<usize>,
}

impl BeforeJump {
    /// Every branch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only branches with `condition`.
    #[must_use]
    pub fn with_condition(mut self, condition: JumpCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Restricts the locator to the `ordinal`-th match.
    #[must_use]
    pub fn with_ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = Some(ordinal);
        self
    }
}

impl InjectionPoint for BeforeJump {
    fn name(&self) -> &'static str {
        "BeforeJump"
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
            .filter(|(_, insn)| match insn {
                Instruction::Jump { cond, .. } => self.condition.map_or(true, |c| c == *cond),
                _ => false,
            })
            .map(|(index, _)| index);
        select_ordinal(matches, self.ordinal)
    }
}
