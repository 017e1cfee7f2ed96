use crate::{
    event::Event,
    ir::{FieldOp, Instruction, InstructionList, MethodSignature},
    locator::{select_ordinal, InjectionPoint, InjectionSite},
};

/// Yields a site before each access to a field.
///
/// `op` restricts the match to one access mode; `None` matches reads and writes alike.
#[derive(Debug, Clone)]
pub struct BeforeFieldAccess {
    /// Internal name of the declaring type
    pub owner: String,
    /// Field name
    pub name: String,
    /// Access mode filter
    pub op: Option<FieldOp>,
    /// Selects a single occurrence (0-based)
    pub ordinal: Option<usize>,
}

impl BeforeFieldAccess {
    /// Every access to `owner.name`.
    #[must_use]
    pub fn new(owner: &str, name: &str) -> Self {
        BeforeFieldAccess {
            owner: owner.replace('.', "/"),
            name: name.to_string(),
            op: None,
            ordinal: None,
        }
    }

    /// Restricts the match to `op`.
    #[must_use]
    pub fn with_op(mut self, op: FieldOp) -> Self {
        self.op = Some(op);
        self
    }

    /// Restricts the locator to the `ordinal`-th match.
    #[must_use]
    pub fn with_ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = Some(ordinal);
        self
    }
}

impl InjectionPoint for BeforeFieldAccess {
    fn name(&self) -> &'static str {
        "BeforeFieldAccess"
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
                Instruction::Field { op, field } => {
                    field.owner == self.owner
                        && field.name == self.name
                        && self.op.map_or(true, |wanted| wanted == *op)
                }
                _ => false,
            })
            .map(|(index, _)| index);
        select_ordinal(matches, self.ordinal)
    }
}
