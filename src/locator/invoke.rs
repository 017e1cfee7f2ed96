use crate::{
    descriptor::MethodDescriptor,
    event::Event,
    ir::{Constant, Instruction, InstructionList, MethodSignature},
    locator::{select_ordinal, InjectionPoint, InjectionSite},
};

/// Yields a site immediately before each call to `target`.
///
/// A call matches if its method reference equals any alias of the descriptor, whatever the
/// dispatch kind. Guarded calls are generated code and never match.
#[derive(Debug, Clone)]
pub struct BeforeCall {
    /// The callee
    pub target: MethodDescriptor,
    /// Selects a single occurrence (0-based) among the matching calls
    pub ordinal: Option<usize>,
}

impl BeforeCall {
    /// Every call to `target`.
    #[must_use]
    pub fn new(target: MethodDescriptor) -> Self {
        BeforeCall {
            target,
            ordinal: None,
        }
    }

    /// Only the `ordinal`-th call to `target`.
    #[must_use]
    pub fn nth(target: MethodDescriptor, ordinal: usize) -> Self {
        BeforeCall {
            target,
            ordinal: Some(ordinal),
        }
    }

    fn is_target(&self, insn: &Instruction) -> bool {
        matches!(insn, Instruction::Call { method, .. } if self.target.matches_ref(method))
    }
}

impl InjectionPoint for BeforeCall {
    fn name(&self) -> &'static str {
        "BeforeCall"
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
            .filter(|(_, insn)| self.is_target(insn))
            .map(|(index, _)| index);
        select_ordinal(matches, self.ordinal)
    }
}

/// Yields a site before each call to `target` whose preceding instruction pushes `constant`.
///
/// Used to tell apart calls that only differ in a literal argument, such as the section name
/// passed to a profiler. Label pseudo-instructions between the constant and the call are
/// skipped.
#[derive(Debug, Clone)]
pub struct BeforeCallWithConstant {
    /// The callee
    pub target: MethodDescriptor,
    /// The constant that must be pushed right before the call
    pub constant: Constant,
    /// Selects a single occurrence (0-based) among the matching calls
    pub ordinal: Option<usize>,
}

impl BeforeCallWithConstant {
    /// Every call to `target` directly preceded by `constant`.
    #[must_use]
    pub fn new(target: MethodDescriptor, constant: Constant) -> Self {
        BeforeCallWithConstant {
            target,
            constant,
            ordinal: None,
        }
    }

    /// Restricts the locator to the `ordinal`-th match.
    #[must_use]
    pub fn with_ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    fn preceded_by_constant(&self, insns: &[Instruction], index: usize) -> bool {
        insns[..index]
            .iter()
            .rev()
            .find(|insn| !matches!(insn, Instruction::Label(_)))
            .is_some_and(|insn| matches!(insn, Instruction::Const(c) if *c == self.constant))
    }
}

impl InjectionPoint for BeforeCallWithConstant {
    fn name(&self) -> &'static str {
        "BeforeCallWithConstant"
    }

    fn find(
        &self,
        _signature: &MethodSignature,
        instructions: &InstructionList,
        _event: &Event,
    ) -> Vec<InjectionSite> {
        let insns = instructions.as_slice();
        let matches = insns
            .iter()
            .enumerate()
            .filter(|(index, insn)| {
                matches!(insn, Instruction::Call { method, .. } if self.target.matches_ref(method))
                    && self.preceded_by_constant(insns, *index)
            })
            .map(|(index, _)| index);
        select_ordinal(matches, self.ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{CallKind, LabelId},
        test::{event, signature, static_call},
    };

    fn descriptor() -> MethodDescriptor {
        MethodDescriptor::builder()
            .alias(
                crate::descriptor::NamingEpoch::Deobfuscated,
                "game/Profiler",
                "startSection",
                "(Ljava/lang/String;)V",
            )
            .unwrap()
            .alias(
                crate::descriptor::NamingEpoch::Obfuscated,
                "mt",
                "a",
                "(Ljava/lang/String;)V",
            )
            .unwrap()
            .build()
            .unwrap()
    }

    fn sections() -> InstructionList {
        InstructionList::from(vec![
            Instruction::Const(Constant::String("root".into())),
            static_call("mt", "a", "(Ljava/lang/String;)V"),
            Instruction::Const(Constant::String("terrain".into())),
            Instruction::Label(LabelId(0)),
            static_call("game/Profiler", "startSection", "(Ljava/lang/String;)V"),
            Instruction::Const(Constant::String("root".into())),
            static_call("game/Profiler", "other", "(Ljava/lang/String;)V"),
            Instruction::Return(None),
        ])
    }

    #[test]
    fn matches_calls_by_any_alias() {
        let sites = BeforeCall::new(descriptor()).find(&signature("()V"), &sections(), &event("e"));
        assert_eq!(
            sites,
            vec![InjectionSite::before(1), InjectionSite::before(4)]
        );
    }

    #[test]
    fn second_of_three_calls() {
        let g = MethodDescriptor::new("a/B", "g", "()V").unwrap();
        let list = InstructionList::from(vec![
            static_call("a/B", "g", "()V"),
            Instruction::Nop,
            static_call("a/B", "g", "()V"),
            static_call("a/B", "h", "()V"),
            static_call("a/B", "g", "()V"),
            Instruction::Return(None),
        ]);
        let sites = BeforeCall::nth(g, 1).find(&signature("()V"), &list, &event("e"));
        assert_eq!(sites, vec![InjectionSite::before(2)]);
    }

    #[test]
    fn ignores_receiver_kind() {
        let g = MethodDescriptor::new("a/B", "g", "()V").unwrap();
        let list = InstructionList::from(vec![
            Instruction::Load {
                kind: crate::ir::ValueKind::Reference,
                index: 0,
            },
            Instruction::Call {
                kind: CallKind::Virtual,
                method: crate::ir::MethodRef::parse("a/B", "g", "()V").unwrap(),
            },
            Instruction::Return(None),
        ]);
        assert_eq!(
            BeforeCall::new(g).find(&signature("()V"), &list, &event("e")),
            vec![InjectionSite::before(1)]
        );
    }

    #[test]
    fn constant_disambiguates_calls() {
        let locator =
            BeforeCallWithConstant::new(descriptor(), Constant::String("terrain".into()));
        let sites = locator.find(&signature("()V"), &sections(), &event("e"));
        assert_eq!(sites, vec![InjectionSite::before(4)]);

        let root = BeforeCallWithConstant::new(descriptor(), Constant::String("root".into()));
        assert_eq!(
            root.find(&signature("()V"), &sections(), &event("e")),
            vec![InjectionSite::before(1)]
        );
        assert!(root
            .with_ordinal(1)
            .find(&signature("()V"), &sections(), &event("e"))
            .is_empty());
    }
}
