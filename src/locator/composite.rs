use std::collections::BTreeSet;

use crate::{
    event::Event,
    ir::{InstructionList, MethodSignature},
    locator::{InjectionPoint, InjectionSite},
};

/// Sites yielded by every inner locator.
///
/// An empty `And` yields nothing.
#[derive(Debug, Default)]
pub struct And(pub Vec<Box<dyn InjectionPoint>>);

impl And {
    /// Combines `locators`.
    #[must_use]
    pub fn new(locators: Vec<Box<dyn InjectionPoint>>) -> Self {
        And(locators)
    }
}

impl InjectionPoint for And {
    fn name(&self) -> &'static str {
        "And"
    }

    fn find(
        &self,
        signature: &MethodSignature,
        instructions: &InstructionList,
        event: &Event,
    ) -> Vec<InjectionSite> {
        let mut locators = self.0.iter();
        let Some(first) = locators.next() else {
            return Vec::new();
        };
        let mut sites: BTreeSet<InjectionSite> =
            first.find(signature, instructions, event).into_iter().collect();
        for locator in locators {
            let other: BTreeSet<InjectionSite> =
                locator.find(signature, instructions, event).into_iter().collect();
            sites.retain(|site| other.contains(site));
        }
        sites.into_iter().collect()
    }
}

/// Sites yielded by any inner locator.
#[derive(Debug, Default)]
pub struct Or(pub Vec<Box<dyn InjectionPoint>>);

impl Or {
    /// Combines `locators`.
    #[must_use]
    pub fn new(locators: Vec<Box<dyn InjectionPoint>>) -> Self {
        Or(locators)
    }
}

impl InjectionPoint for Or {
    fn name(&self) -> &'static str {
        "Or"
    }

    fn find(
        &self,
        signature: &MethodSignature,
        instructions: &InstructionList,
        event: &Event,
    ) -> Vec<InjectionSite> {
        self.0
            .iter()
            .flat_map(|locator| locator.find(signature, instructions, event))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptor::MethodDescriptor,
        ir::Instruction,
        locator::{BeforeCall, BeforeReturn, Head},
        test::{event, signature, static_call},
    };

    fn list() -> InstructionList {
        InstructionList::from(vec![
            static_call("a/B", "g", "()V"),
            static_call("a/B", "h", "()V"),
            Instruction::Return(None),
        ])
    }

    fn call(name: &str) -> Box<dyn InjectionPoint> {
        Box::new(BeforeCall::new(
            MethodDescriptor::new("a/B", name, "()V").unwrap(),
        ))
    }

    #[test]
    fn or_is_sorted_union() {
        let or = Or::new(vec![Box::new(BeforeReturn::new()), call("h"), Box::new(Head)]);
        assert_eq!(
            or.find(&signature("()V"), &list(), &event("e")),
            vec![
                InjectionSite::before(0),
                InjectionSite::before(1),
                InjectionSite::before(2)
            ]
        );
    }

    #[test]
    fn and_is_intersection() {
        let and = And::new(vec![Box::new(Head), call("g")]);
        assert_eq!(
            and.find(&signature("()V"), &list(), &event("e")),
            vec![InjectionSite::before(0)]
        );
        let disjoint = And::new(vec![Box::new(Head), call("h")]);
        assert!(disjoint
            .find(&signature("()V"), &list(), &event("e"))
            .is_empty());
        assert!(And::default()
            .find(&signature("()V"), &list(), &event("e"))
            .is_empty());
    }
}
