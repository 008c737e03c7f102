//! Rule combinators for composing rules.

use barstream_core::num::Num;
use barstream_core::traits::IndicatorId;

use crate::rule::{Rule, RuleContext};

fn merged(mut a: Vec<IndicatorId>, b: Vec<IndicatorId>) -> Vec<IndicatorId> {
    for id in b {
        if !a.contains(&id) {
            a.push(id);
        }
    }
    a
}

/// AND combinator - both rules must be satisfied.
#[derive(Debug, Clone)]
pub struct And<A, B>(pub A, pub B);

impl<N: Num, A: Rule<N>, B: Rule<N>> Rule<N> for And<A, B> {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        self.0.is_satisfied(ctx) && self.1.is_satisfied(ctx)
    }

    fn dependencies(&self) -> Vec<IndicatorId> {
        merged(self.0.dependencies(), self.1.dependencies())
    }
}

/// OR combinator - either rule must be satisfied.
#[derive(Debug, Clone)]
pub struct Or<A, B>(pub A, pub B);

impl<N: Num, A: Rule<N>, B: Rule<N>> Rule<N> for Or<A, B> {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        self.0.is_satisfied(ctx) || self.1.is_satisfied(ctx)
    }

    fn dependencies(&self) -> Vec<IndicatorId> {
        merged(self.0.dependencies(), self.1.dependencies())
    }
}

/// XOR combinator - exactly one rule must be satisfied.
#[derive(Debug, Clone)]
pub struct Xor<A, B>(pub A, pub B);

impl<N: Num, A: Rule<N>, B: Rule<N>> Rule<N> for Xor<A, B> {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        self.0.is_satisfied(ctx) != self.1.is_satisfied(ctx)
    }

    fn dependencies(&self) -> Vec<IndicatorId> {
        merged(self.0.dependencies(), self.1.dependencies())
    }
}

/// NOT combinator - negates the rule.
#[derive(Debug, Clone)]
pub struct Not<A>(pub A);

impl<N: Num, A: Rule<N>> Rule<N> for Not<A> {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        !self.0.is_satisfied(ctx)
    }

    fn dependencies(&self) -> Vec<IndicatorId> {
        self.0.dependencies()
    }
}

/// Builder methods for chaining rules.
pub trait RuleExt: Sized {
    fn and<R>(self, other: R) -> And<Self, R> {
        And(self, other)
    }

    fn or<R>(self, other: R) -> Or<Self, R> {
        Or(self, other)
    }

    fn xor<R>(self, other: R) -> Xor<Self, R> {
        Xor(self, other)
    }

    fn negate(self) -> Not<Self> {
        Not(self)
    }
}

/// Implement [`RuleExt`] for rule types.
#[macro_export]
macro_rules! impl_rule_ext {
    ($($ty:ident $(<$($param:ident),+>)?),+ $(,)?) => {
        $(impl$(<$($param),+>)? $crate::combinators::RuleExt for $ty$(<$($param),+>)? {})+
    };
}

impl_rule_ext!(And<A, B>, Or<A, B>, Xor<A, B>, Not<A>);

impl<R: ?Sized> RuleExt for Box<R> {}
