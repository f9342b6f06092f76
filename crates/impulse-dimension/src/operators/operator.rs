// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Operator: a blend of two dimensions of one numeric type under an arithmetic op.

use crate::dimension::{Dimension, DimensionOptions};
use crate::operators::blend::{self, Blended};
use impulse_engine::{Engine, Potential};
use std::ops::{Add, Div, Mul, Sub};

pub trait Arithmetic:
    Copy + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Div<Output = Self> + Send + Sync + 'static
{
}

impl<T> Arithmetic for T where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<Output = T> + Div<Output = T> + Send + Sync + 'static
{
}

/// Arithmetic applied to operands `a` and `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    /// `a + b`
    Add,
    /// `b - a`
    Subtract,
    /// `a * b`
    Multiply,
    /// `b / a`
    Divide,
}

impl ArithmeticOp {
    pub fn apply<T: Arithmetic>(self, a: T, b: T) -> T {
        match self {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Subtract => b - a,
            ArithmeticOp::Multiply => a * b,
            ArithmeticOp::Divide => b / a,
        }
    }
}

pub type Operation<T> = Blended<T, T, T>;

/// Integer division by a zero `a` faults the firing, which the engine contains.
pub fn operate<T, SA, SB, P>(
    engine: &Engine,
    options: &DimensionOptions,
    a: &Dimension<T, SA>,
    b: &Dimension<T, SB>,
    op: ArithmeticOp,
    potential: P,
) -> Dimension<Operation<T>>
where
    T: Arithmetic,
    SA: Send + 'static,
    SB: Send + 'static,
    P: Potential + 'static,
{
    blend::wire(engine, options, "operator", a, b, move |x: &T, y: &T| op.apply(*x, *y), potential)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::testing::{engine_at, wait_until};
    use impulse_engine::always;
    use std::time::Duration;

    #[test]
    fn test_apply() {
        assert_eq!(ArithmeticOp::Add.apply(4, 10), 14);
        assert_eq!(ArithmeticOp::Subtract.apply(4, 10), 6);
        assert_eq!(ArithmeticOp::Multiply.apply(4, 10), 40);
        assert_eq!(ArithmeticOp::Divide.apply(4.0, 10.0), 2.5);
    }

    #[test]
    fn test_subtract_keeps_operands() {
        let engine = engine_at(500.0);
        let options = DimensionOptions::new(Duration::from_secs(5));
        let a: Dimension<i64> = Dimension::new(&engine, &options);
        let b: Dimension<i64> = Dimension::new(&engine, &options);
        let a_sample = a.recorder().emit(4);
        let b_sample = b.recorder().emit(10);

        let difference = operate(&engine, &options, &a, &b, ArithmeticOp::Subtract, always());
        assert!(difference.name().starts_with("operator-"));

        engine.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || difference.current().is_some()));
        engine.stop();
        assert!(engine.join(Duration::from_secs(5)));

        let output = difference.current().unwrap().value;
        assert_eq!(output.value, 6);
        assert_eq!(output.a, a_sample);
        assert_eq!(output.b, b_sample);
    }
}
