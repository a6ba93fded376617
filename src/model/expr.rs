//! Expression trees for rule and reaction mathematics.
//!
//! Model formulas are built symbolically (`sym("k_fpg") * sym("glp1")`) and
//! resolved against the model's symbol table at compile time, so that
//! evaluation inside the solver right-hand side is a slot lookup rather than
//! a name lookup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::error::DulasimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Func {
    Pow,
    Exp,
    Ln,
    Sqrt,
    Min,
    Max,
    Abs,
}

/// Symbolic expression over model quantities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Num(f64),
    Sym(String),
    Neg(Box<Expr>),
    Binary {
        lhs: Box<Expr>,
        op: BinOp,
        rhs: Box<Expr>,
    },
    Call {
        func: Func,
        args: Vec<Expr>,
    },
}

/// Shorthand for a symbol reference.
pub fn sym(name: impl Into<String>) -> Expr {
    Expr::Sym(name.into())
}

/// Shorthand for a numeric literal.
pub fn num(value: f64) -> Expr {
    Expr::Num(value)
}

impl Expr {
    pub fn pow(self, exponent: impl Into<Expr>) -> Expr {
        Expr::Call {
            func: Func::Pow,
            args: vec![self, exponent.into()],
        }
    }

    pub fn exp(self) -> Expr {
        Expr::Call {
            func: Func::Exp,
            args: vec![self],
        }
    }

    pub fn ln(self) -> Expr {
        Expr::Call {
            func: Func::Ln,
            args: vec![self],
        }
    }

    pub fn min(self, other: impl Into<Expr>) -> Expr {
        Expr::Call {
            func: Func::Min,
            args: vec![self, other.into()],
        }
    }

    pub fn max(self, other: impl Into<Expr>) -> Expr {
        Expr::Call {
            func: Func::Max,
            args: vec![self, other.into()],
        }
    }

    /// All symbol names referenced by this expression.
    pub fn symbols(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Num(_) => {}
            Expr::Sym(name) => out.push(name),
            Expr::Neg(rhs) => rhs.collect_symbols(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_symbols(out);
                rhs.collect_symbols(out);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_symbols(out);
                }
            }
        }
    }

    /// Resolve symbol names to environment slots.
    ///
    /// `context` names the rule or reaction being resolved, for error
    /// reporting only.
    pub fn resolve(
        &self,
        slots: &std::collections::HashMap<String, usize>,
        context: &str,
    ) -> Result<CompiledExpr, DulasimError> {
        match self {
            Expr::Num(v) => Ok(CompiledExpr::Num(*v)),
            Expr::Sym(name) => slots
                .get(name)
                .map(|idx| CompiledExpr::Slot(*idx))
                .ok_or_else(|| DulasimError::UnknownSymbol {
                    symbol: name.clone(),
                    context: context.to_string(),
                }),
            Expr::Neg(rhs) => Ok(CompiledExpr::Neg(Box::new(rhs.resolve(slots, context)?))),
            Expr::Binary { lhs, op, rhs } => Ok(CompiledExpr::Binary {
                lhs: Box::new(lhs.resolve(slots, context)?),
                op: *op,
                rhs: Box::new(rhs.resolve(slots, context)?),
            }),
            Expr::Call { func, args } => Ok(CompiledExpr::Call {
                func: *func,
                args: args
                    .iter()
                    .map(|arg| arg.resolve(slots, context))
                    .collect::<Result<_, _>>()?,
            }),
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Num(value)
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::Sym(name.to_string())
    }
}

macro_rules! impl_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expr>> $trait<R> for Expr {
            type Output = Expr;
            fn $method(self, rhs: R) -> Expr {
                Expr::Binary {
                    lhs: Box::new(self),
                    op: $op,
                    rhs: Box::new(rhs.into()),
                }
            }
        }
    };
}

impl_binop!(Add, add, BinOp::Add);
impl_binop!(Sub, sub, BinOp::Sub);
impl_binop!(Mul, mul, BinOp::Mul);
impl_binop!(Div, div, BinOp::Div);

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(v) => write!(f, "{v}"),
            Expr::Sym(name) => write!(f, "{name}"),
            Expr::Neg(rhs) => write!(f, "-({rhs})"),
            Expr::Binary { lhs, op, rhs } => {
                let op = match op {
                    BinOp::Add => "+",
                    BinOp::Sub => "-",
                    BinOp::Mul => "*",
                    BinOp::Div => "/",
                };
                write!(f, "({lhs} {op} {rhs})")
            }
            Expr::Call { func, args } => {
                let name = match func {
                    Func::Pow => "pow",
                    Func::Exp => "exp",
                    Func::Ln => "ln",
                    Func::Sqrt => "sqrt",
                    Func::Min => "min",
                    Func::Max => "max",
                    Func::Abs => "abs",
                };
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Slot-resolved expression, evaluated against a flat environment vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CompiledExpr {
    Num(f64),
    Slot(usize),
    Neg(Box<CompiledExpr>),
    Binary {
        lhs: Box<CompiledExpr>,
        op: BinOp,
        rhs: Box<CompiledExpr>,
    },
    Call {
        func: Func,
        args: Vec<CompiledExpr>,
    },
}

impl CompiledExpr {
    pub fn eval(&self, env: &[f64]) -> f64 {
        match self {
            CompiledExpr::Num(v) => *v,
            CompiledExpr::Slot(idx) => env[*idx],
            CompiledExpr::Neg(rhs) => -rhs.eval(env),
            CompiledExpr::Binary { lhs, op, rhs } => {
                let a = lhs.eval(env);
                let b = rhs.eval(env);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                }
            }
            CompiledExpr::Call { func, args } => {
                let a = args.first().map(|e| e.eval(env)).unwrap_or(0.0);
                match func {
                    Func::Pow => a.powf(args[1].eval(env)),
                    Func::Exp => a.exp(),
                    Func::Ln => a.ln(),
                    Func::Sqrt => a.sqrt(),
                    Func::Min => a.min(args[1].eval(env)),
                    Func::Max => a.max(args[1].eval(env)),
                    Func::Abs => a.abs(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    fn slots(names: &[&str]) -> HashMap<String, usize> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i))
            .collect()
    }

    #[test]
    fn test_hill_equation() {
        // Emax * D^gamma / (D^gamma + EC50^gamma)
        let e = sym("Emax") * sym("D").pow(sym("gamma"))
            / (sym("D").pow(sym("gamma")) + sym("EC50").pow(sym("gamma")));
        let table = slots(&["Emax", "D", "gamma", "EC50"]);
        let compiled = e.resolve(&table, "hill").unwrap();
        let env = [2.0, 10.0, 1.0, 10.0];
        assert_relative_eq!(compiled.eval(&env), 1.0);
    }

    #[test]
    fn test_unknown_symbol() {
        let e = sym("ka") * sym("A_depot");
        let table = slots(&["ka"]);
        let err = e.resolve(&table, "absorption").unwrap_err();
        assert!(err.to_string().contains("A_depot"));
    }

    #[test]
    fn test_operator_mixing() {
        let e = (num(0.407) * sym("BW0") + num(0.267) * sym("HEIGHT")) - 19.2;
        let table = slots(&["BW0", "HEIGHT"]);
        let compiled = e.resolve(&table, "lbw").unwrap();
        assert_relative_eq!(compiled.eval(&[75.0, 170.0]), 0.407 * 75.0 + 0.267 * 170.0 - 19.2);
    }
}
