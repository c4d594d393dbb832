//! Compiled expressions
//!
//! A declaration value compiles to a small tree of literals and builtin
//! calls. Evaluation against an [`Environment`] is pure and never fails
//! hard: an error inside a function is logged and the expression yields
//! nothing, so the property falls back to its default.
//!
//! Every node carries a cacheability class describing what the result may
//! depend on; the evaluation driver uses it to decide whether a computed
//! style can be cached.

use tracing::debug;

use crate::environment::Environment;
use crate::functions::Builtin;
use crate::value::Value;

/// How safely an expression result can be cached.
///
/// Ordered from most to least cacheable; combining propagates the least
/// cacheable class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Cacheability {
    /// Depends on nothing outside the expression itself.
    Immutable,
    /// Depends only on the dataset snapshot; stale once the dataset changes.
    Stable,
    /// Depends on per-evaluation context; never cached.
    Volatile,
}

impl Cacheability {
    /// Least-cacheable-wins combination.
    pub fn combine(self, other: Cacheability) -> Cacheability {
        self.max(other)
    }
}

/// A compiled expression tree.
///
/// `cond`, `&&`, `||` and `!` are built in rather than registry functions
/// so that they can short-circuit; everything else dispatches through a
/// [`Builtin`].
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Call {
        builtin: &'static Builtin,
        args: Vec<Expr>,
    },
    Cond {
        condition: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    /// Cacheability of the whole tree: the least cacheable node wins.
    pub fn cacheability(&self) -> Cacheability {
        match self {
            Expr::Literal(_) => Cacheability::Immutable,
            Expr::Call { builtin, args } => args
                .iter()
                .fold(builtin.cacheability, |c, a| c.combine(a.cacheability())),
            Expr::Cond { condition, if_true, if_false } => condition
                .cacheability()
                .combine(if_true.cacheability())
                .combine(if_false.cacheability()),
            Expr::And(children) | Expr::Or(children) => children
                .iter()
                .fold(Cacheability::Immutable, |c, e| c.combine(e.cacheability())),
            Expr::Not(inner) => inner.cacheability(),
        }
    }

    /// Evaluates the expression. `None` means "no value": either a function
    /// legitimately produced nothing (e.g. a missing tag) or evaluation
    /// failed and was logged.
    pub fn eval(&self, env: &Environment) -> Option<Value> {
        match self {
            Expr::Literal(value) => Some(value.clone()),
            Expr::Call { builtin, args } => {
                let args: Vec<Option<Value>> = args.iter().map(|a| a.eval(env)).collect();
                match (builtin.eval)(env, &args) {
                    Ok(value) => value,
                    Err(err) => {
                        debug!(function = builtin.name, %err, "expression evaluation failed");
                        None
                    }
                }
            }
            Expr::Cond { condition, if_true, if_false } => {
                if truthy(condition, env) {
                    if_true.eval(env)
                } else {
                    if_false.eval(env)
                }
            }
            Expr::And(children) => Some(Value::Bool(children.iter().all(|c| truthy(c, env)))),
            Expr::Or(children) => Some(Value::Bool(children.iter().any(|c| truthy(c, env)))),
            Expr::Not(inner) => Some(Value::Bool(!truthy(inner, env))),
        }
    }
}

fn truthy(expr: &Expr, env: &Environment) -> bool {
    expr.eval(env).and_then(|v| v.as_bool()).unwrap_or(false)
}
