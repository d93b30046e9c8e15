//! The integer program representation shared by all back ends.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a variable within an [`IlpModel`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct VarId(u32);

impl VarId {
    /// Returns the variable index as a `usize`.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The domain of a variable.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum VarKind {
    /// A 0/1 decision.
    Binary,
    /// An integer in `0..=upper`.
    Integer {
        /// Inclusive upper bound.
        upper: i64,
    },
}

impl VarKind {
    /// Inclusive upper bound of the domain.
    pub fn upper(self) -> i64 {
        match self {
            VarKind::Binary => 1,
            VarKind::Integer { upper } => upper,
        }
    }
}

/// A decision variable with its objective coefficient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Human-readable name, used when dumping a model.
    pub name: String,
    /// Domain of the variable.
    pub kind: VarKind,
    /// Objective coefficient; must be non-negative.
    pub cost: f64,
}

/// The relation of a constraint row.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Sense {
    /// `lhs <= rhs`
    Le,
    /// `lhs == rhs`
    Eq,
    /// `lhs >= rhs`
    Ge,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sense::Le => "<=",
            Sense::Eq => "=",
            Sense::Ge => ">=",
        })
    }
}

/// A linear constraint `sum(coef * var) sense rhs`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Row name.
    pub name: String,
    /// Non-zero terms; a variable appears at most once.
    pub terms: Vec<(VarId, i128)>,
    /// Relation.
    pub sense: Sense,
    /// Right-hand side.
    pub rhs: i128,
}

impl Constraint {
    /// Evaluates the left-hand side under an assignment.
    pub fn activity(&self, values: &[i64]) -> i128 {
        self.terms
            .iter()
            .map(|&(v, a)| a * values[v.index()] as i128)
            .sum()
    }

    /// Returns `true` if the assignment satisfies this row.
    pub fn is_satisfied(&self, values: &[i64]) -> bool {
        let lhs = self.activity(values);
        match self.sense {
            Sense::Le => lhs <= self.rhs,
            Sense::Eq => lhs == self.rhs,
            Sense::Ge => lhs >= self.rhs,
        }
    }
}

/// A minimization problem over bounded non-negative integer variables.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IlpModel {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
}

impl IlpModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binary variable.
    pub fn add_binary(&mut self, name: impl Into<String>, cost: f64) -> VarId {
        self.add_variable(name, VarKind::Binary, cost)
    }

    /// Adds an integer variable in `0..=upper`.
    pub fn add_integer(&mut self, name: impl Into<String>, upper: i64, cost: f64) -> VarId {
        self.add_variable(name, VarKind::Integer { upper: upper.max(0) }, cost)
    }

    fn add_variable(&mut self, name: impl Into<String>, kind: VarKind, cost: f64) -> VarId {
        let id = VarId(self.variables.len() as u32);
        self.variables.push(Variable {
            name: name.into(),
            kind,
            cost: cost.max(0.0),
        });
        id
    }

    /// Adds a constraint row. Zero coefficients are dropped and repeated
    /// variables are merged.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: impl IntoIterator<Item = (VarId, i128)>,
        sense: Sense,
        rhs: i128,
    ) {
        let mut merged: Vec<(VarId, i128)> = Vec::new();
        for (var, coef) in terms {
            match merged.iter_mut().find(|(v, _)| *v == var) {
                Some(entry) => entry.1 += coef,
                None => merged.push((var, coef)),
            }
        }
        merged.retain(|&(_, c)| c != 0);
        self.constraints.push(Constraint {
            name: name.into(),
            terms: merged,
            sense,
            rhs,
        });
    }

    /// All variables in index order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// All constraint rows.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    /// Objective value of an assignment.
    pub fn objective(&self, values: &[i64]) -> f64 {
        self.variables
            .iter()
            .zip(values)
            .map(|(var, &x)| var.cost * x as f64)
            .sum()
    }

    /// Returns `true` if the assignment respects every domain and row.
    pub fn is_feasible(&self, values: &[i64]) -> bool {
        values.len() == self.variables.len()
            && self
                .variables
                .iter()
                .zip(values)
                .all(|(var, &x)| (0..=var.kind.upper()).contains(&x))
            && self.constraints.iter().all(|c| c.is_satisfied(values))
    }
}
