//! A depth-first branch-and-bound back end.
//!
//! Each search node holds the current `[lo, hi]` domain of every variable.
//! Nodes are tightened by bound propagation over all rows until a fixpoint,
//! then pruned against the incumbent with a lower bound that distributes
//! each variable's cost over the set-partition rows it covers. Branching
//! prefers the unsatisfied partition row with the fewest candidates (one
//! child per candidate set to 1) and otherwise splits the first unfixed
//! variable into `x = lo` and `x >= lo + 1`.

use crate::backend::{IlpBackend, IlpSolution, SolveStatus};
use crate::model::{IlpModel, Sense, VarKind};
use std::time::{Duration, Instant};

const EPS: f64 = 1e-9;

/// The built-in branch-and-bound solver.
#[derive(Debug, Clone, Default)]
pub struct BranchAndBound {
    node_limit: Option<u64>,
}

impl BranchAndBound {
    /// Creates a solver bounded only by the timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the search after `limit` nodes, as if the timeout had fired.
    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.node_limit = Some(limit);
        self
    }
}

type Domains = Vec<(i64, i64)>;

/// One domain restriction applied to produce a child node.
#[derive(Clone, Copy, Debug)]
struct Fix {
    var: usize,
    lo: i64,
    hi: i64,
}

struct Frame {
    domains: Domains,
    choices: Vec<Fix>,
    next: usize,
}

/// Per-model data derived once before the search.
struct Prepared<'m> {
    model: &'m IlpModel,
    /// Rows of the form `sum(x) = 1` over binaries.
    partition_rows: Vec<usize>,
    /// For each variable, how many partition rows it appears in.
    partition_share: Vec<u32>,
}

impl<'m> Prepared<'m> {
    fn new(model: &'m IlpModel) -> Self {
        let mut partition_rows = Vec::new();
        let mut partition_share = vec![0u32; model.num_vars()];
        for (idx, row) in model.constraints().iter().enumerate() {
            let is_partition = row.sense == Sense::Eq
                && row.rhs == 1
                && !row.terms.is_empty()
                && row.terms.iter().all(|&(v, a)| {
                    a == 1 && model.variables()[v.index()].kind == VarKind::Binary
                });
            if is_partition {
                partition_rows.push(idx);
                for &(v, _) in &row.terms {
                    partition_share[v.index()] += 1;
                }
            }
        }
        Self {
            model,
            partition_rows,
            partition_share,
        }
    }

    fn root(&self) -> Domains {
        self.model
            .variables()
            .iter()
            .map(|v| (0, v.kind.upper()))
            .collect()
    }

    /// Tightens domains to a fixpoint. Returns `false` if some row can no
    /// longer be satisfied.
    fn propagate(&self, dom: &mut Domains) -> bool {
        loop {
            let mut changed = false;
            for row in self.model.constraints() {
                let (mut min_act, mut max_act) = (0i128, 0i128);
                for &(v, a) in &row.terms {
                    let (lo, hi) = dom[v.index()];
                    if a > 0 {
                        min_act += a * lo as i128;
                        max_act += a * hi as i128;
                    } else {
                        min_act += a * hi as i128;
                        max_act += a * lo as i128;
                    }
                }
                if matches!(row.sense, Sense::Le | Sense::Eq) {
                    if min_act > row.rhs {
                        return false;
                    }
                    let slack = row.rhs - min_act;
                    for &(v, a) in &row.terms {
                        let (lo, hi) = dom[v.index()];
                        if a > 0 {
                            let cap = lo as i128 + slack / a;
                            if cap < hi as i128 {
                                dom[v.index()].1 = cap as i64;
                                changed = true;
                            }
                        } else {
                            let floor = hi as i128 - slack / -a;
                            if floor > lo as i128 {
                                dom[v.index()].0 = floor as i64;
                                changed = true;
                            }
                        }
                    }
                }
                if matches!(row.sense, Sense::Ge | Sense::Eq) {
                    if max_act < row.rhs {
                        return false;
                    }
                    let slack = max_act - row.rhs;
                    for &(v, a) in &row.terms {
                        let (lo, hi) = dom[v.index()];
                        if a > 0 {
                            let floor = hi as i128 - slack / a;
                            if floor > lo as i128 {
                                dom[v.index()].0 = floor as i64;
                                changed = true;
                            }
                        } else {
                            let cap = lo as i128 + slack / -a;
                            if cap < hi as i128 {
                                dom[v.index()].1 = cap as i64;
                                changed = true;
                            }
                        }
                    }
                }
            }
            if dom.iter().any(|&(lo, hi)| lo > hi) {
                return false;
            }
            if !changed {
                return true;
            }
        }
    }

    fn partition_row_satisfied(&self, row: usize, dom: &Domains) -> bool {
        self.model.constraints()[row]
            .terms
            .iter()
            .any(|&(v, _)| dom[v.index()].0 == 1)
    }

    fn lower_bound(&self, dom: &Domains) -> f64 {
        let vars = self.model.variables();
        let mut bound: f64 = vars
            .iter()
            .zip(dom)
            .map(|(var, &(lo, _))| var.cost * lo as f64)
            .sum();
        for &row in &self.partition_rows {
            if self.partition_row_satisfied(row, dom) {
                continue;
            }
            let cheapest = self.model.constraints()[row]
                .terms
                .iter()
                .filter(|&&(v, _)| dom[v.index()].1 == 1)
                .map(|&(v, _)| vars[v.index()].cost / self.partition_share[v.index()] as f64)
                .fold(f64::INFINITY, f64::min);
            bound += cheapest;
        }
        bound
    }

    fn branch(&self, dom: &Domains) -> Vec<Fix> {
        let vars = self.model.variables();
        let mut best_row: Option<(usize, Vec<usize>)> = None;
        for &row in &self.partition_rows {
            if self.partition_row_satisfied(row, dom) {
                continue;
            }
            let free: Vec<usize> = self.model.constraints()[row]
                .terms
                .iter()
                .map(|&(v, _)| v.index())
                .filter(|&v| dom[v] == (0, 1))
                .collect();
            if best_row.as_ref().map_or(true, |(_, b)| free.len() < b.len()) {
                best_row = Some((row, free));
            }
        }
        if let Some((_, mut free)) = best_row {
            free.sort_by(|&a, &b| {
                let ca = vars[a].cost / self.partition_share[a].max(1) as f64;
                let cb = vars[b].cost / self.partition_share[b].max(1) as f64;
                ca.total_cmp(&cb).then(a.cmp(&b))
            });
            return free
                .into_iter()
                .map(|var| Fix { var, lo: 1, hi: 1 })
                .collect();
        }
        match dom.iter().position(|&(lo, hi)| lo < hi) {
            Some(var) => {
                let (lo, hi) = dom[var];
                vec![
                    Fix { var, lo, hi: lo },
                    Fix {
                        var,
                        lo: lo + 1,
                        hi,
                    },
                ]
            }
            None => Vec::new(),
        }
    }
}

impl IlpBackend for BranchAndBound {
    fn name(&self) -> &str {
        "branch-and-bound"
    }

    fn solve(
        &self,
        model: &IlpModel,
        timeout: Duration,
        warm_start: Option<&[i64]>,
    ) -> IlpSolution {
        let start = Instant::now();
        let prepared = Prepared::new(model);

        let mut best: Option<(f64, Vec<i64>)> = warm_start
            .filter(|values| model.is_feasible(values))
            .map(|values| (model.objective(values), values.to_vec()));

        let mut nodes = 0u64;
        let mut interrupted = false;
        let mut stack: Vec<Frame> = Vec::new();

        let mut root = prepared.root();
        if prepared.propagate(&mut root) {
            expand(&prepared, root, &mut best, &mut stack, &mut nodes);
        }

        loop {
            let Some(frame) = stack.last_mut() else {
                break;
            };
            if frame.next == frame.choices.len() {
                stack.pop();
                continue;
            }
            let over_nodes = self.node_limit.is_some_and(|limit| nodes >= limit);
            if over_nodes || start.elapsed() >= timeout {
                interrupted = true;
                break;
            }
            let fix = frame.choices[frame.next];
            frame.next += 1;
            let mut child = frame.domains.clone();
            let (lo, hi) = child[fix.var];
            child[fix.var] = (lo.max(fix.lo), hi.min(fix.hi));
            if prepared.propagate(&mut child) {
                expand(&prepared, child, &mut best, &mut stack, &mut nodes);
            }
        }

        match best {
            Some((objective, values)) => IlpSolution {
                status: if interrupted {
                    SolveStatus::Feasible
                } else {
                    SolveStatus::Optimal
                },
                values,
                objective,
                nodes,
            },
            None if interrupted => IlpSolution::without_solution(SolveStatus::TimedOut, nodes),
            None => IlpSolution::without_solution(SolveStatus::Infeasible, nodes),
        }
    }
}

/// Evaluates a propagated node: records it as the incumbent if it is a leaf,
/// otherwise pushes its children unless the bound prunes it.
fn expand(
    prepared: &Prepared<'_>,
    domains: Domains,
    best: &mut Option<(f64, Vec<i64>)>,
    stack: &mut Vec<Frame>,
    nodes: &mut u64,
) {
    *nodes += 1;
    let bound = prepared.lower_bound(&domains);
    if let Some((incumbent, _)) = best {
        if bound >= *incumbent - EPS {
            return;
        }
    }
    let choices = prepared.branch(&domains);
    if choices.is_empty() {
        let values: Vec<i64> = domains.iter().map(|&(lo, _)| lo).collect();
        let objective = prepared.model.objective(&values);
        if best.as_ref().map_or(true, |(b, _)| objective < *b - EPS) {
            *best = Some((objective, values));
        }
        return;
    }
    stack.push(Frame {
        domains,
        choices,
        next: 0,
    });
}
