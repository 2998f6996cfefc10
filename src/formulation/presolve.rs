//! Bound propagation over the pure-binary rows of a model.
//!
//! Binaries are fixed whenever a row leaves them a single value. When a row
//! can no longer be satisfied, the rows responsible for the fixings are
//! collected and shrunk with a deletion filter until every remaining row is
//! needed: an irreducible infeasible subsystem for this propagation.

use std::collections::{BTreeSet, HashMap};

use super::linear::{Milp, Sense};

const EPS: f64 = 1e-9;

/// `Σ coef · var <= rhs`, tagged with the constraint it comes from.
struct Row<'a> {
    source: usize,
    terms: Vec<(&'a str, f64)>,
    rhs: f64,
}

fn rows<'a>(milp: &'a Milp, subset: &[usize]) -> Vec<Row<'a>> {
    let mut rows = vec![];
    for &source in subset {
        let c = &milp.constraints[source];
        if !c.quad.is_empty() || !c.expr.terms.keys().all(|n| milp.binaries.contains(n)) {
            continue;
        }
        let terms: Vec<(&str, f64)> = c.expr.terms.iter().map(|(n, a)| (n.as_str(), *a)).collect();
        let rhs = c.rhs - c.expr.constant;
        if matches!(c.sense, Sense::Le | Sense::Eq) {
            rows.push(Row { source, terms: terms.clone(), rhs });
        }
        if matches!(c.sense, Sense::Ge | Sense::Eq) {
            rows.push(Row { source, terms: terms.iter().map(|&(n, a)| (n, -a)).collect(), rhs: -rhs });
        }
    }
    rows
}

/// Propagates the rows of `subset` and returns the rows involved in the first
/// row found unsatisfiable.
fn propagate(milp: &Milp, subset: &[usize]) -> Option<BTreeSet<usize>> {
    let rows = rows(milp, subset);
    // var -> (value, index of the row that fixed it)
    let mut fixed: HashMap<&str, (f64, usize)> = HashMap::new();

    loop {
        let mut changed = false;
        for (r, row) in rows.iter().enumerate() {
            let min_activity: f64 = row
                .terms
                .iter()
                .map(|&(n, a)| match fixed.get(n) {
                    Some(&(v, _)) => a * v,
                    None => a.min(0.0),
                })
                .sum();

            if min_activity > row.rhs + EPS {
                return Some(explain(&rows, &fixed, r));
            }

            for &(n, a) in &row.terms {
                if fixed.contains_key(n) {
                    continue;
                }
                if a > 0.0 && min_activity + a > row.rhs + EPS {
                    fixed.insert(n, (0.0, r));
                    changed = true;
                } else if a < 0.0 && min_activity - a > row.rhs + EPS {
                    fixed.insert(n, (1.0, r));
                    changed = true;
                }
            }
        }
        if !changed {
            return None;
        }
    }
}

/// Source constraints of row `start` and, transitively, of every row that
/// fixed one of its variables.
fn explain(rows: &[Row], fixed: &HashMap<&str, (f64, usize)>, start: usize) -> BTreeSet<usize> {
    let mut seen = BTreeSet::new();
    let mut sources = BTreeSet::new();
    let mut stack = vec![start];
    while let Some(r) = stack.pop() {
        if !seen.insert(r) {
            continue;
        }
        sources.insert(rows[r].source);
        for &(n, _) in &rows[r].terms {
            if let Some(&(_, by)) = fixed.get(n) {
                stack.push(by);
            }
        }
    }
    sources
}

/// Indices of an irreducible set of constraints that cannot hold together, if
/// propagation finds one.
pub fn find_conflict(milp: &Milp) -> Option<Vec<usize>> {
    let all: Vec<usize> = (0..milp.constraints.len()).collect();
    let mut conflict: Vec<usize> = propagate(milp, &all)?.into_iter().collect();

    let mut i = 0;
    while i < conflict.len() {
        let mut candidate = conflict.clone();
        candidate.remove(i);
        if propagate(milp, &candidate).is_some() {
            conflict = candidate;
        } else {
            i += 1;
        }
    }
    Some(conflict)
}
