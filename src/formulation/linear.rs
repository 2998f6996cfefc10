use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjSense {
    Minimize,
    Maximize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: BTreeMap<String, f64>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn zero() -> Self {
        Self::default()
    }
    pub fn from_var(v: &str, c: f64) -> Self {
        let mut e = Self::zero();
        if c != 0.0 {
            e.terms.insert(v.to_string(), c);
        }
        e
    }
    pub fn add_term(&mut self, v: &str, c: f64) {
        *self.terms.entry(v.to_string()).or_insert(0.0) += c;
        if self.terms[v].abs() <= 1e-12 {
            self.terms.remove(v);
        }
    }
    pub fn sub_inplace(&mut self, other: &LinearExpr) {
        self.constant -= other.constant;
        for (k, v) in other.terms.iter() {
            *self.terms.entry(k.clone()).or_insert(0.0) -= *v;
        }
        self.terms.retain(|_, c| c.abs() > 1e-12);
    }
    pub fn sub(mut self, other: LinearExpr) -> LinearExpr {
        self.sub_inplace(&other);
        self
    }
    /// Value under `values`; missing variables count as zero.
    pub fn value(&self, values: &HashMap<String, f64>) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|(n, c)| c * values.get(n).copied().unwrap_or(0.0))
                .sum::<f64>()
    }
}

/// `coef · left · right`
#[derive(Clone, Debug, PartialEq)]
pub struct QuadTerm {
    pub coef: f64,
    pub left: String,
    pub right: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

#[derive(Clone, Debug)]
pub struct Constraint {
    pub name: String,
    pub expr: LinearExpr, // lhs
    pub quad: Vec<QuadTerm>,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    pub fn linear(name: String, expr: LinearExpr, sense: Sense, rhs: f64) -> Self {
        Constraint { name, expr, quad: vec![], sense, rhs }
    }

    pub fn lhs_value(&self, values: &HashMap<String, f64>) -> f64 {
        let get = |n: &str| values.get(n).copied().unwrap_or(0.0);
        self.expr.value(values) + self.quad.iter().map(|q| q.coef * get(&q.left) * get(&q.right)).sum::<f64>()
    }

    /// Amount by which `values` violate the row, zero when satisfied.
    pub fn violation(&self, values: &HashMap<String, f64>) -> f64 {
        let lhs = self.lhs_value(values);
        match self.sense {
            Sense::Le => (lhs - self.rhs).max(0.0),
            Sense::Ge => (self.rhs - lhs).max(0.0),
            Sense::Eq => (lhs - self.rhs).abs(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Milp {
    pub objective: LinearExpr,
    pub sense: ObjSense,
    pub constraints: Vec<Constraint>,
    pub binaries: BTreeSet<String>,
    /// Continuous variables, all with a lower bound of zero.
    pub continuous: BTreeSet<String>,
}

impl Milp {
    pub fn new(sense: ObjSense) -> Self {
        Self {
            objective: LinearExpr::zero(),
            sense,
            constraints: vec![],
            binaries: BTreeSet::new(),
            continuous: BTreeSet::new(),
        }
    }

    pub fn is_variable(&self, name: &str) -> bool {
        self.binaries.contains(name) || self.continuous.contains(name)
    }

    /// Moves expression constants to the right-hand side, as the LP format
    /// wants.
    pub fn normalize(&mut self) {
        for c in &mut self.constraints {
            c.rhs -= c.expr.constant;
            c.expr.constant = 0.0;
        }
    }

    /// The rows at `indices` with the variables they mention and no objective.
    pub fn subsystem(&self, indices: &[usize]) -> Milp {
        let mut sub = Milp::new(self.sense);
        for &i in indices {
            let c = &self.constraints[i];
            let names = c.expr.terms.keys().chain(c.quad.iter().flat_map(|q| [&q.left, &q.right]));
            for n in names {
                if self.binaries.contains(n) {
                    sub.binaries.insert(n.clone());
                } else {
                    sub.continuous.insert(n.clone());
                }
            }
            sub.constraints.push(c.clone());
        }
        sub
    }
}

pub fn emit_lp(milp: &Milp) -> String {
    let mut out = String::new();
    match milp.sense {
        ObjSense::Minimize => out.push_str("Minimize\n obj: "),
        ObjSense::Maximize => out.push_str("Maximize\n obj: "),
    }
    out.push_str(&fmt_lin(&milp.objective));
    out.push('\n');
    out.push_str("Subject To\n");
    for c in &milp.constraints {
        let mut lhs = vec![];
        if c.quad.is_empty() || !c.expr.terms.is_empty() || c.expr.constant.abs() > 1e-12 {
            lhs.push(fmt_lin(&c.expr));
        }
        if !c.quad.is_empty() {
            lhs.push(fmt_quad(&c.quad));
        }
        let _ = writeln!(out, " {}: {} {} {}", c.name, lhs.join(" + "), fmt_sense(c.sense), fmt_num(c.rhs));
    }
    if !milp.continuous.is_empty() {
        out.push_str("Bounds\n");
        for v in &milp.continuous {
            let _ = writeln!(out, " {} >= 0", v);
        }
    }
    out.push_str("Binary\n");
    for b in &milp.binaries {
        let _ = writeln!(out, " {}", b);
    }
    out.push_str("End\n");
    out
}

fn fmt_sense(s: Sense) -> &'static str {
    match s {
        Sense::Le => "<=",
        Sense::Ge => ">=",
        Sense::Eq => "=",
    }
}

fn fmt_num(v: f64) -> String {
    if v.abs() < 1e15 && (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{}", v)
    }
}

fn fmt_coef(c: f64) -> String {
    if c < 0.0 {
        format!("- {}", fmt_num(-c))
    } else {
        format!("+ {}", fmt_num(c))
    }
}

fn fmt_lin(e: &LinearExpr) -> String {
    let mut parts: Vec<String> = vec![];
    for (n, c) in e.terms.iter() {
        parts.push(format!("{} {}", fmt_coef(*c), n));
    }
    if e.constant.abs() > 1e-12 {
        parts.push(fmt_coef(e.constant));
    }
    if parts.is_empty() {
        parts.push("0".to_string());
    }
    parts.join(" ")
}

fn fmt_quad(terms: &[QuadTerm]) -> String {
    let inner: Vec<String> = terms
        .iter()
        .map(|q| format!("{} {} * {}", fmt_coef(q.coef), q.left, q.right))
        .collect();
    format!("[ {} ]", inner.join(" "))
}
