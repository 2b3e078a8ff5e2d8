//! End-to-end scenarios for the normalization pipeline

use credo::{
    Clause, Formula, FormulaNode, Literal, SymbolFactory, Term, TermFactory,
};
use std::collections::HashMap;

struct Vocab {
    sf: SymbolFactory,
    tf: TermFactory,
    names: Vec<Term>,
    f0: Term,
    g0: Term,
    f1: credo::Symbol,
    g1: credo::Symbol,
    sort: credo::Sort,
}

fn vocab() -> Vocab {
    let mut sf = SymbolFactory::new();
    let mut tf = TermFactory::new();
    let sort = sf.new_sort();
    let names = (0..3).map(|_| tf.name(sf.new_name(sort))).collect();
    let f0s = sf.new_function(sort, 0);
    let g0s = sf.new_function(sort, 0);
    let f0 = tf.term(f0s, vec![]);
    let g0 = tf.term(g0s, vec![]);
    let f1 = sf.new_function(sort, 1);
    let g1 = sf.new_function(sort, 1);
    Vocab { sf, tf, names, f0, g0, f1, g1, sort }
}

fn bound_variables(phi: &Formula) -> Vec<Term> {
    let mut out = Vec::new();
    phi.for_each_subformula(&mut |psi| {
        if let FormulaNode::Exists(x, _) = psi.node() {
            out.push(*x);
        }
    });
    out
}

#[test]
fn scenario_rectification() {
    let mut v = vocab();
    let (a, b) = (v.names[0], v.names[1]);
    let x = v.tf.fresh_var(v.sort, &mut v.sf);
    // Ex x (x = a ∨ Ex x (x = b))
    let phi = Formula::exists(
        x,
        Formula::or(
            Formula::atomic(Clause::unit_of(Literal::eq(x, a))),
            Formula::exists(x, Formula::atomic(Clause::unit_of(Literal::eq(x, b)))),
        ),
    );
    let psi = phi.nf(&mut v.sf, &mut v.tf, true);

    let binders = bound_variables(&psi);
    assert_eq!(binders.len(), 2);
    assert_ne!(binders[0], binders[1]);
    assert_eq!(binders[0].sort(), binders[1].sort());
    assert!(psi.free_vars(&v.tf).is_empty());
}

#[test]
fn scenario_flattening() {
    let mut v = vocab();
    let a = v.names[0];
    let c = v.names[2];
    let gc = v.tf.term(v.g1, vec![c]);
    let fgc = v.tf.term(v.f1, vec![gc]);

    // f(g(c)) = a under even polarity
    let phi = Formula::atomic(Clause::unit_of(Literal::eq(fgc, a)));
    let psi = phi.nf(&mut v.sf, &mut v.tf, true);

    // A leading and a trailing Not around exactly two fresh binders
    let (y, z, inner) = match psi.node() {
        FormulaNode::Not(p) => match p.node() {
            FormulaNode::Exists(y, p) => match p.node() {
                FormulaNode::Exists(z, p) => match p.node() {
                    FormulaNode::Not(p) => (*y, *z, p),
                    _ => panic!("expected trailing Not"),
                },
                _ => panic!("expected second binder"),
            },
            _ => panic!("expected first binder"),
        },
        _ => panic!("expected leading Not"),
    };
    assert_ne!(y, z);

    // Conceptually Fa y Fa z (y ≠ g(c) ∨ z ≠ f(y) ∨ z = a)
    let fy = v.tf.term(v.f1, vec![y]);
    let expected = Clause::new(vec![
        Literal::neq(gc, y),
        Literal::neq(fy, z),
        Literal::eq(z, a),
    ]);
    match inner.node() {
        FormulaNode::Atomic(clause) => assert_eq!(clause, &expected),
        _ => panic!("expected the flattened clause"),
    }
    assert_eq!(psi.as_univ_clause(&v.tf), Some(expected));
}

#[test]
fn scenario_dist_k() {
    let v = vocab();
    let (a, b) = (v.names[0], v.names[1]);
    let p = Literal::eq(v.f0, a);
    let q = Literal::eq(v.g0, b);

    let phi = Formula::know(2, Formula::not(Formula::atomic(Clause::new(vec![p, q]))));
    let psi = phi.normalize(&v.tf, true);

    let expected = Formula::not(Formula::or(
        Formula::know(2, Formula::atomic(Clause::unit_of(p.flip()))),
        Formula::know(2, Formula::atomic(Clause::unit_of(q.flip()))),
    ));
    assert_eq!(psi, expected);
}

#[test]
fn nf_is_idempotent_on_modal_formulas() {
    let mut v = vocab();
    let (a, b) = (v.names[0], v.names[1]);
    let x = v.tf.fresh_var(v.sort, &mut v.sf);
    let fx = v.tf.term(v.f1, vec![x]);

    let phi = Formula::or(
        Formula::exists(
            x,
            Formula::know(1, Formula::atomic(Clause::unit_of(Literal::eq(fx, a)))),
        ),
        Formula::not(Formula::cons(
            0,
            Formula::atomic(Clause::new(vec![
                Literal::eq(v.f0, a),
                Literal::eq(v.g0, b),
            ])),
        )),
    );
    let once = phi.nf(&mut v.sf, &mut v.tf, true);
    let twice = once.nf(&mut v.sf, &mut v.tf, true);
    assert_eq!(once, twice);

    let plain_once = phi.nf(&mut v.sf, &mut v.tf, false);
    let plain_twice = plain_once.nf(&mut v.sf, &mut v.tf, false);
    assert_eq!(plain_once, plain_twice);
}

// A tiny standard-name model: every ground application resolves to a name
// through `assign`, and quantifiers range over the name universe.
fn resolve(tf: &mut TermFactory, assign: &HashMap<Term, Term>, t: Term) -> Term {
    if t.is_name() {
        return t;
    }
    assert!(t.is_function(), "unsubstituted variable in evaluation");
    let args: Vec<Term> = tf
        .args(t)
        .to_vec()
        .into_iter()
        .map(|u| resolve(tf, assign, u))
        .collect();
    let ground = tf.term(t.symbol(), args);
    *assign
        .get(&ground)
        .unwrap_or_else(|| panic!("assignment misses {}", tf.display(ground)))
}

fn eval_clause(tf: &mut TermFactory, assign: &HashMap<Term, Term>, c: &Clause) -> bool {
    c.literals().iter().any(|l| {
        let lhs = resolve(tf, assign, l.lhs());
        let rhs = resolve(tf, assign, l.rhs());
        if l.pos() {
            lhs == rhs
        } else {
            lhs != rhs
        }
    })
}

fn eval(
    tf: &mut TermFactory,
    names: &[Term],
    assign: &HashMap<Term, Term>,
    phi: &Formula,
) -> bool {
    match phi.node() {
        FormulaNode::Atomic(c) => eval_clause(tf, assign, c),
        FormulaNode::Not(a) => !eval(tf, names, assign, a),
        FormulaNode::Or(a, b) => eval(tf, names, assign, a) || eval(tf, names, assign, b),
        FormulaNode::Exists(x, a) => {
            let x = *x;
            names.iter().any(|&n| {
                let mut body = (**a).clone();
                body.substitute_free(&mut |t| if t == x { Some(n) } else { None }, tf);
                eval(tf, names, assign, &body)
            })
        }
        _ => panic!("objective formulas only"),
    }
}

// Every total assignment of the listed applications to names
fn assignments(apps: &[Term], names: &[Term]) -> Vec<HashMap<Term, Term>> {
    let mut out = vec![HashMap::new()];
    for &app in apps {
        let mut next = Vec::new();
        for partial in &out {
            for &n in names {
                let mut m = partial.clone();
                m.insert(app, n);
                next.push(m);
            }
        }
        out = next;
    }
    out
}

#[test]
fn nf_preserves_truth_in_every_standard_name_model() {
    let mut v = vocab();
    let (a, b) = (v.names[0], v.names[1]);
    let x = v.tf.fresh_var(v.sort, &mut v.sf);

    let candidates = vec![
        Formula::atomic(Clause::unit_of(Literal::eq(v.f0, a))),
        Formula::atomic(Clause::new(vec![
            Literal::eq(v.f0, a),
            Literal::eq(v.g0, b),
        ])),
        Formula::not(Formula::atomic(Clause::unit_of(Literal::eq(v.f0, a)))),
        Formula::exists(x, Formula::atomic(Clause::unit_of(Literal::eq(v.f0, x)))),
        Formula::not(Formula::exists(
            x,
            Formula::atomic(Clause::new(vec![
                Literal::eq(v.f0, x),
                Literal::neq(v.g0, x),
            ])),
        )),
        Formula::or(
            Formula::atomic(Clause::unit_of(Literal::neq(v.f0, b))),
            Formula::exists(x, Formula::atomic(Clause::unit_of(Literal::eq(v.g0, x)))),
        ),
    ];

    let apps = [v.f0, v.g0];
    let names = v.names.clone();
    for phi in candidates {
        let psi = phi.nf(&mut v.sf, &mut v.tf, true);
        for assign in assignments(&apps, &names) {
            let lhs = eval(&mut v.tf, &names, &assign, &phi);
            let rhs = eval(&mut v.tf, &names, &assign, &psi);
            assert_eq!(lhs, rhs, "{} vs {}", phi, psi);
        }
    }
}

#[test]
fn nf_preserves_truth_under_nesting() {
    let mut v = vocab();
    let a = v.names[0];
    let c = v.names[2];
    let gc = v.tf.term(v.g1, vec![c]);
    let fa_apps: Vec<Term> = v
        .names
        .iter()
        .map(|&n| v.tf.term(v.f1, vec![n]))
        .collect();

    let phi = Formula::atomic(Clause::unit_of(Literal::eq(
        v.tf.term(v.f1, vec![gc]),
        a,
    )));
    let psi = phi.nf(&mut v.sf, &mut v.tf, true);

    // g(c) and every f(n) must be interpreted
    let mut apps = vec![gc];
    apps.extend(fa_apps);
    let names = v.names.clone();
    for assign in assignments(&apps, &names) {
        let lhs = eval(&mut v.tf, &names, &assign, &phi);
        let rhs = eval(&mut v.tf, &names, &assign, &psi);
        assert_eq!(lhs, rhs);
    }
}

#[test]
fn nf_of_ground_clause_is_a_universal_clause() {
    let mut v = vocab();
    let a = v.names[0];
    let phi = Formula::atomic(Clause::unit_of(Literal::eq(v.f0, a)));
    let psi = phi.nf(&mut v.sf, &mut v.tf, true);
    let clause = psi.as_univ_clause(&v.tf).expect("universal clause");
    // f ≠ z ∨ z = a
    assert_eq!(clause.len(), 2);
    assert!(clause.literals().iter().any(|l| !l.pos() && l.lhs() == v.f0));
}
