//! End-to-end scenarios for the clause engine

use credo::{AddResult, Clause, Literal, Setup, SymbolFactory, Term, TermFactory};
use proptest::prelude::*;

struct Vocab {
    names: Vec<Term>,
    funcs: Vec<Term>,
}

// Sort T, names a b c, nullary functions f g h
fn vocab() -> Vocab {
    let mut sf = SymbolFactory::new();
    let mut tf = TermFactory::new();
    let sort = sf.new_sort();
    let names = (0..3).map(|_| tf.name(sf.new_name(sort))).collect();
    let funcs = (0..3)
        .map(|_| {
            let f = sf.new_function(sort, 0);
            tf.term(f, vec![])
        })
        .collect();
    Vocab { names, funcs }
}

#[test]
fn scenario_unit_subsumption() {
    let v = vocab();
    let (a, b) = (v.names[0], v.names[1]);
    let f = v.funcs[0];
    let fa = Literal::eq(f, a);
    let fb = Literal::eq(f, b);

    let mut s = Setup::new();
    s.add_clause(&Clause::unit_of(fa));
    s.add_clause(&Clause::new(vec![fa, fb]));
    s.minimize();

    // Only the unit f = a remains
    let remaining: Vec<Clause> = s.clauses().map(|i| s.clause(i)).collect();
    assert_eq!(remaining, vec![Clause::unit_of(fa)]);

    assert!(s.subsumes(&Clause::unit_of(fa)));
    assert!(s.subsumes(&Clause::new(vec![fa, fb])));
    assert!(!s.subsumes(&Clause::unit_of(fb)));
}

#[test]
fn scenario_unit_propagation_to_bottom() {
    let v = vocab();
    let (a, b) = (v.names[0], v.names[1]);
    let f = v.funcs[0];
    let fa = Literal::eq(f, a);
    let fb = Literal::eq(f, b);

    let mut s = Setup::new();
    assert_eq!(s.add_clause(&Clause::new(vec![fa, fb])), AddResult::Ok);
    assert_eq!(s.add_unit(fa.flip()), AddResult::Ok);
    assert_eq!(s.add_unit(fb.flip()), AddResult::Inconsistent);
    assert!(s.contains_empty_clause());
    assert!(!s.consistent());
}

#[test]
fn scenario_shallow_copy_isolation() {
    let v = vocab();
    let (a, b) = (v.names[0], v.names[1]);
    let f = v.funcs[0];
    let fa = Literal::eq(f, a);
    let fb = Literal::eq(f, b);

    let mut s = Setup::new();
    s.add_clause(&Clause::unit_of(fa));
    s.add_clause(&Clause::new(vec![fa, fb]));
    s.minimize();

    {
        let mut copy = s.shallow_copy();
        assert_eq!(copy.add_unit(fa.flip()), AddResult::Inconsistent);
    }

    assert!(s.subsumes(&Clause::unit_of(fa)));
    assert!(!s.contains_empty_clause());
}

#[test]
fn add_unit_makes_its_clause_subsumed() {
    let v = vocab();
    let a = v.names[0];
    for &f in &v.funcs {
        let mut s = Setup::new();
        let lit = Literal::eq(f, a);
        assert_eq!(s.add_unit(lit), AddResult::Ok);
        assert!(s.subsumes(&Clause::unit_of(lit)));
    }
}

#[test]
fn rebuilding_from_materialized_clauses_preserves_subsumption() {
    let v = vocab();
    let (a, b, c) = (v.names[0], v.names[1], v.names[2]);
    let (f, g) = (v.funcs[0], v.funcs[1]);

    let mut s = Setup::new();
    s.add_clause(&Clause::new(vec![Literal::eq(f, a), Literal::eq(g, b)]));
    s.add_clause(&Clause::new(vec![Literal::eq(f, b), Literal::eq(g, c)]));
    s.add_unit(Literal::neq(f, b));
    s.minimize();

    let mut rebuilt = Setup::new();
    for i in s.clauses() {
        rebuilt.add_clause(&s.clause(i));
    }

    let probes = [
        Clause::unit_of(Literal::eq(g, c)),
        Clause::unit_of(Literal::neq(f, b)),
        Clause::new(vec![Literal::eq(f, a), Literal::eq(g, b)]),
        Clause::unit_of(Literal::eq(f, c)),
        Clause::new(vec![Literal::eq(g, a), Literal::eq(g, b)]),
    ];
    for probe in &probes {
        assert_eq!(s.subsumes(probe), rebuilt.subsumes(probe), "probe {}", probe);
    }
}

#[test]
fn subsumption_is_monotone_under_additions() {
    let v = vocab();
    let (a, b) = (v.names[0], v.names[1]);
    let (f, g) = (v.funcs[0], v.funcs[1]);

    let mut s = Setup::new();
    s.add_clause(&Clause::new(vec![Literal::eq(f, a), Literal::eq(g, b)]));

    let probes = [
        Clause::new(vec![Literal::eq(f, a), Literal::eq(g, b)]),
        Clause::unit_of(Literal::eq(f, a)),
        Clause::unit_of(Literal::neq(g, a)),
    ];
    let before: Vec<bool> = probes.iter().map(|p| s.subsumes(p)).collect();

    s.add_unit(Literal::eq(g, b));
    for (probe, was) in probes.iter().zip(before) {
        if was {
            assert!(s.subsumes(probe), "lost {}", probe);
        }
    }
}

#[test]
fn clause_serialization_round_trip() {
    let v = vocab();
    let clause = Clause::new(vec![
        Literal::eq(v.funcs[0], v.names[0]),
        Literal::neq(v.funcs[1], v.names[2]),
    ]);
    let json = serde_json::to_string(&clause).unwrap();
    let back: Clause = serde_json::from_str(&json).unwrap();
    assert_eq!(clause, back);
}

// Index triples (function, name, sign) standing for literals over the
// fixed test vocabulary.
type LitIx = (usize, usize, bool);

fn lit(v: &Vocab, (f, n, pos): LitIx) -> Literal {
    if pos {
        Literal::eq(v.funcs[f], v.names[n])
    } else {
        Literal::neq(v.funcs[f], v.names[n])
    }
}

fn lit_strategy() -> impl Strategy<Value = LitIx> {
    (0..3usize, 0..3usize, any::<bool>())
}

fn clause_strategy() -> impl Strategy<Value = Vec<LitIx>> {
    prop::collection::vec(lit_strategy(), 1..4)
}

fn setup_strategy() -> impl Strategy<Value = Vec<Vec<LitIx>>> {
    prop::collection::vec(clause_strategy(), 0..6)
}

fn build(v: &Vocab, clauses: &[Vec<LitIx>]) -> Setup {
    let mut s = Setup::new();
    for c in clauses {
        let c = Clause::new(c.iter().map(|&ix| lit(v, ix)).collect());
        s.add_clause(&c);
    }
    s
}

#[derive(Debug, PartialEq)]
struct Snapshot {
    empty: bool,
    units: Vec<Literal>,
    clauses: Vec<Clause>,
}

fn snapshot(s: &Setup) -> Snapshot {
    Snapshot {
        empty: s.contains_empty_clause(),
        units: s.units().to_vec(),
        clauses: s.clauses().map(|i| s.clause(i)).collect(),
    }
}

proptest! {
    #[test]
    fn prop_minimize_is_idempotent(clauses in setup_strategy()) {
        let v = vocab();
        let mut s = build(&v, &clauses);
        s.minimize();
        let once = snapshot(&s);
        s.minimize();
        prop_assert_eq!(snapshot(&s), once);
    }

    #[test]
    fn prop_shallow_copy_restore_law(
        clauses in setup_strategy(),
        hyps in prop::collection::vec(lit_strategy(), 0..4),
    ) {
        let v = vocab();
        let mut s = build(&v, &clauses);
        s.minimize();
        let before = snapshot(&s);
        {
            let mut copy = s.shallow_copy();
            for &h in &hyps {
                copy.add_unit(lit(&v, h));
            }
        }
        prop_assert_eq!(snapshot(&s), before);
    }

    #[test]
    fn prop_subsumes_monotone(
        clauses in setup_strategy(),
        extra in clause_strategy(),
        probe in clause_strategy(),
    ) {
        let v = vocab();
        let probe = Clause::new(probe.iter().map(|&ix| lit(&v, ix)).collect());
        let mut s = build(&v, &clauses);
        let before = s.subsumes(&probe);
        s.add_clause(&Clause::new(extra.iter().map(|&ix| lit(&v, ix)).collect()));
        if before {
            prop_assert!(s.subsumes(&probe));
        }
    }

    #[test]
    fn prop_complementary_units_unsat(f in 0..3usize, n in 0..3usize) {
        let v = vocab();
        let a = lit(&v, (f, n, true));
        let mut s = Setup::new();
        prop_assert_eq!(s.add_unit(a), AddResult::Ok);
        prop_assert_eq!(s.add_unit(a.flip()), AddResult::Inconsistent);
        prop_assert!(s.contains_empty_clause());
    }
}
