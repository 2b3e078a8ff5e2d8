//! Naming context: textual identifiers for sorts, terms, and formulas
//!
//! The registry owns the symbol and term factories and binds parser-facing
//! identifiers to the entities they denote. Registration and lookup
//! failures are reported through dedicated error kinds, never silently.
//! Results are announced through the [`Logger`] trait, whose methods all
//! default to no-ops.

use crate::fol::{Sort, Symbol, SymbolFactory, Term, TermFactory};
use crate::formula::Formula;
use indexmap::IndexMap;
use thiserror::Error;

/// Failure kinds of the registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("sort `{0}` is already registered")]
    DuplicateSort(String),
    #[error("variable `{0}` is already registered")]
    DuplicateVariable(String),
    #[error("name `{0}` is already registered")]
    DuplicateName(String),
    #[error("function `{0}` is already registered")]
    DuplicateFunction(String),
    #[error("meta-variable `{0}` is already registered")]
    DuplicateMetaVariable(String),
    #[error("formula `{0}` is already registered")]
    DuplicateFormula(String),
    #[error("unknown sort `{0}`")]
    UnknownSort(String),
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),
    #[error("unknown name `{0}`")]
    UnknownName(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("unknown meta-variable `{0}`")]
    UnknownMetaVariable(String),
    #[error("unknown formula `{0}`")]
    UnknownFormula(String),
}

/// Event sink for registry activity and the knowledge-base driver.
///
/// Every method has a no-op default; implement the ones of interest.
pub trait Logger {
    fn registered_sort(&mut self, _id: &str) {}
    fn registered_variable(&mut self, _id: &str, _sort_id: &str) {}
    fn registered_name(&mut self, _id: &str, _sort_id: &str) {}
    fn registered_function(&mut self, _id: &str, _arity: u8, _sort_id: &str) {}
    fn registered_meta_variable(&mut self, _id: &str, _t: Term) {}
    fn registered_formula(&mut self, _id: &str, _phi: &Formula) {}
    fn unregistered_meta_variable(&mut self, _id: &str) {}
    fn added_to_kb(&mut self, _alpha: &Formula, _accepted: bool) {}
    fn queried(&mut self, _phi: &Formula, _yes: bool) {}
}

/// A [`Logger`] that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLogger;

impl Logger for DefaultLogger {}

/// The naming context used by the parser and the REPL
#[derive(Debug, Default)]
pub struct Registry<L = DefaultLogger> {
    symbols: SymbolFactory,
    terms: TermFactory,
    sorts: IndexMap<String, Sort>,
    variables: IndexMap<String, Term>,
    names: IndexMap<String, Term>,
    functions: IndexMap<String, Symbol>,
    meta_variables: IndexMap<String, Term>,
    formulas: IndexMap<String, Formula>,
    logger: L,
}

impl Registry<DefaultLogger> {
    pub fn new() -> Self {
        Registry::with_logger(DefaultLogger)
    }
}

impl<L: Logger> Registry<L> {
    pub fn with_logger(logger: L) -> Self {
        Registry {
            symbols: SymbolFactory::new(),
            terms: TermFactory::new(),
            sorts: IndexMap::new(),
            variables: IndexMap::new(),
            names: IndexMap::new(),
            functions: IndexMap::new(),
            meta_variables: IndexMap::new(),
            formulas: IndexMap::new(),
            logger,
        }
    }

    /// Allocate a new sort and bind it to `id`
    pub fn register_sort(&mut self, id: &str) -> Result<Sort, RegistryError> {
        if self.sorts.contains_key(id) {
            return Err(RegistryError::DuplicateSort(id.to_string()));
        }
        let sort = self.symbols.new_sort();
        self.sorts.insert(id.to_string(), sort);
        self.logger.registered_sort(id);
        Ok(sort)
    }

    /// Allocate a variable of the sort bound to `sort_id` and bind its
    /// term to `id`
    pub fn register_variable(&mut self, id: &str, sort_id: &str) -> Result<Term, RegistryError> {
        if self.variables.contains_key(id) {
            return Err(RegistryError::DuplicateVariable(id.to_string()));
        }
        let sort = self.lookup_sort(sort_id)?;
        let x = self.terms.fresh_var(sort, &mut self.symbols);
        self.variables.insert(id.to_string(), x);
        self.logger.registered_variable(id, sort_id);
        Ok(x)
    }

    /// Allocate a standard name of the sort bound to `sort_id` and bind
    /// its term to `id`
    pub fn register_name(&mut self, id: &str, sort_id: &str) -> Result<Term, RegistryError> {
        if self.names.contains_key(id) {
            return Err(RegistryError::DuplicateName(id.to_string()));
        }
        let sort = self.lookup_sort(sort_id)?;
        let symbol = self.symbols.new_name(sort);
        let n = self.terms.name(symbol);
        self.names.insert(id.to_string(), n);
        self.logger.registered_name(id, sort_id);
        Ok(n)
    }

    /// Allocate a function symbol of the given arity and sort and bind it
    /// to `id`
    pub fn register_function(
        &mut self,
        id: &str,
        arity: u8,
        sort_id: &str,
    ) -> Result<Symbol, RegistryError> {
        if self.functions.contains_key(id) {
            return Err(RegistryError::DuplicateFunction(id.to_string()));
        }
        let sort = self.lookup_sort(sort_id)?;
        let symbol = self.symbols.new_function(sort, arity);
        self.functions.insert(id.to_string(), symbol);
        self.logger.registered_function(id, arity, sort_id);
        Ok(symbol)
    }

    /// Bind `id` to an existing term; the only unregisterable binding
    pub fn register_meta_variable(&mut self, id: &str, t: Term) -> Result<(), RegistryError> {
        if self.meta_variables.contains_key(id) {
            return Err(RegistryError::DuplicateMetaVariable(id.to_string()));
        }
        self.meta_variables.insert(id.to_string(), t);
        self.logger.registered_meta_variable(id, t);
        Ok(())
    }

    /// Bind `id` to a formula
    pub fn register_formula(&mut self, id: &str, phi: Formula) -> Result<(), RegistryError> {
        if self.formulas.contains_key(id) {
            return Err(RegistryError::DuplicateFormula(id.to_string()));
        }
        self.logger.registered_formula(id, &phi);
        self.formulas.insert(id.to_string(), phi);
        Ok(())
    }

    pub fn unregister_meta_variable(&mut self, id: &str) -> Result<(), RegistryError> {
        if self.meta_variables.shift_remove(id).is_none() {
            return Err(RegistryError::UnknownMetaVariable(id.to_string()));
        }
        self.logger.unregistered_meta_variable(id);
        Ok(())
    }

    pub fn is_registered_sort(&self, id: &str) -> bool {
        self.sorts.contains_key(id)
    }

    pub fn is_registered_variable(&self, id: &str) -> bool {
        self.variables.contains_key(id)
    }

    pub fn is_registered_name(&self, id: &str) -> bool {
        self.names.contains_key(id)
    }

    pub fn is_registered_function(&self, id: &str) -> bool {
        self.functions.contains_key(id)
    }

    pub fn is_registered_meta_variable(&self, id: &str) -> bool {
        self.meta_variables.contains_key(id)
    }

    pub fn is_registered_formula(&self, id: &str) -> bool {
        self.formulas.contains_key(id)
    }

    /// Is `id` bound to any kind of term?
    pub fn is_registered_term(&self, id: &str) -> bool {
        self.is_registered_variable(id)
            || self.is_registered_name(id)
            || self.is_registered_function(id)
            || self.is_registered_meta_variable(id)
    }

    pub fn lookup_sort(&self, id: &str) -> Result<Sort, RegistryError> {
        self.sorts
            .get(id)
            .copied()
            .ok_or_else(|| RegistryError::UnknownSort(id.to_string()))
    }

    pub fn lookup_variable(&self, id: &str) -> Result<Term, RegistryError> {
        self.variables
            .get(id)
            .copied()
            .ok_or_else(|| RegistryError::UnknownVariable(id.to_string()))
    }

    pub fn lookup_name(&self, id: &str) -> Result<Term, RegistryError> {
        self.names
            .get(id)
            .copied()
            .ok_or_else(|| RegistryError::UnknownName(id.to_string()))
    }

    pub fn lookup_function(&self, id: &str) -> Result<Symbol, RegistryError> {
        self.functions
            .get(id)
            .copied()
            .ok_or_else(|| RegistryError::UnknownFunction(id.to_string()))
    }

    pub fn lookup_meta_variable(&self, id: &str) -> Result<Term, RegistryError> {
        self.meta_variables
            .get(id)
            .copied()
            .ok_or_else(|| RegistryError::UnknownMetaVariable(id.to_string()))
    }

    pub fn lookup_formula(&self, id: &str) -> Result<&Formula, RegistryError> {
        self.formulas
            .get(id)
            .ok_or_else(|| RegistryError::UnknownFormula(id.to_string()))
    }

    /// The term factory, for term construction and display
    pub fn term_factory(&self) -> &TermFactory {
        &self.terms
    }

    /// Both factories, split-borrowed for normalization calls
    pub fn factories_mut(&mut self) -> (&mut SymbolFactory, &mut TermFactory) {
        (&mut self.symbols, &mut self.terms)
    }

    /// Build a function application over registered terms
    pub fn term(&mut self, symbol: Symbol, args: Vec<Term>) -> Term {
        self.terms.term(symbol, args)
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut L {
        &mut self.logger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Clause, Literal};

    #[test]
    fn test_register_and_lookup() {
        let mut r = Registry::new();
        let sort = r.register_sort("obj").unwrap();
        assert_eq!(r.lookup_sort("obj").unwrap(), sort);

        let x = r.register_variable("x", "obj").unwrap();
        assert!(x.is_variable());
        assert_eq!(x.sort(), sort);

        let a = r.register_name("a", "obj").unwrap();
        assert!(a.is_name());

        let f = r.register_function("f", 1, "obj").unwrap();
        assert_eq!(f.arity(), 1);
        let fa = r.term(f, vec![a]);
        assert!(fa.is_function());

        assert!(r.is_registered_term("x"));
        assert!(r.is_registered_term("f"));
        assert!(!r.is_registered_term("g"));
    }

    #[test]
    fn test_duplicates_are_errors() {
        let mut r = Registry::new();
        r.register_sort("obj").unwrap();
        assert_eq!(
            r.register_sort("obj"),
            Err(RegistryError::DuplicateSort("obj".to_string()))
        );

        r.register_variable("x", "obj").unwrap();
        assert_eq!(
            r.register_variable("x", "obj"),
            Err(RegistryError::DuplicateVariable("x".to_string()))
        );
    }

    #[test]
    fn test_unknown_lookups_are_errors() {
        let r = Registry::new();
        assert_eq!(
            r.lookup_sort("obj"),
            Err(RegistryError::UnknownSort("obj".to_string()))
        );
        assert_eq!(
            r.lookup_formula("phi"),
            Err(RegistryError::UnknownFormula("phi".to_string()))
        );
    }

    #[test]
    fn test_unknown_sort_blocks_registration() {
        let mut r = Registry::new();
        assert_eq!(
            r.register_name("a", "obj"),
            Err(RegistryError::UnknownSort("obj".to_string()))
        );
        assert!(!r.is_registered_name("a"));
    }

    #[test]
    fn test_meta_variables_unregister() {
        let mut r = Registry::new();
        r.register_sort("obj").unwrap();
        let a = r.register_name("a", "obj").unwrap();

        r.register_meta_variable("m", a).unwrap();
        assert_eq!(r.lookup_meta_variable("m").unwrap(), a);
        r.unregister_meta_variable("m").unwrap();
        assert!(!r.is_registered_meta_variable("m"));
        assert_eq!(
            r.unregister_meta_variable("m"),
            Err(RegistryError::UnknownMetaVariable("m".to_string()))
        );
        // Re-registration after unregistering is fine
        r.register_meta_variable("m", a).unwrap();
    }

    #[test]
    fn test_formula_registration() {
        let mut r = Registry::new();
        r.register_sort("obj").unwrap();
        let a = r.register_name("a", "obj").unwrap();
        let f = r.register_function("f", 0, "obj").unwrap();
        let fa = r.term(f, vec![]);
        let phi = Formula::atomic(Clause::unit_of(Literal::eq(fa, a)));

        r.register_formula("phi", phi.clone()).unwrap();
        assert_eq!(r.lookup_formula("phi").unwrap(), &phi);
        assert_eq!(
            r.register_formula("phi", phi),
            Err(RegistryError::DuplicateFormula("phi".to_string()))
        );
    }

    #[derive(Default)]
    struct EventLog {
        events: Vec<String>,
    }

    impl Logger for EventLog {
        fn registered_sort(&mut self, id: &str) {
            self.events.push(format!("sort {}", id));
        }

        fn registered_name(&mut self, id: &str, sort_id: &str) {
            self.events.push(format!("name {}: {}", id, sort_id));
        }

        fn unregistered_meta_variable(&mut self, id: &str) {
            self.events.push(format!("unregister {}", id));
        }
    }

    #[test]
    fn test_logger_receives_events() {
        let mut r = Registry::with_logger(EventLog::default());
        r.register_sort("obj").unwrap();
        let a = r.register_name("a", "obj").unwrap();
        r.register_meta_variable("m", a).unwrap();
        r.unregister_meta_variable("m").unwrap();

        assert_eq!(
            r.logger().events,
            vec!["sort obj", "name a: obj", "unregister m"]
        );
    }
}
