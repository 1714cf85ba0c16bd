use crate::evaluator::EvalError;
use crate::primitives::Builtin;
use crate::types::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Shared handle to a frame. Closures keep their defining frame alive through it.
pub type Env = Rc<RefCell<Environment>>;

// --- Environment Definition ---

#[derive(Debug, Default)]
pub struct Environment {
    // Use Rc<RefCell<...>> to allow shared ownership and interior mutability.
    // Needed for closures capturing environments and for global definitions.
    outer: Option<Env>,
    bindings: HashMap<String, Value>, // Maps symbol names to values
}

impl Environment {
    /// Creates a new, top-level (root) environment.
    pub fn new() -> Env {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// Creates an empty frame linked to `parent`, or a root when there is none.
    pub fn with_parent(parent: Option<Env>) -> Env {
        Rc::new(RefCell::new(Environment {
            outer: parent,
            bindings: HashMap::new(),
        }))
    }

    /// Creates a new environment enclosed within an outer one.
    pub fn new_enclosed(outer_env: Env) -> Env {
        Environment::with_parent(Some(outer_env))
    }

    /// A fresh root with every builtin installed.
    pub fn new_global_populated() -> Env {
        let env_ptr = Environment::new();
        {
            let mut env = env_ptr.borrow_mut();
            for op in Builtin::ALL {
                env.set(op.name(), Value::Primitive(op));
            }
            // Alternate spellings
            env.set("\\", Value::Primitive(Builtin::Lambda));
            env.set("def", Value::Primitive(Builtin::Define));
        }
        env_ptr
    }

    pub fn is_root(&self) -> bool {
        self.outer.is_none()
    }

    /// Looks up a symbol's value.
    /// Checks the current frame first, then walks up the outer chain.
    /// The result is an independent copy of the bound value.
    pub fn get(&self, name: &str) -> Result<Value, EvalError> {
        if let Some(value) = self.bindings.get(name) {
            Ok(value.clone())
        } else {
            match &self.outer {
                Some(outer_env_ptr) => outer_env_ptr.borrow().get(name),
                None => Err(EvalError::UnboundVariable(name.to_string())),
            }
        }
    }

    /// Binds `name` in *this* frame only, replacing any existing binding here.
    pub fn set(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_string(), value);
    }

    /// Binds `name` in the root frame of this environment's chain.
    pub fn define_global(&mut self, name: &str, value: Value) {
        match &self.outer {
            Some(outer_env_ptr) => outer_env_ptr.borrow_mut().define_global(name, value),
            None => self.set(name, value),
        }
    }

    /// Content copy of this frame. The parent is shared, not copied.
    pub fn copy(&self) -> Env {
        Rc::new(RefCell::new(Environment {
            outer: self.outer.clone(),
            bindings: self.bindings.clone(),
        }))
    }

    fn add_identifiers(&self, mut identifiers: HashSet<String>) -> HashSet<String> {
        for identifier in self.bindings.keys() {
            identifiers.insert(identifier.to_string());
        }
        match self.outer {
            Some(ref outer_env_ptr) => outer_env_ptr.borrow().add_identifiers(identifiers),
            None => identifiers,
        }
    }

    /// Gets every identifier visible from this environment
    pub fn get_identifiers(&self) -> HashSet<String> {
        self.add_identifiers(HashSet::new())
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: i64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_set_and_get_global() {
        let env = Environment::new();
        env.borrow_mut().set("x", num(10));

        let result = env.borrow().get("x");
        assert_eq!(result, Ok(num(10)));
    }

    #[test]
    fn test_get_unbound_global() {
        let env = Environment::new();
        let result = env.borrow().get("y");
        assert!(matches!(result, Err(EvalError::UnboundVariable(s)) if s == "y"));
    }

    #[test]
    fn test_set_and_get_enclosed() {
        let global_env = Environment::new();
        global_env.borrow_mut().set("x", num(10));

        let local_env = Environment::new_enclosed(global_env);
        local_env.borrow_mut().set("y", num(20));

        assert_eq!(local_env.borrow().get("y"), Ok(num(20)));
        assert_eq!(local_env.borrow().get("x"), Ok(num(10)));
    }

    #[test]
    fn test_get_unbound_enclosed() {
        let global_env = Environment::new();
        let local_env = Environment::new_enclosed(global_env);

        let result = local_env.borrow().get("z");
        assert_eq!(result, Err(EvalError::UnboundVariable("z".to_string())));
    }

    #[test]
    fn test_shadowing() {
        let global_env = Environment::new();
        global_env.borrow_mut().set("x", num(1));

        let local_env = Environment::new_enclosed(global_env.clone());
        local_env.borrow_mut().set("x", num(2));

        let inner_local_env = Environment::new_enclosed(local_env.clone());
        inner_local_env
            .borrow_mut()
            .set("y", Value::symbol("y-value"));

        assert_eq!(inner_local_env.borrow().get("x"), Ok(num(2)));
        assert_eq!(inner_local_env.borrow().get("y"), Ok(Value::symbol("y-value")));
        assert_eq!(local_env.borrow().get("x"), Ok(num(2)));
        // The parent is unaffected by the child's binding
        assert_eq!(global_env.borrow().get("x"), Ok(num(1)));
    }

    #[test]
    fn test_set_overwrites_in_same_frame() {
        let env = Environment::new();
        env.borrow_mut().set("x", num(1));
        env.borrow_mut().set("x", num(2));
        assert_eq!(env.borrow().get("x"), Ok(num(2)));
    }

    #[test]
    fn test_set_never_walks_to_parent() {
        let global_env = Environment::new();
        global_env.borrow_mut().set("x", num(1));
        let local_env = Environment::new_enclosed(global_env.clone());
        local_env.borrow_mut().set("x", num(5));
        assert_eq!(global_env.borrow().get("x"), Ok(num(1)));
    }

    #[test]
    fn test_define_global_lands_in_root() {
        let global_env = Environment::new();
        let local_env = Environment::new_enclosed(global_env.clone());
        let inner_env = Environment::new_enclosed(local_env.clone());

        inner_env.borrow_mut().define_global("g", num(7));

        assert_eq!(global_env.borrow().get("g"), Ok(num(7)));
        assert!(local_env.borrow().bindings.get("g").is_none());
        assert!(inner_env.borrow().bindings.get("g").is_none());
    }

    #[test]
    fn test_copy_is_independent_but_shares_parent() {
        let global_env = Environment::new();
        let local_env = Environment::new_enclosed(global_env.clone());
        local_env.borrow_mut().set("x", num(1));

        let copied = local_env.borrow().copy();
        copied.borrow_mut().set("x", num(2));
        assert_eq!(local_env.borrow().get("x"), Ok(num(1)));
        assert_eq!(copied.borrow().get("x"), Ok(num(2)));

        // A later global definition is visible through both
        global_env.borrow_mut().set("g", num(3));
        assert_eq!(copied.borrow().get("g"), Ok(num(3)));
        assert_eq!(local_env.borrow().get("g"), Ok(num(3)));
    }

    #[test]
    fn test_get_returns_independent_copy() {
        let env = Environment::new();
        env.borrow_mut()
            .set("xs", Value::Sequence(vec![num(1), num(2)]));
        let mut fetched = env.borrow().get("xs").unwrap();
        if let Value::Sequence(items) = &mut fetched {
            items.push(num(3));
        }
        assert_eq!(
            env.borrow().get("xs"),
            Ok(Value::Sequence(vec![num(1), num(2)]))
        );
    }

    #[test]
    fn test_with_parent_none_is_root() {
        let root = Environment::with_parent(None);
        assert!(root.borrow().is_root());
        let child = Environment::with_parent(Some(root));
        assert!(!child.borrow().is_root());
    }

    #[test]
    fn test_populated_environment_has_builtins() {
        let env = Environment::new_global_populated();
        let identifiers = env.borrow().get_identifiers();
        for name in ["+", "-", "*", "/", "lambda", "macro", "if", "define", "head", "\\"] {
            assert!(identifiers.contains(name), "missing {}", name);
        }
        assert_eq!(
            env.borrow().get("\\"),
            Ok(Value::Primitive(Builtin::Lambda))
        );
    }
}
