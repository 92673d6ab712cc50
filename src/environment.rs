use crate::object::Object;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a binding frame. Frames are multi-owner because several
/// closures may capture the same defining environment.
pub type Env = Rc<RefCell<Environment>>;

/// A chained binding store. `get` walks outward through the chain; `set`
/// always writes to the local frame.
#[derive(Debug, Default)]
pub struct Environment {
    store: HashMap<String, Object>,
    outer: Option<Env>,
}

impl Environment {
    pub fn new() -> Env {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// A fresh empty frame whose lookups fall through to `outer`. Used once
    /// per function call, linking to the function's captured environment.
    pub fn new_enclosed(outer: &Env) -> Env {
        Rc::new(RefCell::new(Environment {
            store: HashMap::new(),
            outer: Some(Rc::clone(outer)),
        }))
    }

    pub fn get(&self, name: &str) -> Option<Object> {
        match self.store.get(name) {
            Some(value) => Some(value.clone()),
            None => self
                .outer
                .as_ref()
                .and_then(|outer| outer.borrow().get(name)),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: Object) {
        self.store.insert(name.into(), value);
    }
}
