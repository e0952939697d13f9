// SPDX-License-Identifier: Apache-2.0

//! Compiled behaviors for un-flattened modules.
//!
//! A `BehavioralProgram` supplies module bodies in whatever form its front end
//! produces; `compile_all` turns every one of them into a `BehaviorFn` in a
//! single pass and collects them in a `BehaviorRegistry`. Because the registry
//! is handed to each function when it runs, a module may call any other
//! module regardless of the order they were declared or compiled in.

pub mod expr;

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maximum nesting of `BehaviorRegistry::call`; deeper chains are reported as
/// runaway recursion.
pub const MAX_CALL_DEPTH: usize = 64;

/// A compiled module body: packed input port words in, packed output port
/// words out (one `u64` per port, LSB first).
pub type BehaviorFn =
    Arc<dyn Fn(&BehaviorRegistry, &[u64]) -> Result<Vec<u64>, BehaviorError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BehaviorError {
    UnknownModule(String),
    DuplicateModule(String),
    ArityMismatch {
        module: String,
        expected: usize,
        actual: usize,
    },
    RecursionLimit { module: String, depth: usize },
    Compile { module: String, message: String },
    /// An input port index past the end of the packed arguments.
    InputIndex {
        module: String,
        index: usize,
        inputs: usize,
    },
    /// A call selected an output port the callee does not have.
    OutputIndex {
        module: String,
        output: usize,
        outputs: usize,
    },
}

impl std::fmt::Display for BehaviorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BehaviorError::UnknownModule(name) => write!(f, "no behavior for module '{}'", name),
            BehaviorError::DuplicateModule(name) => {
                write!(f, "module '{}' is defined more than once", name)
            }
            BehaviorError::ArityMismatch {
                module,
                expected,
                actual,
            } => write!(
                f,
                "module '{}' takes {} input ports but was given {}",
                module, expected, actual
            ),
            BehaviorError::RecursionLimit { module, depth } => write!(
                f,
                "call to '{}' exceeds the maximum call depth of {}",
                module, depth
            ),
            BehaviorError::Compile { module, message } => {
                write!(f, "compiling module '{}': {}", module, message)
            }
            BehaviorError::InputIndex {
                module,
                index,
                inputs,
            } => write!(
                f,
                "module '{}' reads input {} but only {} were given",
                module, index, inputs
            ),
            BehaviorError::OutputIndex {
                module,
                output,
                outputs,
            } => write!(
                f,
                "output {} of module '{}' selected but it has {} outputs",
                output, module, outputs
            ),
        }
    }
}

impl std::error::Error for BehaviorError {}

/// Wraps a closure as a `BehaviorFn`.
pub fn behavior_fn<F>(f: F) -> BehaviorFn
where
    F: Fn(&BehaviorRegistry, &[u64]) -> Result<Vec<u64>, BehaviorError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Source of module bodies for behavioral compilation.
pub trait BehavioralProgram {
    type ModuleAst: Clone;

    /// Every module in the program, by name.
    fn modules(&self) -> Vec<(String, Self::ModuleAst)>;

    fn compile_module(
        &self,
        name: &str,
        ast: &Self::ModuleAst,
    ) -> Result<BehaviorFn, BehaviorError>;
}

/// Name-keyed table of compiled behaviors.
#[derive(Default)]
pub struct BehaviorRegistry {
    functions: BTreeMap<String, BehaviorFn>,
    depth: Cell<usize>,
}

impl std::fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("modules", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Clone for BehaviorRegistry {
    fn clone(&self) -> Self {
        BehaviorRegistry {
            functions: self.functions.clone(),
            depth: Cell::new(0),
        }
    }
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, function: BehaviorFn) -> Result<(), BehaviorError> {
        if self.functions.contains_key(name) {
            return Err(BehaviorError::DuplicateModule(name.to_string()));
        }
        self.functions.insert(name.to_string(), function);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Invokes the behavior registered under `name`.
    pub fn call(&self, name: &str, args: &[u64]) -> Result<Vec<u64>, BehaviorError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| BehaviorError::UnknownModule(name.to_string()))?;
        let depth = self.depth.get();
        if depth >= MAX_CALL_DEPTH {
            return Err(BehaviorError::RecursionLimit {
                module: name.to_string(),
                depth: MAX_CALL_DEPTH,
            });
        }
        self.depth.set(depth + 1);
        let result = function(self, args);
        self.depth.set(depth);
        result
    }
}

/// Compiles every module of `program` into one registry.
pub fn compile_all<P: BehavioralProgram>(program: &P) -> Result<BehaviorRegistry, BehaviorError> {
    let mut registry = BehaviorRegistry::new();
    for (name, ast) in program.modules() {
        let function = program.compile_module(&name, &ast)?;
        registry.insert(&name, function)?;
    }
    log::info!("compile_all; compiled {} behavioral modules", registry.len());
    Ok(registry)
}
