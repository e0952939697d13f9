// SPDX-License-Identifier: Apache-2.0

//! A small expression language for behavioral module bodies.
//!
//! Programs are plain serde data, so they can be written by hand as JSON:
//!
//! ```json
//! {
//!   "modules": [
//!     {
//!       "name": "add4",
//!       "input_widths": [4, 4],
//!       "outputs": [
//!         {"width": 5, "expr": {"op": "add",
//!                               "lhs": {"op": "input", "index": 0},
//!                               "rhs": {"op": "input", "index": 1}}}
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::behavior::{behavior_fn, BehaviorError, BehaviorFn, BehavioralProgram, BehaviorRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BehaviorExpr {
    /// The word on input port `index`, masked to the port's width.
    Input { index: usize },
    Const { value: u64 },
    Not { arg: Box<BehaviorExpr> },
    And { lhs: Box<BehaviorExpr>, rhs: Box<BehaviorExpr> },
    Or { lhs: Box<BehaviorExpr>, rhs: Box<BehaviorExpr> },
    Xor { lhs: Box<BehaviorExpr>, rhs: Box<BehaviorExpr> },
    /// Wrapping 64-bit addition; the result is masked by the output width.
    Add { lhs: Box<BehaviorExpr>, rhs: Box<BehaviorExpr> },
    /// 1 if equal, else 0.
    Eq { lhs: Box<BehaviorExpr>, rhs: Box<BehaviorExpr> },
    /// `on_true` if `sel` is non-zero.
    Mux {
        sel: Box<BehaviorExpr>,
        on_true: Box<BehaviorExpr>,
        on_false: Box<BehaviorExpr>,
    },
    /// Output port `output` of another module, resolved through the registry
    /// at evaluation time.
    Call {
        module: String,
        args: Vec<BehaviorExpr>,
        #[serde(default)]
        output: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExprOutput {
    pub width: usize,
    pub expr: BehaviorExpr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExprModule {
    pub name: String,
    pub input_widths: Vec<usize>,
    pub outputs: Vec<ExprOutput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExprProgram {
    pub modules: Vec<ExprModule>,
}

fn width_mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

impl BehaviorExpr {
    fn check(&self, module: &ExprModule) -> Result<(), BehaviorError> {
        let compile_error = |message: String| BehaviorError::Compile {
            module: module.name.clone(),
            message,
        };
        match self {
            BehaviorExpr::Input { index } => {
                if *index >= module.input_widths.len() {
                    return Err(compile_error(format!(
                        "input {} out of range; module has {} inputs",
                        index,
                        module.input_widths.len()
                    )));
                }
                Ok(())
            }
            BehaviorExpr::Const { .. } => Ok(()),
            BehaviorExpr::Not { arg } => arg.check(module),
            BehaviorExpr::And { lhs, rhs }
            | BehaviorExpr::Or { lhs, rhs }
            | BehaviorExpr::Xor { lhs, rhs }
            | BehaviorExpr::Add { lhs, rhs }
            | BehaviorExpr::Eq { lhs, rhs } => {
                lhs.check(module)?;
                rhs.check(module)
            }
            BehaviorExpr::Mux {
                sel,
                on_true,
                on_false,
            } => {
                sel.check(module)?;
                on_true.check(module)?;
                on_false.check(module)
            }
            BehaviorExpr::Call { module: callee, args, .. } => {
                if callee.is_empty() {
                    return Err(compile_error("call with an empty module name".to_string()));
                }
                args.iter().try_for_each(|a| a.check(module))
            }
        }
    }

    /// Evaluates this expression inside `module`, whose packed inputs are
    /// `inputs`.
    pub(crate) fn eval(
        &self,
        module: &str,
        registry: &BehaviorRegistry,
        inputs: &[u64],
    ) -> Result<u64, BehaviorError> {
        let eval = |e: &BehaviorExpr| e.eval(module, registry, inputs);
        let v = match self {
            BehaviorExpr::Input { index } => {
                *inputs.get(*index).ok_or_else(|| BehaviorError::InputIndex {
                    module: module.to_string(),
                    index: *index,
                    inputs: inputs.len(),
                })?
            }
            BehaviorExpr::Const { value } => *value,
            BehaviorExpr::Not { arg } => !eval(arg)?,
            BehaviorExpr::And { lhs, rhs } => eval(lhs)? & eval(rhs)?,
            BehaviorExpr::Or { lhs, rhs } => eval(lhs)? | eval(rhs)?,
            BehaviorExpr::Xor { lhs, rhs } => eval(lhs)? ^ eval(rhs)?,
            BehaviorExpr::Add { lhs, rhs } => eval(lhs)?.wrapping_add(eval(rhs)?),
            BehaviorExpr::Eq { lhs, rhs } => (eval(lhs)? == eval(rhs)?) as u64,
            BehaviorExpr::Mux {
                sel,
                on_true,
                on_false,
            } => {
                if eval(sel)? != 0 {
                    eval(on_true)?
                } else {
                    eval(on_false)?
                }
            }
            BehaviorExpr::Call {
                module: callee,
                args,
                output,
            } => {
                let words = args.iter().map(eval).collect::<Result<Vec<u64>, _>>()?;
                let outs = registry.call(callee, &words)?;
                *outs.get(*output).ok_or_else(|| BehaviorError::OutputIndex {
                    module: callee.clone(),
                    output: *output,
                    outputs: outs.len(),
                })?
            }
        };
        Ok(v)
    }
}

impl ExprModule {
    /// Evaluates every output of this module on already-packed inputs.
    pub fn eval(
        &self,
        registry: &BehaviorRegistry,
        args: &[u64],
    ) -> Result<Vec<u64>, BehaviorError> {
        if args.len() != self.input_widths.len() {
            return Err(BehaviorError::ArityMismatch {
                module: self.name.clone(),
                expected: self.input_widths.len(),
                actual: args.len(),
            });
        }
        let masked: Vec<u64> = args
            .iter()
            .zip(&self.input_widths)
            .map(|(v, w)| v & width_mask(*w))
            .collect();
        self.outputs
            .iter()
            .map(|o| Ok(o.expr.eval(&self.name, registry, &masked)? & width_mask(o.width)))
            .collect()
    }
}

impl ExprProgram {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| anyhow!(format!("parsing behavior program: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow!(format!("reading behavior program '{}': {}", path.display(), e)))?;
        Self::from_json_str(&text).map_err(|e| anyhow!(format!("{}: {}", path.display(), e)))
    }
}

impl BehavioralProgram for ExprProgram {
    type ModuleAst = ExprModule;

    fn modules(&self) -> Vec<(String, ExprModule)> {
        self.modules.iter().map(|m| (m.name.clone(), m.clone())).collect()
    }

    fn compile_module(&self, name: &str, ast: &ExprModule) -> Result<BehaviorFn, BehaviorError> {
        for output in &ast.outputs {
            output.expr.check(ast)?;
        }
        log::debug!(
            "compile_module; '{}' with {} inputs and {} outputs",
            name,
            ast.input_widths.len(),
            ast.outputs.len()
        );
        let module = ast.clone();
        Ok(behavior_fn(move |registry, args| module.eval(registry, args)))
    }
}
