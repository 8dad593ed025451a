//! Stack interpreter for flat postfix instruction trees.
//!
//! A [`Model`] supplies the per-instruction behaviour of one problem domain
//! (execution, text, random generation, mutation, graph rendering); the
//! provided methods drive whole trees on top of it.

pub mod fuzzy;
pub mod instruction;

pub use fuzzy::{fuzzy_threshold, FuzzyRuleModel};
pub use instruction::{Instruction, Opcode};

use crate::config::ModelConfig;
use crate::data::Dataset;
use crate::error::{EfrError, Result};
use rand::RngCore;
use std::fmt::Write;

/// Terminal probability used for the root of a random tree
pub const INITIAL_TERMINAL_PROBABILITY: f64 = 0.2;
/// Growth of the terminal probability per recursion level
pub const TERMINAL_PROBABILITY_GROWTH: f64 = 1.1;

/// Everything an instruction may read while one data row is executed
pub struct RowFrame<'a> {
    pub dataset: &'a Dataset,
    pub row_idx: usize,
    /// Estimates produced so far, `outputs` values per row
    pub estimates: &'a [f64],
    pub outputs: usize,
}

impl<'a> RowFrame<'a> {
    pub fn row(&self) -> &'a [f64] {
        self.dataset.row(self.row_idx)
    }

    /// Row `lag` records back; the caller checks `row_idx > lag`
    pub fn past_row(&self, lag: usize) -> &'a [f64] {
        self.dataset.row(self.row_idx - lag)
    }

    /// Estimates of the row `lag` records back; the caller checks `row_idx > lag`
    pub fn past_estimates(&self, lag: usize) -> &'a [f64] {
        let start = (self.row_idx - lag) * self.outputs;
        &self.estimates[start..start + self.outputs]
    }
}

pub trait Model: Send + Sync {
    fn config(&self) -> &ModelConfig;

    /// Execute a single instruction against the stack
    fn execute_instruction(
        &self,
        instruction: &Instruction,
        stack: &mut Vec<f64>,
        frame: &RowFrame<'_>,
    ) -> Result<()>;

    /// Random node: a terminal with probability `terminal_probability`,
    /// otherwise an operator
    fn random_instruction(
        &self,
        inputs: usize,
        targets: usize,
        terminal_probability: f64,
        rng: &mut dyn RngCore,
    ) -> Instruction;

    /// Random node of the given arity
    fn random_instruction_of_arity(
        &self,
        arity: usize,
        inputs: usize,
        targets: usize,
        rng: &mut dyn RngCore,
    ) -> Instruction;

    /// Mutate weight or operands in place
    fn mutate_instruction(
        &self,
        instruction: &mut Instruction,
        inputs: usize,
        targets: usize,
        rng: &mut dyn RngCore,
    );

    /// Emit the DOT node for `instruction` at position `idx`, popping its
    /// children from `stack` and pushing itself
    fn dottify_instruction(
        &self,
        instruction: &Instruction,
        stack: &mut Vec<usize>,
        idx: usize,
        out: &mut String,
    );

    /// Best-effort parse; unknown tokens are logged and become no-ops
    fn parse_instruction(&self, token: &str) -> Instruction {
        match token.parse::<Instruction>() {
            Ok(instruction) => instruction,
            Err(e) => {
                log::warn!("{}", e);
                let weight = token
                    .rsplit_once(':')
                    .and_then(|(_, w)| w.parse().ok())
                    .unwrap_or(0.0);
                Instruction::new(Opcode::NoOp, weight)
            }
        }
    }

    fn print_instruction(&self, instruction: &Instruction, out: &mut String) {
        let _ = write!(out, "{}", instruction);
    }

    /// Run `tree` over every row of `dataset`, storing the residual of each
    /// row at `estimates[row * outputs + output_idx]`.
    fn execute(
        &self,
        tree: &[Instruction],
        dataset: &Dataset,
        estimates: &mut [f64],
        output_idx: usize,
        outputs: usize,
    ) -> Result<()> {
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Executing: {}", self.print(tree));
        }

        let mut stack = Vec::with_capacity(tree.len());

        for row_idx in 0..dataset.records() {
            stack.clear();
            {
                let frame = RowFrame {
                    dataset,
                    row_idx,
                    estimates: &*estimates,
                    outputs,
                };
                for instruction in tree {
                    self.execute_instruction(instruction, &mut stack, &frame)?;
                }
            }

            let residual = stack.pop();
            match residual {
                Some(value) if stack.is_empty() => {
                    estimates[row_idx * outputs + output_idx] = value;
                }
                _ => {
                    let depth = stack.len() + usize::from(residual.is_some());
                    log::error!(
                        "Something went wrong. Stack size is {} instead of 1 for tree {}",
                        depth,
                        self.print(tree)
                    );
                    return Err(EfrError::StructuralCorruption(format!(
                        "residual stack depth {} at row {}",
                        depth, row_idx
                    )));
                }
            }
        }

        Ok(())
    }

    /// Random well-formed tree in postfix order
    fn random_tree(&self, inputs: usize, targets: usize, rng: &mut dyn RngCore) -> Vec<Instruction> {
        let mut stack = Vec::new();
        grow_tree(self, inputs, targets, INITIAL_TERMINAL_PROBABILITY, &mut stack, true, rng);
        stack
    }

    fn print(&self, tree: &[Instruction]) -> String {
        let mut out = String::new();
        for (i, instruction) in tree.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.print_instruction(instruction, &mut out);
        }
        out
    }

    /// Remove no-op placeholders from an instruction buffer
    fn compact(&self, instructions: &mut Vec<Instruction>) {
        compact(instructions);
    }

    /// Directed graph of one tree in the DOT language
    fn dot(&self, tree: &[Instruction]) -> String {
        let mut out = String::from("digraph query { ");
        let mut stack = Vec::new();
        for (idx, instruction) in tree.iter().enumerate() {
            self.dottify_instruction(instruction, &mut stack, idx, &mut out);
        }
        out.push('}');
        out
    }
}

fn grow_tree<M: Model + ?Sized>(
    model: &M,
    inputs: usize,
    targets: usize,
    terminal_probability: f64,
    stack: &mut Vec<Instruction>,
    is_root: bool,
    rng: &mut dyn RngCore,
) {
    let node = if is_root && model.config().nontrivial {
        model.random_instruction(inputs, targets, 0.0, rng)
    } else {
        model.random_instruction(inputs, targets, terminal_probability, rng)
    };

    for _ in 0..node.arity() {
        grow_tree(
            model,
            inputs,
            targets,
            terminal_probability * TERMINAL_PROBABILITY_GROWTH,
            stack,
            false,
            rng,
        );
    }

    stack.push(node);
}

/// Drop no-op placeholders
pub fn compact(instructions: &mut Vec<Instruction>) {
    instructions.retain(|i| !i.is_noop());
}

/// Stack depth left by executing `tree`, `None` on underflow
pub fn residual_depth(tree: &[Instruction]) -> Option<usize> {
    let mut depth = 0usize;
    for instruction in tree {
        match instruction.opcode {
            Opcode::NoOp | Opcode::Separator => {}
            Opcode::ProcessAll => {
                if depth == 0 {
                    return None;
                }
                depth = 1;
            }
            opcode => {
                depth = depth.checked_sub(opcode.arity())? + 1;
            }
        }
    }
    Some(depth)
}

/// Exactly one value left and no underflow
pub fn is_well_formed(tree: &[Instruction]) -> bool {
    !tree.iter().any(Instruction::is_separator) && residual_depth(tree) == Some(1)
}
