use super::{Instruction, Model, Opcode, RowFrame};
use crate::config::ModelConfig;
use crate::error::{EfrError, Result};
use rand::{Rng, RngCore};
use std::fmt::Write;

/// Probability of drawing the unary operator among non-terminals
const NOT_PROBABILITY: f64 = 0.2;
/// Below this roll a terminal becomes a lagged input
const PAST_INPUT_THRESHOLD: f64 = 0.25;
/// Below this roll a terminal becomes a lagged output
const PAST_OUTPUT_THRESHOLD: f64 = 0.5;
/// Roll used when the dataset has no ordinary inputs
const NO_INPUT_ROLL: f64 = 0.3;
/// In-place mutation below this rerolls the weight
const WEIGHT_MUTATION_THRESHOLD: f64 = 0.5;
/// Lagged terminals below this reroll their lag, above it their operand
const LAG_MUTATION_THRESHOLD: f64 = 0.6;

/// Piecewise-linear fuzzy threshold of `value` around `weight`
pub fn fuzzy_threshold(value: f64, weight: f64) -> f64 {
    let p = (1.0 + weight) / 2.0;
    let q = (1.0 - weight * weight) / 4.0;
    if weight > value {
        p * value / weight
    } else {
        p + q * (value - weight) / (1.0 - weight)
    }
}

/// Fuzzy rule interpreter: every node pushes a threshold-shaped degree of truth
#[derive(Debug, Clone, Default)]
pub struct FuzzyRuleModel {
    config: ModelConfig,
}

impl FuzzyRuleModel {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    fn random_terminal(&self, inputs: usize, targets: usize, rng: &mut dyn RngCore) -> Instruction {
        let roll = if inputs == 0 { NO_INPUT_ROLL } else { rng.gen::<f64>() };

        if roll < PAST_INPUT_THRESHOLD && self.config.past_input_limit > 0 {
            let lag = random_lag(self.config.past_input_limit, rng);
            Instruction::past_input(random_index(inputs, rng), lag, 0.0)
        } else if roll < PAST_OUTPUT_THRESHOLD && self.config.past_output_limit > 0 {
            let lag = random_lag(self.config.past_output_limit, rng);
            Instruction::past_output(random_index(targets, rng), lag, 0.0)
        } else {
            Instruction::input(random_index(inputs, rng), 0.0)
        }
    }

    fn random_binary(&self, rng: &mut dyn RngCore) -> Instruction {
        let opcode = Opcode::BINARY[rng.gen_range(0..Opcode::BINARY.len())];
        Instruction::new(opcode, 0.0)
    }

    fn pop(&self, stack: &mut Vec<f64>, instruction: &Instruction) -> Result<f64> {
        stack.pop().ok_or_else(|| {
            log::error!("Stack underflow executing {}", instruction);
            EfrError::StructuralCorruption(format!("stack underflow at {}", instruction))
        })
    }
}

fn random_index(max: usize, rng: &mut dyn RngCore) -> usize {
    if max < 2 {
        0
    } else {
        rng.gen_range(0..max)
    }
}

fn random_lag(limit: usize, rng: &mut dyn RngCore) -> usize {
    if limit > 1 {
        rng.gen_range(1..limit)
    } else {
        1
    }
}

/// Replace `slot` by a uniform draw from `[low, high)` other than its current
/// value; `false` when there is no alternative
fn reroll(slot: &mut usize, low: usize, high: usize, rng: &mut dyn RngCore) -> bool {
    if high <= low + 1 {
        return false;
    }
    let candidate = rng.gen_range(low..high - 1);
    *slot = if candidate >= *slot { candidate + 1 } else { candidate };
    true
}

fn operand(values: &[f64], index: usize) -> Result<f64> {
    values.get(index).copied().ok_or(EfrError::OperandOutOfRange {
        index,
        width: values.len(),
    })
}

impl Model for FuzzyRuleModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn execute_instruction(
        &self,
        instruction: &Instruction,
        stack: &mut Vec<f64>,
        frame: &RowFrame<'_>,
    ) -> Result<()> {
        let weight = instruction.weight;
        let value = match instruction.opcode {
            Opcode::NoOp | Opcode::Separator => return Ok(()),
            Opcode::Input => operand(frame.row(), instruction.value)?,
            Opcode::PastInput => {
                if frame.row_idx > instruction.lag {
                    operand(frame.past_row(instruction.lag), instruction.value)?
                } else {
                    operand(frame.row(), instruction.value)?
                }
            }
            Opcode::PastOutput => {
                if frame.row_idx > instruction.lag {
                    operand(frame.past_estimates(instruction.lag), instruction.value)?
                } else if frame.dataset.inputs() == 0 {
                    operand(frame.row(), instruction.value)?
                } else {
                    0.0
                }
            }
            Opcode::Not => 1.0 - self.pop(stack, instruction)?,
            Opcode::And | Opcode::Or | Opcode::Sum | Opcode::Prod => {
                let a = self.pop(stack, instruction)?;
                let b = self.pop(stack, instruction)?;
                match instruction.opcode {
                    Opcode::And => a.min(b),
                    Opcode::Or => a.max(b),
                    Opcode::Sum => a + b - a * b,
                    _ => a * b,
                }
            }
            Opcode::ProcessAll => {
                return Err(EfrError::UnsupportedInstruction(format!(
                    "{} is not executable by the fuzzy rule model",
                    instruction
                )))
            }
        };

        stack.push(fuzzy_threshold(value, weight));
        Ok(())
    }

    fn random_instruction(
        &self,
        inputs: usize,
        targets: usize,
        terminal_probability: f64,
        rng: &mut dyn RngCore,
    ) -> Instruction {
        let mut instruction = if rng.gen::<f64>() < terminal_probability {
            self.random_terminal(inputs, targets, rng)
        } else if rng.gen::<f64>() < NOT_PROBABILITY && self.config.allow_not {
            Instruction::new(Opcode::Not, 0.0)
        } else {
            self.random_binary(rng)
        };
        instruction.weight = rng.gen();
        instruction
    }

    fn random_instruction_of_arity(
        &self,
        arity: usize,
        inputs: usize,
        targets: usize,
        rng: &mut dyn RngCore,
    ) -> Instruction {
        let mut instruction = match arity {
            0 => self.random_terminal(inputs, targets, rng),
            1 => Instruction::new(Opcode::Not, 0.0),
            _ => self.random_binary(rng),
        };
        instruction.weight = rng.gen();
        instruction
    }

    fn mutate_instruction(
        &self,
        instruction: &mut Instruction,
        inputs: usize,
        targets: usize,
        rng: &mut dyn RngCore,
    ) {
        let roll = rng.gen::<f64>();
        let past_input_limit = self.config.past_input_limit;
        let past_output_limit = self.config.past_output_limit;
        let rerolled = roll >= WEIGHT_MUTATION_THRESHOLD
            && match instruction.opcode {
                Opcode::Input => reroll(&mut instruction.value, 0, inputs, rng),
                Opcode::PastInput if roll < LAG_MUTATION_THRESHOLD => {
                    reroll(&mut instruction.lag, 1, past_input_limit, rng)
                }
                Opcode::PastInput => reroll(&mut instruction.value, 0, inputs, rng),
                Opcode::PastOutput if roll < LAG_MUTATION_THRESHOLD => {
                    reroll(&mut instruction.lag, 1, past_output_limit, rng)
                }
                Opcode::PastOutput => reroll(&mut instruction.value, 0, targets, rng),
                _ => false,
            };

        if !rerolled {
            let previous = instruction.weight;
            instruction.weight = rng.gen();
            while instruction.weight == previous {
                instruction.weight = rng.gen();
            }
        }
    }

    fn dottify_instruction(
        &self,
        instruction: &Instruction,
        stack: &mut Vec<usize>,
        idx: usize,
        out: &mut String,
    ) {
        if !instruction.is_live() {
            return;
        }

        let _ = write!(out, "{} [ label = \"{:.3}\" ]; ", idx, instruction);
        for _ in 0..instruction.arity() {
            match stack.pop() {
                Some(child) => {
                    let _ = write!(out, "{} -> {}; ", idx, child);
                }
                None => log::error!("Unbalanced tree while rendering {}", instruction),
            }
        }
        stack.push(idx);
    }
}
