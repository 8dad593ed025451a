//! A forest is the flat concatenation of one postfix tree per output, each
//! terminated by a separator.

use super::individual::Individual;
use crate::config::ModelConfig;
use crate::data::Dataset;
use crate::engines::evaluation::{apply_parsimony, ErrorRates, TargetErrorRates};
use crate::engines::model::{self, FuzzyRuleModel, Instruction, Model, Opcode};
use crate::error::{EfrError, Result};
use rand::Rng;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Probability of an in-place instruction mutation
const MUTATE_IN_PLACE: f64 = 0.5;
/// Upper bound of the roll that inserts a unary node
const INSERT_UNARY: f64 = 0.6;
/// Probability of a point change over a subtree replacement
const POINT_CHANGE: f64 = 0.8;
/// Live instructions a tree must exceed before a unary node may be dropped
const MIN_LIVE_FOR_DELETION: usize = 3;
/// Nontrivial offspring must be longer than this
const MIN_NONTRIVIAL_LEN: usize = 2;

/// Read-only state shared by every forest of a run
pub struct ForestContext {
    pub dataset: Dataset,
    pub model: Box<dyn Model>,
    pub error_rates: Box<dyn ErrorRates>,
}

impl ForestContext {
    pub fn new(dataset: Dataset, model: Box<dyn Model>, error_rates: Box<dyn ErrorRates>) -> Arc<Self> {
        Arc::new(Self {
            dataset,
            model,
            error_rates,
        })
    }

    /// Fuzzy rule model scored against the dataset targets
    pub fn fuzzy(dataset: Dataset, config: ModelConfig) -> Arc<Self> {
        Self::new(
            dataset,
            Box::new(FuzzyRuleModel::new(config)),
            Box::new(TargetErrorRates),
        )
    }

    pub fn config(&self) -> &ModelConfig {
        self.model.config()
    }
}

impl fmt::Debug for ForestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForestContext")
            .field("records", &self.dataset.records())
            .field("inputs", &self.dataset.inputs())
            .field("targets", &self.dataset.targets())
            .field("config", self.config())
            .finish()
    }
}

/// Leftmost index of the subtree whose root sits at `right` and consumes
/// `arity` operands. No-ops inside the span are skipped. A process-all node
/// consumes the whole stack, so its span reaches back to the tree start.
pub fn subtree_left(instructions: &[Instruction], right: usize, arity: usize) -> usize {
    if instructions.get(right).map_or(false, |i| i.opcode == Opcode::ProcessAll) {
        return tree_start(instructions, right);
    }
    let mut required = arity;
    let mut from = right;
    while required > 0 && from > 0 {
        from -= 1;
        let instruction = &instructions[from];
        if instruction.opcode == Opcode::ProcessAll {
            return tree_start(instructions, from);
        }
        if !instruction.is_noop() {
            required = required - 1 + instruction.arity();
        }
    }
    from
}

fn tree_start(instructions: &[Instruction], at: usize) -> usize {
    instructions[..at]
        .iter()
        .rposition(Instruction::is_separator)
        .map_or(0, |separator| separator + 1)
}

fn live_count(instructions: &[Instruction]) -> usize {
    instructions.iter().filter(|i| !i.is_noop()).count()
}

fn separator_from(instructions: &[Instruction], from: usize) -> usize {
    instructions[from..]
        .iter()
        .position(Instruction::is_separator)
        .map(|offset| from + offset)
        .unwrap_or(instructions.len())
}

/// Append the live part of `tree` and its separator
fn copy_tree(dest: &mut Vec<Instruction>, tree: &[Instruction]) {
    dest.extend(tree.iter().filter(|i| !i.is_noop()));
    dest.push(Instruction::separator());
}

#[derive(Debug, Clone)]
pub struct Forest {
    context: Arc<ForestContext>,
    instructions: Vec<Instruction>,
    outputs: usize,
    estimates: Vec<f64>,
    fitness: Option<f64>,
    p1: f64,
    p2: f64,
}

impl Forest {
    /// Takes ownership of a raw buffer; a missing final separator is added
    pub fn from_instructions(context: Arc<ForestContext>, mut instructions: Vec<Instruction>) -> Self {
        if instructions.last().map_or(false, |i| !i.is_separator()) {
            log::warn!("Forest does not end with a separator, closing the last tree");
            instructions.push(Instruction::separator());
        }
        let outputs = instructions.iter().filter(|i| i.is_separator()).count();
        let estimates = vec![0.0; context.dataset.records() * outputs];
        Self {
            context,
            instructions,
            outputs,
            estimates,
            fitness: None,
            p1: 1.0,
            p2: 1.0,
        }
    }

    /// One random tree per dataset target
    pub fn random<R: Rng>(context: Arc<ForestContext>, rng: &mut R) -> Self {
        let inputs = context.dataset.inputs();
        let targets = context.dataset.targets();
        let mut instructions = Vec::new();
        for _ in 0..targets {
            instructions.extend(context.model.random_tree(inputs, targets, rng));
            instructions.push(Instruction::separator());
        }
        Self::from_instructions(context, instructions)
    }

    /// Best-effort parse of whitespace separated tokens
    pub fn parse(context: Arc<ForestContext>, text: &str) -> Self {
        let instructions = text
            .split_whitespace()
            .map(|token| context.model.parse_instruction(token))
            .collect();
        Self::from_instructions(context, instructions)
    }

    pub fn from_json(context: Arc<ForestContext>, json: &str) -> Result<Self> {
        let instructions: Vec<Instruction> = serde_json::from_str(json)?;
        Ok(Self::from_instructions(context, instructions))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.instructions)?)
    }

    pub fn context(&self) -> &Arc<ForestContext> {
        &self.context
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of trees
    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// Estimates of the last evaluation, `outputs` values per row
    pub fn estimates(&self) -> &[f64] {
        &self.estimates
    }

    pub fn p1(&self) -> f64 {
        self.p1
    }

    pub fn p2(&self) -> f64 {
        self.p2
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Instruction ranges of every tree, separators excluded
    pub fn trees(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::with_capacity(self.outputs);
        let mut start = 0;
        while start < self.instructions.len() {
            let end = separator_from(&self.instructions, start);
            ranges.push(start..end);
            start = end + 1;
        }
        ranges
    }

    /// Range of the tree containing `idx`, separator excluded
    fn tree_of(&self, idx: usize) -> Range<usize> {
        let start = self.instructions[..idx]
            .iter()
            .rposition(Instruction::is_separator)
            .map_or(0, |p| p + 1);
        start..separator_from(&self.instructions, idx)
    }

    fn live_in_tree(&self, idx: usize) -> usize {
        self.instructions[self.tree_of(idx)]
            .iter()
            .filter(|i| i.is_live())
            .count()
    }

    pub fn subtree_left(&self, right: usize, arity: usize) -> usize {
        subtree_left(&self.instructions, right, arity)
    }

    /// Run every tree over the dataset and refresh the error statistics
    pub fn evaluate(&mut self) -> Result<()> {
        let context = Arc::clone(&self.context);
        let dataset = &context.dataset;

        self.estimates.clear();
        self.estimates.resize(dataset.records() * self.outputs, 0.0);

        for (output_idx, range) in self.trees().into_iter().enumerate() {
            context.model.execute(
                &self.instructions[range],
                dataset,
                &mut self.estimates,
                output_idx,
                self.outputs,
            )?;
        }

        let (p1, p2) = context
            .error_rates
            .error_rates(dataset, &self.estimates, self.outputs);
        self.p1 = p1;
        self.p2 = p2;
        Ok(())
    }

    /// Every tree well-formed and one tree per output
    pub fn validate(&self) -> Result<()> {
        let trees = self.trees();
        if trees.len() != self.outputs {
            return Err(EfrError::StructuralCorruption(format!(
                "{} trees for {} outputs",
                trees.len(),
                self.outputs
            )));
        }
        for (idx, range) in trees.into_iter().enumerate() {
            if !model::is_well_formed(&self.instructions[range.clone()]) {
                return Err(EfrError::StructuralCorruption(format!(
                    "tree {} is not well formed: {}",
                    idx,
                    self.context.model.print(&self.instructions[range])
                )));
            }
        }
        Ok(())
    }

    /// Drop no-op placeholders
    pub fn compact(&mut self) {
        self.context.model.compact(&mut self.instructions);
        self.fitness = None;
    }

    /// DOT graph of every tree, one `digraph` per line
    pub fn dot(&self) -> String {
        self.trees()
            .into_iter()
            .map(|range| self.context.model.dot(&self.instructions[range]))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn param_count(&self) -> usize {
        self.instructions.iter().filter(|i| i.is_live()).count()
    }

    /// Weights of the live instructions in buffer order
    pub fn params(&self) -> Vec<f64> {
        self.instructions
            .iter()
            .filter(|i| i.is_live())
            .map(|i| i.weight)
            .collect()
    }

    pub fn set_params(&mut self, params: &[f64]) -> Result<()> {
        let expected = self.param_count();
        if params.len() != expected {
            return Err(EfrError::Evaluation(format!(
                "Expected {} parameters, got {}",
                expected,
                params.len()
            )));
        }
        for (instruction, &weight) in self
            .instructions
            .iter_mut()
            .filter(|i| i.is_live())
            .zip(params)
        {
            instruction.weight = weight;
        }
        self.fitness = None;
        Ok(())
    }
}

impl Individual for Forest {
    fn compute_fitness(&mut self) -> Result<f64> {
        self.fitness = None;
        self.evaluate()?;

        let config = self.context.config();
        let fitness = config.fitness.combine(self.p1, self.p2, config.beta);
        let fitness = apply_parsimony(fitness, self.instructions.len(), config.max_instructions);

        log::debug!("Fitness {:.6} (p1 {:.4}, p2 {:.4})", fitness, self.p1, self.p2);
        self.fitness = Some(fitness);
        Ok(fitness)
    }

    fn fitness(&self) -> f64 {
        self.fitness.unwrap_or(0.0)
    }

    fn mutate<R: Rng>(&mut self, probability: f64, rng: &mut R) {
        let context = Arc::clone(&self.context);
        let model = context.model.as_ref();
        let inputs = context.dataset.inputs();
        let targets = context.dataset.targets();
        let allow_not = context.config().allow_not;
        let nontrivial = context.config().nontrivial;

        let mut i = 0;
        while i < self.instructions.len() {
            if !self.instructions[i].is_live() || rng.gen::<f64>() >= probability {
                i += 1;
                continue;
            }

            let roll = rng.gen::<f64>();
            if roll < MUTATE_IN_PLACE {
                model.mutate_instruction(&mut self.instructions[i], inputs, targets, rng);
            } else if roll < INSERT_UNARY && allow_not {
                let unary = model.random_instruction_of_arity(1, inputs, targets, rng);
                match self.instructions.get(i + 1) {
                    Some(next) if next.is_noop() => self.instructions[i + 1] = unary,
                    _ => self.instructions.insert(i + 1, unary),
                }
                i += 1;
            } else if rng.gen::<f64>() < POINT_CHANGE {
                let arity = self.instructions[i].arity();
                if self.instructions[i].opcode == Opcode::ProcessAll {
                    // the aggregate keeps its opcode, only its parameters move
                    model.mutate_instruction(&mut self.instructions[i], inputs, targets, rng);
                } else if arity == 1 && (self.live_in_tree(i) > MIN_LIVE_FOR_DELETION || !nontrivial) {
                    self.instructions[i] = Instruction::noop();
                } else {
                    self.instructions[i] = model.random_instruction_of_arity(arity, inputs, targets, rng);
                }
            } else {
                let left = self.subtree_left(i, self.instructions[i].arity());
                let subtree = model.random_tree(inputs, targets, rng);
                let inserted = subtree.len();
                self.instructions.splice(left..=i, subtree);
                i = left + inserted - 1;
            }
            i += 1;
        }

        self.fitness = None;
    }

    fn crossover<R: Rng>(&mut self, other: &mut Self, probability: f64, rng: &mut R) {
        if self.outputs != other.outputs {
            log::warn!(
                "Cannot cross forests with {} and {} trees",
                self.outputs,
                other.outputs
            );
            return;
        }

        let nontrivial = self.context.config().nontrivial;
        let a = &self.instructions;
        let b = &other.instructions;
        let mut son = Vec::with_capacity(a.len().max(b.len()));
        let mut daughter = Vec::with_capacity(a.len().max(b.len()));
        let (mut p1, mut p2) = (0, 0);

        for _ in 0..self.outputs {
            let end1 = separator_from(a, p1);
            let end2 = separator_from(b, p2);

            if end1 > p1 && end2 > p2 && rng.gen::<f64>() < probability {
                let r1 = rng.gen_range(p1..end1);
                let r2 = rng.gen_range(p2..end2);

                if a[r1].is_noop() || b[r2].is_noop() {
                    copy_tree(&mut son, &a[p1..end1]);
                    copy_tree(&mut daughter, &b[p2..end2]);
                } else {
                    let left1 = subtree_left(a, r1, a[r1].arity());
                    let left2 = subtree_left(b, r2, b[r2].arity());
                    let len1 = live_count(&a[left1..r1]);
                    let len2 = live_count(&b[left2..r2]);
                    let tree1 = live_count(&a[p1..end1]);
                    let tree2 = live_count(&b[p2..end2]);

                    let degenerate = (len1 == 0 && len2 + 1 == tree2)
                        || (len2 == 0 && len1 + 1 == tree1);
                    if nontrivial && degenerate {
                        copy_tree(&mut son, &a[p1..end1]);
                        copy_tree(&mut daughter, &b[p2..end2]);
                    } else {
                        let live = |i: &&Instruction| !i.is_noop();
                        son.extend(a[p1..left1].iter().filter(live));
                        son.extend(b[left2..=r2].iter().filter(live));
                        copy_tree(&mut son, &a[r1 + 1..end1]);

                        daughter.extend(b[p2..left2].iter().filter(live));
                        daughter.extend(a[left1..=r1].iter().filter(live));
                        copy_tree(&mut daughter, &b[r2 + 1..end2]);
                    }
                }
            } else {
                copy_tree(&mut son, &a[p1..end1]);
                copy_tree(&mut daughter, &b[p2..end2]);
            }

            p1 = end1 + 1;
            p2 = end2 + 1;
        }

        if !nontrivial || (son.len() > MIN_NONTRIVIAL_LEN && daughter.len() > MIN_NONTRIVIAL_LEN) {
            self.instructions = son;
            other.instructions = daughter;
            self.fitness = None;
            other.fitness = None;
        } else {
            log::debug!("Discarding crossover offspring shorter than {} instructions", MIN_NONTRIVIAL_LEN + 1);
        }
    }

    fn len(&self) -> usize {
        self.instructions.len()
    }
}

/// Space separated tokens; a formatter precision applies to every weight
impl fmt::Display for Forest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instruction) in self.instructions.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match f.precision() {
                Some(precision) => write!(f, "{:.*}", precision, instruction)?,
                None => write!(f, "{}", instruction)?,
            }
        }
        Ok(())
    }
}
