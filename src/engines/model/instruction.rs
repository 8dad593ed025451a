use crate::error::EfrError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a GP node in the flat postfix encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    /// Placeholder skipped during execution, reclaimable by mutation
    NoOp,
    /// Terminates one tree of a forest
    Separator,

    Input,
    PastInput,
    PastOutput,

    Not,
    /// Consumes the whole stack in aggregating models; addressed as unary
    ProcessAll,

    And,
    Or,
    Sum,
    Prod,
}

impl Opcode {
    pub const BINARY: [Opcode; 4] = [Opcode::And, Opcode::Or, Opcode::Sum, Opcode::Prod];

    /// Number of stack values the instruction consumes
    pub fn arity(self) -> usize {
        match self {
            Opcode::NoOp | Opcode::Separator => 0,
            Opcode::Input | Opcode::PastInput | Opcode::PastOutput => 0,
            Opcode::Not | Opcode::ProcessAll => 1,
            Opcode::And | Opcode::Or | Opcode::Sum | Opcode::Prod => 2,
        }
    }

    /// No-op and separator never touch the stack
    pub fn is_special(self) -> bool {
        matches!(self, Opcode::NoOp | Opcode::Separator)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Opcode::Input | Opcode::PastInput | Opcode::PastOutput)
    }

    fn mnemonic(self) -> Option<&'static str> {
        match self {
            Opcode::Not => Some("not"),
            Opcode::And => Some("and"),
            Opcode::Or => Some("or"),
            Opcode::Sum => Some("sum"),
            Opcode::Prod => Some("prod"),
            _ => None,
        }
    }

    fn from_mnemonic(token: &str) -> Option<Self> {
        match token {
            "not" => Some(Opcode::Not),
            "and" => Some(Opcode::And),
            "or" => Some(Opcode::Or),
            "sum" => Some(Opcode::Sum),
            "prod" => Some(Opcode::Prod),
            _ => None,
        }
    }
}

/// One GP node.
///
/// `value` is the operand index (input feature or output), `lag` the lookback
/// depth of lagged terminals and `weight` the evolvable threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub value: usize,
    pub lag: usize,
    pub weight: f64,
}

impl Instruction {
    pub fn new(opcode: Opcode, weight: f64) -> Self {
        Self {
            opcode,
            value: 0,
            lag: 0,
            weight,
        }
    }

    pub fn input(value: usize, weight: f64) -> Self {
        Self {
            opcode: Opcode::Input,
            value,
            lag: 0,
            weight,
        }
    }

    pub fn past_input(value: usize, lag: usize, weight: f64) -> Self {
        Self {
            opcode: Opcode::PastInput,
            value,
            lag,
            weight,
        }
    }

    pub fn past_output(value: usize, lag: usize, weight: f64) -> Self {
        Self {
            opcode: Opcode::PastOutput,
            value,
            lag,
            weight,
        }
    }

    pub fn noop() -> Self {
        Self::new(Opcode::NoOp, 0.0)
    }

    pub fn separator() -> Self {
        Self::new(Opcode::Separator, 0.0)
    }

    pub fn arity(&self) -> usize {
        self.opcode.arity()
    }

    pub fn is_noop(&self) -> bool {
        self.opcode == Opcode::NoOp
    }

    pub fn is_separator(&self) -> bool {
        self.opcode == Opcode::Separator
    }

    /// Neither no-op nor separator
    pub fn is_live(&self) -> bool {
        !self.opcode.is_special()
    }
}

fn write_weight(f: &mut fmt::Formatter<'_>, weight: f64) -> fmt::Result {
    match f.precision() {
        Some(precision) => write!(f, "{:.*}", precision, weight),
        None => write!(f, "{}", weight),
    }
}

/// Renders the textual token; a formatter precision applies to the weight.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Opcode::NoOp => return write!(f, "x"),
            Opcode::Separator => return write!(f, ";"),
            Opcode::Input => write!(f, "t{}:", self.value)?,
            Opcode::PastInput => write!(f, "t{}[{}]:", self.value, self.lag)?,
            Opcode::PastOutput => write!(f, "o{}[{}]:", self.value, self.lag)?,
            Opcode::ProcessAll => write!(f, "all:")?,
            op => write!(f, "{}:", op.mnemonic().unwrap_or("?"))?,
        }
        write_weight(f, self.weight)
    }
}

fn parse_index(text: &str, token: &str) -> Result<usize, EfrError> {
    text.parse()
        .map_err(|_| EfrError::Parse(format!("Bad operand '{}' in token '{}'", text, token)))
}

fn parse_weight(text: &str, token: &str) -> Result<f64, EfrError> {
    text.parse()
        .map_err(|_| EfrError::Parse(format!("Bad weight '{}' in token '{}'", text, token)))
}

impl FromStr for Instruction {
    type Err = EfrError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "x" => return Ok(Instruction::noop()),
            ";" => return Ok(Instruction::separator()),
            _ => {}
        }

        let (head, weight) = token
            .rsplit_once(':')
            .ok_or_else(|| EfrError::Parse(format!("Missing weight in token '{}'", token)))?;
        let weight = parse_weight(weight, token)?;

        // `o` followed by `r` is the operator, anything else a lagged output
        let terminal = match head.as_bytes() {
            [b't', ..] => Some(Opcode::Input),
            [b'o', next, ..] if *next != b'r' => Some(Opcode::PastOutput),
            _ => None,
        };

        let Some(opcode) = terminal else {
            return Opcode::from_mnemonic(head)
                .map(|opcode| Instruction::new(opcode, weight))
                .ok_or_else(|| EfrError::Parse(format!("Unknown operator '{}'", head)));
        };

        let operands = &head[1..];
        match operands.split_once('[') {
            Some((value, lag)) => {
                let lag = lag
                    .strip_suffix(']')
                    .ok_or_else(|| EfrError::Parse(format!("Unclosed lag in token '{}'", token)))?;
                let value = parse_index(value, token)?;
                let lag = parse_index(lag, token)?;
                Ok(match opcode {
                    Opcode::Input => Instruction::past_input(value, lag, weight),
                    _ => Instruction::past_output(value, lag, weight),
                })
            }
            None if opcode == Opcode::Input => Ok(Instruction::input(parse_index(operands, token)?, weight)),
            None => Err(EfrError::Parse(format!("Lagged output without lag in token '{}'", token))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_table() {
        assert_eq!(Opcode::Input.arity(), 0);
        assert_eq!(Opcode::PastOutput.arity(), 0);
        assert_eq!(Opcode::Not.arity(), 1);
        assert_eq!(Opcode::ProcessAll.arity(), 1);
        for op in Opcode::BINARY {
            assert_eq!(op.arity(), 2);
        }
        assert!(Opcode::NoOp.is_special());
        assert!(Opcode::Separator.is_special());
        assert!(!Opcode::Not.is_special());
    }

    #[test]
    fn test_parse_tokens() {
        let t: Instruction = "t3:0.25".parse().unwrap();
        assert_eq!(t, Instruction::input(3, 0.25));

        let t: Instruction = "t1[4]:0.5".parse().unwrap();
        assert_eq!(t, Instruction::past_input(1, 4, 0.5));

        let o: Instruction = "o0[2]:0.75".parse().unwrap();
        assert_eq!(o, Instruction::past_output(0, 2, 0.75));

        let or: Instruction = "or:0.1".parse().unwrap();
        assert_eq!(or.opcode, Opcode::Or);
        assert_eq!(or.weight, 0.1);

        let not: Instruction = "not:0.9".parse().unwrap();
        assert_eq!(not.opcode, Opcode::Not);

        assert!("x".parse::<Instruction>().unwrap().is_noop());
        assert!(";".parse::<Instruction>().unwrap().is_separator());
    }

    #[test]
    fn test_parse_errors() {
        assert!("xor:0.5".parse::<Instruction>().is_err());
        // process-all is a crossover boundary marker, not a textual token
        assert!("all:0.5".parse::<Instruction>().is_err());
        assert!("and".parse::<Instruction>().is_err());
        assert!("t1[2:0.5".parse::<Instruction>().is_err());
        assert!("o1:0.5".parse::<Instruction>().is_err());
        assert!("tq:0.5".parse::<Instruction>().is_err());
    }

    #[test]
    fn test_display_precision() {
        let t = Instruction::past_input(2, 3, 0.3);
        assert_eq!(t.to_string(), "t2[3]:0.3");
        assert_eq!(format!("{:.2}", t), "t2[3]:0.30");
        assert_eq!(format!("{:.2}", Instruction::noop()), "x");
        assert_eq!(Instruction::new(Opcode::Prod, 0.5).to_string(), "prod:0.5");
    }
}
