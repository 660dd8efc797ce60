//! Control node variants and their configuration
//!
//! Everything in this module is configuration: it is copied by value when a
//! loop body is cloned and never mutated during a run.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::engine::distribute::{parse_indices, Distribution};
use crate::engine::state::{PortType, SourceExpr};
use crate::sdk::error::{EnactError, Result};

/// A `(name, value)` constraint attached to a port or a loop node
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    #[serde(deserialize_with = "string_or_scalar")]
    pub value: String,
}

/// A constraint after its value has been parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Cap on concurrently running branches
    Concurrency(usize),
    /// Ordered, possibly repeating, indices into the input collection
    ElementIndex(Vec<usize>),
    /// How a collection is split across branches
    Distribution(Distribution),
}

impl Constraint {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse the constraint; unknown names are rejected
    pub fn kind(&self) -> Result<ConstraintKind> {
        match self.name.as_str() {
            "concurrency" => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(ConstraintKind::Concurrency)
                .ok_or_else(|| {
                    EnactError::invalid_constraint(
                        &self.name,
                        &self.value,
                        "expected a positive integer",
                    )
                }),
            "element-index" => parse_indices(&self.value).map(ConstraintKind::ElementIndex),
            "distribution" => Distribution::parse(&self.value).map(ConstraintKind::Distribution),
            other => Err(EnactError::NotImplemented(format!(
                "Constraint {} not implemented",
                other
            ))),
        }
    }
}

/// Input port of a node: where a value comes from and how it is typed
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DataPort {
    pub name: String,
    pub source: String,
    #[serde(rename = "type", default)]
    pub port_type: PortType,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub passing: bool,
}

impl DataPort {
    pub fn new(name: impl Into<String>, source: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            port_type,
            constraints: vec![],
            passing: false,
        }
    }

    pub fn with_constraint(mut self, name: &str, value: &str) -> Self {
        self.constraints.push(Constraint::new(name, value));
        self
    }

    pub fn passing(mut self) -> Self {
        self.passing = true;
        self
    }

    pub fn source_expr(&self) -> Result<SourceExpr> {
        SourceExpr::parse(&self.source)
    }
}

/// Declared output of a function node
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DataOut {
    pub name: String,
    #[serde(rename = "type", default)]
    pub port_type: PortType,
}

impl DataOut {
    pub fn new(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            port_type,
        }
    }
}

/// One loop bound: a literal or the name of a state variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LoopBound {
    Literal(i64),
    Variable(String),
}

impl LoopBound {
    /// Integer literals parse as such, anything else names a variable
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<i64>() {
            Ok(n) => Self::Literal(n),
            Err(_) => Self::Variable(text.trim().to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for LoopBound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(LoopBound::parse(&string_or_scalar(deserializer)?))
    }
}

/// `from`/`to`/`step` of a parallel-for
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoopSpec {
    pub from: LoopBound,
    pub to: LoopBound,
    #[serde(default = "default_step")]
    pub step: LoopBound,
}

fn default_step() -> LoopBound {
    LoopBound::Literal(1)
}

impl LoopSpec {
    pub fn new(from: &str, to: &str, step: &str) -> Self {
        Self {
            from: LoopBound::parse(from),
            to: LoopBound::parse(to),
            step: LoopBound::parse(step),
        }
    }

    /// Names of the bounds that must be read from state
    pub fn variables(&self) -> Vec<&str> {
        [&self.from, &self.to, &self.step]
            .into_iter()
            .filter_map(|b| match b {
                LoopBound::Variable(name) => Some(name.as_str()),
                LoopBound::Literal(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FunctionSpec {
    /// Selects the invoker; empty means the registry default
    #[serde(rename = "type", default)]
    pub function_type: String,
    #[serde(default)]
    pub inputs: Vec<DataPort>,
    #[serde(default)]
    pub outputs: Vec<DataOut>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct ParallelSpec {
    #[serde(default)]
    pub inputs: Vec<DataPort>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ParallelForSpec {
    #[serde(default)]
    pub inputs: Vec<DataPort>,
    #[serde(rename = "loop")]
    pub loop_spec: LoopSpec,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IfSpec {
    pub condition: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SwitchCase {
    pub value: Value,
    /// Index into the switch node's children
    pub branch: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SwitchSpec {
    pub input: DataPort,
    #[serde(default)]
    pub cases: Vec<SwitchCase>,
    #[serde(rename = "default", default)]
    pub default_branch: Option<usize>,
}

/// Construct families; each start variant is closed by the end of its family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Parallel,
    ParallelFor,
    If,
    Switch,
}

/// Closed set of control node variants
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NodeKind {
    Function(FunctionSpec),
    ParallelStart(ParallelSpec),
    ParallelEnd,
    ParallelForStart(ParallelForSpec),
    ParallelForEnd,
    IfStart(IfSpec),
    IfEnd,
    SwitchStart(SwitchSpec),
    SwitchEnd,
}

impl NodeKind {
    /// The workflow-language type tag of this variant
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Function(_) => "function",
            Self::ParallelStart(_) => "parallel-start",
            Self::ParallelEnd => "parallel-end",
            Self::ParallelForStart(_) => "parallel-for-start",
            Self::ParallelForEnd => "parallel-for-end",
            Self::IfStart(_) => "if-start",
            Self::IfEnd => "if-end",
            Self::SwitchStart(_) => "switch-start",
            Self::SwitchEnd => "switch-end",
        }
    }

    /// The family this variant opens, if it is a start node
    pub fn opens(&self) -> Option<Family> {
        match self {
            Self::ParallelStart(_) => Some(Family::Parallel),
            Self::ParallelForStart(_) => Some(Family::ParallelFor),
            Self::IfStart(_) => Some(Family::If),
            Self::SwitchStart(_) => Some(Family::Switch),
            _ => None,
        }
    }

    /// The family this variant closes, if it is an end node
    pub fn closes(&self) -> Option<Family> {
        match self {
            Self::ParallelEnd => Some(Family::Parallel),
            Self::ParallelForEnd => Some(Family::ParallelFor),
            Self::IfEnd => Some(Family::If),
            Self::SwitchEnd => Some(Family::Switch),
            _ => None,
        }
    }

    pub fn is_end(&self) -> bool {
        self.closes().is_some()
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Nested constructs take the count of functions preceding them on their level
    pub fn accepts_nested_offset(&self) -> bool {
        self.opens().is_some()
    }

    /// Input ports declared on this node
    pub fn inputs(&self) -> &[DataPort] {
        match self {
            Self::Function(spec) => &spec.inputs,
            Self::ParallelStart(spec) => &spec.inputs,
            Self::ParallelForStart(spec) => &spec.inputs,
            Self::SwitchStart(spec) => std::slice::from_ref(&spec.input),
            _ => &[],
        }
    }

    /// Keys accepted by `pass_result`: port sources (whole and per alternative) and loop variables
    pub fn accepted_keys(&self) -> Vec<String> {
        let mut keys = vec![];
        let mut push_source = |text: &str| {
            keys.push(text.to_string());
            if let Ok(expr) = SourceExpr::parse(text) {
                keys.extend(expr.keys());
            }
        };

        for port in self.inputs() {
            push_source(&port.source);
        }
        if let Self::ParallelForStart(spec) = self {
            for var in spec.loop_spec.variables() {
                push_source(var);
            }
        }

        keys.sort();
        keys.dedup();
        keys
    }
}

/// Accept strings, numbers and booleans where the workflow language expects text
fn string_or_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Bool(b) => b.to_string(),
    })
}
