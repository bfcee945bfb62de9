//! Interpreter — entry points for running Arbor programs.
//!
//! [`Interpreter::evaluate`] runs a program to completion under a time
//! limit. [`Interpreter::step_through`] hands back a [`Stepper`] that
//! advances one term at a time and exposes the machine state between
//! steps, for debuggers and visualizers.

use crate::env::ScopeChain;
use crate::evaluator::{rules, Machine, Progress, Rules};
use crate::grammar::Grammar;
use crate::store::Store;
use crate::value::Value;
use arbor_terms::{Arg, Error, Result, Span, TermRef};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::Ref;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// Wall-clock budget of a run unless configured otherwise.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_millis(2000);

/// Run settings. Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Elapsed time after which a run fails with a timeout error.
    pub time_limit: Duration,
    /// Whether the time limit applies at all.
    pub check_timeout: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_limit: DEFAULT_TIME_LIMIT,
            check_timeout: true,
        }
    }
}

/// Runs programs of the Arbor grammar.
///
/// Holds the semantic rule table; each run gets its own environment and
/// store, so one interpreter can run any number of programs.
pub struct Interpreter {
    grammar: &'static Grammar,
    rules: Rc<Rules>,
    config: RunConfig,
}

impl Interpreter {
    pub fn new() -> Result<Self> {
        Self::with_config(RunConfig::default())
    }

    pub fn with_config(config: RunConfig) -> Result<Self> {
        let grammar = Grammar::shared()?;
        Ok(Self {
            grammar,
            rules: Rc::new(rules(grammar)),
            config,
        })
    }

    pub fn grammar(&self) -> &'static Grammar {
        self.grammar
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Evaluate a `TopLevel` program to its final value.
    pub fn evaluate(&self, program: &TermRef) -> Result<Value> {
        let body = self.load(program)?;
        let limit = self
            .config
            .check_timeout
            .then_some(self.config.time_limit);
        debug!("evaluating {} (time limit: {:?})", body.name(), limit);

        let mut machine = Machine::new(Rc::clone(&self.rules), body, limit);
        let value = machine.run()?;
        debug!("run finished after {} steps: {}", machine.steps(), value);
        Ok(value)
    }

    /// Prepare a program for step-wise evaluation. Timeouts are not checked;
    /// the host decides how long to keep stepping.
    pub fn step_through(&self, program: &TermRef) -> Result<Stepper> {
        let body = self.load(program)?;
        debug!("stepping through {}", body.name());
        Ok(Stepper {
            machine: Machine::new(Rc::clone(&self.rules), body, None),
            failure: None,
        })
    }

    /// Validate the whole program and unwrap its body.
    fn load(&self, program: &TermRef) -> Result<TermRef> {
        self.grammar.registry.validate(program)?;
        if program.kind() != &self.grammar.top_level {
            return Err(Error::shape(format!(
                "expected a {} program, found {} (ancestor chain {})",
                self.grammar.top_level,
                program.name(),
                program.ancestry()
            ))
            .at(program.span()));
        }
        program
            .arg(0)
            .and_then(Arg::as_term)
            .map(Arc::clone)
            .ok_or_else(|| {
                Error::shape(format!("{} has no body", program.name())).at(program.span())
            })
    }
}

/// Evaluate a program with the default configuration.
pub fn evaluate(program: &TermRef) -> Result<Value> {
    Interpreter::new()?.evaluate(program)
}

/// Step through a program with the default configuration.
pub fn step_through(program: &TermRef) -> Result<Stepper> {
    Interpreter::new()?.step_through(program)
}

// ══════════════════════════════════════════════════════════════════════════
// Stepping
// ══════════════════════════════════════════════════════════════════════════

/// A paused run. Each [`Stepper::step`] performs one evaluation step.
///
/// Once the run has finished, further steps return the same result: the
/// final value, or the error that stopped it.
pub struct Stepper {
    machine: Machine,
    failure: Option<Error>,
}

impl Stepper {
    pub fn step(&mut self) -> Result<Progress> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let progress = self.machine.step();
        if let Err(err) = &progress {
            debug!("run failed after {} steps: {}", self.machine.steps(), err);
            self.failure = Some(err.clone());
        }
        progress
    }

    /// Step until the run finishes.
    pub fn run(&mut self) -> Result<Value> {
        loop {
            if let Progress::Done(value) = self.step()? {
                return Ok(value);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.failure.is_some() || self.machine.pending().is_none()
    }

    /// The term the next step evaluates.
    pub fn current_term(&self) -> Option<&TermRef> {
        self.machine.pending()
    }

    /// The scope chain the next step runs in.
    pub fn scope(&self) -> Ref<'_, ScopeChain> {
        self.machine.env().borrow()
    }

    pub fn store(&self) -> &Store {
        self.machine.store()
    }

    pub fn steps(&self) -> u64 {
        self.machine.steps()
    }

    /// Continuation frames waiting for a value.
    pub fn pending(&self) -> usize {
        self.machine.depth()
    }

    pub fn snapshot(&self) -> Snapshot {
        let term = self.current_term();
        let frames = self
            .scope()
            .scopes()
            .iter()
            .map(|scope| {
                scope
                    .bindings()
                    .map(|(name, value)| {
                        let shown = value.map_or_else(|| "<unset>".to_string(), Value::to_string);
                        (name.to_string(), shown)
                    })
                    .collect()
            })
            .collect();
        Snapshot {
            term: term.map(|t| t.to_string()),
            span: term.map(|t| t.span()).filter(Span::is_known),
            frames,
            store: self.store().cells().iter().map(Value::to_string).collect(),
            pending: self.pending(),
            steps: self.steps(),
        }
    }
}

/// Machine state between two steps, in a host-friendly form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// The next term to evaluate; `None` once finished.
    pub term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Scope chain, outermost first.
    pub frames: Vec<BTreeMap<String, String>>,
    /// Store cells by address.
    pub store: Vec<String>,
    pub pending: usize,
    pub steps: u64,
}

impl Snapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
