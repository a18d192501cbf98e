use std::io::{self, Write};

use metronome_clock::ClockAdapter;
use metronome_core::{DiagnosticArg, DiagnosticEmitter, TimedWait};
use tracing::{debug, warn};

use crate::{Args, HostError, HostErrorKind, HostValue};

/// Name the functions are registered under in the scripting environment
pub const MODULE_NAME: &str = "Metronome";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    /// Variadic
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFunction {
    Alarm,
    Ualarm,
    Sleep,
    Pause,
    Warn,
}

/// One registered host function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub function: HostFunction,
    pub arity: Arity,
    pub summary: &'static str,
}

const FUNCTIONS: &[FunctionSpec] = &[
    FunctionSpec {
        name: "alarm",
        function: HostFunction::Alarm,
        arity: Arity::Exactly(1),
        summary: "alarm(seconds) -> seconds left on the replaced alarm",
    },
    FunctionSpec {
        name: "ualarm",
        function: HostFunction::Ualarm,
        arity: Arity::Exactly(2),
        summary: "ualarm(initial_us, repeat_us) -> microseconds left on the replaced alarm",
    },
    FunctionSpec {
        name: "sleep",
        function: HostFunction::Sleep,
        arity: Arity::Exactly(1),
        summary: "sleep(seconds) -> 0, raises SleepInterrupted with the residual",
    },
    FunctionSpec {
        name: "pause",
        function: HostFunction::Pause,
        arity: Arity::Exactly(0),
        summary: "pause -> nil once any signal has been handled",
    },
    FunctionSpec {
        name: "warn",
        function: HostFunction::Warn,
        arity: Arity::Any,
        summary: "warn(*values) -> nil, one line per value on stderr",
    },
];

/// The metronome functions as seen by a scripting host
///
/// Hosts decode their own values into [`HostValue`]s, call [`MetronomeModule::call`]
/// and raise the returned [`HostError`] as an exception.
pub struct MetronomeModule<C, W = io::Stderr> {
    engine: TimedWait<C>,
    emitter: DiagnosticEmitter<W>,
}

impl<C: ClockAdapter> MetronomeModule<C> {
    pub fn new(clock: C) -> Self {
        Self::with_emitter(clock, DiagnosticEmitter::stderr())
    }
}

impl<C: ClockAdapter, W: Write> MetronomeModule<C, W> {
    pub fn with_emitter(clock: C, emitter: DiagnosticEmitter<W>) -> Self {
        Self {
            engine: TimedWait::new(clock),
            emitter,
        }
    }

    /// Registration table: every callable name and its arity
    pub fn functions() -> &'static [FunctionSpec] {
        FUNCTIONS
    }

    pub fn engine_mut(&mut self) -> &mut TimedWait<C> {
        &mut self.engine
    }

    pub fn into_parts(self) -> (TimedWait<C>, DiagnosticEmitter<W>) {
        (self.engine, self.emitter)
    }

    pub fn call(&mut self, name: &str, values: &[HostValue]) -> Result<HostValue, HostError> {
        let spec = FUNCTIONS.iter().find(|f| f.name == name).ok_or_else(|| {
            HostError::new(
                HostErrorKind::NoMethodError,
                format!("undefined method '{name}' for {MODULE_NAME}"),
            )
        })?;

        let args = Args::new(spec.name, values);
        if let Arity::Exactly(n) = spec.arity {
            args.expect_len(n)?;
        }
        debug!(target: "scripting", function = spec.name, argc = values.len(), "host call");

        match spec.function {
            HostFunction::Alarm => {
                let previous = self.engine.schedule_alarm(args.int(0)?)?;
                Ok(previous.into())
            }
            HostFunction::Ualarm => {
                let previous = self
                    .engine
                    .schedule_micro_alarm(args.int(0)?, args.int(1)?)?;
                Ok(previous.into())
            }
            HostFunction::Sleep => {
                self.engine.sleep(args.float(0)?)?;
                Ok(HostValue::Int(0))
            }
            HostFunction::Pause => {
                self.engine.wait_for_signal()?;
                Ok(HostValue::Nil)
            }
            HostFunction::Warn => {
                self.warn(args.all());
                Ok(HostValue::Nil)
            }
        }
    }

    fn warn(&mut self, values: &[HostValue]) {
        let diagnostics: Vec<DiagnosticArg> = values.iter().map(to_diagnostic).collect();
        if let Err(err) = self.emitter.emit(&diagnostics) {
            warn!(target: "scripting", %err, "warn output incomplete");
        }
    }
}

fn to_diagnostic(value: &HostValue) -> DiagnosticArg {
    match value {
        HostValue::Str(text) => DiagnosticArg::Text(text.clone()),
        HostValue::Array(items) => DiagnosticArg::Sequence(items.iter().map(to_diagnostic).collect()),
        other => DiagnosticArg::other(other.clone()),
    }
}
