//! Finite state machine with optionally timed states
//!
//! States are registered by name and share one parameter value `P`. The run loop
//! calls the current state's [`State::in_loop`] until it asks to move on. A state
//! that declares a [`State::timing`] gets its `in_loop` called once per period by
//! the machine's [`Operation`] instead of back to back. A shutdown latch (SIGINT
//! in the binary) ends the run once the step in progress returns.

use std::collections::BTreeMap;
use std::time::Duration;

use metronome_clock::{ClockAdapter, Latch};
use tracing::{debug, info, warn};

use crate::{Operation, Tick, TimingError, validate};

/// State [`Machine::check`] expects to find
pub const START_STATE: &str = "start";

/// What a state wants after one `in_loop` call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Transition {
    #[default]
    Stay,
    /// Leave for the named state; naming the current state re-enters it
    Goto(String),
    /// End the run
    Finish,
}

impl Transition {
    pub fn goto(state: impl Into<String>) -> Self {
        Transition::Goto(state.into())
    }
}

/// One state of a [`Machine`]
pub trait State<P> {
    fn name(&self) -> &str;

    /// Period between `in_loop` calls; `None` runs them back to back
    fn timing(&self) -> Option<Duration> {
        None
    }

    fn on_enter(&mut self, _params: &mut P) {}

    fn in_loop(&mut self, params: &mut P) -> Transition;

    fn on_exit(&mut self, _params: &mut P) {}
}

#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    #[error("no states defined")]
    NoStates,

    #[error("state '{0}' is not defined")]
    UnknownState(String),

    #[error("state '{name}' has an invalid timing")]
    InvalidTiming {
        name: String,
        #[source]
        source: TimingError,
    },

    #[error(transparent)]
    Timing(#[from] TimingError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineReport {
    /// State that was current when the run ended
    pub last_state: String,
    /// `in_loop` calls across all states
    pub steps: u64,
    /// Ended by the shutdown latch rather than by a state
    pub shut_down: bool,
}

pub struct Machine<P, C, L, S> {
    params: P,
    states: BTreeMap<String, Box<dyn State<P>>>,
    operation: Operation<C, L>,
    shutdown: S,
    current: Option<String>,
}

impl<P, C: ClockAdapter, L: Latch, S: Latch> Machine<P, C, L, S> {
    /// `operation` paces timed states; `shutdown` counts the requests to stop.
    pub fn new(operation: Operation<C, L>, shutdown: S, params: P) -> Self {
        Self {
            params,
            states: BTreeMap::new(),
            operation,
            shutdown,
            current: None,
        }
    }

    /// Register `state` under its name, replacing any state of the same name.
    pub fn add<T: State<P> + 'static>(&mut self, state: T) -> Result<(), MachineError> {
        let name = state.name().to_string();
        if let Some(step) = state.timing() {
            validate::period("state timing", step).map_err(|source| {
                MachineError::InvalidTiming {
                    name: name.clone(),
                    source,
                }
            })?;
        }

        if self.states.insert(name.clone(), Box::new(state)).is_some() {
            debug!(target: "metronome", state = %name, "replaced state");
        }
        Ok(())
    }

    /// Ready to [`Machine::run`] from [`START_STATE`]?
    pub fn check(&self) -> Result<(), MachineError> {
        self.check_from(START_STATE)
    }

    pub fn check_from(&self, from: &str) -> Result<(), MachineError> {
        if self.states.is_empty() {
            return Err(MachineError::NoStates);
        }
        if !self.states.contains_key(from) {
            return Err(MachineError::UnknownState(from.to_string()));
        }
        Ok(())
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// State being run, or the last one if the run has ended
    pub fn current_state(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut P {
        &mut self.params
    }

    pub fn into_params(self) -> P {
        self.params
    }

    /// Run from state `from` until a state finishes, a transition names an
    /// unknown state, or the shutdown latch fires.
    pub fn run(&mut self, from: &str) -> Result<MachineReport, MachineError> {
        self.check_from(from)?;

        let Self {
            params,
            states,
            operation,
            shutdown,
            current,
        } = self;

        let mut name = from.to_string();
        let mut steps = 0u64;
        let mut shut_down = false;
        info!(target: "metronome", state = %name, "machine starting");

        loop {
            *current = Some(name.clone());
            let state = states
                .get_mut(&name)
                .ok_or_else(|| MachineError::UnknownState(name.clone()))?;

            debug!(target: "metronome", state = %name, "entering state");
            state.on_enter(params);

            let next = match state.timing() {
                Some(step) => {
                    info!(target: "metronome", state = %name, ?step, "state enabling metronome");
                    operation.set_period(step)?;
                    let mut next = Transition::Stay;
                    operation.run(None, |_, _| {
                        steps += 1;
                        next = state.in_loop(params);
                        if next != Transition::Stay || shutdown.pending() > 0 {
                            Tick::Stop
                        } else {
                            Tick::Continue
                        }
                    })?;
                    info!(target: "metronome", state = %name, "state stopping metronome");
                    next
                }
                None => loop {
                    steps += 1;
                    let next = state.in_loop(params);
                    if next != Transition::Stay || shutdown.pending() > 0 {
                        break next;
                    }
                },
            };

            state.on_exit(params);
            debug!(target: "metronome", state = %name, "left state");

            if shutdown.take() > 0 {
                info!(target: "metronome", state = %name, "shutting down");
                shut_down = true;
                break;
            }

            match next {
                Transition::Goto(to) if states.contains_key(&to) => {
                    debug!(target: "metronome", from = %name, to = %to, "transition");
                    name = to;
                }
                Transition::Goto(to) => {
                    warn!(target: "metronome", from = %name, to = %to, "no such state, stopping");
                    break;
                }
                Transition::Stay | Transition::Finish => break,
            }
        }

        info!(target: "metronome", state = %name, steps, shut_down, "machine stopped");
        Ok(MachineReport {
            last_state: name,
            steps,
            shut_down,
        })
    }
}
