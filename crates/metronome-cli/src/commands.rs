use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use metronome_clock::{Latch, Signal, SignalLatch, SystemClock};
use metronome_core::{
    DiagnosticEmitter, Machine, Operation, START_STATE, State, Tick, TimedWait, TimingError,
    Transition,
};
use metronome_scripting_host::{HostValue, MetronomeModule};
use tracing::{debug, info};

use crate::config::MetronomeConfig;
use crate::values::parse_value;

fn engine() -> TimedWait<SystemClock> {
    TimedWait::new(SystemClock::new())
}

/// Keeps a stray SIGALRM from ending the process while an alarm is armed
fn alarm_latch() -> Result<SignalLatch> {
    SignalLatch::install(Signal::SIGALRM).context("failed to trap SIGALRM")
}

pub fn alarm(seconds: i64, replacement: Option<i64>) -> Result<()> {
    let _latch = alarm_latch()?;
    let mut engine = engine();

    let previous = engine.schedule_alarm(seconds)?;
    println!("alarm({seconds}) -> {previous}");

    if let Some(replacement) = replacement {
        let previous = engine.schedule_alarm(replacement)?;
        println!("alarm({replacement}) -> {previous}");
    }

    engine.cancel_alarm()?;
    Ok(())
}

pub fn ualarm(initial_us: i64, repeat_us: i64, replacement: Option<(i64, i64)>) -> Result<()> {
    let _latch = alarm_latch()?;
    let mut engine = engine();

    let previous = engine.schedule_micro_alarm(initial_us, repeat_us)?;
    println!("ualarm({initial_us}, {repeat_us}) -> {previous}");

    if let Some((initial, repeat)) = replacement {
        let previous = engine.schedule_micro_alarm(initial, repeat)?;
        println!("ualarm({initial}, {repeat}) -> {previous}");
    }

    engine.cancel_alarm()?;
    Ok(())
}

pub fn sleep(seconds: f64, alarm: Option<i64>, resume: bool) -> Result<()> {
    let latch = alarm_latch()?;
    let mut engine = engine();
    if let Some(alarm) = alarm {
        engine.schedule_alarm(alarm)?;
    }

    let started = Instant::now();
    let mut result = engine.sleep(seconds);
    let outcome = loop {
        match result {
            Ok(()) => {
                println!("slept {:.3}s", started.elapsed().as_secs_f64());
                break Ok(());
            }
            Err(TimingError::SleepInterrupted { residual, os_error }) => {
                println!(
                    "interrupted by {} signal(s) ({os_error}), {:.3}s left",
                    latch.take(),
                    residual.as_secs_f64()
                );
                if !resume {
                    break Ok(());
                }
                debug!(?residual, "resuming sleep");
                result = engine.sleep_duration(residual);
            }
            Err(err) => break Err(err).context("sleep failed"),
        }
    };

    engine.cancel_alarm()?;
    outcome
}

pub fn pause(alarm: Option<i64>) -> Result<()> {
    let latches = [Signal::SIGALRM, Signal::SIGINT, Signal::SIGUSR1]
        .into_iter()
        .map(|signal| {
            SignalLatch::install(signal).with_context(|| format!("failed to trap {signal:?}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut engine = engine();
    if let Some(alarm) = alarm {
        engine.schedule_alarm(alarm)?;
    }

    info!("waiting for SIGALRM, SIGINT or SIGUSR1 (pid {})", std::process::id());
    engine.wait_for_signal()?;
    engine.cancel_alarm()?;

    for latch in &latches {
        let count = latch.take();
        if count > 0 {
            println!("received {:?} x{count}", latch.signal());
        }
    }
    Ok(())
}

pub fn warn(words: &[String], config: &MetronomeConfig) -> Result<()> {
    let values: Vec<HostValue> = words.iter().map(|word| parse_value(word)).collect();
    let emitter = DiagnosticEmitter::stderr().with_max_depth(config.diagnostics.max_depth);
    let mut module = MetronomeModule::with_emitter(SystemClock::new(), emitter);
    module.call("warn", &values)?;
    Ok(())
}

pub fn tick(step: f64, count: Option<u64>, strict: bool) -> Result<()> {
    let interrupt = SignalLatch::install(Signal::SIGINT).context("failed to trap SIGINT")?;
    let mut operation = Operation::new(engine(), alarm_latch()?, step)?.with_strict_timing(strict);

    info!(step = ?operation.step(), strict, "starting recurring operation");
    let report = operation
        .run(count, |iteration, previous_tet| {
            println!("tick {iteration} (previous step took {previous_tet:?})");
            if interrupt.take() > 0 {
                info!("interrupted, stopping after this step");
                Tick::Stop
            } else {
                Tick::Continue
            }
        })
        .map_err(|err| match err {
            TimingError::Overrun(overrun) => anyhow::anyhow!(
                "{overrun} ({:.0}% of the period)",
                overrun.ratio()
            ),
            other => other.into(),
        })?;

    println!(
        "{} steps, {} missed ticks, last step took {:?}",
        report.iterations, report.missed_ticks, report.last_tet
    );
    Ok(())
}

/// Counts once per period, then hands over to `done`
struct Counting {
    step: Duration,
    limit: u64,
}

impl State<u64> for Counting {
    fn name(&self) -> &str {
        START_STATE
    }

    fn timing(&self) -> Option<Duration> {
        Some(self.step)
    }

    fn in_loop(&mut self, count: &mut u64) -> Transition {
        *count += 1;
        println!("count {count}");
        if *count >= self.limit {
            Transition::goto("done")
        } else {
            Transition::Stay
        }
    }
}

struct Done;

impl State<u64> for Done {
    fn name(&self) -> &str {
        "done"
    }

    fn on_enter(&mut self, count: &mut u64) {
        println!("counted to {count}");
    }

    fn in_loop(&mut self, _count: &mut u64) -> Transition {
        Transition::Finish
    }
}

pub fn count(step: f64, limit: u64) -> Result<()> {
    let step = Duration::try_from_secs_f64(step).context("invalid step")?;
    let interrupt = SignalLatch::install(Signal::SIGINT).context("failed to trap SIGINT")?;
    let operation = Operation::new(engine(), alarm_latch()?, step.as_secs_f64())?;

    let mut machine = Machine::new(operation, interrupt, 0u64);
    machine.add(Counting { step, limit })?;
    machine.add(Done)?;
    machine.check()?;

    let report = machine.run(START_STATE)?;
    println!(
        "{} steps, ended in {}{}",
        report.steps,
        report.last_state,
        if report.shut_down { " (interrupted)" } else { "" }
    );
    Ok(())
}
