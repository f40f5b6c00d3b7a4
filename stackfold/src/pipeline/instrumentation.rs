//! Stage timing hooks.
//!
//! The pipeline reports how long each stage took to a [`StageObserver`]
//! supplied by the caller instead of logging timings itself. Servers can
//! forward these to their tracing setup; the CLI uses [`LogObserver`].

use log::debug;
use std::fmt;
use std::time::{Duration, Instant};

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Events → caller-callee graph
    Aggregate,
    /// Graph → columnar arrays
    Columnarize,
    /// Columnar arrays → flame graph layout
    Assemble,
    /// Sampling-rate correction of the totals
    Correct,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Aggregate, Stage::Columnarize, Stage::Assemble, Stage::Correct];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Aggregate => "aggregate",
            Stage::Columnarize => "columnarize",
            Stage::Assemble => "assemble",
            Stage::Correct => "correct",
        };
        f.write_str(name)
    }
}

/// Receives the duration of every completed stage.
///
/// Stages that fail are not reported.
pub trait StageObserver {
    fn stage_finished(&self, stage: Stage, elapsed: Duration);
}

impl<T: StageObserver + ?Sized> StageObserver for &T {
    fn stage_finished(&self, stage: Stage, elapsed: Duration) {
        (**self).stage_finished(stage, elapsed);
    }
}

/// Logs stage timings at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl StageObserver for LogObserver {
    fn stage_finished(&self, stage: Stage, elapsed: Duration) {
        debug!("{stage} took {:.3}ms", elapsed.as_secs_f64() * 1000.0);
    }
}

/// Discards stage timings.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn stage_finished(&self, _stage: Stage, _elapsed: Duration) {}
}

/// Run `f` and report its duration as `stage` if it succeeds.
pub fn timed<T, E, O>(observer: &O, stage: Stage, f: impl FnOnce() -> Result<T, E>) -> Result<T, E>
where
    O: StageObserver + ?Sized,
{
    let start = Instant::now();
    let result = f()?;
    observer.stage_finished(stage, start.elapsed());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Stage>>);

    impl StageObserver for Recorder {
        fn stage_finished(&self, stage: Stage, _elapsed: Duration) {
            self.0.lock().unwrap().push(stage);
        }
    }

    #[test]
    fn test_timed_reports_success() {
        let recorder = Recorder::default();
        let value: Result<u32, ()> = timed(&recorder, Stage::Assemble, || Ok(7));
        assert_eq!(value, Ok(7));
        assert_eq!(*recorder.0.lock().unwrap(), vec![Stage::Assemble]);
    }

    #[test]
    fn test_timed_skips_failures() {
        let recorder = Recorder::default();
        let value: Result<u32, &str> = timed(&recorder, Stage::Aggregate, || Err("boom"));
        assert_eq!(value, Err("boom"));
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stage_display() {
        let names: Vec<String> = Stage::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["aggregate", "columnarize", "assemble", "correct"]);
    }
}
