use std::time::{Duration, Instant};

use tracing::info;

/// Accumulated cost of one named step. Develop and lens steps run once per subarea,
/// so a step usually has several runs.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTiming {
    pub name: &'static str,
    pub runs: usize,
    pub total: Duration,
}

impl StepTiming {
    pub fn mean(&self) -> Duration {
        if self.runs == 0 {
            Duration::ZERO
        } else {
            self.total / self.runs as u32
        }
    }
}

/// Wall-clock durations of the steps a session executed, in order of first run.
#[derive(Debug, Default)]
pub struct PipelineTimings {
    steps: Vec<StepTiming>,
}

impl PipelineTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, name: &'static str, duration: Duration) {
        match self.steps.iter_mut().find(|s| s.name == name) {
            Some(step) => {
                step.runs += 1;
                step.total += duration;
            }
            None => self.steps.push(StepTiming { name, runs: 1, total: duration }),
        }
    }

    pub fn record(&mut self, timer: Timer) {
        self.add_step(timer.name, timer.start.elapsed());
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.total).sum()
    }

    pub fn get_step(&self, name: &str) -> Option<&StepTiming> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn log_summary(&self) {
        let total = self.total_duration().as_secs_f64();
        for step in &self.steps {
            let share = if total > 0.0 {
                step.total.as_secs_f64() / total * 100.0
            } else {
                0.0
            };
            info!(
                "{:<10} {:>4} run(s) {:>10.3}ms ({:>5.1}%)",
                step.name,
                step.runs,
                step.total.as_secs_f64() * 1000.0,
                share
            );
        }
        info!("{:<10} {:>18.3}ms", "total", total * 1000.0);
    }
}

/// Started when a step begins; handed to `PipelineTimings::record` when it ends.
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn start(name: &'static str) -> Self {
        Self { name, start: Instant::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_accumulate_by_name() {
        let mut timings = PipelineTimings::new();
        timings.add_step("raw", Duration::from_millis(5));
        timings.add_step("develop", Duration::from_millis(10));
        timings.add_step("develop", Duration::from_millis(20));

        assert_eq!(timings.steps().len(), 2);
        assert_eq!(timings.steps()[0].name, "raw");
        let develop = timings.get_step("develop").unwrap();
        assert_eq!(develop.runs, 2);
        assert_eq!(develop.total, Duration::from_millis(30));
        assert_eq!(develop.mean(), Duration::from_millis(15));
        assert_eq!(timings.total_duration(), Duration::from_millis(35));
        assert!(timings.get_step("lens").is_none());
    }

    #[test]
    fn test_record_timer() {
        let mut timings = PipelineTimings::new();
        timings.record(Timer::start("first"));
        assert_eq!(timings.get_step("first").map(|s| s.runs), Some(1));
        timings.clear();
        assert!(timings.steps().is_empty());
    }
}
