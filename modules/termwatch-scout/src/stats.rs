use std::fmt;

/// Where and why a cycle stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopInfo {
    pub term: String,
    pub kind: &'static str,
    pub message: String,
}

/// Counters for one collection cycle. Logged at the end of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub run_stamp: String,
    pub terms_loaded: usize,
    pub terms_attempted: usize,
    /// Terms whose cursor moved.
    pub terms_advanced: usize,
    /// Terms searched successfully with nothing new.
    pub terms_unchanged: usize,
    pub results_archived: usize,
    pub stopped: Option<StopInfo>,
}

impl RunStats {
    pub fn new(run_stamp: &str) -> Self {
        Self {
            run_stamp: run_stamp.to_string(),
            ..Default::default()
        }
    }

    /// Whether every loaded term was searched.
    pub fn completed(&self) -> bool {
        self.stopped.is_none()
    }

    /// Terms left untouched this cycle, including the one that stopped it.
    pub fn terms_remaining(&self) -> usize {
        self.terms_loaded
            .saturating_sub(self.terms_advanced)
            .saturating_sub(self.terms_unchanged)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run={} terms_loaded={} attempted={} advanced={} unchanged={} remaining={} results_archived={}",
            self.run_stamp,
            self.terms_loaded,
            self.terms_attempted,
            self.terms_advanced,
            self.terms_unchanged,
            self.terms_remaining(),
            self.results_archived,
        )?;
        if let Some(stop) = &self.stopped {
            write!(f, " stopped_on={} reason={}", stop.term, stop.kind)?;
        }
        Ok(())
    }
}
