use crate::table::PollResult;

/// What one output channel did with a poll result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub devices: usize,
    pub discovery: usize,
    pub states: usize,
    /// `n-a` values that were not published.
    pub absent: usize,
    pub failed: usize,
    /// The bus went away and the remaining publishes were dropped.
    pub interrupted: bool,
}

pub trait MetricCollector {
    fn publish(&mut self, result: &PollResult) -> PublishReport;
}
