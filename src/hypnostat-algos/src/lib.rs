#[macro_use]
extern crate log;

pub(crate) mod metrics;
pub use metrics::{MetricResult, MetricsError, SleepMetrics, StageStat, compute_metrics};

pub(crate) mod cycles;
pub use cycles::{REM_MERGE_GAP, SleepCycles};

pub(crate) mod breathing;
pub use breathing::{BreathingMetrics, BreathingPattern};

pub(crate) mod delta;
pub use delta::{SleepMetricsDelta, StageStatDelta};

pub(crate) mod report;
pub use report::{HourGroup, HypnogramReport, StageEvent};

pub mod helpers;
