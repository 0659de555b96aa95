use serde::{Deserialize, Serialize};

use crate::config::{PenaltyMode, SelectionConfig};

/// Decides how much a neighbour's priority drops when a product it is
/// connected to gets selected.
pub trait PenaltyPolicy: Send + Sync {
    /// Amount to subtract from `current`. Must be finite and non-negative.
    fn penalty(&self, current: f64, edge_total: f64, max_edge_total: f64) -> f64;
}

impl<T: PenaltyPolicy + ?Sized> PenaltyPolicy for Box<T> {
    fn penalty(&self, current: f64, edge_total: f64, max_edge_total: f64) -> f64 {
        (**self).penalty(current, edge_total, max_edge_total)
    }
}

/// `penalty = edge_total * scale`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearPenalty {
    pub scale: f64,
}

impl Default for LinearPenalty {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl PenaltyPolicy for LinearPenalty {
    fn penalty(&self, _current: f64, edge_total: f64, _max_edge_total: f64) -> f64 {
        clamp_delta(edge_total * self.scale)
    }
}

/// Relative reduction by `edge_total / max_edge_total`, capped at `cap`, never
/// pushing a priority below `floor` and never raising one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProportionalPenalty {
    pub cap: f64,
    pub floor: f64,
}

impl Default for ProportionalPenalty {
    fn default() -> Self {
        Self { cap: 0.65, floor: 1.0 }
    }
}

impl PenaltyPolicy for ProportionalPenalty {
    fn penalty(&self, current: f64, edge_total: f64, max_edge_total: f64) -> f64 {
        if max_edge_total <= 0.0 {
            return 0.0;
        }

        let factor = (edge_total / max_edge_total).clamp(0.0, self.cap);
        let target = (current * (1.0 - factor)).max(self.floor);
        clamp_delta(current - target)
    }
}

pub fn penalty_policy(config: &SelectionConfig) -> Box<dyn PenaltyPolicy> {
    match config.penalty_mode {
        PenaltyMode::Linear => Box::new(LinearPenalty { scale: config.penalty_scale }),
        PenaltyMode::Proportional => Box::new(ProportionalPenalty {
            cap: config.proportional_cap,
            floor: config.proportional_floor,
        }),
    }
}

fn clamp_delta(delta: f64) -> f64 {
    if delta.is_finite() && delta > 0.0 {
        delta
    } else {
        0.0
    }
}
