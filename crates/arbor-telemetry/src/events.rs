//! Simulation event types.
//!
//! Events are small value types tagged with the tick that produced them.

use arbor_solver::TickReport;
use arbor_types::BodyId;
use serde::{Deserialize, Serialize};

/// A simulation event emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    /// Tick number (0-indexed).
    pub tick: u64,
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Tick started.
    TickBegin {
        /// Simulation time at the start of the tick (seconds).
        sim_time: f32,
    },

    /// Tick completed.
    TickEnd {
        /// Wall-clock time for the whole tick (seconds).
        wall_time: f64,
        joints_solved: usize,
    },

    /// A body broke off its parent and became a free root.
    Dearticulated { body: BodyId },

    /// Joints that needed the QL fallback this tick.
    EigenFallback { count: u32 },

    /// Shape of the level schedule used by the tick.
    Schedule { levels: usize, units: usize },

    /// Energy snapshot after the tick.
    Energy { kinetic: f64 },

    /// Custom event for extensibility.
    Custom {
        label: String,
        /// JSON-encoded payload.
        payload: String,
    },
}

impl SimulationEvent {
    pub fn new(tick: u64, kind: EventKind) -> Self {
        Self { tick, kind }
    }

    /// Events describing a finished tick, in emission order.
    ///
    /// `EigenFallback` is only produced when a fallback happened.
    pub fn from_report(report: &TickReport) -> Vec<Self> {
        let tick = report.tick;
        let mut events = vec![Self::new(
            tick,
            EventKind::TickBegin {
                sim_time: report.sim_time,
            },
        )];
        events.extend(
            report
                .dearticulated
                .iter()
                .map(|&body| Self::new(tick, EventKind::Dearticulated { body })),
        );
        if report.eigen_fallbacks > 0 {
            events.push(Self::new(
                tick,
                EventKind::EigenFallback {
                    count: report.eigen_fallbacks,
                },
            ));
        }
        events.push(Self::new(
            tick,
            EventKind::Schedule {
                levels: report.levels,
                units: report.units,
            },
        ));
        events.push(Self::new(
            tick,
            EventKind::TickEnd {
                wall_time: report.wall_time,
                joints_solved: report.joints_solved,
            },
        ));
        events
    }

    /// Wraps any serializable value into a `Custom` event.
    pub fn custom<T: Serialize>(
        tick: u64,
        label: impl Into<String>,
        payload: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self::new(
            tick,
            EventKind::Custom {
                label: label.into(),
                payload: serde_json::to_string(payload)?,
            },
        ))
    }

    /// Short name of the event kind.
    pub fn label(&self) -> &str {
        match &self.kind {
            EventKind::TickBegin { .. } => "tick_begin",
            EventKind::TickEnd { .. } => "tick_end",
            EventKind::Dearticulated { .. } => "dearticulated",
            EventKind::EigenFallback { .. } => "eigen_fallback",
            EventKind::Schedule { .. } => "schedule",
            EventKind::Energy { .. } => "energy",
            EventKind::Custom { label, .. } => label,
        }
    }
}
