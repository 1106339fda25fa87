//! Connection topology as a pure function of the settings.

use super::stage::{Edge, StageId};
use crate::settings::Settings;

/// The full edge set for one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    edges: Vec<Edge>,
}

impl Topology {
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn contains(&self, edge: Edge) -> bool {
        self.edges.contains(&edge)
    }

    /// Edges leaving `stage`, in wiring order.
    pub fn outgoing(&self, stage: StageId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.from == stage)
    }
}

/// Computes the unique chain for `settings`.
///
/// Effects are chained in a fixed order (distortion, tremolo, reverb), each
/// one only when enabled. Disabled effects are bypassed. The analysis tap
/// always sits directly in front of the output.
pub fn topology(settings: &Settings) -> Topology {
    let mut edges = vec![Edge::signal(StageId::ToneSource, StageId::AmplitudeGate)];
    let mut last = StageId::AmplitudeGate;

    if settings.distortion_enabled {
        edges.push(Edge::signal(last, StageId::DistortionShaper));
        last = StageId::DistortionShaper;
    }

    if settings.tremolo_enabled {
        edges.push(Edge::signal(last, StageId::TremoloGate));
        edges.push(Edge::control(StageId::TremoloModulator, StageId::TremoloGate));
        last = StageId::TremoloGate;
    }

    if settings.reverb_enabled {
        edges.push(Edge::signal(last, StageId::DryGain));
        edges.push(Edge::signal(last, StageId::ReverbUnit));
        edges.push(Edge::signal(StageId::ReverbUnit, StageId::WetGain));
        edges.push(Edge::signal(StageId::DryGain, StageId::AnalysisTap));
        edges.push(Edge::signal(StageId::WetGain, StageId::AnalysisTap));
    } else {
        edges.push(Edge::signal(last, StageId::AnalysisTap));
    }

    edges.push(Edge::signal(StageId::AnalysisTap, StageId::Output));
    Topology { edges }
}
