use crate::alignment::FrameAlignment;
use crate::instance::WindowKey;
use crate::metrics::{DetPoint, ModePoint};
use crate::signal::TemporalSignal;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A fixed-point false-alarm-rate operating point usable as a map key.
/// Wraps the bit pattern of the configured rate so equal rates hash equally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetRfa(u64);

impl TargetRfa {
    pub fn new(rate: f64) -> Self {
        Self(rate.to_bits())
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl fmt::Display for TargetRfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Closed set of metric names shared between filter diagnostics, the
/// per-pair component cache and the congruence breakdown. `Display` renders
/// the report-facing names.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricKey {
    TemporalIntersection,
    TemporalIou,
    SpatialIou,
    ObjectCongruence,
    MinMode,
    ModeRecords,
    AlignmentRecords,
    DetPoints,
    RefMaskLocalization,
    PMissAtRfa(TargetRfa),
}

impl MetricKey {
    pub fn p_miss_at_rfa(rate: f64) -> Self {
        Self::PMissAtRfa(TargetRfa::new(rate))
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKey::TemporalIntersection => write!(f, "temporal_intersection"),
            MetricKey::TemporalIou => write!(f, "temporal_intersection-over-union"),
            MetricKey::SpatialIou => write!(f, "spatial_intersection-over-union"),
            MetricKey::ObjectCongruence => write!(f, "object_congruence"),
            MetricKey::MinMode => write!(f, "minMODE"),
            MetricKey::ModeRecords => write!(f, "MODE_records"),
            MetricKey::AlignmentRecords => write!(f, "alignment_records"),
            MetricKey::DetPoints => write!(f, "det_points"),
            MetricKey::RefMaskLocalization => write!(f, "ref_filter_localization"),
            MetricKey::PMissAtRfa(rate) => write!(f, "object-p_miss@{rate}rfa"),
        }
    }
}

/// Tagged union of everything a metric can evaluate to. Scalar metrics keep
/// their undefined state explicit instead of signalling errors.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
    Scalar(Option<f64>),
    ModeCurve(Vec<ModePoint>),
    DetCurve(Vec<DetPoint>),
    Alignments(Vec<FrameAlignment>),
    Localization(BTreeMap<WindowKey, TemporalSignal>),
}

impl MetricValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MetricValue::Scalar(value) => *value,
            _ => None,
        }
    }
}

/// Named metric values produced by one filter or component evaluation.
pub type ComponentMap = HashMap<MetricKey, MetricValue>;

/// Key-value store scoped to a single (reference, system) pair evaluation.
///
/// Callers populate it between filter invocations so expensive shared
/// sub-results are computed once. It is keyed purely by metric name, so one
/// cache must never be reused across different instance pairs.
///
#[derive(Clone, Debug, Default)]
pub struct ComponentCache {
    components: ComponentMap,
}

impl ComponentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &MetricKey) -> Option<&MetricValue> {
        self.components.get(key)
    }

    pub fn insert(&mut self, key: MetricKey, value: MetricValue) {
        self.components.insert(key, value);
    }

    pub fn remove(&mut self, key: &MetricKey) -> Option<MetricValue> {
        self.components.remove(key)
    }

    pub fn contains(&self, key: &MetricKey) -> bool {
        self.components.contains_key(key)
    }

    pub fn contains_all(&self, keys: &[MetricKey]) -> bool {
        keys.iter().all(|key| self.contains(key))
    }

    /// Merges the outcome of a component evaluation into the cache.
    pub fn extend(&mut self, components: ComponentMap) {
        self.components.extend(components);
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
