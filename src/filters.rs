pub mod cache;

use crate::filters::cache::{ComponentCache, ComponentMap, MetricKey, MetricValue};
use crate::instance::{
    simple_spatial_intersection_over_union, spatial_intersection_over_union,
    temporal_intersection, temporal_intersection_over_union, ActivityInstance, SpatialExtent,
    Typed,
};
use crate::signal::TemporalSignal;
use std::collections::HashMap;

/// Accept/reject decision of a pairwise filter plus the named metric values
/// it measured on the way. Diagnostics are reported independently of the
/// decision.
#[derive(Clone, Debug, Default)]
pub struct FilterOutcome {
    pub accepted: bool,
    pub components: ComponentMap,
}

impl FilterOutcome {
    pub fn new(accepted: bool, components: ComponentMap) -> Self {
        Self {
            accepted,
            components,
        }
    }

    pub fn decision(accepted: bool) -> Self {
        Self {
            accepted,
            components: ComponentMap::default(),
        }
    }
}

/// A pairwise predicate over (reference, system) operands. Filters are
/// strategy objects built from explicit configuration, pure with respect to
/// their operands.
///
pub trait PairFilter<T> {
    fn evaluate(&self, reference: &T, system: &T) -> FilterOutcome;
}

/// Accepts pairs with any temporal intersection at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemporalIntersectionFilter;

impl PairFilter<ActivityInstance> for TemporalIntersectionFilter {
    fn evaluate(&self, reference: &ActivityInstance, system: &ActivityInstance) -> FilterOutcome {
        let intersection = temporal_intersection(reference, system);
        FilterOutcome::new(
            intersection > 0.0,
            HashMap::from([(
                MetricKey::TemporalIntersection,
                MetricValue::Scalar(Some(intersection)),
            )]),
        )
    }
}

/// Accepts pairs whose temporal intersection-over-union exceeds the
/// threshold.
#[derive(Clone, Copy, Debug)]
pub struct TemporalOverlapFilter {
    threshold: f64,
}

impl TemporalOverlapFilter {
    pub fn new(threshold: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&threshold),
            "Threshold must lay within [0.0, 1.0)"
        );
        Self { threshold }
    }
}

impl PairFilter<ActivityInstance> for TemporalOverlapFilter {
    fn evaluate(&self, reference: &ActivityInstance, system: &ActivityInstance) -> FilterOutcome {
        let tiou = temporal_intersection_over_union(reference, system);
        FilterOutcome::new(
            tiou > self.threshold,
            HashMap::from([(MetricKey::TemporalIou, MetricValue::Scalar(Some(tiou)))]),
        )
    }
}

/// Accepts pairs whose frame-wise spatial intersection-over-union over the
/// full localization exceeds the threshold.
#[derive(Clone, Copy, Debug)]
pub struct SpatialOverlapFilter {
    threshold: f64,
}

impl SpatialOverlapFilter {
    pub fn new(threshold: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&threshold),
            "Threshold must lay within [0.0, 1.0)"
        );
        Self { threshold }
    }
}

impl PairFilter<ActivityInstance> for SpatialOverlapFilter {
    fn evaluate(&self, reference: &ActivityInstance, system: &ActivityInstance) -> FilterOutcome {
        let siou = spatial_intersection_over_union(reference, system);
        FilterOutcome::new(
            siou > self.threshold,
            HashMap::from([(MetricKey::SpatialIou, MetricValue::Scalar(Some(siou)))]),
        )
    }
}

/// Same contract over raw aggregate spatial signals, usable for whole
/// instances, objects or per-frame localizations.
#[derive(Clone, Copy, Debug)]
pub struct SimpleSpatialOverlapFilter {
    threshold: f64,
}

impl SimpleSpatialOverlapFilter {
    pub fn new(threshold: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&threshold),
            "Threshold must lay within [0.0, 1.0)"
        );
        Self { threshold }
    }
}

impl<T: SpatialExtent> PairFilter<T> for SimpleSpatialOverlapFilter {
    fn evaluate(&self, reference: &T, system: &T) -> FilterOutcome {
        let ssiou = simple_spatial_intersection_over_union(reference, system);
        FilterOutcome::new(
            ssiou > self.threshold,
            HashMap::from([(MetricKey::SpatialIou, MetricValue::Scalar(Some(ssiou)))]),
        )
    }
}

/// Accepts pairs with identical object category labels.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObjectTypeMatchFilter;

impl<T: Typed> PairFilter<T> for ObjectTypeMatchFilter {
    fn evaluate(&self, reference: &T, system: &T) -> FilterOutcome {
        FilterOutcome::decision(reference.object_type() == system.object_type())
    }
}

/// Accepts pairs whose object types map to the same equivalence class. A
/// type absent from the class map rejects the pair; unmapped types are
/// policy, not faults.
///
#[derive(Clone, Debug)]
pub struct EquivClassTypeMatchFilter {
    classes: HashMap<String, String>,
}

impl EquivClassTypeMatchFilter {
    pub fn new(classes: &[(&str, &str)]) -> Self {
        Self {
            classes: classes
                .iter()
                .map(|(object_type, class)| (object_type.to_string(), class.to_string()))
                .collect(),
        }
    }
}

impl<T: Typed> PairFilter<T> for EquivClassTypeMatchFilter {
    fn evaluate(&self, reference: &T, system: &T) -> FilterOutcome {
        let r_class = self.classes.get(reference.object_type());
        let s_class = self.classes.get(system.object_type());

        match (r_class, s_class) {
            (Some(r_class), Some(s_class)) => FilterOutcome::decision(r_class == s_class),
            _ => FilterOutcome::decision(false),
        }
    }
}

/// Selects the temporal mask fed into the alignment driver for one side of
/// the pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemporalMask {
    /// Intersection of both extents.
    Intersection,
    /// The reference extent unchanged.
    Reference,
    /// The system extent unchanged.
    System,
}

impl TemporalMask {
    pub fn resolve(&self, reference: &TemporalSignal, system: &TemporalSignal) -> TemporalSignal {
        match self {
            TemporalMask::Intersection => reference.intersection(system),
            TemporalMask::Reference => reference.clone(),
            TemporalMask::System => system.clone(),
        }
    }
}

/// Returns the temporal IoU component, reading through the cache without
/// writing back. Callers are expected to have populated frequently reused
/// values themselves.
///
pub fn temporal_iou_component(
    reference: &ActivityInstance,
    system: &ActivityInstance,
    cache: &ComponentCache,
) -> ComponentMap {
    let value = cache
        .get(&MetricKey::TemporalIou)
        .cloned()
        .unwrap_or_else(|| {
            MetricValue::Scalar(Some(temporal_intersection_over_union(reference, system)))
        });
    HashMap::from([(MetricKey::TemporalIou, value)])
}

/// Returns the simple spatial IoU component, reading through the cache
/// without writing back.
pub fn simple_spatial_iou_component(
    reference: &ActivityInstance,
    system: &ActivityInstance,
    cache: &ComponentCache,
) -> ComponentMap {
    let value = cache
        .get(&MetricKey::SpatialIou)
        .cloned()
        .unwrap_or_else(|| {
            MetricValue::Scalar(Some(simple_spatial_intersection_over_union(
                reference, system,
            )))
        });
    HashMap::from([(MetricKey::SpatialIou, value)])
}
