use crate::signal::region::SpatialRegion;
use crate::signal::TemporalSignal;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Frame index within a temporal window.
pub type FrameKey = u64;

/// Key of one temporal sub-window (a source file in the original benchmark).
pub type WindowKey = String;

/// Per-window object localization: frame -> spatial footprint.
pub type FrameLocalization = BTreeMap<FrameKey, SpatialRegion>;

/// Shared stand-in for "no localization in this window". Returned by
/// reference wherever a window entry is absent; must never be mutated.
///
pub static EMPTY_LOCALIZATION: Lazy<FrameLocalization> = Lazy::new(BTreeMap::new);

/// A single annotated object: its category label, the detector presence
/// confidence (1.0 for reference annotations) and per-window, per-frame
/// spatial footprints. Immutable once built.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    object_type: String,
    presence_conf: f32,
    localization: BTreeMap<WindowKey, FrameLocalization>,
}

impl Object {
    pub fn new(object_type: &str, presence_conf: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&presence_conf),
            "The presence confidence must lay within [0.0, 1.0]"
        );
        Self {
            object_type: object_type.to_string(),
            presence_conf,
            localization: BTreeMap::default(),
        }
    }

    /// Adds the object footprints for one window.
    ///
    /// # Parameters
    /// * `window` - the temporal window key;
    /// * `frames` - slice of (frame, footprint) tuples.
    ///
    pub fn with_localization(mut self, window: &str, frames: &[(FrameKey, SpatialRegion)]) -> Self {
        let entry = self.localization.entry(window.to_string()).or_default();
        for (frame, region) in frames {
            entry.insert(*frame, *region);
        }
        self
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn presence_conf(&self) -> f32 {
        self.presence_conf
    }

    pub fn localization_in(&self, window: &str) -> &FrameLocalization {
        self.localization.get(window).unwrap_or(&EMPTY_LOCALIZATION)
    }

    /// Aggregate spatial signal of the object over all windows and frames.
    pub fn spatial_signal(&self) -> SpatialRegion {
        self.localization
            .values()
            .flat_map(|frames| frames.values())
            .fold(SpatialRegion::EMPTY, |hull, region| hull.hull(region))
    }
}

/// A reference or system annotation instance: per-window temporal extents
/// plus the set of objects localized within them.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivityInstance {
    temporal_localization: BTreeMap<WindowKey, TemporalSignal>,
    objects: Vec<Object>,
}

impl ActivityInstance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extent(mut self, window: &str, signal: TemporalSignal) -> Self {
        self.temporal_localization.insert(window.to_string(), signal);
        self
    }

    pub fn with_object(mut self, object: Object) -> Self {
        self.objects.push(object);
        self
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn temporal_localization(&self) -> &BTreeMap<WindowKey, TemporalSignal> {
        &self.temporal_localization
    }

    /// Per-frame spatial footprint of the whole instance within one window,
    /// merging the footprints of all its objects frame by frame.
    ///
    pub fn frame_footprints(&self, window: &str) -> BTreeMap<FrameKey, SpatialRegion> {
        let mut out: BTreeMap<FrameKey, SpatialRegion> = BTreeMap::new();
        for object in &self.objects {
            for (frame, region) in object.localization_in(window) {
                if region.is_empty() {
                    continue;
                }
                out.entry(*frame)
                    .and_modify(|footprint| *footprint = footprint.hull(region))
                    .or_insert(*region);
            }
        }
        out
    }

    /// Aggregate spatial signal of the instance over all objects.
    pub fn spatial_signal(&self) -> SpatialRegion {
        self.objects
            .iter()
            .fold(SpatialRegion::EMPTY, |hull, object| {
                hull.hull(&object.spatial_signal())
            })
    }
}

/// Anything carrying an object category label. The seam lets the type-match
/// filters run against whole objects as well as per-frame localizations.
pub trait Typed {
    fn object_type(&self) -> &str;
}

impl Typed for Object {
    fn object_type(&self) -> &str {
        &self.object_type
    }
}

/// Anything with an aggregate spatial footprint.
pub trait SpatialExtent {
    fn spatial_signal(&self) -> SpatialRegion;
}

impl SpatialExtent for Object {
    fn spatial_signal(&self) -> SpatialRegion {
        Object::spatial_signal(self)
    }
}

impl SpatialExtent for ActivityInstance {
    fn spatial_signal(&self) -> SpatialRegion {
        ActivityInstance::spatial_signal(self)
    }
}

/// Pairs of per-window temporal signals shared by both instances.
/// Localizations that span several windows are treated as independent
/// occurrences, never merged across windows.
///
pub fn temporal_signal_pairs<'a>(
    reference: &'a ActivityInstance,
    system: &'a ActivityInstance,
) -> Vec<(&'a TemporalSignal, &'a TemporalSignal, &'a WindowKey)> {
    reference
        .temporal_localization
        .iter()
        .filter_map(|(window, ref_signal)| {
            system
                .temporal_localization
                .get(window)
                .map(|sys_signal| (ref_signal, sys_signal, window))
        })
        .collect()
}

/// Total temporal intersection between two instances, in frames.
pub fn temporal_intersection(reference: &ActivityInstance, system: &ActivityInstance) -> f64 {
    temporal_signal_pairs(reference, system)
        .iter()
        .map(|(r, s, _)| r.intersection(s).area())
        .sum()
}

/// Temporal intersection-over-union across all windows of either instance.
pub fn temporal_intersection_over_union(
    reference: &ActivityInstance,
    system: &ActivityInstance,
) -> f64 {
    let mut intersection = 0.0;
    let mut union = 0.0;

    for (window, ref_signal) in &reference.temporal_localization {
        match system.temporal_localization.get(window) {
            Some(sys_signal) => {
                intersection += ref_signal.intersection(sys_signal).area();
                union += ref_signal.union(sys_signal).area();
            }
            None => union += ref_signal.area(),
        }
    }
    for (window, sys_signal) in &system.temporal_localization {
        if !reference.temporal_localization.contains_key(window) {
            union += sys_signal.area();
        }
    }

    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Frame-wise spatial intersection-over-union over the full localizations of
/// both instances. Frames covered by only one side contribute their whole
/// footprint area to the union.
///
pub fn spatial_intersection_over_union(
    reference: &ActivityInstance,
    system: &ActivityInstance,
) -> f64 {
    let mut intersection = 0.0;
    let mut union = 0.0;

    let windows: Vec<&WindowKey> = reference
        .temporal_localization
        .keys()
        .chain(system.temporal_localization.keys())
        .collect();

    let mut seen: Vec<&WindowKey> = Vec::new();
    for window in windows {
        if seen.contains(&window) {
            continue;
        }
        seen.push(window);

        let ref_frames = reference.frame_footprints(window);
        let sys_frames = system.frame_footprints(window);

        for (frame, ref_region) in &ref_frames {
            match sys_frames.get(frame) {
                Some(sys_region) => {
                    intersection += ref_region.intersection_area(sys_region);
                    union += ref_region.union_area(sys_region);
                }
                None => union += ref_region.area(),
            }
        }
        for (frame, sys_region) in &sys_frames {
            if !ref_frames.contains_key(frame) {
                union += sys_region.area();
            }
        }
    }

    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Intersection-over-union of two aggregate spatial signals, ignoring time.
pub fn simple_spatial_intersection_over_union<R, S>(reference: &R, system: &S) -> f64
where
    R: SpatialExtent,
    S: SpatialExtent,
{
    reference.spatial_signal().iou(&system.spatial_signal())
}

#[cfg(test)]
mod instance_tests {
    use crate::instance::{
        simple_spatial_intersection_over_union, temporal_intersection,
        temporal_intersection_over_union, temporal_signal_pairs, ActivityInstance, Object,
    };
    use crate::signal::region::{approx, SpatialRegion};
    use crate::signal::TemporalSignal;

    fn region() -> SpatialRegion {
        SpatialRegion::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn absent_window_yields_shared_empty_localization() {
        let o = Object::new("Person", 1.0).with_localization("w1", &[(1, region())]);
        assert!(o.localization_in("w2").is_empty());
        assert_eq!(o.localization_in("w1").len(), 1);
    }

    #[test]
    fn signal_pairs_cover_shared_windows_only() {
        let r = ActivityInstance::new()
            .with_extent("w1", TemporalSignal::from_range(0, 10))
            .with_extent("w2", TemporalSignal::from_range(0, 10));
        let s = ActivityInstance::new().with_extent("w2", TemporalSignal::from_range(5, 15));

        let pairs = temporal_signal_pairs(&r, &s);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].2, "w2");
    }

    #[test]
    fn temporal_intersection_sums_over_windows() {
        let r = ActivityInstance::new()
            .with_extent("w1", TemporalSignal::from_range(0, 10))
            .with_extent("w2", TemporalSignal::from_range(0, 4));
        let s = ActivityInstance::new()
            .with_extent("w1", TemporalSignal::from_range(5, 15))
            .with_extent("w2", TemporalSignal::from_range(2, 4));

        assert!(approx(temporal_intersection(&r, &s), 7.0));
        // intersection 7, union (15 - 0) + (4 - 0) = 19
        assert!(approx(temporal_intersection_over_union(&r, &s), 7.0 / 19.0));
    }

    #[test]
    fn disjoint_extents_have_zero_intersection() {
        let r = ActivityInstance::new().with_extent("w1", TemporalSignal::from_range(0, 5));
        let s = ActivityInstance::new().with_extent("w1", TemporalSignal::from_range(5, 10));
        assert_eq!(temporal_intersection(&r, &s), 0.0);
    }

    #[test]
    fn instance_footprint_merges_objects_per_frame() {
        let r = ActivityInstance::new()
            .with_object(
                Object::new("Person", 1.0)
                    .with_localization("w1", &[(1, SpatialRegion::new(0.0, 0.0, 5.0, 5.0))]),
            )
            .with_object(
                Object::new("Vehicle", 1.0)
                    .with_localization("w1", &[(1, SpatialRegion::new(5.0, 5.0, 5.0, 5.0))]),
            );
        let footprints = r.frame_footprints("w1");
        assert!(footprints[&1].almost_same(&SpatialRegion::new(0.0, 0.0, 10.0, 10.0), 1e-6));
    }

    #[test]
    fn simple_spatial_iou_uses_aggregate_signals() {
        let a = Object::new("Person", 1.0).with_localization("w1", &[(1, region())]);
        let b = Object::new("Person", 0.8)
            .with_localization("w1", &[(7, SpatialRegion::new(100.0, 100.0, 10.0, 10.0))]);
        assert_eq!(simple_spatial_intersection_over_union(&a, &b), 0.0);
        assert!(approx(simple_spatial_intersection_over_union(&a, &a), 1.0));
    }
}
