use crate::alignment::{
    perform_alignment, AlignmentRecord, FrameAlignment, IoUKernelBuilder, KernelBuilder,
    LocalizedObject,
};
use crate::filters::cache::{ComponentCache, ComponentMap, MetricKey, MetricValue};
use crate::filters::{FilterOutcome, PairFilter, TemporalMask};
use crate::instance::{temporal_signal_pairs, ActivityInstance, FrameKey, Object, WindowKey};
use crate::metrics::{
    identity_cost, mode, p_miss, p_miss_at_r_fa, r_fa, CostFunction, DetPoint, ModePoint,
};
use crate::signal::TemporalSignal;
use crate::Errors;
use itertools::Itertools;
use log::debug;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// False-alarm-rate operating points reported by default.
pub const DEFAULT_TARGET_RFAS: [f64; 4] = [0.5, 0.2, 0.1, 0.033];

/// Full scoring record for one (reference, system) pair.
///
/// `object_congruence` and `min_mode` are undefined when the pair holds no
/// reference objects after type filtering; that is a legitimate "no signal
/// to score" outcome, not an error.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CongruenceBreakdown {
    pub object_congruence: Option<f64>,
    pub min_mode: Option<f64>,
    pub mode_records: Vec<ModePoint>,
    pub alignment_records: Vec<FrameAlignment>,
    pub det_points: Vec<DetPoint>,
    pub ref_mask_localization: BTreeMap<WindowKey, TemporalSignal>,
    pub p_miss_at_rfa: Vec<(f64, Option<f64>)>,
}

impl CongruenceBreakdown {
    /// Flattens the breakdown into named components for diagnostics
    /// reporting and cache population.
    pub fn into_components(self) -> ComponentMap {
        let mut components = HashMap::from([
            (
                MetricKey::ObjectCongruence,
                MetricValue::Scalar(self.object_congruence),
            ),
            (MetricKey::MinMode, MetricValue::Scalar(self.min_mode)),
            (
                MetricKey::ModeRecords,
                MetricValue::ModeCurve(self.mode_records),
            ),
            (
                MetricKey::AlignmentRecords,
                MetricValue::Alignments(self.alignment_records),
            ),
            (MetricKey::DetPoints, MetricValue::DetCurve(self.det_points)),
            (
                MetricKey::RefMaskLocalization,
                MetricValue::Localization(self.ref_mask_localization),
            ),
        ]);
        for (target, value) in self.p_miss_at_rfa {
            components.insert(MetricKey::p_miss_at_rfa(target), MetricValue::Scalar(value));
        }
        components
    }

    /// Rebuilds a typed breakdown from named components, e.g. out of a
    /// fully populated cache. Fails when a component is missing or holds a
    /// value of the wrong kind.
    ///
    pub fn from_components(
        components: &ComponentMap,
        target_rfas: &[f64],
    ) -> Result<Self, Errors> {
        fn fetch<'m>(
            components: &'m ComponentMap,
            key: MetricKey,
        ) -> Result<&'m MetricValue, Errors> {
            components
                .get(&key)
                .ok_or_else(|| Errors::MissingComponent(key.to_string()))
        }

        fn scalar(components: &ComponentMap, key: MetricKey) -> Result<Option<f64>, Errors> {
            match fetch(components, key)? {
                MetricValue::Scalar(value) => Ok(*value),
                _ => Err(Errors::ComponentKindMismatch(key.to_string())),
            }
        }

        let mode_records = match fetch(components, MetricKey::ModeRecords)? {
            MetricValue::ModeCurve(curve) => curve.clone(),
            _ => return Err(Errors::ComponentKindMismatch(MetricKey::ModeRecords.to_string())),
        };
        let alignment_records = match fetch(components, MetricKey::AlignmentRecords)? {
            MetricValue::Alignments(records) => records.clone(),
            _ => {
                return Err(Errors::ComponentKindMismatch(
                    MetricKey::AlignmentRecords.to_string(),
                ))
            }
        };
        let det_points = match fetch(components, MetricKey::DetPoints)? {
            MetricValue::DetCurve(points) => points.clone(),
            _ => return Err(Errors::ComponentKindMismatch(MetricKey::DetPoints.to_string())),
        };
        let ref_mask_localization = match fetch(components, MetricKey::RefMaskLocalization)? {
            MetricValue::Localization(localization) => localization.clone(),
            _ => {
                return Err(Errors::ComponentKindMismatch(
                    MetricKey::RefMaskLocalization.to_string(),
                ))
            }
        };

        let mut p_miss_at_rfa = Vec::with_capacity(target_rfas.len());
        for &target in target_rfas {
            p_miss_at_rfa.push((target, scalar(components, MetricKey::p_miss_at_rfa(target))?));
        }

        Ok(Self {
            object_congruence: scalar(components, MetricKey::ObjectCongruence)?,
            min_mode: scalar(components, MetricKey::MinMode)?,
            mode_records,
            alignment_records,
            det_points,
            ref_mask_localization,
            p_miss_at_rfa,
        })
    }
}

/// Per-frame grouping of the objects whose spatial footprint survives the
/// temporal mask. Built in two explicit passes: join-and-filter per object,
/// then group by frame.
///
fn object_signals_to_lookup<'a>(
    mask: &TemporalSignal,
    objects: &[&'a Object],
    window: &str,
) -> BTreeMap<FrameKey, Vec<LocalizedObject<'a>>> {
    let mut selected: Vec<(FrameKey, LocalizedObject<'a>)> = Vec::new();
    for &object in objects {
        for (frame, region) in object.localization_in(window) {
            if mask.contains(*frame) && !region.is_empty() {
                selected.push((*frame, LocalizedObject::new(object, *region)));
            }
        }
    }

    let mut lookup: BTreeMap<FrameKey, Vec<LocalizedObject<'a>>> = BTreeMap::new();
    for (frame, localized) in selected {
        lookup.entry(frame).or_default().push(localized);
    }
    lookup
}

fn select_objects<'a>(objects: &'a [Object], allowed: &[String]) -> Vec<&'a Object> {
    objects
        .iter()
        .filter(|object| {
            allowed.is_empty() || allowed.iter().any(|t| t == object.object_type())
        })
        .collect()
}

/// Object congruence scorer: aligns reference and system object
/// localizations frame by frame, sweeps the observed presence confidences
/// and reduces the sweep into a minimal MODE score with DET operating
/// points.
///
#[derive(Clone, Debug)]
pub struct ObjectCongruence<K: KernelBuilder> {
    kernel_builder: K,
    ref_mask: TemporalMask,
    sys_mask: TemporalMask,
    object_types: Vec<String>,
    cmiss: CostFunction,
    cfa: CostFunction,
    target_rfas: Vec<f64>,
}

impl Default for ObjectCongruence<IoUKernelBuilder> {
    fn default() -> Self {
        Self::new(IoUKernelBuilder::default())
    }
}

impl<K: KernelBuilder> ObjectCongruence<K> {
    pub fn new(kernel_builder: K) -> Self {
        Self {
            kernel_builder,
            ref_mask: TemporalMask::Reference,
            sys_mask: TemporalMask::Intersection,
            object_types: Vec::default(),
            cmiss: identity_cost,
            cfa: identity_cost,
            target_rfas: DEFAULT_TARGET_RFAS.to_vec(),
        }
    }

    /// Sets the temporal masks applied to the reference and system sides of
    /// every shared window before the frame lookups are built.
    pub fn with_masks(mut self, ref_mask: TemporalMask, sys_mask: TemporalMask) -> Self {
        self.ref_mask = ref_mask;
        self.sys_mask = sys_mask;
        self
    }

    /// Restricts scoring to the listed object types. An empty list means no
    /// restriction.
    pub fn with_object_types(mut self, object_types: &[&str]) -> Self {
        self.object_types = object_types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_costs(mut self, cmiss: CostFunction, cfa: CostFunction) -> Self {
        self.cmiss = cmiss;
        self.cfa = cfa;
        self
    }

    pub fn with_target_rfas(mut self, target_rfas: &[f64]) -> Self {
        assert!(
            target_rfas.iter().all(|rate| *rate > 0.0),
            "Target false-alarm rates must be positive"
        );
        self.target_rfas = target_rfas.to_vec();
        self
    }

    pub fn target_rfas(&self) -> &[f64] {
        &self.target_rfas
    }

    /// The components the cache must hold, all at once, for a breakdown to
    /// be reused instead of recomputed.
    pub fn required_keys(&self) -> Vec<MetricKey> {
        let mut keys = vec![
            MetricKey::ObjectCongruence,
            MetricKey::MinMode,
            MetricKey::ModeRecords,
            MetricKey::AlignmentRecords,
            MetricKey::DetPoints,
            MetricKey::RefMaskLocalization,
        ];
        keys.extend(
            self.target_rfas
                .iter()
                .map(|&target| MetricKey::p_miss_at_rfa(target)),
        );
        keys
    }

    /// Scores one pair from scratch.
    pub fn breakdown(
        &self,
        reference: &ActivityInstance,
        system: &ActivityInstance,
    ) -> CongruenceBreakdown {
        let ref_objects = select_objects(reference.objects(), &self.object_types);
        let sys_objects = select_objects(system.objects(), &self.object_types);

        let mut correct: Vec<AlignmentRecord> = Vec::new();
        let mut missed: Vec<AlignmentRecord> = Vec::new();
        let mut false_alarms: Vec<AlignmentRecord> = Vec::new();
        let mut alignment_records: Vec<FrameAlignment> = Vec::new();
        let mut ref_mask_localization: BTreeMap<WindowKey, TemporalSignal> = BTreeMap::new();
        let mut reference_operands = 0_usize;

        for (ref_signal, sys_signal, window) in temporal_signal_pairs(reference, system) {
            let ref_mask = self.ref_mask.resolve(ref_signal, sys_signal);
            let sys_mask = self.sys_mask.resolve(ref_signal, sys_signal);

            let ref_lookup = object_signals_to_lookup(&ref_mask, &ref_objects, window);
            let sys_lookup = object_signals_to_lookup(&sys_mask, &sys_objects, window);

            ref_mask_localization.insert(window.clone(), ref_mask);

            let frames: Vec<FrameKey> = ref_lookup
                .keys()
                .chain(sys_lookup.keys())
                .copied()
                .sorted()
                .dedup()
                .collect();

            for frame in frames {
                let frame_refs = ref_lookup.get(&frame).map(Vec::as_slice).unwrap_or(&[]);
                let frame_sys = sys_lookup.get(&frame).map(Vec::as_slice).unwrap_or(&[]);
                reference_operands += frame_refs.len();

                let kernel = self.kernel_builder.build(frame_sys);
                let outcome = perform_alignment(frame_refs, frame_sys, &kernel);

                alignment_records.extend(
                    outcome
                        .correct
                        .iter()
                        .chain(outcome.missed.iter())
                        .chain(outcome.false_alarms.iter())
                        .map(|record| FrameAlignment {
                            frame,
                            record: record.clone(),
                        }),
                );

                correct.extend(outcome.correct);
                missed.extend(outcome.missed);
                false_alarms.extend(outcome.false_alarms);
            }

            debug!(
                "window {}: {} correct, {} missed, {} false alarm records so far",
                window,
                correct.len(),
                missed.len(),
                false_alarms.len()
            );
        }

        let num_correct = correct.len();
        let num_miss = missed.len();
        let ref_area: f64 = ref_mask_localization.values().map(TemporalSignal::area).sum();

        debug!(
            "sweeping {} reference operands against {} system confidences",
            reference_operands,
            correct.len() + false_alarms.len()
        );

        let sweep: Vec<f32> = correct
            .iter()
            .chain(false_alarms.iter())
            .filter_map(|record| record.system_conf())
            .sorted_by(|a, b| a.partial_cmp(b).unwrap())
            .dedup()
            .collect();

        let mut mode_records: Vec<ModePoint> = Vec::with_capacity(sweep.len());
        let mut det_points: Vec<DetPoint> = Vec::with_capacity(sweep.len());

        for confidence in sweep {
            let above = |record: &&AlignmentRecord| {
                record
                    .system_conf()
                    .map(|conf| conf >= confidence)
                    .unwrap_or(false)
            };
            let filtered_correct = correct.iter().filter(above).count();
            let filtered_fa = false_alarms.iter().filter(above).count();
            // A correct detection whose confidence drops below the
            // threshold becomes a miss at that operating point.
            let filtered_miss = num_miss + num_correct - filtered_correct;

            if let Some(score) = mode(
                filtered_correct,
                filtered_miss,
                filtered_fa,
                self.cmiss,
                self.cfa,
            ) {
                mode_records.push(ModePoint {
                    confidence,
                    mode: score,
                });
            }

            det_points.push(DetPoint {
                confidence,
                rate_fa: r_fa(filtered_correct, filtered_miss, filtered_fa, ref_area),
                p_miss: p_miss(filtered_correct, filtered_miss, filtered_fa),
            });
        }

        let min_mode = mode_records
            .iter()
            .map(|point| point.mode)
            .fold(None, |acc: Option<f64>, score| {
                Some(acc.map_or(score, |best| best.min(score)))
            });

        let p_miss_at_rfa = self
            .target_rfas
            .iter()
            .map(|&target| (target, p_miss_at_r_fa(&det_points, target)))
            .collect();

        CongruenceBreakdown {
            object_congruence: min_mode.map(|score| 1.0 - score),
            min_mode,
            mode_records,
            alignment_records,
            det_points,
            ref_mask_localization,
            p_miss_at_rfa,
        }
    }

    /// Cache-aware component evaluation: when every required key is already
    /// present in the cache the cached components are returned as-is; a
    /// partial hit is treated as a full miss and the whole breakdown is
    /// recomputed, so mixed stale/fresh state can never be observed.
    ///
    pub fn component(
        &self,
        reference: &ActivityInstance,
        system: &ActivityInstance,
        cache: &ComponentCache,
    ) -> ComponentMap {
        let keys = self.required_keys();
        if cache.contains_all(&keys) {
            return keys
                .into_iter()
                .filter_map(|key| cache.get(&key).cloned().map(|value| (key, value)))
                .collect();
        }
        self.breakdown(reference, system).into_components()
    }

    /// Scores many pairs independently. Pair evaluations share no state, so
    /// this is the natural parallelization axis.
    pub fn breakdown_batch(
        &self,
        pairs: &[(ActivityInstance, ActivityInstance)],
    ) -> Vec<CongruenceBreakdown>
    where
        K: Sync,
    {
        pairs
            .par_iter()
            .map(|(reference, system)| self.breakdown(reference, system))
            .collect()
    }
}

/// Pass/fail gate over the congruence score: accepted iff
/// `1 - minMODE >= threshold`. Undefined congruence never passes.
///
#[derive(Clone, Debug)]
pub struct ObjectCongruenceFilter<K: KernelBuilder> {
    scorer: ObjectCongruence<K>,
    threshold: f64,
}

impl<K: KernelBuilder> ObjectCongruenceFilter<K> {
    pub fn new(scorer: ObjectCongruence<K>, threshold: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&threshold),
            "Threshold must lay within [0.0, 1.0]"
        );
        Self { scorer, threshold }
    }
}

impl<K: KernelBuilder> PairFilter<ActivityInstance> for ObjectCongruenceFilter<K> {
    fn evaluate(&self, reference: &ActivityInstance, system: &ActivityInstance) -> FilterOutcome {
        let breakdown = self.scorer.breakdown(reference, system);
        let accepted = breakdown
            .object_congruence
            .map(|congruence| congruence >= self.threshold)
            .unwrap_or(false);
        FilterOutcome::new(accepted, breakdown.into_components())
    }
}

#[cfg(test)]
mod congruence_tests {
    use crate::alignment::{AlignmentClass, IoUKernelBuilder};
    use crate::congruence::{ObjectCongruence, ObjectCongruenceFilter};
    use crate::filters::cache::{ComponentCache, MetricKey, MetricValue};
    use crate::filters::PairFilter;
    use crate::instance::{ActivityInstance, Object};
    use crate::signal::region::{approx, SpatialRegion};
    use crate::signal::TemporalSignal;

    fn region() -> SpatialRegion {
        SpatialRegion::new(0.0, 0.0, 10.0, 10.0)
    }

    fn far_region() -> SpatialRegion {
        SpatialRegion::new(100.0, 100.0, 10.0, 10.0)
    }

    fn frames(range: std::ops::Range<u64>, region: SpatialRegion) -> Vec<(u64, SpatialRegion)> {
        range.map(|frame| (frame, region)).collect()
    }

    fn scorer() -> ObjectCongruence<IoUKernelBuilder> {
        ObjectCongruence::default().with_target_rfas(&[0.5])
    }

    /// One reference object fully overlapped by one system detection across
    /// 3 frames at confidence 0.9, plus a disjoint system detection at
    /// confidence 0.4 in the same frames.
    fn overlap_with_false_alarm() -> (ActivityInstance, ActivityInstance) {
        let reference = ActivityInstance::new()
            .with_extent("w1", TemporalSignal::from_range(0, 3))
            .with_object(
                Object::new("Person", 1.0).with_localization("w1", &frames(0..3, region())),
            );
        let system = ActivityInstance::new()
            .with_extent("w1", TemporalSignal::from_range(0, 3))
            .with_object(
                Object::new("Person", 0.9).with_localization("w1", &frames(0..3, region())),
            )
            .with_object(
                Object::new("Person", 0.4).with_localization("w1", &frames(0..3, far_region())),
            );
        (reference, system)
    }

    #[test]
    fn end_to_end_overlap_with_false_alarm() {
        let (reference, system) = overlap_with_false_alarm();
        let breakdown = scorer().breakdown(&reference, &system);

        // one correct and one false alarm per frame
        let correct = breakdown
            .alignment_records
            .iter()
            .filter(|fa| fa.record.class() == AlignmentClass::Correct)
            .count();
        let missed = breakdown
            .alignment_records
            .iter()
            .filter(|fa| fa.record.class() == AlignmentClass::Miss)
            .count();
        let false_alarms = breakdown
            .alignment_records
            .iter()
            .filter(|fa| fa.record.class() == AlignmentClass::FalseAlarm)
            .count();
        assert_eq!((correct, missed, false_alarms), (3, 0, 3));

        // sweep thresholds are the two observed confidences
        assert_eq!(breakdown.mode_records.len(), 2);
        let low = &breakdown.mode_records[0];
        let high = &breakdown.mode_records[1];
        assert_eq!(low.confidence, 0.4);
        assert_eq!(high.confidence, 0.9);
        // at 0.4 every record survives: 0 misses, 3 false alarms over 3 refs
        assert!(approx(low.mode, 1.0));
        // at 0.9 the false alarms drop out and the correct records survive
        assert!(approx(high.mode, 0.0));

        assert_eq!(breakdown.min_mode, Some(high.mode.min(low.mode)));
        assert!(approx(breakdown.object_congruence.unwrap(), 1.0));

        // DET points: rfa = fa / ref mask area (3 frames)
        assert_eq!(breakdown.det_points.len(), 2);
        assert!(approx(breakdown.det_points[0].rate_fa.unwrap(), 1.0));
        assert!(approx(breakdown.det_points[0].p_miss.unwrap(), 0.0));
        assert!(approx(breakdown.det_points[1].rate_fa.unwrap(), 0.0));

        // p_miss@0.5rfa is defined: the curve spans rfa 0.0..=1.0
        assert_eq!(breakdown.p_miss_at_rfa.len(), 1);
        assert_eq!(breakdown.p_miss_at_rfa[0].0, 0.5);
        assert!(approx(breakdown.p_miss_at_rfa[0].1.unwrap(), 0.0));
    }

    #[test]
    fn low_confidence_correct_becomes_miss_when_filtered() {
        // correct detection at 0.4, false alarm at 0.9
        let reference = ActivityInstance::new()
            .with_extent("w1", TemporalSignal::from_range(0, 1))
            .with_object(Object::new("Person", 1.0).with_localization("w1", &frames(0..1, region())));
        let system = ActivityInstance::new()
            .with_extent("w1", TemporalSignal::from_range(0, 1))
            .with_object(Object::new("Person", 0.4).with_localization("w1", &frames(0..1, region())))
            .with_object(
                Object::new("Person", 0.9).with_localization("w1", &frames(0..1, far_region())),
            );

        let breakdown = scorer().breakdown(&reference, &system);

        // at 0.4: 1 correct, 0 miss, 1 false alarm => MODE 1
        // at 0.9: 0 correct, 1 miss, 1 false alarm => MODE 2
        assert_eq!(breakdown.mode_records.len(), 2);
        assert!(approx(breakdown.mode_records[0].mode, 1.0));
        assert!(approx(breakdown.mode_records[1].mode, 2.0));
        assert_eq!(breakdown.min_mode, Some(breakdown.mode_records[0].mode));
        assert!(approx(breakdown.object_congruence.unwrap(), 0.0));

        assert!(approx(breakdown.det_points[1].p_miss.unwrap(), 1.0));
    }

    #[test]
    fn det_curve_is_monotonic_along_the_sweep() {
        let mut system = ActivityInstance::new().with_extent("w1", TemporalSignal::from_range(0, 8));
        let mut reference =
            ActivityInstance::new().with_extent("w1", TemporalSignal::from_range(0, 8));

        for i in 0..4_u64 {
            let covered = SpatialRegion::new(20.0 * i as f32, 0.0, 10.0, 10.0);
            reference = reference.with_object(
                Object::new("Person", 1.0).with_localization("w1", &[(i, covered)]),
            );
            system = system.with_object(
                Object::new("Person", 0.2 * (i + 1) as f32).with_localization("w1", &[(i, covered)]),
            );
        }
        // uncovered detections at assorted confidences
        for i in 0..3_u64 {
            system = system.with_object(
                Object::new("Person", 0.15 * (i + 1) as f32).with_localization(
                    "w1",
                    &[(i + 4, SpatialRegion::new(500.0, 500.0, 5.0, 5.0))],
                ),
            );
        }

        let breakdown = scorer().breakdown(&reference, &system);
        assert!(breakdown.det_points.len() > 2);

        for window in breakdown.det_points.windows(2) {
            assert!(window[0].confidence < window[1].confidence);
            assert!(window[0].rate_fa.unwrap() >= window[1].rate_fa.unwrap());
            assert!(window[0].p_miss.unwrap() <= window[1].p_miss.unwrap());
        }
    }

    #[test]
    fn congruence_is_undefined_without_reference_objects() {
        let reference =
            ActivityInstance::new().with_extent("w1", TemporalSignal::from_range(0, 3));
        let system = ActivityInstance::new()
            .with_extent("w1", TemporalSignal::from_range(0, 3))
            .with_object(Object::new("Person", 0.7).with_localization("w1", &frames(0..3, region())));

        let breakdown = scorer().breakdown(&reference, &system);
        assert_eq!(breakdown.min_mode, None);
        assert_eq!(breakdown.object_congruence, None);
        assert!(breakdown.mode_records.is_empty());
        // the DET curve still records the false-alarm operating points
        assert_eq!(breakdown.det_points.len(), 1);
        assert_eq!(breakdown.det_points[0].p_miss, None);

        // an undefined congruence never passes the gate
        let filter = ObjectCongruenceFilter::new(scorer(), 0.0);
        assert!(!filter.evaluate(&reference, &system).accepted);
    }

    #[test]
    fn congruence_is_defined_and_bounded_with_references() {
        let (reference, system) = overlap_with_false_alarm();
        let breakdown = scorer().breakdown(&reference, &system);
        let congruence = breakdown.object_congruence.unwrap();
        assert!((0.0..=1.0).contains(&congruence));

        let filter = ObjectCongruenceFilter::new(scorer(), 0.5);
        let outcome = filter.evaluate(&reference, &system);
        assert!(outcome.accepted);
        assert_eq!(
            outcome.components[&MetricKey::ObjectCongruence].as_scalar(),
            breakdown.object_congruence
        );
    }

    #[test]
    fn type_allow_list_drops_reference_objects() {
        let (reference, system) = overlap_with_false_alarm();
        let breakdown = scorer()
            .with_object_types(&["Vehicle"])
            .breakdown(&reference, &system);
        assert_eq!(breakdown.object_congruence, None);
        assert!(breakdown.alignment_records.is_empty());
    }

    #[test]
    fn component_reuses_a_fully_populated_cache_only() {
        let (reference, system) = overlap_with_false_alarm();
        let scorer = scorer();
        let fresh = scorer.breakdown(&reference, &system);

        // full cache hit: the cached components win, even when tampered
        let mut cache = ComponentCache::new();
        cache.extend(fresh.clone().into_components());
        cache.insert(MetricKey::MinMode, MetricValue::Scalar(Some(0.123)));
        let cached = scorer.component(&reference, &system, &cache);
        assert_eq!(cached[&MetricKey::MinMode].as_scalar(), Some(0.123));

        // removing a single key degrades to a full recomputation
        cache.remove(&MetricKey::DetPoints);
        let recomputed = scorer.component(&reference, &system, &cache);
        assert_eq!(
            recomputed[&MetricKey::MinMode].as_scalar(),
            fresh.min_mode
        );
        for key in scorer.required_keys() {
            assert!(recomputed.contains_key(&key), "missing {key}");
        }
    }

    #[test]
    fn cached_components_round_trip_to_a_breakdown() {
        use crate::congruence::CongruenceBreakdown;

        let (reference, system) = overlap_with_false_alarm();
        let scorer = scorer();
        let fresh = scorer.breakdown(&reference, &system);

        let components = fresh.clone().into_components();
        let rebuilt =
            CongruenceBreakdown::from_components(&components, scorer.target_rfas()).unwrap();
        assert_eq!(rebuilt, fresh);

        let mut partial = components;
        partial.remove(&MetricKey::AlignmentRecords);
        assert!(CongruenceBreakdown::from_components(&partial, scorer.target_rfas()).is_err());
    }

    #[test]
    fn windows_are_scored_independently() {
        // the same objects appear in two windows; records must not merge
        let reference = ActivityInstance::new()
            .with_extent("w1", TemporalSignal::from_range(0, 1))
            .with_extent("w2", TemporalSignal::from_range(0, 1))
            .with_object(
                Object::new("Person", 1.0)
                    .with_localization("w1", &frames(0..1, region()))
                    .with_localization("w2", &frames(0..1, region())),
            );
        let system = ActivityInstance::new()
            .with_extent("w1", TemporalSignal::from_range(0, 1))
            .with_extent("w2", TemporalSignal::from_range(0, 1))
            .with_object(
                Object::new("Person", 0.8)
                    .with_localization("w1", &frames(0..1, region()))
                    .with_localization("w2", &frames(0..1, region())),
            );

        let breakdown = scorer().breakdown(&reference, &system);
        assert_eq!(breakdown.alignment_records.len(), 2);
        assert_eq!(breakdown.ref_mask_localization.len(), 2);
        // two windows of one frame each
        let area: f64 = breakdown
            .ref_mask_localization
            .values()
            .map(|signal| signal.area())
            .sum();
        assert!(approx(area, 2.0));
    }

    #[test]
    fn window_without_reference_objects_still_contributes_false_alarms() {
        let reference = ActivityInstance::new()
            .with_extent("w1", TemporalSignal::from_range(0, 2))
            .with_object(Object::new("Person", 1.0).with_localization("w1", &frames(0..2, region())))
            .with_extent("w2", TemporalSignal::from_range(0, 2));
        let system = ActivityInstance::new()
            .with_extent("w1", TemporalSignal::from_range(0, 2))
            .with_object(Object::new("Person", 0.9).with_localization("w1", &frames(0..2, region())))
            .with_extent("w2", TemporalSignal::from_range(0, 2))
            .with_object(
                Object::new("Person", 0.3).with_localization("w2", &frames(0..2, far_region())),
            );

        let breakdown = scorer().breakdown(&reference, &system);
        let false_alarms = breakdown
            .alignment_records
            .iter()
            .filter(|fa| fa.record.class() == crate::alignment::AlignmentClass::FalseAlarm)
            .count();
        assert_eq!(false_alarms, 2);
        assert!(breakdown.object_congruence.is_some());
    }

    #[test]
    fn batch_scoring_matches_sequential_scoring() {
        let (reference, system) = overlap_with_false_alarm();
        let scorer = scorer();
        let pairs = vec![
            (reference.clone(), system.clone()),
            (system.clone(), reference.clone()),
        ];
        let batch = scorer.breakdown_batch(&pairs);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], scorer.breakdown(&reference, &system));
        assert_eq!(batch[1], scorer.breakdown(&system, &reference));
    }
}
