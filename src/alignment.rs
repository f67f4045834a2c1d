use crate::instance::{Object, SpatialExtent, Typed};
use crate::signal::region::SpatialRegion;
use pathfinding::kuhn_munkres::kuhn_munkres;
use pathfinding::matrix::Matrix;

const F32_I64_MULT: f32 = 1_000_000.0;

/// One object's spatial footprint in one frame: the operand the bipartite
/// matcher works with.
#[derive(Clone, Copy, Debug)]
pub struct LocalizedObject<'a> {
    pub object: &'a Object,
    pub region: SpatialRegion,
}

impl<'a> LocalizedObject<'a> {
    pub fn new(object: &'a Object, region: SpatialRegion) -> Self {
        Self { object, region }
    }
}

impl Typed for LocalizedObject<'_> {
    fn object_type(&self) -> &str {
        self.object.object_type()
    }
}

impl SpatialExtent for LocalizedObject<'_> {
    fn spatial_signal(&self) -> SpatialRegion {
        self.region
    }
}

/// Owned snapshot of a matched operand, kept inside alignment records so the
/// records outlive the borrowed frame lookups and stay cacheable.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedObject {
    pub object_type: String,
    pub presence_conf: f32,
    pub region: SpatialRegion,
}

impl From<&LocalizedObject<'_>> for RecordedObject {
    fn from(localized: &LocalizedObject<'_>) -> Self {
        Self {
            object_type: localized.object.object_type().to_string(),
            presence_conf: localized.object.presence_conf(),
            region: localized.region,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignmentClass {
    Correct,
    Miss,
    FalseAlarm,
}

/// A classified matching outcome for one frame. The classification is
/// implied by which sides are present: both - correct, reference only -
/// miss, system only - false alarm.
///
#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentRecord {
    pub reference: Option<RecordedObject>,
    pub system: Option<RecordedObject>,
    pub kernel_score: Option<f32>,
}

impl AlignmentRecord {
    pub fn correct(
        reference: &LocalizedObject<'_>,
        system: &LocalizedObject<'_>,
        kernel_score: f32,
    ) -> Self {
        Self {
            reference: Some(reference.into()),
            system: Some(system.into()),
            kernel_score: Some(kernel_score),
        }
    }

    pub fn miss(reference: &LocalizedObject<'_>) -> Self {
        Self {
            reference: Some(reference.into()),
            system: None,
            kernel_score: None,
        }
    }

    pub fn false_alarm(system: &LocalizedObject<'_>) -> Self {
        Self {
            reference: None,
            system: Some(system.into()),
            kernel_score: None,
        }
    }

    pub fn class(&self) -> AlignmentClass {
        match (&self.reference, &self.system) {
            (Some(_), Some(_)) => AlignmentClass::Correct,
            (Some(_), None) => AlignmentClass::Miss,
            (None, _) => AlignmentClass::FalseAlarm,
        }
    }

    /// Presence confidence of the system side, when one exists.
    pub fn system_conf(&self) -> Option<f32> {
        self.system.as_ref().map(|object| object.presence_conf)
    }
}

/// An alignment record tagged with the frame it originated from, retained
/// for per-frame audits of a scored pair.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameAlignment {
    pub frame: crate::instance::FrameKey,
    pub record: AlignmentRecord,
}

/// Classified record sets produced by one matcher invocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlignmentOutcome {
    pub correct: Vec<AlignmentRecord>,
    pub missed: Vec<AlignmentRecord>,
    pub false_alarms: Vec<AlignmentRecord>,
}

/// Pairwise similarity kernel for the matcher. `None` marks a disallowed
/// pairing; `Some(score)` with `score` in [0.0, 1.0] marks an allowed one.
pub trait ObjectKernel {
    fn score(&self, reference: &LocalizedObject, system: &LocalizedObject) -> Option<f32>;
}

/// Builds a kernel against the system objects active in one frame, so the
/// matcher can be weighted per frame.
pub trait KernelBuilder {
    type Kernel: ObjectKernel;

    fn build(&self, system_objects: &[LocalizedObject]) -> Self::Kernel;
}

/// Plain spatial-overlap kernel: region IoU, disallowed below the minimum
/// overlap floor.
#[derive(Clone, Copy, Debug)]
pub struct IoUKernel {
    min_overlap: f64,
}

impl ObjectKernel for IoUKernel {
    fn score(&self, reference: &LocalizedObject, system: &LocalizedObject) -> Option<f32> {
        let iou = reference.region.iou(&system.region);
        if iou > self.min_overlap {
            Some(iou as f32)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct IoUKernelBuilder {
    min_overlap: f64,
}

impl IoUKernelBuilder {
    pub fn new(min_overlap: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&min_overlap),
            "The minimum overlap must lay within [0.0, 1.0)"
        );
        Self { min_overlap }
    }
}

impl Default for IoUKernelBuilder {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl KernelBuilder for IoUKernelBuilder {
    type Kernel = IoUKernel;

    fn build(&self, _system_objects: &[LocalizedObject]) -> IoUKernel {
        IoUKernel {
            min_overlap: self.min_overlap,
        }
    }
}

/// IoU kernel that additionally requires identical object types.
#[derive(Clone, Copy, Debug)]
pub struct TypeMatchedIoUKernel {
    inner: IoUKernel,
}

impl ObjectKernel for TypeMatchedIoUKernel {
    fn score(&self, reference: &LocalizedObject, system: &LocalizedObject) -> Option<f32> {
        if reference.object_type() != system.object_type() {
            None
        } else {
            self.inner.score(reference, system)
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TypeMatchedIoUKernelBuilder {
    inner: IoUKernelBuilder,
}

impl TypeMatchedIoUKernelBuilder {
    pub fn new(min_overlap: f64) -> Self {
        Self {
            inner: IoUKernelBuilder::new(min_overlap),
        }
    }
}

impl KernelBuilder for TypeMatchedIoUKernelBuilder {
    type Kernel = TypeMatchedIoUKernel;

    fn build(&self, system_objects: &[LocalizedObject]) -> TypeMatchedIoUKernel {
        TypeMatchedIoUKernel {
            inner: self.inner.build(system_objects),
        }
    }
}

/// Finds the optimal assignment between reference and system localizations
/// of one frame and classifies every operand.
///
/// The cost matrix has one row per reference and one column per system
/// object plus one padding column per reference, so the Hungarian solver
/// always has a feasible assignment. Allowed pairings are scaled to strictly
/// positive integer weights; padding and disallowed pairings stay at zero,
/// so any real match outweighs leaving a reference unmatched. A row resolved
/// to padding or to a zero-weight column is a miss; a system column that no
/// row claimed with positive weight is a false alarm.
///
pub fn perform_alignment<K: ObjectKernel>(
    references: &[LocalizedObject],
    systems: &[LocalizedObject],
    kernel: &K,
) -> AlignmentOutcome {
    let mut outcome = AlignmentOutcome::default();

    if references.is_empty() {
        outcome.false_alarms = systems.iter().map(AlignmentRecord::false_alarm).collect();
        return outcome;
    }

    let scores: Vec<Vec<Option<f32>>> = references
        .iter()
        .map(|reference| {
            systems
                .iter()
                .map(|system| kernel.score(reference, system))
                .collect()
        })
        .collect();

    let mut cost_matrix = Matrix::new(references.len(), systems.len() + references.len(), 0i64);
    for (row, row_scores) in scores.iter().enumerate() {
        for (col, score) in row_scores.iter().enumerate() {
            if let Some(score) = score {
                let v = cost_matrix.get_mut((row, col)).unwrap();
                *v = 1 + (score * F32_I64_MULT) as i64;
            }
        }
    }

    let (_, assignment) = kuhn_munkres(&cost_matrix);

    let mut matched_systems = vec![false; systems.len()];
    for (row, col) in assignment.into_iter().enumerate() {
        match scores[row].get(col).copied().flatten() {
            Some(score) => {
                matched_systems[col] = true;
                outcome
                    .correct
                    .push(AlignmentRecord::correct(&references[row], &systems[col], score));
            }
            None => outcome.missed.push(AlignmentRecord::miss(&references[row])),
        }
    }

    for (col, system) in systems.iter().enumerate() {
        if !matched_systems[col] {
            outcome.false_alarms.push(AlignmentRecord::false_alarm(system));
        }
    }

    outcome
}
