pub use crate::alignment::{
    perform_alignment, AlignmentClass, AlignmentOutcome, AlignmentRecord, FrameAlignment,
    IoUKernelBuilder, KernelBuilder, LocalizedObject, ObjectKernel, RecordedObject,
    TypeMatchedIoUKernelBuilder,
};
pub use crate::congruence::{
    CongruenceBreakdown, ObjectCongruence, ObjectCongruenceFilter, DEFAULT_TARGET_RFAS,
};
pub use crate::filters::cache::{ComponentCache, ComponentMap, MetricKey, MetricValue, TargetRfa};
pub use crate::filters::{
    simple_spatial_iou_component, temporal_iou_component, EquivClassTypeMatchFilter,
    FilterOutcome, ObjectTypeMatchFilter, PairFilter, SimpleSpatialOverlapFilter,
    SpatialOverlapFilter, TemporalIntersectionFilter, TemporalMask, TemporalOverlapFilter,
};
pub use crate::instance::{
    simple_spatial_intersection_over_union, spatial_intersection_over_union,
    temporal_intersection, temporal_intersection_over_union, temporal_signal_pairs,
    ActivityInstance, FrameKey, FrameLocalization, Object, SpatialExtent, Typed, WindowKey,
};
pub use crate::metrics::{
    identity_cost, mode, p_miss, p_miss_at_r_fa, r_fa, CostFunction, DetPoint, ModePoint,
};
pub use crate::signal::region::SpatialRegion;
pub use crate::signal::TemporalSignal;
