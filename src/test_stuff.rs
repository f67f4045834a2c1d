use crate::instance::{ActivityInstance, FrameKey, Object};
use crate::signal::region::SpatialRegion;
use crate::signal::TemporalSignal;
use rand::distributions::Uniform;
use rand::prelude::ThreadRng;
use rand::Rng;

/// Generates a random non-empty region within a `span x span` scene.
pub fn random_region(rng: &mut ThreadRng, span: f32) -> SpatialRegion {
    let position = Uniform::new(0.0_f32, span * 0.8);
    let size = Uniform::new(span * 0.05, span * 0.2);
    SpatialRegion::new(
        rng.sample(position),
        rng.sample(position),
        rng.sample(size),
        rng.sample(size),
    )
}

/// A single object localized with the same footprint on every frame of the
/// given range.
pub fn boxed_object(
    object_type: &str,
    presence_conf: f32,
    window: &str,
    frames: std::ops::Range<FrameKey>,
    region: SpatialRegion,
) -> Object {
    let localization: Vec<(FrameKey, SpatialRegion)> =
        frames.map(|frame| (frame, region)).collect();
    Object::new(object_type, presence_conf).with_localization(window, &localization)
}

/// An instance with one window extent and a single boxed object.
pub fn boxed_instance(
    object_type: &str,
    presence_conf: f32,
    window: &str,
    frames: std::ops::Range<FrameKey>,
    region: SpatialRegion,
) -> ActivityInstance {
    ActivityInstance::new()
        .with_extent(window, TemporalSignal::from_range(frames.start, frames.end))
        .with_object(boxed_object(
            object_type,
            presence_conf,
            window,
            frames,
            region,
        ))
}
