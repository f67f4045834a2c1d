use anyhow::Result;
use modescore::prelude::*;

fn main() -> Result<()> {
    env_logger::init();

    // Ground truth: one person tracked over 30 frames.
    let reference = ActivityInstance::new()
        .with_extent("camera_1.mp4", TemporalSignal::from_range(0, 30))
        .with_object(Object::new("Person", 1.0).with_localization(
            "camera_1.mp4",
            &(0..30)
                .map(|frame| (frame, SpatialRegion::new(40.0, 60.0, 30.0, 80.0)))
                .collect::<Vec<_>>(),
        ));

    // Detector output: a close hit, a drifting low-confidence detection and
    // a spurious one.
    let system = ActivityInstance::new()
        .with_extent("camera_1.mp4", TemporalSignal::from_range(0, 30))
        .with_object(Object::new("Person", 0.92).with_localization(
            "camera_1.mp4",
            &(0..30)
                .map(|frame| (frame, SpatialRegion::new(42.0, 58.0, 30.0, 82.0)))
                .collect::<Vec<_>>(),
        ))
        .with_object(Object::new("Person", 0.35).with_localization(
            "camera_1.mp4",
            &(10..20)
                .map(|frame| (frame, SpatialRegion::new(200.0, 50.0, 25.0, 70.0)))
                .collect::<Vec<_>>(),
        ));

    let scorer = ObjectCongruence::new(IoUKernelBuilder::new(0.2))
        .with_masks(TemporalMask::Reference, TemporalMask::Intersection)
        .with_target_rfas(&[0.5, 0.2]);

    let breakdown = scorer.breakdown(&reference, &system);

    println!("minMODE           : {:?}", breakdown.min_mode);
    println!("object congruence : {:?}", breakdown.object_congruence);
    for point in &breakdown.mode_records {
        println!("  MODE @ conf {:.2} = {:.4}", point.confidence, point.mode);
    }
    for (target, p_miss) in &breakdown.p_miss_at_rfa {
        println!("  p_miss @ {target} rfa = {p_miss:?}");
    }

    let gate = ObjectCongruenceFilter::new(scorer, 0.5);
    let outcome = gate.evaluate(&reference, &system);
    println!("accepted at 0.5   : {}", outcome.accepted);

    Ok(())
}
