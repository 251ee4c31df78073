use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use spritewatch::{
    AggregatorConfig, BoundingBox, ClassSpec, DetectionAggregator, GrayImage, MatchCandidate,
    MatchMode, Metric, ObjectClass, TemplateLibrary, TemplateSource,
};

fn make_sprite(width: usize, height: usize, salt: usize) -> GrayImage {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13 + salt) ^ (y * 7) ^ (x * y + salt * 3)) & 0xFF;
            data.push(value.max(1) as u8);
        }
    }
    GrayImage::new(data, width, height).unwrap()
}

fn runner_library() -> TemplateLibrary {
    TemplateLibrary::builder()
        .class(
            ClassSpec::new("runner").with_threshold(0.85),
            vec![TemplateSource::new(
                "runner",
                GrayImage::filled(32, 32, 255).unwrap(),
            )],
        )
        .build()
        .unwrap()
}

fn candidate(class: &str, template_index: usize, x: usize, y: usize, score: f32) -> MatchCandidate {
    MatchCandidate {
        class: ObjectClass::new(class),
        template_index,
        template_name: format!("{class}_{template_index}").into(),
        x,
        y,
        width: 20,
        height: 16,
        score,
    }
}

#[test]
fn runner_is_detected_once_at_its_location() {
    let library = runner_library();
    let mut frame = GrayImage::filled(200, 200, 0).unwrap();
    frame.paste(GrayImage::filled(32, 32, 255).unwrap().view(), 50, 60);

    let detections = DetectionAggregator::default()
        .aggregate(frame.view(), &library)
        .unwrap();
    assert_eq!(detections.len(), 1);
    let det = &detections[0];
    assert_eq!(det.class, ObjectClass::new("runner"));
    assert_eq!(det.bbox, BoundingBox::new(50, 60, 32, 32));
    assert!((det.confidence - 1.0).abs() < 1e-6);
    assert_eq!(&*det.template, "runner");
}

/// White 20x20 sprite crossed by a dark two-pixel bar.
fn pale_sprite() -> GrayImage {
    let data = (0..20 * 20)
        .map(|i| if (9..11).contains(&(i / 20)) { 0 } else { 255 })
        .collect();
    GrayImage::new(data, 20, 20).unwrap()
}

#[test]
fn pale_sprite_on_flat_background_needs_zncc() {
    let mut frame = GrayImage::filled(120, 80, 255).unwrap();
    frame.paste(pale_sprite().view(), 50, 30);
    let sprite_box = BoundingBox::new(50, 30, 20, 20);
    let detect = |metric| {
        let library = TemplateLibrary::builder()
            .class(
                ClassSpec::new("cloud").with_metric(metric),
                vec![TemplateSource::new("cloud", pale_sprite())],
            )
            .build()
            .unwrap();
        DetectionAggregator::default()
            .aggregate(frame.view(), &library)
            .unwrap()
    };

    // Plain white scores about 0.95 against the sprite under Ncc.
    let ncc = detect(Metric::Ncc);
    assert!(ncc
        .iter()
        .any(|d| d.bbox.intersection_area(&sprite_box) == 0));

    let zncc = detect(Metric::Zncc);
    assert!(!zncc.is_empty());
    assert!(zncc.iter().any(|d| d.bbox == sprite_box));
    assert!(zncc
        .iter()
        .all(|d| d.bbox.intersection_area(&sprite_box) > 0));
}

#[test]
fn empty_frame_has_no_detections() {
    let library = runner_library();
    let frame = GrayImage::filled(200, 200, 0).unwrap();
    let detections = DetectionAggregator::default()
        .aggregate(frame.view(), &library)
        .unwrap();
    assert!(detections.is_empty());
}

#[test]
fn overlapping_birds_collapse_to_the_stronger_one() {
    let library = TemplateLibrary::builder()
        .class(
            ClassSpec::new("bird"),
            vec![
                TemplateSource::new("up", make_sprite(20, 16, 1)),
                TemplateSource::new("down", make_sprite(20, 16, 2)),
            ],
        )
        .build()
        .unwrap();
    let merged = DetectionAggregator::default().merge(
        &library,
        vec![
            candidate("bird", 0, 100, 40, 0.9),
            candidate("bird", 1, 102, 41, 0.95),
        ],
    );
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].confidence, 0.95);
    assert_eq!(merged[0].bbox.x, 102);
    assert_eq!(&*merged[0].template, "bird_1");
}

#[test]
fn equal_scores_prefer_top_left_then_lower_template() {
    let library = TemplateLibrary::builder()
        .class(
            ClassSpec::new("bird"),
            vec![
                TemplateSource::new("up", make_sprite(20, 16, 1)),
                TemplateSource::new("down", make_sprite(20, 16, 2)),
            ],
        )
        .build()
        .unwrap();
    let agg = DetectionAggregator::default();

    let merged = agg.merge(
        &library,
        vec![
            candidate("bird", 0, 11, 20, 0.9),
            candidate("bird", 0, 12, 19, 0.9),
        ],
    );
    assert_eq!(merged.len(), 1);
    assert_eq!((merged[0].bbox.x, merged[0].bbox.y), (12, 19));

    let merged = agg.merge(
        &library,
        vec![
            candidate("bird", 1, 12, 19, 0.9),
            candidate("bird", 0, 12, 19, 0.9),
        ],
    );
    assert_eq!(&*merged[0].template, "bird_0");
}

#[test]
fn merge_ignores_candidate_order() {
    let library = TemplateLibrary::builder()
        .class(
            ClassSpec::new("bird"),
            vec![TemplateSource::new("up", make_sprite(20, 16, 1))],
        )
        .class(
            ClassSpec::new("cactus"),
            vec![
                TemplateSource::new("small", make_sprite(20, 16, 3)),
                TemplateSource::new("large", make_sprite(20, 16, 4)),
            ],
        )
        .build()
        .unwrap();
    let agg = DetectionAggregator::new(AggregatorConfig {
        overlap_threshold: 0.3,
        ..AggregatorConfig::default()
    })
    .unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let mut candidates: Vec<MatchCandidate> = (0..60)
        .map(|i| {
            let class = if i % 3 == 0 { "bird" } else { "cactus" };
            let template_index = if class == "cactus" { i % 2 } else { 0 };
            // Coarse scores force ties.
            let score = 0.8 + 0.05 * rng.random_range(0..4u8) as f32;
            candidate(
                class,
                template_index,
                rng.random_range(0..120),
                rng.random_range(0..60),
                score,
            )
        })
        .collect();

    let expected = agg.merge(&library, candidates.clone());
    assert!(!expected.is_empty());
    for _ in 0..20 {
        candidates.shuffle(&mut rng);
        assert_eq!(agg.merge(&library, candidates.clone()), expected);
    }
}

#[test]
fn detections_follow_class_order_then_position() {
    let runner = make_sprite(16, 20, 5);
    let cactus = make_sprite(12, 24, 6);
    let bird = make_sprite(20, 10, 7);
    let library = TemplateLibrary::builder()
        .class(
            ClassSpec::new("runner")
                .with_threshold(0.95)
                .with_mode(MatchMode::Best)
                .with_metric(Metric::Zncc),
            vec![TemplateSource::new("runner", runner.clone())],
        )
        .class(
            ClassSpec::new("bird")
                .with_threshold(0.95)
                .with_metric(Metric::Zncc),
            vec![TemplateSource::new("bird", bird.clone())],
        )
        .class(
            ClassSpec::new("cactus")
                .with_threshold(0.95)
                .with_metric(Metric::Zncc),
            vec![TemplateSource::new("cactus", cactus.clone())],
        )
        .build()
        .unwrap();

    let mut frame = GrayImage::filled(240, 120, 0).unwrap();
    frame.paste(cactus.view(), 200, 80);
    frame.paste(cactus.view(), 90, 80);
    frame.paste(cactus.view(), 150, 80);
    frame.paste(bird.view(), 120, 10);
    frame.paste(runner.view(), 10, 70);

    let detections = DetectionAggregator::default()
        .aggregate(frame.view(), &library)
        .unwrap();
    let summary: Vec<(&str, usize, usize)> = detections
        .iter()
        .map(|d| (d.class.as_str(), d.bbox.x, d.bbox.y))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("runner", 10, 70),
            ("bird", 120, 10),
            ("cactus", 90, 80),
            ("cactus", 150, 80),
            ("cactus", 200, 80),
        ]
    );
    assert!(detections.iter().all(|d| d.confidence > 0.999));
}

#[test]
fn aggregate_is_idempotent() {
    let cactus = make_sprite(12, 24, 6);
    let library = TemplateLibrary::builder()
        .class(
            ClassSpec::new("cactus")
                .with_threshold(0.7)
                .with_metric(Metric::Zncc),
            vec![TemplateSource::new("cactus", cactus.clone())],
        )
        .build()
        .unwrap();
    let mut rng = StdRng::seed_from_u64(9);
    let data = (0..160 * 90).map(|_| rng.random::<u8>()).collect();
    let mut frame = GrayImage::new(data, 160, 90).unwrap();
    frame.paste(cactus.view(), 40, 30);
    frame.paste(cactus.view(), 100, 50);

    let agg = DetectionAggregator::default();
    let first = agg.aggregate(frame.view(), &library).unwrap();
    let second = agg.aggregate(frame.view(), &library).unwrap();
    assert_eq!(first, second);
    assert!(first.iter().any(|d| (d.bbox.x, d.bbox.y) == (40, 30)));
    assert!(first.iter().any(|d| (d.bbox.x, d.bbox.y) == (100, 50)));
}

#[test]
fn template_threshold_overrides_class_threshold() {
    let sprite = GrayImage::filled(8, 8, 255).unwrap();
    let library = TemplateLibrary::builder()
        .class(
            ClassSpec::new("cactus").with_threshold(0.5),
            vec![TemplateSource::new("strict", sprite.clone()).with_threshold(1.0)],
        )
        .build()
        .unwrap();
    // A half-covered copy scores sqrt(0.5) under Ncc.
    let mut frame = GrayImage::filled(40, 20, 0).unwrap();
    frame.paste(GrayImage::filled(4, 8, 255).unwrap().view(), 0, 0);
    let detections = DetectionAggregator::default()
        .aggregate(frame.view(), &library)
        .unwrap();
    assert!(detections.is_empty());

    frame.paste(sprite.view(), 20, 10);
    let detections = DetectionAggregator::default()
        .aggregate(frame.view(), &library)
        .unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].bbox, BoundingBox::new(20, 10, 8, 8));
}

#[test]
fn frame_smaller_than_a_template_is_a_size_error() {
    let library = runner_library();
    let frame = GrayImage::filled(31, 200, 0).unwrap();
    let err = DetectionAggregator::default()
        .aggregate(frame.view(), &library)
        .unwrap_err();
    assert!(matches!(
        err,
        spritewatch::SpriteWatchError::TemplateSize { .. }
    ));
}
