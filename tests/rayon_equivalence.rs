#![cfg(feature = "rayon")]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spritewatch::{
    AggregatorConfig, ClassSpec, DetectionAggregator, GrayImage, MatchConfig, MatchMode, Matcher,
    Metric, ObjectClass, Template, TemplateLibrary, TemplateSource,
};

fn make_sprite(width: usize, height: usize, salt: usize) -> GrayImage {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 11 + salt) ^ (y * 3) ^ (x * y)) & 0xFF;
            data.push(value as u8);
        }
    }
    GrayImage::new(data, width, height).unwrap()
}

fn noisy_frame(width: usize, height: usize, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..width * height).map(|_| rng.random::<u8>()).collect();
    GrayImage::new(data, width, height).unwrap()
}

#[test]
fn parallel_rows_match_sequential_scan() {
    let sprite = make_sprite(14, 10, 0);
    let mut frame = noisy_frame(160, 120, 11);
    frame.paste(sprite.view(), 70, 33);
    let tpl = Template::new("bird", ObjectClass::new("bird"), sprite, Metric::Zncc).unwrap();

    let seq = Matcher::new();
    let par = Matcher::new().with_config(MatchConfig {
        parallel: true,
        ..MatchConfig::default()
    });

    for mode in [MatchMode::All, MatchMode::Best] {
        let a = seq.find(frame.view(), &tpl, 0.3, mode).unwrap();
        let b = par.find(frame.view(), &tpl, 0.3, mode).unwrap();
        assert_eq!(a, b);
        assert_eq!((a[0].x, a[0].y), (70, 33));
    }

    let a = seq.response(frame.view(), &tpl).unwrap();
    let b = par.response(frame.view(), &tpl).unwrap();
    assert_eq!(a, b);
}

#[test]
fn parallel_jobs_match_sequential_aggregation() {
    let cactus_small = make_sprite(10, 18, 1);
    let cactus_large = make_sprite(16, 26, 2);
    let bird = make_sprite(18, 9, 3);
    let library = TemplateLibrary::builder()
        .class(
            ClassSpec::new("bird").with_threshold(0.6),
            vec![TemplateSource::new("bird", bird.clone())],
        )
        .class(
            ClassSpec::new("cactus")
                .with_threshold(0.9)
                .with_metric(Metric::Zncc),
            vec![
                TemplateSource::new("small", cactus_small.clone()),
                TemplateSource::new("large", cactus_large.clone()),
            ],
        )
        .build()
        .unwrap();

    let mut frame = noisy_frame(220, 110, 12);
    frame.paste(cactus_small.view(), 20, 80);
    frame.paste(cactus_large.view(), 120, 70);
    frame.paste(bird.view(), 60, 10);

    let sequential = DetectionAggregator::default()
        .aggregate(frame.view(), &library)
        .unwrap();
    let parallel = DetectionAggregator::new(AggregatorConfig {
        parallel: true,
        matcher: MatchConfig {
            parallel: true,
            ..MatchConfig::default()
        },
        ..AggregatorConfig::default()
    })
    .unwrap()
    .aggregate(frame.view(), &library)
    .unwrap();

    assert_eq!(sequential, parallel);
    assert!(sequential
        .iter()
        .any(|d| d.class.as_str() == "cactus" && (d.bbox.x, d.bbox.y) == (120, 70)));
}
