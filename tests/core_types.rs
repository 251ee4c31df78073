use spritewatch::{
    luma, CaptureRegion, ClassSpec, Frame, GrayImage, ImageView, Metric, ObjectClass,
    PixelFormat, SpriteWatchError, Template, TemplateLibrary, TemplateSource,
};

#[test]
fn image_view_rejects_invalid_dimensions() {
    let data = [0u8; 4];

    let err = ImageView::from_slice(&data, 0, 1).err().unwrap();
    assert_eq!(
        err,
        SpriteWatchError::InvalidDimensions {
            width: 0,
            height: 1,
        }
    );

    let err = ImageView::from_slice(&data, 1, 0).err().unwrap();
    assert_eq!(
        err,
        SpriteWatchError::InvalidDimensions {
            width: 1,
            height: 0,
        }
    );
}

#[test]
fn image_view_rejects_invalid_stride() {
    let data = [0u8; 8];

    let err = ImageView::new(&data, 4, 1, 3).err().unwrap();
    assert_eq!(
        err,
        SpriteWatchError::InvalidStride {
            width: 4,
            stride: 3,
        }
    );
}

#[test]
fn image_view_rejects_small_buffer() {
    let data = [0u8; 3];

    let err = ImageView::new(&data, 2, 2, 2).err().unwrap();
    assert_eq!(err, SpriteWatchError::BufferTooSmall { needed: 4, got: 3 });
}

#[test]
fn image_view_roi_keeps_stride() {
    let data: Vec<u8> = (0u8..20).collect();
    let view = ImageView::new(&data, 4, 4, 5).unwrap();
    let roi = view.roi(1, 2, 2, 2).unwrap();
    assert_eq!(roi.stride(), 5);
    assert_eq!(roi.row(0).unwrap(), &[11u8, 12]);
    assert_eq!(roi.get(1, 1), Some(&17));
    assert!(matches!(
        view.roi(3, 3, 2, 1),
        Err(SpriteWatchError::RoiOutOfBounds { .. })
    ));
}

#[test]
fn gray_image_paste_clips_at_edges() {
    let mut canvas = GrayImage::filled(6, 4, 0).unwrap();
    let sprite = GrayImage::filled(3, 3, 9).unwrap();
    canvas.paste(sprite.view(), 4, 2);
    let painted = canvas.data().iter().filter(|&&v| v == 9).count();
    assert_eq!(painted, 4);
    assert_eq!(canvas.view().get(5, 3), Some(&9));
    assert_eq!(canvas.view().get(3, 3), Some(&0));
}

#[test]
fn frame_validates_buffer_length() {
    let err = Frame::new(vec![0u8; 11], 2, 2, PixelFormat::Rgb8).unwrap_err();
    assert_eq!(err, SpriteWatchError::BufferTooSmall { needed: 12, got: 11 });
    assert!(Frame::new(Vec::new(), 0, 2, PixelFormat::Gray8).is_err());
}

#[test]
fn frame_grayscale_uses_integer_luma() {
    let frame = Frame::new(vec![255, 0, 0, 0, 255, 0, 0, 0, 255], 3, 1, PixelFormat::Rgb8).unwrap();
    let gray = frame.to_gray();
    assert_eq!(gray.data(), &[luma(255, 0, 0), luma(0, 255, 0), luma(0, 0, 255)]);
    assert_eq!(gray.data(), &[77u8, 149, 29]);
}

#[test]
fn capture_region_rejects_zero_width() {
    assert!(matches!(
        CaptureRegion::new(0, 0, 0, 400),
        Err(SpriteWatchError::InvalidRegion { .. })
    ));
    assert!(matches!(
        CaptureRegion::new(10, -5, 600, 400),
        Err(SpriteWatchError::InvalidRegion { .. })
    ));
    let region = CaptureRegion::default();
    assert_eq!(
        (region.top(), region.left(), region.width(), region.height()),
        (300, 600, 600, 400)
    );
}

#[test]
fn degenerate_templates_are_rejected_per_metric() {
    let flat = GrayImage::filled(8, 8, 200).unwrap();
    let err = Template::new("flat", ObjectClass::new("runner"), flat.clone(), Metric::Zncc)
        .unwrap_err();
    assert!(matches!(err, SpriteWatchError::DegenerateTemplate { .. }));
    assert!(Template::new("flat", ObjectClass::new("runner"), flat, Metric::Ncc).is_ok());

    let black = GrayImage::filled(8, 8, 0).unwrap();
    let err = Template::new("black", ObjectClass::new("runner"), black, Metric::Ncc).unwrap_err();
    assert_eq!(
        err,
        SpriteWatchError::DegenerateTemplate {
            template: "black".to_string(),
            reason: "all pixels are zero",
        }
    );
}

#[test]
fn library_check_fits_names_the_template() {
    let library = TemplateLibrary::builder()
        .class(
            ClassSpec::new("cactus"),
            vec![
                TemplateSource::new("small", GrayImage::filled(10, 20, 90).unwrap()),
                TemplateSource::new("large", GrayImage::filled(25, 40, 90).unwrap()),
            ],
        )
        .build()
        .unwrap();
    assert!(library.check_fits(25, 40).is_ok());
    assert_eq!(
        library.check_fits(24, 100).unwrap_err(),
        SpriteWatchError::TemplateSize {
            template: "large".to_string(),
            template_width: 25,
            template_height: 40,
            frame_width: 24,
            frame_height: 100,
        }
    );
}

#[test]
fn library_rejects_duplicate_classes() {
    let sprite = GrayImage::filled(4, 4, 1).unwrap();
    let err = TemplateLibrary::builder()
        .class(
            ClassSpec::new("bird"),
            vec![TemplateSource::new("a", sprite.clone())],
        )
        .class(ClassSpec::new("bird"), vec![TemplateSource::new("b", sprite)])
        .build()
        .unwrap_err();
    assert!(matches!(err, SpriteWatchError::InvalidInput(_)));
    assert!(matches!(
        TemplateLibrary::builder().build(),
        Err(SpriteWatchError::InvalidInput(_))
    ));
}
