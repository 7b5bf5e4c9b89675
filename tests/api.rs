use autolabel_rust::{Device, FeatureLabeler, FeatureResult, LabelError, PstLabeler, PstParameters, PstResult};
use ndarray::Array2;
use serde_json::json;

fn fill(mask: &mut Array2<u8>, y0: usize, x0: usize, h: usize, w: usize) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            mask[[y, x]] = 255;
        }
    }
}

fn count_on(mask: &Array2<u8>) -> usize {
    mask.iter().filter(|&&v| v > 0).count()
}

fn disc_image(size: usize) -> Array2<u8> {
    let c = size as f32 / 2.0;
    let r = size as f32 / 4.0;
    Array2::from_shape_fn((size, size), |(y, x)| {
        let d = ((y as f32 - c).powi(2) + (x as f32 - c).powi(2)).sqrt();
        if d < r {
            220
        } else {
            40
        }
    })
}

#[test]
fn zero_image_gives_zero_mask() {
    let mut labeler = PstLabeler::with_device(Device::Cpu);
    labeler
        .set_params_from_mapping(
            json!({
                "phase_strength": 20,
                "warp_strength": 400,
                "sigma_LPF": 0.1,
                "thresh_min": -1.0,
                "thresh_max": 0.01,
            })
            .as_object()
            .cloned()
            .unwrap(),
        )
        .unwrap();

    let image = Array2::<u8>::zeros((100, 100));
    let result = labeler.apply(image.view()).unwrap();

    assert_eq!(result.dim(), (100, 100));
    assert!(result.mask().iter().all(|&v| v == 0));
}

#[test]
fn labeler_is_usable_through_traits() {
    fn run<L: FeatureLabeler>(labeler: &mut L, params: L::Params, image: &Array2<u8>) -> L::Output {
        labeler.set_params(params);
        labeler.apply(image.view()).unwrap()
    }

    let mut labeler = PstLabeler::with_device(Device::Parallel);
    let image = disc_image(48);
    let result = run(
        &mut labeler,
        PstParameters::with_thresholds(20.0, 400.0, 0.1, -1.0, 0.01),
        &image,
    );

    assert!(result.mask().iter().all(|&v| v == 0 || v == 255));

    // any feature pixel must come back inside its own region
    if let Some(((y, x), _)) = result.mask().indexed_iter().find(|(_, &v)| v > 0) {
        let region = FeatureResult::extract_at(&result, x, y);
        assert_eq!(region[[y, x]], 255);
        for (r, m) in region.iter().zip(result.mask().iter()) {
            assert!(*r == 0 || *m > 0);
        }
    }
}

#[test]
fn phase_only_output_is_rescaled() {
    let mut labeler = PstLabeler::with_device(Device::Cpu);
    labeler.set_params(PstParameters::new(20.0, 400.0, 0.1, None, None, false).unwrap());

    let raw = labeler.apply_raw(disc_image(32).view()).unwrap();
    let result = labeler.apply(disc_image(32).view()).unwrap();

    assert!(raw.iter().all(|v| v.abs() <= std::f32::consts::PI + 1e-4));
    assert_eq!(result.mask().iter().copied().max(), Some(255));
    assert_eq!(labeler.kernel_builds(), 1);
}

#[test]
fn apply_before_set_params_fails() {
    let mut labeler = PstLabeler::new();
    let err = labeler.apply(disc_image(16).view()).unwrap_err();
    assert!(matches!(err, LabelError::ParamsNotSet));
}

#[test]
fn extract_at_border_region_is_unclipped() {
    let mut mask = Array2::<u8>::zeros((20, 20));
    fill(&mut mask, 0, 0, 4, 6);
    fill(&mut mask, 10, 10, 3, 3);
    let result = PstResult::new(mask);

    let region = result.extract_at(0, 0);

    assert_eq!(count_on(&region), 24);
    assert_eq!(region[[0, 0]], 255);
    assert_eq!(region[[3, 5]], 255);
    assert_eq!(region[[10, 10]], 0);
}

#[test]
fn extract_at_zero_pixel_is_empty() {
    let mut mask = Array2::<u8>::zeros((20, 20));
    fill(&mut mask, 0, 0, 4, 6);
    let result = PstResult::new(mask);

    assert_eq!(count_on(&result.extract_at(15, 15)), 0);
    assert_eq!(count_on(&result.extract_at(25, 3)), 0);
}

#[test]
fn denoise_threshold_separates_clusters() {
    let threshold = 20;
    let mut mask = Array2::<u8>::zeros((30, 30));
    fill(&mut mask, 2, 2, 5, 5); // threshold + 5 pixels
    fill(&mut mask, 20, 20, 3, 5); // threshold - 5 pixels

    let mut result = PstResult::new(mask);
    result.denoise(threshold);

    let kept = result.edges();
    assert_eq!(count_on(&kept), 25);
    assert_eq!(kept[[4, 4]], 255);
    assert_eq!(kept[[21, 22]], 0);
}

#[test]
fn reconstruction_thickens_and_rounds_block() {
    let mut mask = Array2::<u8>::zeros((40, 40));
    fill(&mut mask, 15, 15, 10, 10);
    let mut result = PstResult::new(mask);

    result.mask_reconstruction_with(15, 7);

    // (row, first column, last column) of every non-empty row
    let expected = [
        (14, 17, 22),
        (15, 16, 23),
        (16, 15, 24),
        (17, 14, 25),
        (18, 14, 25),
        (19, 14, 25),
        (20, 14, 25),
        (21, 14, 25),
        (22, 14, 25),
        (23, 15, 24),
        (24, 16, 23),
        (25, 17, 22),
    ];
    let mask = result.mask();
    for y in 0..40 {
        let on: Vec<usize> = (0..40).filter(|&x| mask[[y, x]] > 0).collect();
        match expected.iter().find(|(row, _, _)| *row == y) {
            Some(&(_, first, last)) => assert_eq!(on, (first..=last).collect::<Vec<_>>(), "row {y}"),
            None => assert!(on.is_empty(), "row {y}"),
        }
    }
    assert!(mask.iter().all(|&v| v == 0 || v == 255));
    assert_eq!(count_on(&result.edges()), 120);
}

#[test]
fn reconstruction_grows_block_until_saturated() {
    let mut mask = Array2::<u8>::zeros((40, 40));
    fill(&mut mask, 15, 15, 10, 10);
    let mut result = PstResult::new(mask);

    let mut stable = false;
    for _ in 0..60 {
        let before = result.edges();
        result.mask_reconstruction();
        if result.edges() == before {
            stable = true;
            break;
        }
    }
    assert!(stable);
    // a block away from the border keeps growing, so the only fixed point is the full image
    assert!(result.mask().iter().all(|&v| v == 255));

    let settled = result.edges();
    result.mask_reconstruction();
    assert_eq!(result.edges(), settled);
}

#[test]
fn reconstruction_keeps_full_and_empty_masks() {
    let mut full = PstResult::new(Array2::from_elem((25, 30), 255));
    full.mask_reconstruction();
    assert!(full.mask().iter().all(|&v| v == 255));

    let mut empty = PstResult::new(Array2::zeros((25, 30)));
    empty.mask_reconstruction();
    assert!(empty.mask().iter().all(|&v| v == 0));
}

#[test]
fn copy_is_independent() {
    let mut mask = Array2::<u8>::zeros((20, 20));
    fill(&mut mask, 5, 5, 2, 2);
    let original = PstResult::new(mask);

    let mut refined = original.copy();
    refined.denoise(10);

    assert_eq!(count_on(&original.edges()), 4);
    assert_eq!(count_on(&refined.edges()), 0);
}

#[test]
fn click_composition_builds_label_mask() {
    let mut mask = Array2::<u8>::zeros((16, 16));
    fill(&mut mask, 1, 1, 3, 3);
    fill(&mut mask, 8, 8, 4, 4);
    let result = PstResult::new(mask);
    let mut labels = Array2::<u8>::zeros((16, 16));

    result.union_at(&mut labels, 2, 2).unwrap();
    result.union_at(&mut labels, 9, 9).unwrap();
    result.union_at(&mut labels, 9, 9).unwrap();
    assert_eq!(count_on(&labels), 25);

    result.toggle_at(&mut labels, 2, 2).unwrap();
    assert_eq!(count_on(&labels), 16);
}

#[test]
fn params_mapping_matches_constructor() {
    let from_map = PstParameters::try_from(json!({
        "phase_strength": 0.5,
        "warp_strength": 20,
        "sigma_LPF": 0.25,
        "thresh_min": -0.5,
        "thresh_max": 0.5,
        "morph_flag": true,
    }))
    .unwrap();

    assert_eq!(from_map, PstParameters::with_thresholds(0.5, 20.0, 0.25, -0.5, 0.5));
    assert!(PstParameters::try_from(json!({"phase_strength": 1})).is_err());
}
