// Property tests for the downsample-factor calculator
use bitmap_kit::bitmap::{
    BitmapError, Constraint, SampleRequest, compute_initial_sample_size, compute_sample_size,
    compute_sample_size_raw, round_sample_size,
};
use proptest::prelude::*;

fn request(width: u32, height: u32, min_side: Constraint, max_pixels: Constraint) -> SampleRequest {
    SampleRequest::new(width, height)
        .expect("positive dimensions")
        .with_min_side_length(min_side)
        .with_max_num_pixels(max_pixels)
}

#[test]
fn documented_scenarios() {
    let cases = [
        (4000, 3000, -1, 720 * 480, 8),
        (100, 100, -1, -1, 1),
        (1000, 500, 200, -1, 2),
        (10_000, 10_000, -1, 1000, 320),
        (1000, 1000, 500, 10_000, 16),
    ];

    for (width, height, min_side, max_pixels, expected) in cases {
        let actual = compute_sample_size_raw(width, height, min_side, max_pixels)
            .expect("valid input");
        assert_eq!(actual, expected, "{}x{} min={} max={}", width, height, min_side, max_pixels);
    }
}

#[test]
fn invalid_inputs_are_rejected() {
    let cases = [(0, 10, -1, -1), (10, -3, -1, -1), (10, 10, 0, -1), (10, 10, -1, -7)];

    for (width, height, min_side, max_pixels) in cases {
        assert!(matches!(
            compute_sample_size_raw(width, height, min_side, max_pixels),
            Err(BitmapError::InvalidArgument(_))
        ));
    }
}

proptest! {
    #[test]
    fn unconstrained_is_always_one(width in 1u32..=100_000, height in 1u32..=100_000) {
        let req = request(width, height, Constraint::Unconstrained, Constraint::Unconstrained);
        prop_assert_eq!(compute_sample_size(&req), 1);
    }

    #[test]
    fn result_is_at_least_one(
        width in 1u32..=50_000,
        height in 1u32..=50_000,
        min_side in proptest::option::of(1u32..=10_000),
        max_pixels in proptest::option::of(1u32..=50_000_000),
    ) {
        let to_constraint = |v: Option<u32>| match v {
            Some(n) => Constraint::limit(n).expect("positive"),
            None => Constraint::Unconstrained,
        };
        let req = request(width, height, to_constraint(min_side), to_constraint(max_pixels));
        prop_assert!(compute_sample_size(&req) >= 1);
    }

    #[test]
    fn image_within_budget_is_not_subsampled(
        width in 1u32..=2_000,
        height in 1u32..=2_000,
        slack in 0u32..=1_000_000,
    ) {
        let budget = width * height + slack;
        let req = request(
            width,
            height,
            Constraint::Unconstrained,
            Constraint::limit(budget).expect("positive"),
        );
        prop_assert_eq!(compute_initial_sample_size(&req), 1);
        prop_assert_eq!(compute_sample_size(&req), 1);
    }

    #[test]
    fn rounding_law(initial in 1u32..=1_000_000) {
        let rounded = round_sample_size(initial);
        prop_assert!(rounded >= initial);
        if initial <= 8 {
            prop_assert!(rounded.is_power_of_two());
            prop_assert!(rounded / 2 < initial);
        } else {
            prop_assert_eq!(rounded % 8, 0);
            prop_assert!(rounded - initial < 8);
        }
    }
}
