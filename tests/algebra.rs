//! End-to-end scenarios exercising composition, batching, geometric
//! queries, and the render-list compiler together.

use std::rc::Rc;

use float_cmp::assert_approx_eq;
use glam::DVec2;
use proptest::prelude::*;

use collage::{
    Affine, Batched, BoxShape, Color, Diagram, Error, UNIT_X, UNIT_Y, circle, hcat, rect, square,
    vcat,
};

#[test]
fn a_row_of_three_unit_squares() {
    let d = hcat([square(1.0), square(1.0), square(1.0)], 0.0).unwrap();

    let env = d.envelope();
    assert_approx_eq!(f64, env.width().unwrap().values()[0], 3.0);
    assert_approx_eq!(f64, env.height().unwrap().values()[0], 1.0);

    let prims = d.render_list().unwrap();
    assert_eq!(prims.len(), 3);
    let orders: Vec<i64> = prims.iter().map(|p| p.order.values()[0]).collect();
    assert_eq!(orders, vec![0, 1, 2]);

    // Square centers advance by one unit each.
    let xs: Vec<f64> = prims
        .iter()
        .map(|p| p.transform.values()[0].transform_point2(DVec2::ZERO).x)
        .collect();
    assert_approx_eq!(f64, xs[1] - xs[0], 1.0);
    assert_approx_eq!(f64, xs[2] - xs[1], 1.0);
}

#[test]
fn batched_row_offsets_match_cumulative_widths() {
    // One batched primitive: four left-anchored boxes, widths 1, 2, 1, 2.
    let widths = [1.0, 2.0, 1.0, 2.0];
    let halves: Vec<DVec2> = widths.iter().map(|w| DVec2::new(w / 2.0, 0.5)).collect();
    let transforms: Vec<Affine> = widths
        .iter()
        .map(|w| Affine::from_translation(DVec2::new(w / 2.0, 0.0)))
        .collect();
    let d = Diagram::primitive(
        Rc::new(BoxShape::batched(Batched::from_slice(&halves))),
        Batched::from_slice(&transforms),
        None,
    )
    .unwrap();

    let row = d.batch_hcat(0.0).unwrap();
    assert!(row.size().is_scalar());
    assert_approx_eq!(f64, row.envelope().width().unwrap().values()[0], 6.0);

    let prims = row.render_list().unwrap();
    assert_eq!(prims.len(), 1);
    let lefts: Vec<f64> = prims[0]
        .transform
        .values()
        .iter()
        .zip(&widths)
        .map(|(t, w)| t.transform_point2(DVec2::ZERO).x - w / 2.0)
        .collect();
    for (left, expected) in lefts.iter().zip([0.0, 1.0, 3.0, 4.0]) {
        assert_approx_eq!(f64, *left, expected);
    }
    assert_eq!(prims[0].order.values(), &[0, 1, 2, 3]);
}

#[test]
fn incompatible_batch_sizes_refuse_to_compose() {
    let a = square(1.0).add_axis(3).unwrap();
    let b = circle(1.0).add_axis(4).unwrap();
    match a.atop(&b) {
        Err(Error::ShapeMismatch { left, right }) => {
            assert_eq!(left.dims(), &[3]);
            assert_eq!(right.dims(), &[4]);
        }
        other => panic!("expected ShapeMismatch, got {other:?}"),
    }
}

#[test]
fn above_and_above2_anchor_differently() {
    let tall = rect(1.0, 3.0);
    let short = square(1.0);

    // above keeps the first operand in place and pushes the second down.
    let d1 = tall.above(&short).unwrap();
    assert_approx_eq!(f64, d1.envelope().at(-UNIT_Y).unwrap().values()[0], 1.5);
    assert_approx_eq!(f64, d1.envelope().at(UNIT_Y).unwrap().values()[0], 2.5);

    // above2 keeps the *second* operand in place and lifts the first.
    let d2 = tall.above2(&short).unwrap();
    assert_approx_eq!(f64, d2.envelope().at(UNIT_Y).unwrap().values()[0], 0.5);
    assert_approx_eq!(f64, d2.envelope().at(-UNIT_Y).unwrap().values()[0], 3.5);

    // And in above2 the second operand paints first.
    let prims = d2.render_list().unwrap();
    let first_height = prims[0].transform.values()[0].transform_point2(DVec2::ZERO);
    assert_approx_eq!(f64, first_height.y, 0.0);
}

#[test]
fn cat_edge_cases() {
    assert!(hcat([], 1.0).unwrap().is_empty());

    let single = hcat([circle(2.0)], 10.0).unwrap();
    assert_approx_eq!(f64, single.envelope().width().unwrap().values()[0], 4.0);
    assert_eq!(single.render_list().unwrap().len(), 1);
}

#[test]
fn vertical_stacking_grows_downward() {
    let d = vcat([square(1.0), square(1.0)], 0.0).unwrap();
    assert_approx_eq!(f64, d.envelope().height().unwrap().values()[0], 2.0);
    assert_approx_eq!(f64, d.envelope().width().unwrap().values()[0], 1.0);
}

#[test]
fn empty_is_transparent_to_composition() {
    let d = square(1.0).translate(2.0, 0.0);
    let composed = Diagram::empty().atop(&d).unwrap();
    assert_approx_eq!(
        f64,
        composed.envelope().at(UNIT_X).unwrap().values()[0],
        d.envelope().at(UNIT_X).unwrap().values()[0]
    );
    assert_eq!(composed.render_list().unwrap().len(), 1);
}

#[test]
fn snug_placement_beats_envelope_placement_for_circles() {
    // Envelope placement butts bounding circles; snug placement probes the
    // outline. For two circles on the same axis they agree.
    let snug = circle(1.0).beside_snug(&circle(1.0), UNIT_X).unwrap();
    let loose = circle(1.0).beside(&circle(1.0), UNIT_X).unwrap();
    assert_approx_eq!(
        f64,
        snug.envelope().width().unwrap().values()[0],
        loose.envelope().width().unwrap().values()[0]
    );

    // A probe that misses the second operand is a hard error.
    let far = circle(1.0).translate(0.0, 100.0);
    assert!(matches!(
        circle(1.0).juxtapose_snug(&far, UNIT_X),
        Err(Error::TraceMiss { .. })
    ));
}

#[test]
fn pad_changes_placement_but_not_content() {
    let padded = square(2.0).pad(2.0).unwrap();
    // Envelope doubled.
    assert_approx_eq!(f64, padded.envelope().width().unwrap().values()[0], 4.0);
    // A neighbor placed beside it respects the padding.
    let row = padded.beside(&square(2.0), UNIT_X).unwrap();
    let prims = row.render_list().unwrap();
    let second = prims[1].transform.values()[0].transform_point2(DVec2::ZERO);
    assert_approx_eq!(f64, second.x, 3.0);
}

#[test]
fn layout_scales_everything_into_the_frame() {
    let d = hcat([square(1.0), square(1.0), square(1.0)], 0.0).unwrap();
    let layout = d.layout(100, None).unwrap();
    assert_eq!(layout.height, 100);
    assert_eq!(layout.width, 300);

    // All primitive centers must land inside the frame.
    for prim in &layout.primitives {
        for t in prim.transform.values() {
            let c = t.transform_point2(DVec2::ZERO);
            assert!(c.x >= 0.0 && c.x <= 300.0, "x out of frame: {}", c.x);
            assert!(c.y >= 0.0 && c.y <= 100.0, "y out of frame: {}", c.y);
        }
    }
}

#[test]
fn styles_inherit_from_ancestors() {
    let d = hcat(
        [square(1.0).fill_color(Color::named("red")), square(1.0)],
        0.0,
    )
    .unwrap()
    .fill_color(Color::named("blue"))
    .line_width(0.1);
    let prims = d.render_list().unwrap();
    assert_eq!(prims[0].attrs.values()[0].fill, Some(Color::named("red")));
    assert_eq!(prims[1].attrs.values()[0].fill, Some(Color::named("blue")));
    assert_eq!(prims[0].attrs.values()[0].stroke_width, Some(0.1));
}

#[test]
fn batched_and_scalar_diagrams_broadcast_together() {
    let shifts: Vec<Affine> = (0..3)
        .map(|i| Affine::from_translation(DVec2::new(f64::from(i) * 2.0, 0.0)))
        .collect();
    let batched = circle(0.5)
        .apply_transform(Batched::from_slice(&shifts))
        .unwrap();
    let composed = batched.atop(&square(1.0)).unwrap();
    assert_eq!(composed.size().dims(), &[3]);

    let folded = composed.batch_concat().unwrap();
    let prims = folded.render_list().unwrap();
    assert_eq!(prims.len(), 2);
    // Each lane element paints its circle and its square copy in sequence.
    assert_eq!(prims[0].order.values(), &[0, 2, 4]);
    assert_eq!(prims[1].order.values(), &[1, 3, 5]);
}

proptest! {
    #[test]
    fn juxtapose_makes_envelopes_touch(angle in 0.0..std::f64::consts::TAU, r1 in 0.1..5.0f64, r2 in 0.1..5.0f64) {
        let dir = DVec2::new(angle.cos(), angle.sin());
        let a = circle(r1);
        let moved = a.juxtapose(&circle(r2), dir).unwrap();
        // The moved diagram's near edge meets the first one's far edge.
        let near = moved.envelope().at(-dir).unwrap().values()[0];
        let far = a.envelope().at(dir).unwrap().values()[0];
        prop_assert!((near + far).abs() < 1e-9);
    }

    #[test]
    fn rotation_preserves_circle_envelopes(angle in 0.0..std::f64::consts::TAU, r in 0.1..5.0f64) {
        let d = circle(r).rotate(angle);
        let w = d.envelope().at(UNIT_X).unwrap().values()[0];
        prop_assert!((w - r).abs() < 1e-9);
    }
}
