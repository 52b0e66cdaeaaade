use backprop_lab::multilayer::{forward, MultiLayerParams, Weight};
use backprop_lab::toy::{evaluate, numerical_gradient, ToyParams};
use proptest::prelude::*;

const EPS: f64 = 1e-6;

fn toy(input: f64, theta1: f64, theta2: f64, target: f64) -> ToyParams {
    ToyParams {
        input,
        theta1,
        theta2,
        target,
    }
}

#[test]
fn analytic_matches_numeric_on_known_points() {
    let points = [
        toy(1.0, 0.5, -0.3, 0.8),
        toy(-1.5, 2.0, 0.7, 0.1),
        toy(0.25, -2.5, 1.9, 0.95),
        toy(2.0, 0.0, 0.0, 0.0),
    ];
    for p in points {
        let ev = evaluate(p);
        let (n1, n2) = numerical_gradient(p, EPS);
        assert!((ev.d_theta1 - n1).abs() < 1e-6, "{p:?}: {} vs {n1}", ev.d_theta1);
        assert!((ev.d_theta2 - n2).abs() < 1e-6, "{p:?}: {} vs {n2}", ev.d_theta2);
    }
}

fn perturbed(params: MultiLayerParams, w: Weight, delta: f64) -> MultiLayerParams {
    let mut p = params;
    match w {
        Weight::Layer1 { hidden, input } => p.weights_layer1[hidden][input] += delta,
        Weight::Layer2 { output, hidden } => p.weights_layer2[output][hidden] += delta,
    }
    p
}

#[test]
fn multilayer_paths_sum_to_numeric_gradient() {
    let params = MultiLayerParams::default();
    let f = forward(params);
    for w in Weight::all() {
        let paths = f.gradient_paths(w).unwrap();
        let expected_paths = match w {
            Weight::Layer1 { .. } => 2,
            Weight::Layer2 { .. } => 1,
        };
        assert_eq!(paths.len(), expected_paths, "{w}");
        let summed: f64 = paths.iter().map(|p| p.product).sum();
        assert_eq!(summed, f.gradient(w).unwrap());

        let numeric = (forward(perturbed(params, w, EPS)).cost - forward(perturbed(params, w, -EPS)).cost)
            / (2.0 * EPS);
        assert!((summed - numeric).abs() < 1e-8, "{w}: {summed} vs {numeric}");
    }
}

#[test]
fn every_path_product_is_its_factors() {
    let f = forward(MultiLayerParams::default());
    for w in Weight::all() {
        for path in f.gradient_paths(w).unwrap() {
            let product: f64 = path.factors.iter().map(|(_, v)| v).product();
            assert_eq!(product, path.product);
        }
    }
}

proptest! {
    #[test]
    fn toy_cost_is_never_negative(
        x in -1e3f64..1e3,
        t1 in -1e3f64..1e3,
        t2 in -1e3f64..1e3,
        t in -10f64..10.0,
    ) {
        prop_assert!(evaluate(toy(x, t1, t2, t)).cost >= 0.0);
    }

    #[test]
    fn toy_gradient_check(
        x in -2f64..2.0,
        t1 in -3f64..3.0,
        t2 in -2f64..2.0,
        t in 0f64..1.0,
    ) {
        let p = toy(x, t1, t2, t);
        let ev = evaluate(p);
        let (n1, n2) = numerical_gradient(p, EPS);
        prop_assert!((ev.d_theta1 - n1).abs() < 1e-6);
        prop_assert!((ev.d_theta2 - n2).abs() < 1e-6);
    }

    #[test]
    fn multilayer_cost_is_never_negative(
        w1 in prop::array::uniform4(-2f64..2.0),
        w2 in prop::array::uniform4(-2f64..2.0),
        x in prop::array::uniform2(-2f64..2.0),
        t in prop::array::uniform2(0f64..1.0),
    ) {
        let params = MultiLayerParams {
            inputs: x,
            weights_layer1: [[w1[0], w1[1]], [w1[2], w1[3]]],
            weights_layer2: [[w2[0], w2[1]], [w2[2], w2[3]]],
            targets: t,
        };
        let f = forward(params);
        prop_assert!(f.cost >= 0.0);
        let g = f.gradients();
        prop_assert!(g.d_layer1.iter().flatten().chain(g.d_layer2.iter().flatten()).all(|v| v.is_finite()));
    }
}
