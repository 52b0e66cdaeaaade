use backprop_lab::activations::ActivationKind;
use backprop_lab::config::LabConfig;
use backprop_lab::feedforward::{FeedForwardNet, Topology};
use backprop_lab::input::{NumericField, SliderBounds};
use backprop_lab::typeset::{self, Typesetter};
use proptest::prelude::*;

fn activation() -> impl Strategy<Value = ActivationKind> {
    prop::sample::select(ActivationKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn forward_shapes_follow_topology(
        inputs in 1usize..=20,
        outputs in 1usize..=20,
        hidden in prop::collection::vec(1usize..=50, 0..=4),
        act in activation(),
        seed in any::<u64>(),
    ) {
        let topology = Topology { inputs, hidden: hidden.clone(), outputs };
        let mut net = FeedForwardNet::new(topology, act, seed).unwrap();
        net.randomize_inputs();
        let out = net.forward().unwrap().to_vec();
        prop_assert_eq!(out.len(), outputs);
        prop_assert!(out.iter().all(|v| v.is_finite()));
        let widths: Vec<usize> = net.layer_outputs().iter().map(Vec::len).collect();
        let mut expected = vec![inputs];
        expected.extend(hidden);
        expected.push(outputs);
        prop_assert_eq!(widths, expected);
    }

    #[test]
    fn rejected_text_keeps_last_value(
        start in 0f64..1.0,
        bad in prop_oneof![1.0001f64..1e6, -1e6f64..-0.0001],
    ) {
        let mut field = NumericField::new(start, SliderBounds::new(0.0, 1.0, 0.01));
        prop_assert!(field.edit(&bad.to_string()).is_err());
        prop_assert_eq!(field.value(), start);
        prop_assert!(field.error().is_some());
    }
}

#[test]
fn extreme_inputs_stay_finite() {
    let topology = Topology {
        inputs: 2,
        hidden: vec![50; 10],
        outputs: 3,
    };
    for act in [ActivationKind::Sigmoid, ActivationKind::Tanh, ActivationKind::Softmax] {
        let mut net = FeedForwardNet::new(topology.clone(), act, 1).unwrap();
        net.set_inputs(&[1000.0, -1000.0]).unwrap();
        assert!(net.forward().unwrap().iter().all(|v| v.is_finite()), "{act}");
    }
}

#[test]
fn config_file_round_trip() {
    let dir = std::env::temp_dir().join(format!("backprop-lab-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("lab.toml");
    std::fs::write(
        &path,
        "[perceptron]\ninputs = 4\nhidden = [6]\nactivation = \"leaky_relu\"\nseed = 9\n",
    )
    .unwrap();
    let cfg = LabConfig::load_from_file(&path).unwrap();
    cfg.validate().unwrap();
    let p = cfg.perceptron();
    let net = FeedForwardNet::new(p.topology, p.activation, p.seed).unwrap();
    assert_eq!(net.topology().to_string(), "4-6-2");
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn global_typesetter_renders() {
    assert_eq!(typeset::render(r"\sigma(z)"), "σ(z)");
    let lease = Typesetter::global().acquire();
    assert!(Typesetter::global().is_loaded());
    assert_eq!(lease.render(r"\eta \nabla J"), "η ∇ J");
}

#[test]
fn shipped_config_matches_defaults() {
    let cfg = LabConfig::load_from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/lab.toml")).unwrap();
    cfg.validate().unwrap();
    let defaults = LabConfig::default();
    assert_eq!(cfg.dashboard(), defaults.dashboard());
    assert_eq!(cfg.descent(), defaults.descent());
    assert_eq!(cfg.toy(), defaults.toy());
    assert_eq!(cfg.multilayer(), defaults.multilayer());
    assert_eq!(cfg.perceptron(), defaults.perceptron());
    assert_eq!(cfg.logging(), defaults.logging());
}
