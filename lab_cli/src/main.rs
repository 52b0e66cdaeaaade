use anyhow::{ensure, Context, Result};
use backprop_lab::activations::ActivationKind;
use backprop_lab::config::{DashboardConfig, LabConfig};
use backprop_lab::descent::DescentSimulator;
use backprop_lab::feedforward::{FeedForwardNet, Topology};
use backprop_lab::multilayer::{self, Weight};
use backprop_lab::routes::Page;
use backprop_lab::simulation::Simulation;
use backprop_lab::stepper::Walkthrough;
use backprop_lab::toy::{self, ToyParams};
use backprop_lab::training::{Dashboard, Param};
use backprop_lab::typeset::Typesetter;
use backprop_lab::{logging, report};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

#[derive(Parser)]
#[command(version, about = "Backpropagation course, in the terminal")]
struct Cli {
    /// TOML config file; repeat to layer several, later files win
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Vec<PathBuf>,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Toy 1-1-1 network: forward values and chain-rule gradients
    Toy {
        #[arg(short = 'x', long, allow_hyphen_values = true)]
        input: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        theta1: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        theta2: Option<f64>,
        #[arg(short, long)]
        target: Option<f64>,
        /// Also show the parameters after one update with this rate
        #[arg(long)]
        lr: Option<f64>,
        /// Reveal the forward pass one step at a time
        #[arg(long)]
        walkthrough: bool,
    },
    /// Fixed 2-2-2 network: every chain-rule path per weight
    Multilayer {
        /// Reveal the computation one step at a time
        #[arg(long)]
        walkthrough: bool,
    },
    /// Gradient descent on J(θ) = 1 − e^{−θ²/2}
    Descent {
        #[arg(long, allow_hyphen_values = true)]
        start: Option<f64>,
        #[arg(long)]
        lr: Option<f64>,
        /// Milliseconds between ticks; 0 runs without a timer
        #[arg(long)]
        tick_ms: Option<u64>,
        #[arg(long, default_value_t = 1000)]
        max_ticks: usize,
        #[arg(long, value_name = "PATH")]
        history_csv: Option<PathBuf>,
    },
    /// Training dashboard on the toy network
    Train {
        /// Learning rate, within the slider range [0.01, 1] unless --unbounded
        #[arg(long)]
        lr: Option<f64>,
        #[arg(short = 'x', long, allow_hyphen_values = true)]
        input: Option<f64>,
        #[arg(short, long)]
        target: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        theta1: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        theta2: Option<f64>,
        /// Milliseconds between epochs; 0 runs without a timer
        #[arg(long)]
        tick_ms: Option<u64>,
        /// Accept any finite override, ignoring the slider ranges
        #[arg(long)]
        unbounded: bool,
        #[arg(long, default_value_t = 1000)]
        max_epochs: usize,
        #[arg(long, value_name = "PATH")]
        history_csv: Option<PathBuf>,
    },
    /// Feed-forward visualizer: one forward pass through a custom network
    Perceptron {
        /// Input values, comma separated
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        inputs: Vec<f64>,
        /// Hidden layer widths, comma separated
        #[arg(long, value_delimiter = ',')]
        hidden: Option<Vec<usize>>,
        #[arg(long)]
        outputs: Option<usize>,
        #[arg(long)]
        activation: Option<ActivationKind>,
        #[arg(long)]
        seed: Option<u64>,
        /// Draw random inputs instead of `--inputs`
        #[arg(long, conflicts_with = "inputs")]
        randomize: bool,
        /// Explain one neuron, as LAYER:NEURON (layer 1 = first hidden)
        #[arg(long, value_parser = parse_neuron)]
        neuron: Option<(usize, usize)>,
    },
    /// List the course pages
    Routes,
}

fn parse_neuron(s: &str) -> Result<(usize, usize), String> {
    let (layer, neuron) = s
        .split_once(':')
        .ok_or_else(|| format!("expected LAYER:NEURON, got `{s}`"))?;
    let layer = layer.trim().parse().map_err(|e| format!("layer: {e}"))?;
    let neuron = neuron.trim().parse().map_err(|e| format!("neuron: {e}"))?;
    Ok((layer, neuron))
}

fn load_config(paths: &[PathBuf]) -> Result<LabConfig> {
    let mut config = LabConfig::default();
    for path in paths {
        let layer = LabConfig::load_from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        config = config
            .merge(layer)
            .with_context(|| format!("layering config {}", path.display()))?;
    }
    config.validate()?;
    Ok(config)
}

/// Dashboard from config plus command-line overrides. Overrides go through
/// the slider checks unless `unbounded` is set.
fn dashboard_from(
    cfg: DashboardConfig,
    overrides: &[(Param, Option<f64>)],
    unbounded: bool,
) -> Result<Dashboard> {
    if unbounded {
        let mut params = cfg.params;
        for &(param, value) in overrides {
            if let Some(v) = value {
                ensure!(v.is_finite(), "{param:?} must be finite, got {v}");
                param.apply(&mut params, v);
            }
        }
        return Ok(Dashboard::with_limits(params, cfg.limits));
    }
    let mut dash = Dashboard::with_limits(cfg.params, cfg.limits);
    for &(param, value) in overrides {
        if let Some(v) = value {
            dash.set_param(param, v)?;
        }
    }
    Ok(dash)
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Tick `sim` on a fixed interval until it stops running, `max_ticks`
/// elapse, or Ctrl-C pauses it. A zero interval drains synchronously.
async fn drive<S, F>(sim: &mut S, tick: Duration, max_ticks: usize, mut on_tick: F) -> Result<usize>
where
    S: Simulation,
    F: FnMut(&S),
{
    sim.start()?;
    if tick.is_zero() {
        let mut ticks = 0;
        while sim.is_running() && ticks < max_ticks {
            sim.tick();
            ticks += 1;
            on_tick(sim);
        }
        return Ok(finished(sim, ticks));
    }
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of an interval fires immediately.
    interval.tick().await;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticks = 0;
    while sim.is_running() && ticks < max_ticks {
        tokio::select! {
            _ = interval.tick() => {
                sim.tick();
                ticks += 1;
                on_tick(sim);
            }
            res = &mut ctrl_c => {
                res?;
                sim.pause();
                info!(sim = sim.name(), ticks, "interrupted");
                break;
            }
        }
    }
    Ok(finished(sim, ticks))
}

fn finished<S: Simulation>(sim: &S, ticks: usize) -> usize {
    if sim.phase().is_terminal() {
        info!(sim = sim.name(), phase = %sim.phase(), ticks, "run finished");
    }
    ticks
}

/// Reveal `frames` one per stepper tick.
async fn play(mut walkthrough: Walkthrough, frames: &[String]) {
    let mut interval = tokio::time::interval(walkthrough.interval());
    interval.tick().await;
    walkthrough.start();
    if let Some(first) = frames.first() {
        println!("{first}");
    }
    while walkthrough.is_animating() {
        interval.tick().await;
        let step = walkthrough.tick();
        if !walkthrough.is_animating() {
            break;
        }
        if let Some(frame) = frames.get(step) {
            println!("{frame}");
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let level = logging::level_for_verbosity(config.logging().level()?, cli.verbose);
    logging::init_logging(level)?;
    debug!(?level, files = cli.config.len(), "configuration loaded");

    match cli.command {
        Command::Toy {
            input,
            theta1,
            theta2,
            target,
            lr,
            walkthrough,
        } => {
            let base = config.toy();
            let params = ToyParams {
                input: input.map(|v| toy::INPUT_BOUNDS.check(v)).transpose()?.unwrap_or(base.input),
                theta1: theta1.map(|v| toy::THETA1_BOUNDS.check(v)).transpose()?.unwrap_or(base.theta1),
                theta2: theta2.map(|v| toy::THETA2_BOUNDS.check(v)).transpose()?.unwrap_or(base.theta2),
                target: target.map(|v| toy::TARGET_BOUNDS.check(v)).transpose()?.unwrap_or(base.target),
            };
            let ev = toy::evaluate(params);
            if cli.json {
                return print_json(&json!({
                    "evaluation": ev,
                    "chain_rule": ev.chain_rule(),
                    "updated": lr.map(|lr| ev.updated_params(lr)),
                }));
            }
            let tex = Typesetter::global().acquire();
            let mut frames = vec![format!(
                "x = {:.3}, θ₁ = {:.3}, θ₂ = {:.3}, t = {:.3}",
                params.input, params.theta1, params.theta2, params.target
            )];
            for step in ev.forward_steps() {
                frames.push(format!("{}\n  {}\n  {}", step.title, tex.render(&step.equation), step.calculation));
            }
            if walkthrough {
                play(Walkthrough::toy(), &frames).await;
            } else {
                frames.iter().for_each(|f| println!("{f}"));
            }
            println!();
            for step in ev.backward_steps() {
                println!("{}\n  {}\n  {}", step.title, tex.render(&step.equation), step.calculation);
            }
            if let Some(lr) = lr {
                let next = ev.updated_params(lr);
                println!(
                    "\nAfter one step (η = {lr}): θ₁ = {:.6}, θ₂ = {:.6}, J = {:.6}",
                    next.theta1,
                    next.theta2,
                    toy::evaluate(next).cost
                );
            }
        }
        Command::Multilayer { walkthrough } => {
            let f = multilayer::forward(config.multilayer());
            let grads = f.gradients();
            if cli.json {
                let paths = Weight::all()
                    .map(|w| Ok(json!({ "weight": w.to_string(), "paths": f.gradient_paths(w)? })))
                    .collect::<Result<Vec<_>>>()?;
                return print_json(&json!({ "forward": f, "gradients": grads, "paths": paths }));
            }
            let mut frames = vec![
                format!("x = {:?}, t = {:?}", f.params.inputs, f.params.targets),
                format!("z⁽²⁾ = W⁽¹⁾x = [{:.4}, {:.4}]", f.z2[0], f.z2[1]),
                format!("a⁽²⁾ = σ(z⁽²⁾) = [{:.4}, {:.4}]", f.a2[0], f.a2[1]),
                format!("z⁽³⁾ = W⁽²⁾a⁽²⁾ = [{:.4}, {:.4}]", f.z3[0], f.z3[1]),
                format!("a⁽³⁾ = σ(z⁽³⁾) = [{:.4}, {:.4}]", f.a3[0], f.a3[1]),
                format!("e = a⁽³⁾ − t = [{:.4}, {:.4}]", f.errors[0], f.errors[1]),
                format!("J = ½Σe² = {:.6}", f.cost),
            ];
            let mut layer2 = String::from("Layer 2 gradients (one path each):");
            let mut layer1 = String::from("Layer 1 gradients (two paths each):");
            for w in Weight::all() {
                let paths = f.gradient_paths(w)?;
                let total: f64 = paths.iter().map(|p| p.product).sum();
                let section = match w {
                    Weight::Layer1 { .. } => &mut layer1,
                    Weight::Layer2 { .. } => &mut layer2,
                };
                let value = f.params.weight(w)?;
                section.push_str(&format!("\n  ∂J/∂{w} = {total:.6}  ({w} = {value:+.2})"));
                for p in &paths {
                    let factors: Vec<String> = p.factors.iter().map(|(l, v)| format!("{l}={v:.4}")).collect();
                    section.push_str(&format!(
                        "\n    via output {}: {} → {:.6}",
                        p.output + 1,
                        factors.join(" × "),
                        p.product
                    ));
                }
            }
            frames.push(layer2);
            frames.push(layer1);
            if walkthrough {
                play(Walkthrough::multilayer(), &frames).await;
            } else {
                frames.iter().for_each(|f| println!("{f}"));
            }
        }
        Command::Descent {
            start,
            lr,
            tick_ms,
            max_ticks,
            history_csv,
        } => {
            let cfg = config.descent();
            let mut sim = DescentSimulator::new(cfg.params);
            if let Some(start) = start {
                sim.set_position(start)?;
            }
            if let Some(lr) = lr {
                sim.set_learning_rate(lr)?;
            }
            let tick = Duration::from_millis(tick_ms.unwrap_or(cfg.tick_ms));
            let quiet = cli.json;
            let ticks = drive(&mut sim, tick, max_ticks, |s| {
                if !quiet {
                    println!(
                        "epoch {:>4}  θ = {:+.6}  J = {:.6}  ∇J = {:+.6}",
                        s.epoch(),
                        s.position(),
                        s.cost(),
                        s.gradient()
                    );
                }
            })
            .await?;
            if let Some(path) = &history_csv {
                report::save_descent_history(path, sim.history().iter())?;
                info!(path = %path.display(), "history written");
            }
            if cli.json {
                return print_json(&json!({
                    "phase": sim.phase(),
                    "ticks": ticks,
                    "position": sim.position(),
                    "cost": sim.cost(),
                    "history": sim.history(),
                }));
            }
            let costs: Vec<f64> = sim.history().iter().map(|p| p.cost).collect();
            println!("\n{}", report::summary_table("Cost", &costs));
            println!("Phase: {} after {} epochs", sim.phase(), sim.epoch());
        }
        Command::Train {
            lr,
            input,
            target,
            theta1,
            theta2,
            tick_ms,
            unbounded,
            max_epochs,
            history_csv,
        } => {
            let cfg = config.dashboard();
            let overrides = [
                (Param::LearningRate, lr),
                (Param::Input, input),
                (Param::Target, target),
                (Param::InitialTheta1, theta1),
                (Param::InitialTheta2, theta2),
            ];
            let mut dash = dashboard_from(cfg, &overrides, unbounded)?;
            let tick = Duration::from_millis(tick_ms.unwrap_or(cfg.tick_ms));
            let quiet = cli.json;
            drive(&mut dash, tick, max_epochs, |d| {
                let s = d.state();
                if !quiet && d.failure().is_none() {
                    println!(
                        "epoch {:>4}  J = {:.6}  θ₁ = {:+.4}  θ₂ = {:+.4}  y = {:.4}  acc = {:.1}%",
                        s.epoch, s.cost, s.weights.theta1, s.weights.theta2, s.output, s.accuracy
                    );
                }
            })
            .await?;
            if let Some(path) = &history_csv {
                report::save_training_history(path, dash.history().iter())?;
                info!(path = %path.display(), "history written");
            }
            let insight = dash.insight();
            if cli.json {
                return print_json(&json!({
                    "phase": dash.phase(),
                    "state": dash.state(),
                    "failure": dash.failure(),
                    "insight": insight.message(),
                    "history": dash.history(),
                }));
            }
            let costs: Vec<f64> = dash.history().iter().map(|s| s.cost).collect();
            println!("\n{}", report::summary_table("Cost", &costs));
            println!("[{:?}] {}", insight.severity(), insight.message());
        }
        Command::Perceptron {
            inputs,
            hidden,
            outputs,
            activation,
            seed,
            randomize,
            neuron,
        } => {
            let cfg = config.perceptron();
            let topology = Topology {
                inputs: if inputs.is_empty() { cfg.topology.inputs } else { inputs.len() },
                hidden: hidden.unwrap_or(cfg.topology.hidden),
                outputs: outputs.unwrap_or(cfg.topology.outputs),
            };
            let mut net = FeedForwardNet::new(
                topology,
                activation.unwrap_or(cfg.activation),
                seed.unwrap_or(cfg.seed),
            )?;
            if randomize {
                net.randomize_inputs();
            } else if !inputs.is_empty() {
                net.set_inputs(&inputs)?;
            }
            net.forward()?;
            let breakdown = neuron
                .map(|(layer, n)| net.neuron_breakdown(layer, n))
                .transpose()?;
            if cli.json {
                return print_json(&json!({
                    "topology": net.topology(),
                    "activation": net.activation(),
                    "layer_outputs": net.layer_outputs(),
                    "neuron": breakdown,
                }));
            }
            println!("Network {} ({}, output range {})", net.topology(), net.activation(), net.activation().range());
            for (i, values) in net.layer_outputs().iter().enumerate() {
                let label = match i {
                    0 => "input".to_string(),
                    i if i == net.layer_outputs().len() - 1 => "output".to_string(),
                    i => format!("hidden {i}"),
                };
                let shown: Vec<String> = values.iter().map(|v| format!("{v:.4}")).collect();
                println!("  {label:<9} [{}]", shown.join(", "));
            }
            if let Some(b) = breakdown {
                println!("\nLayer {} neuron {} ({}):", b.layer, b.neuron, b.activation);
                for (x, w, p) in &b.terms {
                    println!("  {x:+.4} × {w:+.4} = {p:+.4}");
                }
                println!("  + bias {:+.4}", b.bias);
                println!("  z = {:.4} → a = {:.4}  (∂a/∂z = {:.4})", b.pre_activation, b.activated, b.slope);
            }
        }
        Command::Routes => {
            if cli.json {
                let pages: Vec<_> = Page::ALL
                    .iter()
                    .map(|p| json!({ "path": p.path(), "title": p.title(), "command": p.command() }))
                    .collect();
                return print_json(&json!(pages));
            }
            for page in Page::ALL {
                println!("{:<20} {:<18} {}", page.path(), page.title(), page.command().unwrap_or("-"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use backprop_lab::simulation::Phase;

    #[test]
    fn neuron_argument() {
        assert_eq!(parse_neuron("2:3"), Ok((2, 3)));
        assert!(parse_neuron("2").is_err());
        assert!(parse_neuron("a:1").is_err());
    }

    #[test]
    fn cli_parses() {
        let cli = Cli::try_parse_from(["backprop-lab", "train", "--lr", "0.5", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Train { lr: Some(_), .. }));
        assert!(Cli::try_parse_from(["backprop-lab", "perceptron", "--inputs", "1,2", "--randomize"]).is_err());
    }

    #[tokio::test]
    async fn zero_interval_drains_synchronously() {
        let mut sim = DescentSimulator::default();
        let mut seen = 0;
        let ticks = drive(&mut sim, Duration::ZERO, 10_000, |_| seen += 1).await.unwrap();
        assert_eq!(ticks, seen);
        assert!(sim.at_minimum());
        assert!(sim.phase().is_terminal());
    }

    #[tokio::test]
    async fn unbounded_learning_rate_reaches_divergence() {
        let overrides = [(Param::LearningRate, Some(50.0))];
        assert!(dashboard_from(DashboardConfig::default(), &overrides, false).is_err());

        let mut dash = dashboard_from(DashboardConfig::default(), &overrides, true).unwrap();
        assert_eq!(dash.params().learning_rate, 50.0);
        drive(&mut dash, Duration::ZERO, 100, |_| {}).await.unwrap();
        assert_eq!(dash.phase(), Phase::Diverged);
        assert!(dash.failure().is_some_and(|f| f.is_divergence()));

        let nan = [(Param::Target, Some(f64::NAN))];
        assert!(dashboard_from(DashboardConfig::default(), &nan, true).is_err());
    }

    #[test]
    fn bad_config_path_is_reported() {
        let err = load_config(&[PathBuf::from("/nonexistent/lab.toml")]).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
