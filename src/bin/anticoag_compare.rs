use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use anticoag_markov::cohort::CohortOutcomes;
use anticoag_markov::{
    compare_arms, load_config, logging, run_psa_with_mode, Cohort, CostEffectiveness,
    DeterministicParams, RelativeRiskMode, Therapy,
};

#[derive(Debug, Parser)]
#[command(name = "anticoag_compare")]
#[command(about = "Compare no treatment against anticoagulation with a Markov cohort model")]
struct Cli {
    /// JSON configuration; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Number of probabilistic sensitivity analysis trials
    #[arg(long)]
    psa_trials: Option<usize>,

    /// Apply a sampled bleeding relative risk to each PSA matrix
    #[arg(long, default_value_t = false)]
    fold_relative_risk: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    if let Err(error) = try_main() {
        eprintln!("anticoag_compare failed: {error:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = load_config(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load configuration: {}", path.display()),
        None => "invalid built-in configuration".to_string(),
    })?;
    if let Some(seed) = cli.seed {
        config.simulation.seed = seed;
    }
    if let Some(trials) = cli.psa_trials {
        config.simulation.psa_trials = trials;
    }
    config.validate()?;

    let inputs = &config.inputs;
    let simulation = &config.simulation;
    let steps = simulation.steps(inputs.delta_t)?;

    let mut arms = Vec::with_capacity(Therapy::ALL.len());
    for (id, therapy) in Therapy::ALL.into_iter().enumerate() {
        let params = DeterministicParams::new(inputs, therapy)?;
        let outcomes = Cohort::new(id as u64, therapy, simulation.population_size).simulate(
            &params,
            steps,
            simulation.seed,
        )?;
        print_outcomes(&outcomes)?;
        arms.push(outcomes);
    }

    let comparison = compare_arms(&arms[0], &arms[1]);
    println!("{} vs {}:", comparison.treated, comparison.base);
    if let Some(gain) = comparison.survival_time_gain {
        println!("  change in mean survival time: {gain:.3} years");
    }
    println!("  change in mean stroke count: {:.3}", comparison.stroke_count_change);
    println!("  incremental cost: {:.2}", comparison.incremental_cost);
    println!("  incremental utility: {:.4}", comparison.incremental_utility);
    match comparison.cost_effectiveness() {
        CostEffectiveness::Dominant => println!("  {} dominates", comparison.treated),
        CostEffectiveness::Dominated => println!("  {} is dominated", comparison.treated),
        CostEffectiveness::Icer(ratio) => println!("  ICER: {ratio:.2}"),
    }
    println!(
        "  net monetary benefit at {:.0}: {:.2}",
        simulation.willingness_to_pay,
        comparison.net_monetary_benefit(simulation.willingness_to_pay)
    );

    if simulation.psa_trials > 0 {
        let mode = if cli.fold_relative_risk {
            RelativeRiskMode::Folded
        } else {
            RelativeRiskMode::Ignored
        };
        let psa = run_psa_with_mode(inputs, simulation, mode)?;
        let cost = psa.incremental_cost_stat()?;
        let utility = psa.incremental_utility_stat()?;
        let (cost_lo, cost_hi) = cost.percentile_interval(0.95);
        let (util_lo, util_hi) = utility.percentile_interval(0.95);

        println!("PSA ({} trials):", psa.trials.len());
        println!("  incremental cost: {:.2} [{cost_lo:.2}, {cost_hi:.2}]", cost.mean);
        println!("  incremental utility: {:.4} [{util_lo:.4}, {util_hi:.4}]", utility.mean);
        println!(
            "  probability cost-effective at {:.0}: {:.3}",
            simulation.willingness_to_pay,
            psa.probability_cost_effective(simulation.willingness_to_pay)
        );
    }

    Ok(())
}

fn print_outcomes(outcomes: &CohortOutcomes) -> Result<()> {
    let cost = outcomes.cost_stat()?;
    let utility = outcomes.utility_stat()?;
    let (cost_lo, cost_hi) = cost.mean_ci95();
    let (util_lo, util_hi) = utility.mean_ci95();

    println!("{}:", outcomes.therapy);
    if let Some(survival) = outcomes.mean_survival_time() {
        println!("  mean survival time: {survival:.3} years");
    }
    if let Ok(stroke) = outcomes.stroke_time_stat() {
        println!("  mean time to first stroke: {:.3} years", stroke.mean);
    }
    println!("  mean discounted cost: {:.2} [{cost_lo:.2}, {cost_hi:.2}]", cost.mean);
    println!("  mean discounted utility: {:.4} [{util_lo:.4}, {util_hi:.4}]", utility.mean);
    Ok(())
}
