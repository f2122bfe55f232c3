//! Headless encounter runner.
//!
//! Plays an encounter file with the autopilot standing in for the player.
//! A single run prints the event stream and the final party report; a batch
//! prints one line per seed and a summary.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use skirmish_core::{
    run_batch, Autopilot, AutopilotConfig, BatchSummary, CombatEvent, EncounterSpec,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "skirmish-sim")]
#[command(about = "Run Skirmish encounters headlessly with an autopilot player")]
struct Args {
    /// Encounter JSON file
    encounter: PathBuf,

    /// Random seed (first seed of a batch); random if omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Number of encounters to run with consecutive seeds
    #[arg(long, default_value_t = 1)]
    batch: u64,

    /// Probability the autopilot hits each timing challenge
    #[arg(long, default_value_t = 0.5)]
    hit_rate: f64,

    /// Print reports as JSON lines
    #[arg(long)]
    json: bool,

    /// Enable debug logging from the engine
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "skirmish_core=debug" } else { "skirmish_core=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if !(0.0..=1.0).contains(&args.hit_rate) {
        bail!("--hit-rate must be within [0, 1], got {}", args.hit_rate);
    }
    if args.batch == 0 {
        bail!("--batch must be at least 1");
    }

    let spec = EncounterSpec::from_json_file(&args.encounter)
        .with_context(|| format!("loading encounter {}", args.encounter.display()))?;
    let seed = args.seed.unwrap_or_else(rand::random);
    let pilot = AutopilotConfig {
        hit_rate: args.hit_rate,
        ..AutopilotConfig::default()
    };

    if args.batch == 1 {
        run_single(&spec, &pilot, seed, args.json)
    } else {
        run_many(&spec, &pilot, seed, args.batch, args.json)
    }
}

fn run_single(spec: &EncounterSpec, pilot: &AutopilotConfig, seed: u64, json: bool) -> Result<()> {
    let mut session = spec.start(seed).context("starting encounter")?;
    let mut autopilot = Autopilot::new(pilot.clone(), seed.wrapping_add(1));
    let state = autopilot.run(&mut session).context("playing encounter")?;

    for event in session.take_events() {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", describe(&event));
        }
    }

    let rewards = session.rewards();
    info!(
        %state,
        turns = session.turns_taken(),
        gold = rewards.gold,
        experience = rewards.experience,
        "encounter finished"
    );

    if json {
        println!("{}", serde_json::to_string(&session.party_report())?);
    } else {
        println!();
        println!("result: {state} after {} turns", session.turns_taken());
        println!("rewards: {} gold, {} xp", rewards.gold, rewards.experience);
        for member in session.party_report() {
            println!(
                "  {:<12} HP {:>4}/{:<4} MP {:>4}/{:<4}",
                member.name, member.current_hp, member.max_hp, member.current_mp, member.max_mp
            );
        }
    }
    Ok(())
}

fn run_many(
    spec: &EncounterSpec,
    pilot: &AutopilotConfig,
    first: u64,
    count: u64,
    json: bool,
) -> Result<()> {
    let seeds: Vec<u64> = (0..count).map(|i| first.wrapping_add(i)).collect();
    let reports = run_batch(spec, None, pilot, &seeds).context("running batch")?;

    for report in &reports {
        if json {
            println!("{}", serde_json::to_string(report)?);
        } else {
            println!(
                "seed {:>20}  {:<7}  turns {:>4}  gold {:>5}  xp {:>5}",
                report.seed,
                if report.victory { "victory" } else { "defeat" },
                report.turns,
                report.gold,
                report.experience
            );
        }
    }

    let summary = BatchSummary::from_reports(&reports);
    if json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!();
        println!(
            "{} encounters, {} victories ({:.1}%), {:.1} turns, {:.1} gold, {:.1} xp on average",
            summary.encounters,
            summary.victories,
            summary.win_rate * 100.0,
            summary.mean_turns,
            summary.mean_gold,
            summary.mean_experience
        );
    }
    Ok(())
}

fn describe(event: &CombatEvent) -> String {
    match event {
        CombatEvent::EncounterStarted { party, monsters, is_boss, seed } => {
            let boss = if *is_boss { " (boss)" } else { "" };
            format!("encounter{boss}: {party} vs {monsters} [seed {seed}]")
        }
        CombatEvent::TurnStarted { actor } => format!("-- turn {actor}"),
        CombatEvent::ActionDeclared { actor, skill, targets } => {
            format!("{actor} uses {skill} on {targets:?}")
        }
        CombatEvent::ModifierStarted { kind, actor } => format!("{kind} challenge for {actor}"),
        CombatEvent::ModifierResolved { kind, outcome } => format!("{kind} challenge: {outcome:?}"),
        CombatEvent::AttackParried { attacker, defender, negated } => {
            format!("{defender} parries {attacker}, {negated} damage negated")
        }
        CombatEvent::DamageApplied { source, target, amount, critical } => {
            let crit = if *critical { " (critical)" } else { "" };
            format!("{source} hits {target} for {amount}{crit}")
        }
        CombatEvent::PoolChanged { combatant, change } => {
            format!("{combatant} {} {}/{}", change.pool, change.value, change.max)
        }
        CombatEvent::CombatantDefeated { combatant } => format!("{combatant} is defeated"),
        CombatEvent::TurnEnded { actor } => format!("-- end {actor}"),
        CombatEvent::EncounterEnded { victory, gold, experience } => {
            let result = if *victory { "victory" } else { "defeat" };
            format!("{result}: {gold} gold, {experience} xp")
        }
        CombatEvent::EncounterAborted => "aborted".to_string(),
    }
}
