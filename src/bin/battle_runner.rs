//! Headless AI-vs-AI battle runner
//!
//! Usage: cargo run --bin battle_runner -- [options]
//! Output: JSON or text with the outcome and the action log

use battle_core::battle::actions::WAIT_ACTION_ID;
use battle_core::battle::ai::{load_profile, AiProfile, BattleAi, RuleAi, SearchAi};
use battle_core::battle::{
    perform_action_with, ActionKind, ActionMethod, ActionRequest, ActionTarget, BattleMap, BattleState, BattleUnit,
    CombatAction, CombatStats, EffectKind, EffectTemplate, OffsetCoord, StatType,
};
use battle_core::core::config::CombatConfig;
use battle_core::core::types::UnitId;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run a headless AI battle and output results")]
struct Args {
    /// AI engine: search or rules
    #[arg(long, default_value = "search")]
    engine: String,

    /// TOML rule profile given to both units (rules engine only)
    #[arg(long)]
    profile: Option<String>,

    /// TOML file with combat config overrides
    #[arg(long)]
    config: Option<String>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum rounds before stopping
    #[arg(long, default_value = "20")]
    max_rounds: u32,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print every action to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct UnitSummary {
    user_id: String,
    cur_health: f64,
    fled: bool,
    outcome: Option<String>,
    elo_change: Option<f64>,
}

#[derive(Serialize)]
struct RunnerResult {
    engine: String,
    seed: u64,
    rounds: u32,
    actions: usize,
    concluded: bool,
    units: Vec<UnitSummary>,
    log: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let config = match &args.config {
        Some(path) => match std::fs::read_to_string(path)
            .map_err(battle_core::core::error::CombatError::from)
            .and_then(|contents| CombatConfig::from_toml_str(&contents))
        {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => CombatConfig::default(),
    };

    let profile = match &args.profile {
        Some(path) => match load_profile(path) {
            Ok(profile) => Some(profile),
            Err(e) => {
                eprintln!("Failed to load profile {}: {}", path, e);
                std::process::exit(1);
            }
        },
        // NPCs without a profile would have no rules at all
        None => Some(AiProfile {
            name: "fallback".to_string(),
            include_default_rules: true,
            ..AiProfile::default()
        }),
    };

    let ai: Box<dyn BattleAi> = match args.engine.as_str() {
        "search" => Box::new(SearchAi::default()),
        "rules" => Box::new(RuleAi),
        other => {
            eprintln!("Unknown engine '{}', expected search or rules", other);
            std::process::exit(1);
        }
    };

    let map = BattleMap::new(8, 6);
    let mut state = BattleState::new(format!("arena-{}", seed), seed, create_units(profile));
    info!(engine = %args.engine, seed, "Battle started");

    let mut log = Vec::new();
    let mut actions = 0;
    while !state.is_concluded() && state.round < args.max_rounds {
        let mut progressed = false;
        let ids: Vec<UnitId> = state
            .units
            .iter()
            .filter(|u| u.in_battle() && u.is_ai)
            .map(|u| u.user_id.clone())
            .collect();

        for unit_id in ids {
            if state.is_concluded() {
                break;
            }
            let Some(unit) = state.unit(&unit_id) else {
                continue;
            };
            if !unit.in_battle() || unit.action_points <= 0.0 {
                continue;
            }

            let outcome = match ai.perform(&state, &map, &unit_id, &config) {
                Ok(Some(outcome)) => Ok(outcome),
                Ok(None) => {
                    let request = ActionRequest {
                        unit_id: unit_id.clone(),
                        action_id: WAIT_ACTION_ID.to_string(),
                        target: unit.position,
                    };
                    perform_action_with(&state, &map, &request, &config)
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(outcome) => {
                    if args.verbose {
                        eprintln!("[round {}] {}", state.round, outcome.description);
                        for entry in &outcome.log {
                            eprintln!("  {}", entry.text);
                        }
                    }
                    log.push(outcome.description);
                    state = outcome.state;
                    actions += 1;
                    progressed = true;
                }
                Err(e) => warn!(unit = %unit_id, error = %e, "AI action rejected"),
            }
        }

        if !progressed {
            warn!(round = state.round, "No unit could act, stopping");
            break;
        }
    }

    let units = state
        .units
        .iter()
        .map(|unit| {
            let result = state.results.iter().find(|r| r.user_id == unit.user_id);
            UnitSummary {
                user_id: unit.user_id.to_string(),
                cur_health: unit.pools.cur_health,
                fled: unit.fled_battle,
                outcome: result.map(|r| format!("{:?}", r.outcome)),
                elo_change: result.map(|r| r.elo_change),
            }
        })
        .collect();

    let result = RunnerResult {
        engine: args.engine.clone(),
        seed,
        rounds: state.round,
        actions,
        concluded: state.is_concluded(),
        units,
        log,
    };

    match args.format.as_str() {
        "text" => {
            println!("Battle Result");
            println!("=============");
            println!("Engine: {}", result.engine);
            println!("Rounds: {}", result.rounds);
            println!("Actions: {}", result.actions);
            println!("Concluded: {}", result.concluded);
            for unit in &result.units {
                println!(
                    "  {} health={:.1} fled={} outcome={}",
                    unit.user_id,
                    unit.cur_health,
                    unit.fled,
                    unit.outcome.as_deref().unwrap_or("-")
                );
            }
            println!();
            println!("Seed: {}", result.seed);
        }
        other => {
            if other != "json" {
                eprintln!("Unknown format '{}', defaulting to json", other);
            }
            match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Failed to serialize result: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Two NPCs from rival villages on opposite sides of the arena
fn create_units(profile: Option<AiProfile>) -> Vec<BattleUnit> {
    let strike = CombatAction::new(
        "fire_strike",
        "Fire Strike",
        ActionKind::Jutsu,
        ActionTarget::Opponent,
        ActionMethod::Single,
        3,
    )
    .with_action_cost(50.0)
    .with_description("%user hurls fire at %target")
    .with_effect(
        EffectTemplate::new(EffectKind::Damage, 12.0)
            .power_per_level(0.5)
            .stats(vec![StatType::Ninjutsu]),
    );
    let mend = CombatAction::new(
        "mend",
        "Mend",
        ActionKind::Jutsu,
        ActionTarget::SelfUnit,
        ActionMethod::Single,
        0,
    )
    .with_action_cost(60.0)
    .with_effect(EffectTemplate::new(EffectKind::Heal, 15.0));

    let leaf = BattleUnit::new("npc_leaf", "Leaf Genin", OffsetCoord::new(0, 2))
        .with_village("leaf")
        .with_stats(CombatStats::uniform(20.0))
        .with_ai(profile.clone())
        .with_jutsu(strike.clone())
        .with_jutsu(mend.clone());
    let sand = BattleUnit::new("npc_sand", "Sand Genin", OffsetCoord::new(7, 3))
        .with_village("sand")
        .with_stats(CombatStats::uniform(18.0))
        .with_ai(profile)
        .with_jutsu(strike)
        .with_jutsu(mend);
    vec![leaf, sand]
}
