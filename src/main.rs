use anyhow::{bail, Context, Result};
use efrgen::config::ConfigManager;
use efrgen::engines::generation::{query, EvolutionEngine, Individual, LogProgressCallback};
use std::env;

const USAGE: &str = "usage: efrgen <config.toml> [--query \"<forest>\"] [--dot] [--json]";

struct Args {
    config_path: String,
    query: Option<String>,
    dot: bool,
    json: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let config_path = args.next().context(USAGE)?;
    let mut parsed = Args {
        config_path,
        query: None,
        dot: false,
        json: false,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--query" => parsed.query = Some(args.next().context("--query needs a forest")?),
            "--dot" => parsed.dot = true,
            "--json" => parsed.json = true,
            other => bail!("unknown argument '{}'\n{}", other, USAGE),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args()?;
    let mut manager = ConfigManager::new();
    manager
        .load_from_file(&args.config_path)
        .with_context(|| format!("loading {}", args.config_path))?;

    let engine = EvolutionEngine::from_app_config(manager.get())?;

    let forest = match &args.query {
        Some(text) => {
            let forest = query(engine.context().clone(), text).context("evaluating query")?;
            for row in forest.estimates().chunks(forest.outputs().max(1)) {
                let line: Vec<String> = row.iter().map(|v| format!("{:.6}", v)).collect();
                println!("{}", line.join("\t"));
            }
            forest
        }
        None => {
            let mut engine = engine;
            let outcome = engine.run(LogProgressCallback)?;
            outcome.winner
        }
    };

    println!("{}", forest);
    println!(
        "fitness {:.6} p1 {:.6} p2 {:.6}",
        forest.fitness(),
        forest.p1(),
        forest.p2()
    );
    if args.dot {
        println!("{}", forest.dot());
    }
    if args.json {
        println!("{}", forest.to_json()?);
    }
    Ok(())
}
