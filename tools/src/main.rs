//! kingdom-runner: headless runner for the idle kingdom.
//!
//! Usage:
//!   kingdom-runner --seed 12345 --ticks 600 --db kingdom.db
//!   kingdom-runner --seed 12345 --data-dir ./data --ipc-mode

use anyhow::Result;
use kingdom_core::{
    command::{CommandReply, PlayerCommand},
    config::SimConfig,
    engine::SimEngine,
    store::{KeyValueStore, MemoryStore, SqliteStore},
    types::Millis,
    view::SimView,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick { count: u64 },
    Advance { millis: Millis },
    Command { command: PlayerCommand },
    Quit,
}

#[derive(serde::Serialize)]
struct IpcReply {
    state: SimView,
    #[serde(skip_serializing_if = "Option::is_none")]
    export_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 600u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = string_arg(&args, "--data-dir");

    if !ipc_mode {
        println!("Idle Kingdom; kingdom-runner");
        println!("  seed:      {seed}");
        println!("  ticks:     {ticks}");
        println!("  db:        {db}");
        println!("  data_dir:  {}", data_dir.unwrap_or("(built-in)"));
        println!();
    }

    let config = match data_dir {
        Some(dir) => SimConfig::load(dir)?,
        None => SimConfig::default(),
    };
    let store: Box<dyn KeyValueStore> = if db == ":memory:" {
        Box::new(MemoryStore::new())
    } else {
        Box::new(SqliteStore::open(db)?)
    };

    let mut engine = SimEngine::build(config, seed, store);
    match engine.load() {
        Ok(true) => log::info!("resumed save at tick {}", engine.current_tick()),
        Ok(false) => log::info!("no save found, starting fresh"),
        Err(err) => log::warn!("save unreadable, started fresh: {err}"),
    }

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        engine.run_ticks(ticks)?;
        engine.save()?;
        print_summary(&engine, ticks);
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut SimEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let mut export_code = None;
        let outcome = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => Ok(()),
            IpcCommand::Tick { count } => engine.run_ticks(count),
            IpcCommand::Advance { millis } => engine.advance_millis(millis).map(|_| ()),
            IpcCommand::Command { command } => engine.apply_command(command).map(|reply| {
                if let CommandReply::ExportCode { code } = reply {
                    export_code = Some(code);
                }
            }),
        };

        let reply = IpcReply {
            state: engine.view(),
            export_code,
            error: outcome.err().map(|e| e.to_string()),
        };
        writeln!(stdout, "{}", serde_json::to_string(&reply)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(engine: &SimEngine, ticks: u64) {
    let view = engine.view();

    println!("=== RUN SUMMARY ===");
    println!("  ticks run:      {ticks}");
    println!("  final tick:     {}", view.time.tick);
    println!("  calendar:       year {}, {}", view.time.year, view.time.season);
    println!("  explorer hp:    {}/{}", view.player.hp, view.player.max_hp);

    println!();
    println!("=== RESOURCES ===");
    for r in &view.resources {
        println!("  {:<10} {:>10.2} / {:<10.2} ({:+.2}/tick)", r.name, r.amount, r.cap, r.per_tick);
    }

    println!();
    println!("=== BUILDINGS ===");
    for b in &view.buildings {
        let price = b
            .price
            .iter()
            .map(|(res, amount)| format!("{amount} {res}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {:<14} x{:<4} next: {price}", b.name, b.count);
    }

    if !view.log.is_empty() {
        println!();
        println!("=== RECENT LOG ===");
        for entry in &view.log {
            println!("  [{:>6}] {}", entry.tick, entry.message);
        }
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
