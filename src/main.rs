//! Neon Casino command-line driver
//!
//! Plays single rounds against a wallet persisted in a JSON state file, and
//! runs seeded simulations for return-to-player checks.

use clap::{Parser, Subcommand, ValueEnum};
use neon_casino::{
    config::ConfigLoader,
    errors::{CasinoResult, ConfigurationError},
    games::{
        simulation::{simulate, Strategy},
        CoinSide, GameType, Reveal,
    },
    random::{RandomSource, ThreadRandom},
    storage::{JsonFileStore, KeyValueStore},
    tap::TapGame,
    Casino,
};
use std::{path::PathBuf, sync::Arc};

/// Neon Casino CLI
#[derive(Parser)]
#[command(name = "neon-casino")]
#[command(about = "Case openings, Crash, Mines and Coinflip with a persistent wallet")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON state file holding balance and tap progress
    #[arg(short, long)]
    state: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as TOML
    Config,

    /// Show the current balance
    Balance,

    /// Open a case and credit the prize after the reveal
    OpenCase {
        name: String,
    },

    /// Call a side and flip
    Coinflip {
        call: CoinSide,
        stake: f64,
    },

    /// Play a live Crash round, cashing out at a target multiplier
    Crash {
        stake: f64,

        #[arg(long, default_value = "1.5")]
        cash_at: f64,
    },

    /// Reveal random cells, then cash out
    Mines {
        stake: f64,

        #[arg(long, default_value = "3")]
        reveals: usize,
    },

    /// Tap for balance, or buy more tap power
    Tap {
        #[arg(long)]
        upgrade: bool,
    },

    /// Coin tap game
    Coins {
        #[arg(value_enum, default_value = "tap")]
        action: CoinAction,
    },

    /// Play many rounds with a fixed strategy and report the return
    Simulate {
        game: GameType,

        #[arg(short, long, default_value = "10000")]
        rounds: usize,

        #[arg(long, default_value = "neon")]
        seed: String,

        /// Stake per round; defaults to the game minimum
        #[arg(long)]
        stake: Option<f64>,

        #[arg(long, default_value = "1.5")]
        cash_at: f64,

        #[arg(long, default_value = "3")]
        reveals: usize,

        /// Case to open when simulating cases
        #[arg(long, default_value = "Бомж")]
        case: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CoinAction {
    Tap,
    Upgrade,
    Withdraw,
    Bonus,
}

#[tokio::main]
async fn main() -> CasinoResult<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "neon_casino=debug" } else { "neon_casino=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_path(path);
    }
    let config = loader.load()?;

    let state_path = cli
        .state
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.storage.state_path));

    match cli.command {
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config).map_err(|e| {
                ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e))
            })?;
            println!("{}", rendered);
        }
        Commands::Simulate {
            game,
            rounds,
            seed,
            stake,
            cash_at,
            reveals,
            case,
        } => {
            let strategy = match game {
                GameType::Crash => Strategy::Crash {
                    stake: stake.unwrap_or(config.crash.min_stake),
                    cash_at,
                },
                GameType::Mines => Strategy::Mines {
                    stake: stake.unwrap_or(config.mines.min_stake),
                    reveals,
                },
                GameType::CoinFlip => Strategy::CoinFlip {
                    stake: stake.unwrap_or(config.coinflip.min_stake),
                },
                GameType::Case => Strategy::Case { name: case },
            };

            let report = simulate(&strategy, rounds, &seed, &config)?;
            println!(
                "Simulation: {} x {} (seed {})",
                report.game_type, report.rounds, report.seed
            );
            println!("   Win rate:   {:.2}%", report.win_rate * 100.0);
            println!("   Wagered:    {:.2}", report.wagered);
            println!("   Paid out:   {:.2}", report.paid_out);
            println!("   RTP:        {:.2}%", report.rtp * 100.0);
            println!("   House edge: {:.2}%", report.house_edge * 100.0);
        }
        command => {
            let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&state_path)?);
            let casino = Casino::open(config, store.clone())?;
            play(&casino, store, command).await?;
            println!("Balance: {:.2}", casino.balance());
        }
    }

    Ok(())
}

async fn play(
    casino: &Casino,
    store: Arc<dyn KeyValueStore>,
    command: Commands,
) -> CasinoResult<()> {
    match command {
        Commands::Balance => {}
        Commands::OpenCase { name } => {
            let opening = casino.open_case_revealed(&name).await?;
            let note = if opening.fallback { " (fallback)" } else { "" };
            println!(
                "{}: paid {:.2}, won {:.2}{}",
                opening.case_name, opening.price, opening.payout, note
            );
        }
        Commands::Coinflip { call, stake } => {
            let result = casino.play_coinflip_revealed(call, stake).await?;
            let verdict = if result.won { "won" } else { "lost" };
            println!(
                "Called {}, landed {}: {} {:.2}",
                result.call, result.outcome, verdict, result.settlement.payout
            );
        }
        Commands::Crash { stake, cash_at } => {
            let handle = casino.spawn_crash(stake)?;
            let mut multiplier = handle.watch();
            loop {
                if *multiplier.borrow_and_update() + 1e-9 >= cash_at {
                    // Err here means the round crashed first; finish_crash reports it
                    let _ = handle.cash_out().await;
                    break;
                }
                if multiplier.changed().await.is_err() {
                    break;
                }
            }

            let (round, settlement) = casino.finish_crash(handle).await?;
            println!(
                "Crash {} at {:.2}x (crash point {:.2}x): payout {:.2}",
                round.state.as_str(),
                round.multiplier,
                round.crash_point.unwrap_or_default(),
                settlement.payout
            );
        }
        Commands::Mines { stake, reveals } => {
            let id = casino.start_mines(stake)?;
            let mut picker = ThreadRandom::new();
            let mut finished = false;

            for _ in 0..reveals {
                let Some(view) = casino.mines_session(id) else {
                    break;
                };
                let hidden = view.hidden();
                let index = hidden[picker.draw_index(hidden.len())];

                match casino.reveal_cell(id, index)? {
                    Reveal::Safe { multiplier } => {
                        println!("Cell {}: safe, {:.1}x", index, multiplier)
                    }
                    Reveal::Cleared(settlement) => {
                        println!("Cell {}: board cleared, payout {:.2}", index, settlement.payout);
                        finished = true;
                        break;
                    }
                    Reveal::Mine => {
                        println!("Cell {}: mine", index);
                        finished = true;
                        break;
                    }
                    Reveal::Ignored => {}
                }
            }

            if !finished {
                let settlement = casino.mines_cash_out(id)?;
                println!("Cashed out {:.2}", settlement.payout);
            }
        }
        Commands::Tap { upgrade } => {
            let wallet = casino.wallet();
            if upgrade {
                let power = wallet.upgrade_tap()?;
                println!("Tap power: {}", power);
            } else {
                wallet.tap()?;
            }
        }
        Commands::Coins { action } => {
            let mut game = TapGame::load(store, casino.config().tap.clone())?;
            let wallet = casino.wallet().as_ref();
            match action {
                CoinAction::Tap => {
                    game.tap()?;
                }
                CoinAction::Upgrade => {
                    game.upgrade(wallet)?;
                }
                CoinAction::Withdraw => {
                    game.withdraw(wallet)?;
                }
                CoinAction::Bonus => {
                    if !game.claim_subscription_bonus()? {
                        println!("Bonus already claimed");
                    }
                }
            }
            println!("Coins: {} (power {})", game.coins(), game.power());
        }
        Commands::Config | Commands::Simulate { .. } => {}
    }
    Ok(())
}
