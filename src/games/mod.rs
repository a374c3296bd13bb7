pub mod types;
pub mod cases;
pub mod crash;
pub mod crash_driver;
pub mod mines;
pub mod coinflip;
pub mod registry;
pub mod simulation;

pub use types::*;
pub use cases::{open_case, CaseConfig, CaseOpening};
pub use crash::{CrashSession, CrashState, CrashView, Tick};
pub use crash_driver::CrashHandle;
pub use mines::{Cell, MinesSession, MinesState, MinesView, Reveal};
pub use coinflip::CoinflipResult;
pub use registry::SessionRegistry;
