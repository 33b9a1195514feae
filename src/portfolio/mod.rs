pub mod ledger;
pub mod position;
pub mod trade;

pub use ledger::{SymbolPick, SymbolPickLog, TradeLedger};
pub use position::OpenPosition;
pub use trade::{Direction, Trade, TradeResult};
