pub mod futures_contract;
pub mod roll;

pub use futures_contract::{round_to_tick, FuturesContract};
pub use roll::{ContractMonth, MonthCode, RollResolver};
