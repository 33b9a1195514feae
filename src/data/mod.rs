pub mod bar;
pub mod cache;
pub mod loader;
pub mod resample;

pub use bar::{Bar, BarError};
pub use cache::{BarCache, Fingerprint};
pub use loader::{load_csv, load_csv_cached, prepare_bars, read_bars, DataError, LoadOptions};
pub use resample::resample;
