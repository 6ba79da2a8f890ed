//! Weather controller: discovers effect instances by name, groups them into
//! effect categories, and switches which categories run on a randomized timer.

pub mod category;
pub mod config;
pub mod error;
pub mod registry;
pub mod report;
pub mod state_machine;

pub use category::*;
pub use config::WeatherConfig;
pub use error::WeatherError;
pub use registry::*;
pub use report::WeatherReport;
pub use state_machine::*;
