mod advisory;
mod clock;
mod growth;

pub use advisory::{daily_advice, AdvisorySystem};
pub use clock::ClockSystem;
pub use growth::GrowthSystem;
