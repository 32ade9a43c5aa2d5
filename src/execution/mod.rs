pub mod poller;
pub mod runner;

pub use poller::{PollOutcome, PollPolicy, StatusClass};
pub use runner::ExecutionRunner;
