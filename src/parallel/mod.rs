pub mod pool;
pub mod soak;

pub use pool::WorkerPool;
pub use soak::{run_soak, SoakResult, SoakSummary};
