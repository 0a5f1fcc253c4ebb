pub mod api;
pub mod autosave;
pub mod clock;
pub mod config;
mod error;
pub mod plan;
pub mod recovery;

pub use api::{HttpPlanApi, PlanApi};
pub use autosave::{AutosaveController, SaveOutcome, UiEvent};
pub use config::AutosaveConfig;
pub use error::AutosaveError;
pub use plan::{FormState, PlanSnapshot};

/// Install a fmt subscriber filtered by `RUST_LOG`, defaulting to `info`.
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
