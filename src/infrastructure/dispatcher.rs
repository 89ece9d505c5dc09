use crate::config::IntakeConfig;
use crate::services::dispatcher::ProcessDispatcher;
use std::sync::Arc;
use tracing::{info, warn};

pub fn setup_dispatcher(config: &IntakeConfig) -> Arc<ProcessDispatcher> {
    let dispatcher = ProcessDispatcher::from_config(config);

    info!(
        "👷 Worker command: {:?} (cwd: {})",
        config.worker_command,
        dispatcher.working_dir().display()
    );

    // Not fatal: uploads still succeed, each launch failure is logged
    if !dispatcher.working_dir().is_dir() {
        warn!(
            "⚠️  Worker project root {} does not exist; worker launches will fail",
            dispatcher.working_dir().display()
        );
    }

    Arc::new(dispatcher)
}
