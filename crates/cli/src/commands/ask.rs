use supportdesk_agent::runtime::AgentRuntime;
use supportdesk_core::domain::turn::Turn;
use uuid::Uuid;

use crate::commands::{build_runtime, load_config, open_migrated_pool, CommandResult};

/// Runs one turn end to end. The outcome `message` carries the turn response as JSON.
pub fn run(session_id: &str, message: &str) -> CommandResult {
    if session_id.trim().is_empty() {
        return CommandResult::failure("ask", "invalid_input", "session must not be blank", 2);
    }

    let config = match load_config("ask") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match build_runtime("ask") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let correlation_id = Uuid::new_v4().to_string();
    let turn = Turn::new(session_id, message);
    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let agent = AgentRuntime::from_config(&config, pool.clone())
            .map_err(|error| ("runtime_init", format!("failed to build http client: {error}"), 3u8))?;
        let response = agent.handle_turn(&turn, &correlation_id).await.map_err(|error| {
            ("turn_failure", format!("{error} (correlation_id: {correlation_id})"), 6u8)
        });
        pool.close().await;
        let response = response?;
        serde_json::to_string(&response)
            .map_err(|error| ("serialization", error.to_string(), 1u8))
    });

    match result {
        Ok(payload) => CommandResult::success("ask", payload),
        Err(failure) => CommandResult::from_step("ask", failure),
    }
}
