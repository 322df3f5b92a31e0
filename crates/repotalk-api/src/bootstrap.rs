use crate::config::Config;
use anyhow::Context;
use repotalk_assistant::{AssistantConfig, AssistantId, AssistantService};

/// Load or create the configured assistant and upload its instructions.
///
/// Every failure here is fatal: the service cannot answer anything without a
/// configured assistant.
pub async fn init_assistant(config: &Config, assistants: &AssistantService) -> anyhow::Result<AssistantId> {
    let section = &config.assistant;
    let assistant_config = AssistantConfig::from(section);

    let id = assistants
        .load_or_create_assistant(&assistant_config, section.recreate)
        .await
        .with_context(|| format!("Failed to load or create assistant '{}'", section.name))?;

    let instructions = tokio::fs::read_to_string(&section.instructions_path)
        .await
        .with_context(|| {
            format!(
                "Error reading instructions file '{}'",
                section.instructions_path.display()
            )
        })?;

    assistants
        .set_instructions(&id, &instructions)
        .await
        .context("Failed to upload assistant instructions")?;

    Ok(id)
}
