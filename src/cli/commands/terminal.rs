use anyhow::Result;

use crate::cli::ModelArgs;
use crate::llm;
use crate::transport::terminal::TerminalRepl;
use crate::ui::Palette;

pub async fn run_terminal(model: &ModelArgs) -> Result<()> {
    let config = super::resolve(&super::base_options(model))?;
    let palette = Palette::from_settings(&config.style)?;

    tracing::debug!(
        model = config.model.key(),
        personality = %config.personality_name,
        streaming = config.streaming,
        "starting terminal"
    );

    let loader = llm::loader(config.model_settings());
    let mut repl = TerminalRepl::new(config.model, loader, palette)?;
    repl.run().await
}
