//! Interactive terminal front end.
//!
//! The terminal owns a single implicit session. Each line read from the
//! prompt is either a command or a message; a message's turn is drained
//! while it is being produced, so streamed output appears as it arrives.

/// Command parsing and autocomplete.
pub mod command;
mod ui;

use anyhow::Result;
use inquire::Text;
use inquire::ui::{Attributes, Color, RenderConfig, StyleSheet, Styled};

use command::{Command, Input, SlashCommandCompleter, parse_input};
use ui::Printer;

use crate::llm::{ModelKind, ModelLoader};
use crate::session::{ClientId, ClientSession};
use crate::stream::Output;
use crate::ui::{Palette, Spinner, is_prompt_cancelled};

/// The terminal REPL.
pub struct TerminalRepl {
    session: ClientSession,
    loader: ModelLoader,
    printer: Printer,
}

impl TerminalRepl {
    /// Loads `kind` and prepares the REPL.
    ///
    /// Fails when the model cannot be loaded, e.g. because the credential is
    /// missing.
    pub fn new(kind: ModelKind, loader: ModelLoader, palette: Palette) -> Result<Self> {
        let model = loader(kind)?;
        Ok(Self {
            session: ClientSession::new(ClientId::terminal(), model),
            loader,
            printer: Printer::new(palette),
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.printer.banner(self.session.model_name());

        loop {
            let Some(line) = read_line().await? else {
                break;
            };

            match parse_input(&line) {
                Input::Empty => {}
                Input::Command(cmd) => {
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                Input::Text(text) => self.converse(&text).await?,
            }
        }

        self.printer.goodbye();
        Ok(())
    }

    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Info => {
                let info = format!("{}: {}", self.session.model_name(), self.session.model_info());
                self.printer.misc(&info);
            }
            Command::Help => self.printer.help(),
            Command::Model(None) => self.printer.error("Usage: /model <name>"),
            Command::Model(Some(name)) => self.switch_model(&name),
            Command::Quit => return false,
            Command::Unknown(cmd) => self.printer.error(&format!("Unknown command: /{cmd}")),
        }
        true
    }

    fn switch_model(&mut self, name: &str) {
        let loaded = ModelKind::from_name(name).and_then(|kind| (self.loader)(kind));
        match loaded {
            Ok(model) => {
                self.session = ClientSession::new(ClientId::terminal(), model);
                let message = format!("Loaded {}", self.session.model_name());
                self.printer.misc(&message);
            }
            Err(err) => {
                tracing::warn!(model = name, error = %err, "failed to switch model");
                self.printer.error(&err.to_string());
            }
        }
    }

    async fn converse(&mut self, text: &str) -> Result<()> {
        self.printer.client_message(text);

        let (submitted, rendered) = tokio::join!(
            self.session.submit(text),
            render_turn(&self.session, &mut self.printer)
        );
        rendered?;
        if let Err(err) = submitted {
            self.printer.error(&err.to_string());
        }
        Ok(())
    }
}

/// Reads one line from the prompt; `None` when the user cancels.
async fn read_line() -> Result<Option<String>> {
    let answer = tokio::task::spawn_blocking(|| {
        Text::new("")
            .with_render_config(render_config())
            .with_autocomplete(SlashCommandCompleter)
            .with_help_message("Type a message, /help for commands, Ctrl+C to quit")
            .prompt()
    })
    .await?;

    match answer {
        Ok(line) => Ok(Some(line)),
        Err(e) if is_prompt_cancelled(&e) => {
            println!();
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn render_config() -> RenderConfig<'static> {
    let prompt_style = Styled::new("❯")
        .with_fg(Color::LightBlue)
        .with_attr(Attributes::BOLD);
    let mut render_config = RenderConfig::default()
        .with_prompt_prefix(prompt_style)
        .with_answered_prompt_prefix(prompt_style);

    render_config.option = StyleSheet::new().with_fg(Color::Grey);
    render_config.selected_option = Some(StyleSheet::new().with_fg(Color::DarkMagenta));
    render_config
}

/// Prints one turn of `session` until its end.
async fn render_turn(session: &ClientSession, printer: &mut Printer) -> Result<()> {
    let mut spinner: Option<Spinner> = None;

    while let Some(outputs) = session.next_outputs().await {
        for output in outputs {
            match output {
                Output::TurnStart => {
                    if session.is_streaming() {
                        printer.open_server();
                    } else {
                        spinner = Some(Spinner::thinking());
                    }
                }
                Output::Plain(text) => {
                    stop_spinner(&mut spinner);
                    printer.open_server();
                    printer.plain(&text)?;
                }
                Output::Markdown(text) => {
                    stop_spinner(&mut spinner);
                    printer.open_server();
                    printer.markdown(&text);
                }
                Output::Error(message) => {
                    stop_spinner(&mut spinner);
                    printer.close_server();
                    printer.error(&message);
                }
                Output::TurnEnd => {
                    stop_spinner(&mut spinner);
                    printer.close_server();
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}

fn stop_spinner(spinner: &mut Option<Spinner>) {
    if let Some(spinner) = spinner.take() {
        spinner.stop();
    }
}
