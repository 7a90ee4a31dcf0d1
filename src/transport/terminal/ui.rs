//! Terminal rendering: titled rules around each message, streamed prose
//! written as it arrives, and markdown units through termimad.

use std::io::{self, Write};

use termimad::MadSkin;

use crate::ui::{Palette, Style, rule, terminal_width};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const CLIENT_TITLE: &str = "You";
pub const SERVER_TITLE: &str = "LLM";
pub const ERROR_TITLE: &str = "ERROR";

/// Writes conversation output to stdout.
pub struct Printer {
    palette: Palette,
    skin: MadSkin,
    width: usize,
    /// The cursor sits at the start of a line.
    at_line_start: bool,
    /// An `LLM` rule has been printed and not yet closed.
    server_open: bool,
}

impl Printer {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            skin: MadSkin::default(),
            width: terminal_width(),
            at_line_start: true,
            server_open: false,
        }
    }

    pub fn banner(&mut self, model_name: &str) {
        self.misc(&format!(
            "Welcome to {} {}! Chatting with {}.\n\
             Type a message and press enter. /help lists commands, 'exit' or 'quit' leaves.",
            Style::header("llm-repl"),
            Style::version(format!("v{VERSION}")),
            Style::value(model_name),
        ));
    }

    pub fn client_message(&mut self, message: &str) {
        self.block(Some(CLIENT_TITLE), self.palette.client, |printer| {
            printer.print_markdown(message);
        });
    }

    /// Prints the opening `LLM` rule if it is not already open.
    pub fn open_server(&mut self) {
        if self.server_open {
            return;
        }
        self.line_break();
        println!("{}", rule(Some(SERVER_TITLE), self.palette.server, self.width));
        self.server_open = true;
    }

    pub fn close_server(&mut self) {
        if !self.server_open {
            return;
        }
        self.line_break();
        println!("{}", rule(None, self.palette.server, self.width));
        println!();
        self.server_open = false;
    }

    /// Writes streamed prose immediately.
    pub fn plain(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let mut stdout = io::stdout().lock();
        write!(stdout, "{text}")?;
        stdout.flush()?;
        self.at_line_start = text.ends_with('\n');
        Ok(())
    }

    /// Writes a complete markdown unit on its own lines.
    pub fn markdown(&mut self, text: &str) {
        self.line_break();
        self.print_markdown(text);
    }

    pub fn error(&mut self, message: &str) {
        self.block(Some(ERROR_TITLE), self.palette.error, |printer| {
            println!("{message}");
            printer.at_line_start = true;
        });
    }

    /// Prints a message between untitled rules.
    pub fn misc(&mut self, message: &str) {
        self.block(None, self.palette.misc, |printer| {
            println!("{message}");
            printer.at_line_start = true;
        });
    }

    pub fn help(&mut self) {
        let lines = [
            format!("{}", Style::header("Available commands")),
            format!("  {}            {}", Style::command("/help"), Style::secondary("Show this help")),
            format!("  {}            {}", Style::command("/info"), Style::secondary("Describe the loaded model")),
            format!("  {}    {}", Style::command("/model <name>"), Style::secondary("Load another model")),
            format!("  {}     {}", Style::command("/quit, /exit"), Style::secondary("Exit the REPL")),
        ];
        self.misc(&lines.join("\n"));
    }

    pub fn goodbye(&mut self) {
        self.close_server();
        self.line_break();
        println!();
        println!("{}", rule(None, self.palette.misc, self.width));
    }

    fn block(&mut self, title: Option<&str>, color: owo_colors::AnsiColors, body: impl FnOnce(&mut Self)) {
        self.line_break();
        println!("{}", rule(title, color, self.width));
        body(self);
        self.line_break();
        println!("{}", rule(None, color, self.width));
    }

    fn print_markdown(&mut self, text: &str) {
        print!("{}", self.skin.term_text(text));
        self.at_line_start = true;
    }

    fn line_break(&mut self) {
        if !self.at_line_start {
            println!();
            self.at_line_start = true;
        }
    }
}
