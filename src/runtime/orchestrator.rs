use anyhow::Result;
use colored::Colorize;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::{
    agents::{StreamOutcome, StreamingAgent},
    app::Config,
    context::{ContextItem, FileItem, TextItem},
    models::Model,
    session::Session,
    utils::{log_debug, log_error, log_info, log_warn},
};

use super::input::{parse_line, render_items, ReplCommand, HELP_TEXT};

type InputLines = Lines<BufReader<Stdin>>;

/// Interactive line-oriented chat loop
pub struct Orchestrator {
    agent: StreamingAgent,
    session: Session,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn Model>, config: &Config) -> Self {
        Self {
            agent: StreamingAgent::from_config(model, config),
            session: Session::new(),
        }
    }

    /// Run until `/quit`, Ctrl-C at the prompt, or end of input
    pub async fn run(mut self) -> Result<()> {
        println!(
            "{} {}",
            "Mark".bold().cyan(),
            format!("(model: {})", self.agent.model_name()).dimmed()
        );
        println!("{}", "Type /help for commands.".dimmed());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("{} ", ">".green().bold());
            std::io::stdout().flush()?;

            // Once a reply has streamed, SIGINT no longer kills the process,
            // so Ctrl-C at the prompt has to be handled here
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                println!();
                break;
            };

            let command = parse_line(&line);
            log_debug(format!("REPL command: {:?}", command));

            match command {
                ReplCommand::AddText(text) => {
                    let item = ContextItem::from(TextItem::new(text));
                    println!("{} {}", "Added".green(), item.label());
                    self.session.context_mut().add_item(item);
                }
                ReplCommand::AddFile(path) => match FileItem::new(&path) {
                    Ok(item) => {
                        let item = ContextItem::from(item);
                        println!("{} {}", "Added".green(), item.label());
                        self.session.context_mut().add_item(item);
                    }
                    Err(e) => {
                        log_warn("⚠️", &e);
                        println!("{}", e.to_string().red());
                    }
                },
                ReplCommand::Delete(index) => self.delete_item(index),
                ReplCommand::Send => self.submit(&mut lines).await?,
                ReplCommand::List => self.list_items(),
                ReplCommand::Cancel => println!("{}", "Nothing is streaming.".dimmed()),
                ReplCommand::New => {
                    self.agent.cancel_and_wait().await;
                    self.session = Session::new();
                    log_info("🆕", "Started a new session");
                    println!("{}", "Started a new session.".green());
                }
                ReplCommand::Help => println!("{}", HELP_TEXT),
                ReplCommand::Quit => break,
                ReplCommand::Invalid(message) => println!("{}", message.yellow()),
            }
        }

        self.agent.cancel_and_wait().await;
        Ok(())
    }

    fn delete_item(&mut self, index: usize) {
        let context = self.session.context_mut();
        match context.get(index).map(|item| item.label()) {
            Some(label) => {
                context.delete_item(index);
                println!("{} {}", "Removed".green(), label);
            }
            None if context.is_empty() => println!("{}", "The context is empty.".yellow()),
            None => println!(
                "{}",
                format!("No item {}; choose 1-{}.", index + 1, context.len()).yellow()
            ),
        }
    }

    fn list_items(&self) {
        let lines = render_items(self.session.context());
        if lines.is_empty() {
            println!("{}", "The context is empty.".dimmed());
            return;
        }
        for line in lines {
            println!("{}", line);
        }
    }

    /// Stream one reply, printing chunks as they arrive
    ///
    /// Ctrl-C or a typed `/cancel` stops the generation; the partial reply
    /// stays in the session.
    async fn submit(&mut self, lines: &mut InputLines) -> Result<()> {
        if self.session.context().is_empty() {
            println!("{}", "(sending an empty context)".dimmed());
        }

        let mut chunks = self.agent.run(&self.session);
        let generation = chunks.generation();
        let mut stdout = std::io::stdout();
        println!();

        loop {
            tokio::select! {
                chunk = chunks.next() => match chunk {
                    Some(chunk) => {
                        print!("{}", chunk);
                        stdout.flush()?;
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    self.agent.cancel();
                    break;
                }
                line = lines.next_line() => match line? {
                    Some(line) if parse_line(&line) == ReplCommand::Cancel => {
                        self.agent.cancel();
                        break;
                    }
                    Some(_) => {
                        println!("{}", "(streaming; /cancel or Ctrl-C to stop)".dimmed());
                    }
                    None => {
                        self.agent.cancel();
                        break;
                    }
                },
            }
        }
        drop(chunks);
        println!();

        match self.agent.last_outcome() {
            Some(StreamOutcome::Completed) => {
                log_info("✅", format!("Generation {} completed", generation));
            }
            Some(StreamOutcome::Cancelled) => {
                println!("{}", "[cancelled]".yellow());
            }
            Some(StreamOutcome::Failed) => {
                log_error("❌", format!("Generation {} failed", generation));
                println!("{}", "[failed]".red());
            }
            None => {}
        }
        Ok(())
    }
}
