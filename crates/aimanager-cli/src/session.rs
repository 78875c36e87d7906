use aimanager::agent::Agent;
use aimanager::models::message::Message;
use aimanager::models::role::Role;
use anyhow::Result;
use bat::WrappingMode;
use cliclack::{input, spinner};
use console::style;
use futures::StreamExt;
use std::io::{self, Write};

/// What a line typed at the prompt asks for
#[derive(Debug, PartialEq)]
pub enum Command {
    Exit,
    History,
    Clear,
    Message(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "" => Command::Empty,
            "exit" | "quit" => Command::Exit,
            "history" => Command::History,
            "clear" => Command::Clear,
            _ => Command::Message(line.to_string()),
        }
    }
}

pub struct Session {
    agent: Agent,
    user_id: String,
    conversation_id: Option<String>,
    stream: bool,
}

impl Session {
    pub fn new(
        agent: Agent,
        user_id: String,
        conversation_id: Option<String>,
        stream: bool,
    ) -> Self {
        Session {
            agent,
            user_id,
            conversation_id,
            stream,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        println!(
            "{} {}",
            style(format!("Agent {} ready.", self.agent.name())).green(),
            style("Type \"exit\" to end the session, \"history\" or \"clear\" to manage it.").dim()
        );
        if let Some(conversation_id) = &self.conversation_id {
            println!("{}", style(format!("Conversation: {}", conversation_id)).dim());
        }

        loop {
            let line: String = input("Message:").placeholder("").interact()?;
            match Command::parse(&line) {
                Command::Exit => break,
                Command::Empty => continue,
                Command::History => self.print_history().await?,
                Command::Clear => {
                    let removed = self
                        .agent
                        .clear_conversation(&self.user_id, self.conversation_id.as_deref())
                        .await?;
                    if removed {
                        println!("{}", style("Conversation cleared.").dim());
                    } else {
                        println!("{}", style("Nothing to clear.").dim());
                    }
                }
                Command::Message(prompt) => {
                    tokio::select! {
                        result = self.turn(&prompt) => {
                            if let Err(e) = result {
                                eprintln!("{} {}", style("Error:").red(), e);
                            }
                        }
                        _ = tokio::signal::ctrl_c() => {
                            println!("{}", style("Interrupted.").yellow());
                        }
                    }
                }
            }
        }

        self.agent.close().await?;
        Ok(())
    }

    /// One-shot turn without the prompt loop
    pub async fn headless(&self, prompt: &str) -> Result<()> {
        let result = self.turn(prompt).await;
        self.agent.close().await?;
        result
    }

    async fn turn(&self, prompt: &str) -> Result<()> {
        if self.stream {
            let mut fragments = self
                .agent
                .generate_response_stream(prompt, &self.user_id, self.conversation_id.as_deref())
                .await?;
            let mut stdout = io::stdout();
            while let Some(fragment) = fragments.next().await {
                write!(stdout, "{}", fragment?)?;
                stdout.flush()?;
            }
            println!();
        } else {
            let spin = spinner();
            spin.start("awaiting reply");
            let reply = self
                .agent
                .generate_response(prompt, &self.user_id, self.conversation_id.as_deref())
                .await;
            spin.stop("");
            render(&reply?)?;
        }
        Ok(())
    }

    pub async fn print_history(&self) -> Result<()> {
        let messages = self
            .agent
            .get_conversation(&self.user_id, self.conversation_id.as_deref(), false)
            .await?;
        print_messages(&messages)
    }
}

pub fn print_messages(messages: &[Message]) -> Result<()> {
    if messages.is_empty() {
        println!("{}", style("No messages yet.").dim());
    }
    for message in messages {
        let label = match message.role {
            Role::User => style("user".to_string()).cyan(),
            Role::Assistant => style("assistant".to_string()).green(),
            _ => style(message.role.to_string()).dim(),
        };
        println!("{}", label.bold());
        render(&message.content)?;
    }
    Ok(())
}

fn render(content: &str) -> Result<()> {
    bat::PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print()?;
    println!();
    Ok(())
}
