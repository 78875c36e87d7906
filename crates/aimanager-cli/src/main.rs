use aimanager::agent::Agent;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod configuration;
mod error;
mod session;
mod tools;

use configuration::{Overrides, Settings};
use session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Provider backend (openai, lmstudio, openrouter or custom)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Conversation store (memory, file, sqlite or redis)
    #[arg(long, global = true)]
    memory: Option<String>,

    /// Model to use instead of the provider default
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Agent name, which also namespaces stored conversations
    #[arg(short, long, global = true)]
    agent: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ConversationArgs {
    /// User the conversation belongs to
    #[arg(short, long, default_value = "default")]
    user: String,

    /// Conversation id
    #[arg(short, long)]
    conversation: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat
    Chat {
        #[command(flatten)]
        conversation: ConversationArgs,

        /// Print the reply as it arrives
        #[arg(long)]
        stream: bool,
    },
    /// Send a single prompt and print the reply
    Ask {
        prompt: String,

        #[command(flatten)]
        conversation: ConversationArgs,

        /// Print the reply as it arrives
        #[arg(long)]
        stream: bool,
    },
    /// Print the stored history of a conversation
    History {
        #[command(flatten)]
        conversation: ConversationArgs,

        /// Include the system prompt
        #[arg(long)]
        system: bool,
    },
    /// Delete the stored history of a conversation
    Clear {
        #[command(flatten)]
        conversation: ConversationArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = Overrides {
        agent: cli.agent,
        provider: cli.provider,
        memory: cli.memory,
        model: cli.model,
    };
    let agent = build_agent(&overrides).await?;

    match cli.command {
        Command::Chat {
            conversation,
            stream,
        } => {
            let conversation_id = conversation
                .conversation
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let mut session =
                Session::new(agent, conversation.user, Some(conversation_id), stream);
            session.start().await?;
        }
        Command::Ask {
            prompt,
            conversation,
            stream,
        } => {
            let session = Session::new(agent, conversation.user, conversation.conversation, stream);
            session.headless(&prompt).await?;
        }
        Command::History {
            conversation,
            system,
        } => {
            let messages = agent
                .get_conversation(
                    &conversation.user,
                    conversation.conversation.as_deref(),
                    system,
                )
                .await?;
            session::print_messages(&messages)?;
            agent.close().await?;
        }
        Command::Clear { conversation } => {
            let removed = agent
                .clear_conversation(&conversation.user, conversation.conversation.as_deref())
                .await?;
            if removed {
                println!("{}", style("Conversation cleared.").dim());
            } else {
                println!("{}", style("No stored conversation.").dim());
            }
            agent.close().await?;
        }
    }
    Ok(())
}

async fn build_agent(overrides: &Overrides) -> Result<Agent> {
    let settings = Settings::new(overrides)?;
    let (agent_config, provider_config, store_config) = settings.into_agent_config()?;
    let mut agent = Agent::from_config(agent_config, Some(provider_config), store_config).await?;
    tools::register_builtin_tools(&mut agent)?;
    Ok(agent)
}
