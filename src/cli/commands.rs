use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "taskbridge")]
#[command(author, version, about = "Configuration-driven MCP bridge for remote task APIs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the configured tools over stdio MCP
    Serve,

    /// List the configured tools
    List,

    /// Validate the tool catalog and exit
    Validate,

    /// Invoke a single tool and print the result
    Call {
        tool: String,

        /// Tool input as a JSON object
        #[arg(short, long, default_value = "{}")]
        input: String,
    },
}
