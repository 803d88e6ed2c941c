use clap::{Parser, Subcommand};

/// Notes API with OAuth2 password and refresh token grants
#[derive(Parser)]
#[command(name = "notes-api", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Port to bind
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Manage OAuth2 clients
    Client {
        #[command(subcommand)]
        command: ClientCommands,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Register a new client; the secret is stored as a bcrypt hash
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        secret: String,
        #[arg(long, default_value = "")]
        redirect_uri: String,
        #[arg(long, default_value = "")]
        extra: String,
    },
    /// List registered clients
    List,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user account
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        firstname: String,
        #[arg(long, default_value = "")]
        lastname: String,
        /// Default scope granted when a token request names none
        #[arg(long, default_value = "")]
        scope: String,
    },
}
