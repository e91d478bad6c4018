//! CLI module - Command-line interface for gridwatch

mod commands;

use clap::{Parser, Subcommand};

use crate::entities::users::Role;

/// gridwatch - energy monitoring management API
#[derive(Parser)]
#[command(name = "gridwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "daemon", alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Load demo users, sites, devices, metrics and a subscription
    Seed,

    /// Create an account without going through the API
    CreateUser {
        username: String,

        email: String,

        /// Read from `GRIDWATCH_PASSWORD` when omitted
        #[arg(long, env = "GRIDWATCH_PASSWORD")]
        password: String,

        #[arg(long, default_value = "standard")]
        role: Role,
    },
}

pub use commands::*;
