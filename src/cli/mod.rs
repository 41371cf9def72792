// Command Line Interface Module
// Storefront client CLI using clap

pub mod commands;

use clap::{Parser, Subcommand};
use colored::*;
use storefront_sync::config::LogFormat;

/// Storefront - browse products and manage your cart from the terminal
#[derive(Parser)]
#[command(name = "storefront")]
#[command(author = "Storefront Team")]
#[command(version)]
#[command(about = "🛒 Storefront - session-aware cart client for the storefront API", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "storefront.toml")]
    pub config: String,

    /// Override the configured log format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Store(StoreCommand),

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Commands that talk to the storefront API
#[derive(Subcommand)]
pub enum StoreCommand {
    /// Log in and persist the bearer credential
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// Forget the persisted credential
    Logout,

    /// Create a new account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        #[arg(short, long)]
        email: Option<String>,
    },

    /// Show the current identity
    Whoami,

    /// Show the account balance
    Balance,

    /// Top up the account balance
    Recharge {
        amount: f64,
    },

    /// List products
    Products {
        #[arg(long, default_value = "0")]
        page: u32,

        /// Page size (defaults to the configured size)
        #[arg(long)]
        size: Option<u32>,

        /// Sort order (defaults to the configured order)
        #[arg(long)]
        sort: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Show one product
    Product {
        id: u64,
    },

    /// Show stock for one product
    Stock {
        id: u64,
    },

    /// Show the cart
    Cart,

    /// Add a product to the cart
    Add {
        product_id: u64,

        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },

    /// Set the quantity of a cart line
    Update {
        product_id: u64,
        quantity: u32,
    },

    /// Remove a product from the cart
    Remove {
        product_id: u64,
    },

    /// Empty the cart
    Clear,

    /// Pay for the cart with the account balance
    Checkout,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Validate the configuration file
    Validate,
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}

/// Format a money amount
pub fn price(amount: f64) -> String {
    format!("¥{:.2}", amount)
}
