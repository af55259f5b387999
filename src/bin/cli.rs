//! Ignite CLI Client
//!
//! Command-line interface for cache management and key-value access.

use std::num::ParseIntError;
use std::str::ParseBoolError;

use clap::{Parser, Subcommand, ValueEnum};
use ignite_client::cache::CacheConfigurationRefs;
use ignite_client::{Client, ClientConfig, IgniteError, Result, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// Ignite thin-client CLI
#[derive(Parser, Debug)]
#[command(name = "ignite-cli")]
#[command(about = "CLI for the Ignite binary thin-client protocol")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "10800")]
    port: u16,

    /// Network family (tcp, tcp4, tcp6)
    #[arg(short, long, default_value = "tcp")]
    network: String,

    /// Dial timeout in milliseconds
    #[arg(long, default_value = "5000")]
    connect_timeout_ms: u64,

    /// How keys and values given on the command line are encoded
    #[arg(short = 't', long, value_enum, default_value = "string")]
    value_type: ValueType,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List cache names
    Caches,

    /// Create a cache
    Create {
        name: String,

        /// Succeed if the cache already exists
        #[arg(long)]
        if_missing: bool,

        /// Number of backups
        #[arg(long)]
        backups: Option<i32>,
    },

    /// Destroy a cache
    Destroy { name: String },

    /// Get a value by key
    Get { cache: String, key: String },

    /// Put a key-value pair
    Put {
        cache: String,
        key: String,
        value: String,
    },

    /// Show a cache's configuration
    Config { name: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ValueType {
    String,
    Int,
    Long,
    Bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ignite_client=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = ClientConfig::builder()
        .network(&args.network)
        .host(&args.host)
        .port(args.port)
        .connect_timeout_ms(args.connect_timeout_ms)
        .build();

    let client = match Client::connect(config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to connect: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = run(&client, &args);
    if let Err(e) = client.close() {
        tracing::warn!("Error closing connection: {}", e);
    }

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(client: &Client, args: &Args) -> Result<()> {
    match &args.command {
        Commands::Caches => {
            for name in client.cache_get_names()? {
                println!("{}", name);
            }
        }
        Commands::Create {
            name,
            if_missing,
            backups,
        } => {
            let mut refs = CacheConfigurationRefs::new(name.as_str());
            refs.backups = *backups;
            if *if_missing {
                client.cache_get_or_create_with_configuration(&refs)?;
            } else {
                client.cache_create_with_configuration(&refs)?;
            }
            println!("OK");
        }
        Commands::Destroy { name } => {
            client.cache_destroy(name)?;
            println!("OK");
        }
        Commands::Get { cache, key } => {
            let key = parse_value(key, args.value_type)?;
            match client.cache_get(cache, false, &key)? {
                Value::Null => println!("(nil)"),
                value => println!("{}", value),
            }
        }
        Commands::Put { cache, key, value } => {
            let key = parse_value(key, args.value_type)?;
            let value = parse_value(value, args.value_type)?;
            client.cache_put(cache, false, &key, &value)?;
            println!("OK");
        }
        Commands::Config { name } => {
            let config = client.cache_get_configuration(name, 0)?;
            println!("{:#?}", config);
        }
    }
    Ok(())
}

fn parse_value(raw: &str, kind: ValueType) -> Result<Value> {
    let invalid = |e: String| IgniteError::Config(format!("{:?}: {}", raw, e));
    Ok(match kind {
        ValueType::String => Value::from(raw),
        ValueType::Int => Value::Int(
            raw.parse()
                .map_err(|e: ParseIntError| invalid(e.to_string()))?,
        ),
        ValueType::Long => Value::Long(
            raw.parse()
                .map_err(|e: ParseIntError| invalid(e.to_string()))?,
        ),
        ValueType::Bool => Value::Bool(
            raw.parse()
                .map_err(|e: ParseBoolError| invalid(e.to_string()))?,
        ),
    })
}
