//! Converter CLI
//!
//! Command-line interface for the Currency Converter API.

use anyhow::Result;
use clap::{Parser, Subcommand};

use converter_client::ConverterClient;
use converter_types::{ConverterId, CurrencyCode};

#[derive(Parser)]
#[command(name = "converter")]
#[command(author, version, about = "Currency Converter API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the Converter API
    #[arg(
        long,
        env = "CONVERTER_API_URL",
        default_value = "http://localhost:3000"
    )]
    api_url: String,

    /// API key for authentication
    #[arg(long, env = "CONVERTER_API_KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Converter operations
    Converter {
        #[command(subcommand)]
        action: ConverterCommands,
    },
    /// Convert an amount with stored rates
    Convert {
        /// Base currency (GBP, USD, EUR, CNY)
        #[arg(long)]
        from: String,
        /// Target currency
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: i64,
    },
    /// User management
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Bootstrap the first user and API key
    Bootstrap {
        /// Email of the first (staff) user
        #[arg(long)]
        email: String,
    },
    /// List supported currencies
    Currencies,
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum ConverterCommands {
    /// Create a converter for a base currency
    Create {
        /// Base currency (GBP, USD, EUR, CNY)
        code: String,
        #[arg(long)]
        title: String,
        /// Owner email; must be the caller's own email
        #[arg(long)]
        user: String,
    },
    /// Get converter details and rates
    Get {
        /// Converter ID (UUID)
        id: String,
    },
    /// Refresh a converter's rates
    Update {
        /// Converter ID (UUID)
        id: String,
        /// The converter's own currency code
        #[arg(long)]
        code: String,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a user and print their API key (staff only)
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        staff: bool,
    },
    /// Show the user the API key belongs to
    Me,
}

fn parse_converter_id(s: &str) -> Result<ConverterId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid converter ID: {}", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = ConverterClient::new(&cli.api_url);
    if let Some(key) = cli.api_key {
        client = client.with_api_key(key);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Currencies => {
            for code in CurrencyCode::all() {
                println!("{} {} {}", code, code.symbol(), code.display_name());
            }
        }

        Commands::Converter { action } => match action {
            ConverterCommands::Create { code, title, user } => {
                let converter = client.create_converter(&title, &code, &user).await?;
                println!("{}", serde_json::to_string_pretty(&converter)?);
            }
            ConverterCommands::Get { id } => {
                let converter = client.get_converter(parse_converter_id(&id)?).await?;
                println!("{}", serde_json::to_string_pretty(&converter)?);
            }
            ConverterCommands::Update { id, code } => {
                let converter = client
                    .update_converter(parse_converter_id(&id)?, &code)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&converter)?);
            }
        },

        Commands::Convert { from, to, amount } => {
            let result = client.convert(&from, &to, amount).await?;
            println!("{}", result.converter);
        }

        Commands::User { action } => match action {
            UserCommands::Create { email, staff } => {
                let issued = client.create_user(&email, staff).await?;
                println!("{}", issued.api_key);
            }
            UserCommands::Me => {
                let user = client.me().await?;
                println!("{}", serde_json::to_string_pretty(&user)?);
            }
        },

        Commands::Bootstrap { email } => {
            let issued = client.bootstrap(&email).await?;
            println!("{}", issued.message);
            println!("{}", issued.api_key);
        }
    }

    Ok(())
}
