//! Main entry point for the storefront command-line client.
//!
//! Signs in, inspects the session and reads or updates orders against the
//! configured storefront API. Results are printed to stdout as JSON; logs go
//! to stderr.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use storefront_config::Config;
use storefront_core::{StorefrontBuilder, StorefrontClient, StorefrontFactories};
use storefront_types::{OrderStatus, Role, SecretString, SessionEvent, SignInRequest, StorefrontEvent};
use tokio::sync::broadcast;

// Import implementations from individual crates
use storefront_envelope::implementations::aes::create_cipher;
use storefront_storage::implementations::file::create_storage as create_file_storage;
use storefront_storage::implementations::memory::create_storage as create_memory_storage;
use storefront_transport::implementations::http::create_transport;

/// Command-line arguments for the storefront client.
#[derive(Parser, Debug)]
#[command(name = "storefront", author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
	/// Sign in and store the session
	SignIn {
		#[arg(long)]
		email: String,
		#[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
		password: String,
	},
	/// Forget the stored session
	SignOut,
	/// Show the signed-in user
	Me,
	/// Read or update orders
	#[command(subcommand)]
	Orders(OrdersCommand),
	/// Switch the active role
	Role { role: Role },
}

#[derive(Subcommand, Debug, PartialEq)]
enum OrdersCommand {
	/// List your orders, or a workspace's orders
	List {
		#[arg(long)]
		workspace: Option<String>,
	},
	/// Show one order
	Show { id: String },
	/// Move an order to a new status
	SetStatus { id: String, status: OrderStatus },
	/// Cancel an order
	Cancel { id: String },
}

/// Main entry point for the storefront client.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the client and restores the persisted session
/// 5. Runs the requested command and prints its result
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	// Create env filter with default from args
	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();

	// Load configuration
	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.client.id);

	let client = build_client(config)?;
	let mut events = client.subscribe();
	client.initialize().await?;

	let result = run(&client, args.command).await;
	report_invalidation(&mut events);
	let output = result?;

	println!("{}", serde_json::to_string_pretty(&output)?);
	client.shutdown().await?;
	Ok(())
}

/// Runs one command and returns what to print.
async fn run(
	client: &StorefrontClient,
	command: Command,
) -> Result<Value, Box<dyn std::error::Error>> {
	let output = match command {
		Command::SignIn { email, password } => {
			let credentials = SignInRequest::new(email, SecretString::from(password));
			let user = client.auth().sign_in(&credentials).await?;
			json!({ "signedIn": true, "user": user })
		},
		Command::SignOut => {
			client.auth().sign_out().await?;
			json!({ "signedOut": true })
		},
		Command::Me => serde_json::to_value(client.auth().me().await?)?,
		Command::Role { role } => {
			client.auth().switch_role(role).await?;
			json!({ "activeRole": role })
		},
		Command::Orders(command) => {
			let orders = client.orders();
			match command {
				OrdersCommand::List { workspace: Some(workspace) } => {
					serde_json::to_value(orders.list_workspace_orders(&workspace).await?)?
				},
				OrdersCommand::List { workspace: None } => {
					serde_json::to_value(orders.list_orders().await?)?
				},
				OrdersCommand::Show { id } => serde_json::to_value(orders.get_order(&id).await?)?,
				OrdersCommand::SetStatus { id, status } => {
					serde_json::to_value(orders.change_status_by_id(&id, status).await?)?
				},
				OrdersCommand::Cancel { id } => serde_json::to_value(
					orders
						.change_status_by_id(&id, OrderStatus::Cancelled)
						.await?,
				)?,
			}
		},
	};
	Ok(output)
}

/// Tells the user to sign in again when the session was torn down.
fn report_invalidation(events: &mut broadcast::Receiver<StorefrontEvent>) -> bool {
	let mut invalidated = false;
	while let Ok(event) = events.try_recv() {
		if let StorefrontEvent::Session(SessionEvent::Invalidated { reason }) = event {
			eprintln!("Session expired ({}), sign in again", reason);
			invalidated = true;
		}
	}
	invalidated
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the client with all shipped implementations.
///
/// This function wires up the concrete implementations for:
/// - Storage backends (in-memory, file)
/// - Transports (HTTP)
/// - Body ciphers (AES-256-GCM)
fn build_client(config: Config) -> Result<StorefrontClient, Box<dyn std::error::Error>> {
	let builder = StorefrontBuilder::new(config);

	let storage_factories = create_factory_map!(
		storefront_storage::StorageInterface,
		storefront_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	let transport_factories = create_factory_map!(
		storefront_transport::TransportInterface,
		storefront_transport::TransportError,
		"http" => create_transport,
	);

	let cipher_factories = create_factory_map!(
		storefront_envelope::CipherInterface,
		storefront_envelope::EnvelopeError,
		"aes_gcm" => create_cipher,
	);

	let factories = StorefrontFactories {
		storage_factories,
		transport_factories,
		cipher_factories,
	};

	Ok(builder.build(factories)?)
}
