//! Integration adapter CLI.
//!
//! ```text
//! integration-adapter --config adapters.toml inspect svc.v1
//! integration-adapter --config adapters.toml tls svc.v1
//! integration-adapter --config adapters.toml token svc.v1
//! integration-adapter --config adapters.toml send svc.v1 --path /v1/items
//! integration-adapter --config adapters.toml watch svc.v1 other.v2
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use http::Method;

use integration_adapter::auth::{BearerTokenProvider, SystemClock};
use integration_adapter::client::{AdapterRequest, ClientManager, ReqwestTransport};
use integration_adapter::config::{Auth, ConfigSource, ConfigWatcher, FileConfigStore, MergingConfigSource};
use integration_adapter::observability::logging::init_logging;
use integration_adapter::tls::{create_tls_bundle, KeyStore, StoreEntry};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "integration-adapter")]
#[command(about = "Inspect and exercise hot-reloadable adapter clients", long_about = None)]
struct Cli {
    /// Adapter configuration file (TOML).
    #[arg(short, long, default_value = "adapters.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged configuration of an adapter (secrets masked)
    Inspect { key: String },
    /// List key and trust store entries built from the adapter's PEM settings
    Tls { key: String },
    /// Fetch a bearer token for the adapter
    Token { key: String },
    /// Send one request through the adapter client
    Send {
        key: String,
        #[arg(short, long, default_value = "GET")]
        method: String,
        #[arg(short, long, default_value = "")]
        path: String,
        #[arg(short, long)]
        body: Option<String>,
    },
    /// Rebuild clients for the given keys whenever the file changes
    Watch {
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> CliResult {
    init_logging("integration_adapter=info")?;
    let cli = Cli::parse();

    let store = Arc::new(FileConfigStore::open(&cli.config)?);
    let source = Arc::new(MergingConfigSource::new(store.clone()));

    match cli.command {
        Commands::Inspect { key } => {
            let snapshot = source.fetch(&key)?;
            println!("key:         {}", snapshot.key);
            println!("fingerprint: {}", snapshot.fingerprint());
            println!("refresh:     {}", snapshot.refresh);
            println!("{:#?}", snapshot.properties);
        }
        Commands::Tls { key } => {
            let snapshot = source.fetch(&key)?;
            let bundle = create_tls_bundle(&snapshot.properties.http)?;
            if bundle.is_insecure() {
                println!("peer verification disabled (skip_ssl)");
            }
            println!("protocol: {}", bundle.protocol());
            print_store(bundle.key_store());
            print_store(bundle.trust_store());
        }
        Commands::Token { key } => {
            let snapshot = source.fetch(&key)?;
            let Auth::Bearer(credentials) = snapshot.properties.auth else {
                return Err(format!("adapter '{key}' does not use bearer auth").into());
            };
            let provider = BearerTokenProvider::new(
                &key,
                credentials,
                Arc::new(ReqwestTransport::with_defaults()?),
                Arc::new(SystemClock),
            );
            let token = provider.get_token().await?;
            println!("{token:?}");
        }
        Commands::Send { key, method, path, body } => {
            let manager = ClientManager::new(source)?;
            let client = manager.get_client(&key).await?;
            let method = Method::from_bytes(method.to_uppercase().as_bytes())?;
            let mut request = AdapterRequest::new(method, path);
            if let Some(body) = body {
                request = request.with_body(body);
            }
            let response = client.send(request).await?;
            println!("{} ({} ms)", response.status, response.elapsed.as_millis());
            match response.json::<serde_json::Value>() {
                Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
                Err(_) => println!("{}", response.text()),
            }
        }
        Commands::Watch { keys } => {
            let manager = ClientManager::new(source)?;
            refresh_clients(&manager, &keys).await;

            let (watcher, mut updates) = ConfigWatcher::new(store);
            let _watcher = watcher.run()?;
            loop {
                tokio::select! {
                    Some(path) = updates.recv() => {
                        tracing::info!(path = ?path, "Configuration updated");
                        refresh_clients(&manager, &keys).await;
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Shutdown requested");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

async fn refresh_clients(manager: &ClientManager, keys: &[String]) {
    for key in keys {
        match manager.get_client(key).await {
            Ok(client) => tracing::info!(key = %key, fingerprint = %client.fingerprint(), "Adapter client ready"),
            Err(e) => tracing::error!(key = %key, error = %e, "Adapter client unavailable"),
        }
    }
}

fn print_store(store: Option<&KeyStore>) {
    let Some(store) = store else {
        return;
    };
    println!("{} store ({})", store.name(), store.store_type());
    for entry in store.entries() {
        match entry {
            StoreEntry::PrivateKey { alias, chain, .. } => {
                println!("  key   {alias}");
                for cert in chain {
                    println!("        subject={} issuer={}", cert.subject(), cert.issuer());
                }
            }
            StoreEntry::Certificate { alias, certificate } => {
                println!("  cert  {alias} subject={} issuer={}", certificate.subject(), certificate.issuer());
            }
        }
    }
}
