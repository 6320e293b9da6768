//! `hlb` command-line client.
//!
//! ```text
//!   flags / HLB_* env / --config file
//!         │
//!         ▼
//!   ClientConfig ──▶ HlbClient::connect ──▶ identity (STS) ──▶ credentials cache/store
//!         │                 │
//!         │                 ▼
//!         │           transport (429 retry) ──▶ HLB API
//!         │                 │
//!         ▼                 ▼
//!   Ctrl-C ──▶ cancel ──▶ reconcile (wait for active / deleted)
//! ```

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;

use hlb_client::api::{
    HlbClient, Listener, ListenerCreate, ListenerUpdate, LoadBalancer, LoadBalancerCreate,
    LoadBalancerUpdate,
};
use hlb_client::config::loader::{apply_env_overrides, load_config};
use hlb_client::config::ClientConfig;
use hlb_client::lifecycle::signals::spawn_ctrl_c_handler;
use hlb_client::lifecycle::Shutdown;
use hlb_client::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "hlb")]
#[command(about = "Manage HLB load balancers and listeners", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// HLB API key (falls back to HLB_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// AWS region
    #[arg(long, global = true)]
    region: Option<String>,

    /// AWS partition
    #[arg(long, global = true)]
    partition: Option<String>,

    /// AWS shared config profile for base credentials (falls back to AWS_PROFILE)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = Output::Text)]
    output: Output,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List load balancers
    ListLoadBalancers {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        next_token: Option<String>,
    },
    /// Show one load balancer
    GetLoadBalancer {
        #[arg(long)]
        id: String,
    },
    /// Create a load balancer and wait until it is active
    CreateLoadBalancer(CreateLoadBalancerArgs),
    /// Update a load balancer and wait until it is active
    UpdateLoadBalancer {
        #[arg(long)]
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// JSON file with the update payload
        #[arg(long)]
        input_json: Option<PathBuf>,
    },
    /// Delete a load balancer and wait until it is gone
    DeleteLoadBalancer {
        #[arg(long)]
        id: String,
    },
    /// List listeners of a load balancer
    ListListeners {
        #[arg(long)]
        load_balancer_id: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        next_token: Option<String>,
    },
    /// Show one listener
    GetListener {
        #[arg(long)]
        load_balancer_id: String,
        #[arg(long)]
        listener_id: String,
    },
    /// Create a listener
    CreateListener(CreateListenerArgs),
    /// Update a listener
    UpdateListener {
        #[arg(long)]
        load_balancer_id: String,
        #[arg(long)]
        listener_id: String,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        protocol: Option<String>,
        #[arg(long)]
        target_group_arn: Option<String>,
        /// JSON file with the update payload
        #[arg(long)]
        input_json: Option<PathBuf>,
    },
    /// Delete a listener
    DeleteListener {
        #[arg(long)]
        load_balancer_id: String,
        #[arg(long)]
        listener_id: String,
    },
}

#[derive(Args)]
struct CreateLoadBalancerArgs {
    /// JSON file with the full create payload; other flags are ignored
    #[arg(long)]
    input_json: Option<PathBuf>,
    #[arg(short, long, required_unless_present = "input_json")]
    name: Option<String>,
    #[arg(short, long, value_delimiter = ',', required_unless_present = "input_json")]
    subnets: Vec<String>,
    #[arg(short = 'g', long, value_delimiter = ',')]
    security_groups: Vec<String>,
    #[arg(short, long)]
    internal: bool,
    #[arg(short = 't', long, default_value = "ipv4")]
    ip_address_type: String,
    #[arg(long, default_value = "lb-standard")]
    ec2_iam_role: String,
    #[arg(long, required_unless_present = "input_json")]
    zone_id: Option<String>,
    #[arg(long, required_unless_present = "input_json")]
    zone_name: Option<String>,
}

#[derive(Args)]
struct CreateListenerArgs {
    #[arg(long)]
    load_balancer_id: String,
    /// JSON file with the full create payload; other flags are ignored
    #[arg(long)]
    input_json: Option<PathBuf>,
    #[arg(long, required_unless_present = "input_json")]
    port: Option<u16>,
    #[arg(long, required_unless_present = "input_json")]
    protocol: Option<String>,
    #[arg(long, required_unless_present = "input_json")]
    target_group_arn: Option<String>,
    #[arg(long)]
    certificate_secrets_name: Option<String>,
    #[arg(long)]
    alpn_policy: Option<String>,
    #[arg(long)]
    enable_deletion_protection: bool,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = build_config(&cli)?;
    let level = if cli.debug {
        "debug"
    } else {
        config.observability.log_level.as_str()
    };
    init_logging(level, config.observability.json);

    let shutdown = Shutdown::new();
    spawn_ctrl_c_handler(shutdown.clone());
    let cancel = shutdown.token();

    let client = HlbClient::connect(config).await?;
    let output = cli.output;

    match cli.command {
        Commands::ListLoadBalancers { limit, next_token } => {
            let page = client
                .list_load_balancers(&cancel, Some(limit), next_token.as_deref())
                .await?;
            if output == Output::Json {
                return print_json(&page);
            }
            print_load_balancers(&page.items);
            if let Some(token) = page.next() {
                println!("\nUse --next-token {} to get the next page", token);
            }
        }
        Commands::GetLoadBalancer { id } => {
            let lb = client.get_load_balancer(&cancel, &id).await?;
            if output == Output::Json {
                return print_json(&lb);
            }
            print_load_balancers(std::slice::from_ref(&lb));
        }
        Commands::CreateLoadBalancer(args) => {
            let input = match &args.input_json {
                Some(path) => read_json::<LoadBalancerCreate>(path)?,
                None => LoadBalancerCreate {
                    name: args.name,
                    subnets: args.subnets,
                    security_groups: args.security_groups,
                    internal: args.internal,
                    ip_address_type: Some(args.ip_address_type),
                    ec2_iam_role: Some(args.ec2_iam_role),
                    zone_id: args.zone_id,
                    zone_name: args.zone_name,
                    ..Default::default()
                },
            };
            let lb = client.create_load_balancer(&cancel, &input).await?;
            if output == Output::Json {
                return print_json(&lb);
            }
            println!("Created load balancer: {} (ID: {})", lb.name, lb.id);
        }
        Commands::UpdateLoadBalancer {
            id,
            name,
            input_json,
        } => {
            let input = match &input_json {
                Some(path) => read_json::<LoadBalancerUpdate>(path)?,
                None => LoadBalancerUpdate {
                    name,
                    ..Default::default()
                },
            };
            let lb = client.update_load_balancer(&cancel, &id, &input).await?;
            if output == Output::Json {
                return print_json(&lb);
            }
            println!("Updated load balancer: {} (ID: {})", lb.name, lb.id);
        }
        Commands::DeleteLoadBalancer { id } => {
            client.delete_load_balancer(&cancel, &id).await?;
            if output == Output::Json {
                return print_json(&serde_json::json!({ "status": "deleted" }));
            }
            println!("Deleted load balancer: {}", id);
        }
        Commands::ListListeners {
            load_balancer_id,
            limit,
            next_token,
        } => {
            let page = client
                .list_listeners(&cancel, &load_balancer_id, Some(limit), next_token.as_deref())
                .await?;
            if output == Output::Json {
                return print_json(&page);
            }
            print_listeners(&page.items);
            if let Some(token) = page.next() {
                println!("\nUse --next-token {} to get the next page", token);
            }
        }
        Commands::GetListener {
            load_balancer_id,
            listener_id,
        } => {
            let listener = client
                .get_listener(&cancel, &load_balancer_id, &listener_id)
                .await?;
            if output == Output::Json {
                return print_json(&listener);
            }
            print_listeners(std::slice::from_ref(&listener));
        }
        Commands::CreateListener(args) => {
            let input = match &args.input_json {
                Some(path) => read_json::<ListenerCreate>(path)?,
                None => ListenerCreate {
                    port: args.port.unwrap_or_default(),
                    protocol: args.protocol.unwrap_or_default(),
                    target_group_arn: args.target_group_arn.unwrap_or_default(),
                    certificate_secrets_name: args.certificate_secrets_name,
                    alpn_policy: args.alpn_policy,
                    enable_deletion_protection: args.enable_deletion_protection,
                    ..Default::default()
                },
            };
            let listener = client
                .create_listener(&cancel, &args.load_balancer_id, &input)
                .await?;
            if output == Output::Json {
                return print_json(&listener);
            }
            println!("Created listener: {} (port {})", listener.id, listener.port);
        }
        Commands::UpdateListener {
            load_balancer_id,
            listener_id,
            port,
            protocol,
            target_group_arn,
            input_json,
        } => {
            let input = match &input_json {
                Some(path) => read_json::<ListenerUpdate>(path)?,
                None => ListenerUpdate {
                    port,
                    protocol,
                    target_group_arn,
                    ..Default::default()
                },
            };
            let listener = client
                .update_listener(&cancel, &load_balancer_id, &listener_id, &input)
                .await?;
            if output == Output::Json {
                return print_json(&listener);
            }
            println!("Updated listener: {} (port {})", listener.id, listener.port);
        }
        Commands::DeleteListener {
            load_balancer_id,
            listener_id,
        } => {
            client
                .delete_listener(&cancel, &load_balancer_id, &listener_id)
                .await?;
            if output == Output::Json {
                return print_json(&serde_json::json!({ "status": "deleted" }));
            }
            println!("Deleted listener: {}", listener_id);
        }
    }

    Ok(())
}

/// File values, overridden by flags; the environment only fills fields
/// both leave unset.
fn build_config(cli: &Cli) -> CliResult<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    if let Some(api_key) = &cli.api_key {
        config.api_key = api_key.clone();
    }
    if let Some(region) = &cli.region {
        config.region = region.clone();
    }
    if let Some(partition) = &cli.partition {
        config.partition = partition.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = Some(endpoint.clone());
    }
    if let Some(profile) = &cli.profile {
        config.identity.profile = Some(profile.clone());
    }
    apply_env_overrides(&mut config);

    if config.api_key.is_empty() {
        return Err(
            "HLB API key is required. Set it using --api-key flag or HLB_API_KEY environment variable"
                .into(),
        );
    }
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read input JSON file {}: {}", path.display(), e))?;
    serde_json::from_str(&data).map_err(|e| format!("failed to parse input JSON: {}", e).into())
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_load_balancers(items: &[LoadBalancer]) {
    let rows: Vec<[String; 4]> = items
        .iter()
        .map(|lb| {
            [
                lb.id.clone(),
                lb.name.clone(),
                lb.dns_name.clone(),
                lb.state.to_string(),
            ]
        })
        .collect();
    print_table(["ID", "NAME", "DNS NAME", "STATE"], &rows);
}

fn print_listeners(items: &[Listener]) {
    let rows: Vec<[String; 4]> = items
        .iter()
        .map(|l| {
            [
                l.id.clone(),
                l.port.to_string(),
                l.protocol.clone(),
                l.target_group_arn.clone(),
            ]
        })
        .collect();
    print_table(["ID", "PORT", "PROTOCOL", "TARGET GROUP ARN"], &rows);
}

fn print_table<const N: usize>(header: [&str; N], rows: &[[String; N]]) {
    let mut widths = header.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", line(header.to_vec()));
    for row in rows {
        println!("{}", line(row.iter().map(String::as_str).collect()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("hlb").chain(args.iter().copied()))
    }

    #[test]
    fn test_file_values_are_not_replaced_by_environment() {
        let file = config_file(
            "api_key = \"from-file\"\nregion = \"eu-west-1\"\n\n[identity]\nprofile = \"file-profile\"\n",
        );
        let path = file.path().to_str().unwrap();

        let config = build_config(&parse(&["--config", path, "list-load-balancers"])).unwrap();
        assert_eq!(config.api_key, "from-file");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.identity.profile.as_deref(), Some("file-profile"));
    }

    #[test]
    fn test_flags_override_file_values() {
        let file = config_file("api_key = \"from-file\"\nregion = \"eu-west-1\"\n");
        let path = file.path().to_str().unwrap();

        let config = build_config(&parse(&[
            "--config",
            path,
            "--api-key",
            "from-flag",
            "--region",
            "us-west-2",
            "--profile",
            "dev",
            "list-load-balancers",
        ]))
        .unwrap();
        assert_eq!(config.api_key, "from-flag");
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.identity.profile.as_deref(), Some("dev"));
    }
}
