use anyhow::{Context, Result};
use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cloud_info::providers::{OneVariant, OpenNebulaOptions, OpenNebulaProvider, OpenStackOptions, OpenStackProvider};
use cloud_info::{Provider, StaticProvider, collect};

#[derive(Parser)]
#[command(name = "cloud-info-provider")]
#[command(version)]
#[command(about = "Publish the compute offer of an OpenStack or OpenNebula site as JSON records")]
struct Cli {
    #[arg(long, value_enum, default_value = "openstack")]
    provider: ProviderKind,

    /// JSON file with static defaults, endpoints and shares.
    #[arg(long)]
    static_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "pretty")]
    format: OutputFormat,

    #[command(flatten)]
    openstack: OpenStackArgs,

    #[command(flatten)]
    opennebula: OpenNebulaArgs,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProviderKind {
    Openstack,
    Opennebula,
    Opennebularocci,
    Indigoon,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Args)]
struct OpenStackArgs {
    #[arg(long, env = "OS_USERNAME")]
    os_username: Option<String>,

    #[arg(long, env = "OS_PASSWORD", hide_env_values = true)]
    os_password: Option<String>,

    #[arg(long, env = "OS_TENANT_NAME")]
    os_tenant_name: Option<String>,

    #[arg(long, env = "OS_AUTH_URL")]
    os_auth_url: Option<String>,

    /// CA bundle used to verify the Keystone and Nova certificates.
    #[arg(long, env = "OS_CACERT")]
    os_cacert: Option<PathBuf>,

    #[arg(long, env = "NOVACLIENT_INSECURE")]
    insecure: bool,

    /// Use flavor names in template ids, as OCCI-OS does.
    #[arg(long)]
    legacy_occi_os: bool,

    #[arg(long)]
    no_probe_endpoints: bool,

    /// Seconds to wait for an endpoint version probe.
    #[arg(long, default_value_t = 10)]
    probe_timeout: u64,
}

#[derive(Args)]
struct OpenNebulaArgs {
    #[arg(long, env = "ON_AUTH", hide_env_values = true)]
    on_auth: Option<String>,

    #[arg(long, env = "ON_RPCXML_ENDPOINT", default_value = "http://localhost:2633/RPC2")]
    on_rpcxml_endpoint: Option<String>,

    /// Only publish images registered by cloudkeeper or vmcatcher.
    #[arg(long, visible_alias = "cloudkeeper-images")]
    vmcatcher_images: bool,

    #[arg(long)]
    rocci_template_dir: Option<PathBuf>,

    /// Read rOCCI resource templates from OpenNebula documents.
    #[arg(long)]
    rocci_remote_templates: bool,
}

impl From<OpenStackArgs> for OpenStackOptions {
    fn from(args: OpenStackArgs) -> Self {
        Self {
            username: args.os_username,
            password: args.os_password,
            tenant_name: args.os_tenant_name,
            auth_url: args.os_auth_url,
            cacert: args.os_cacert,
            insecure: args.insecure,
            legacy_occi_os: args.legacy_occi_os,
            probe_endpoints: !args.no_probe_endpoints,
            probe_timeout: Duration::from_secs(args.probe_timeout),
        }
    }
}

impl From<OpenNebulaArgs> for OpenNebulaOptions {
    fn from(args: OpenNebulaArgs) -> Self {
        Self {
            auth: args.on_auth,
            rpcxml_endpoint: args.on_rpcxml_endpoint,
            cloudkeeper_images: args.vmcatcher_images,
            rocci_template_dir: args.rocci_template_dir,
            rocci_remote_templates: args.rocci_remote_templates,
        }
    }
}

fn load_static(path: Option<&PathBuf>) -> Result<StaticProvider> {
    match path {
        Some(path) => StaticProvider::from_file(path)
            .with_context(|| format!("loading static defaults from {}", path.display())),
        None => Ok(StaticProvider::empty()),
    }
}

async fn build_provider(cli: Cli, static_defaults: StaticProvider) -> Result<Box<dyn Provider>> {
    let variant = match cli.provider {
        ProviderKind::Openstack => {
            let options = OpenStackOptions::from(cli.openstack);
            let provider = OpenStackProvider::connect(&options, static_defaults).await?;
            return Ok(Box::new(provider));
        }
        ProviderKind::Opennebula => OneVariant::OpenNebula,
        ProviderKind::Opennebularocci => OneVariant::Rocci,
        ProviderKind::Indigoon => OneVariant::Indigo,
    };
    let options = OpenNebulaOptions::from(cli.opennebula);
    Ok(Box::new(OpenNebulaProvider::connect(variant, &options, static_defaults)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the JSON document, logs go to stderr
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let format = cli.format;
    let static_defaults = load_static(cli.static_file.as_ref())?;

    let provider = build_provider(cli, static_defaults).await?;
    let info = collect(provider.as_ref())
        .await
        .with_context(|| format!("collecting information from {}", provider.name()))?;

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(&info)?,
        OutputFormat::Pretty => serde_json::to_string_pretty(&info)?,
    };
    println!("{rendered}");
    Ok(())
}
