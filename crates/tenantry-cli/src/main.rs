use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tenantry_cli::{init_tracing, operator_error, parse_org_config, truncate_string};
use tenantry_core::models::{CreateLeadRequest, Lead, LeadStatus, Tenant, TenantStatus};
use tenantry_core::{BaseConfig, NamespaceProvisioner, ProvisionerConfig, TenantStore};
use tenantry_db::{connect, run_migrations, LeadRepository, PgSchemaProvisioner, TenantRepository};
use tenantry_provisioner::{ContainerRuntime, DockerEngine, ProvisioningPipeline, TenantLifecycle};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "tenantry", about = "Provision and manage school tenants", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending control-plane migrations
    Migrate,
    /// Manage inbound leads
    Leads {
        #[command(subcommand)]
        command: LeadCommands,
    },
    /// Manage tenants
    Tenants {
        #[command(subcommand)]
        command: TenantCommands,
    },
}

#[derive(Subcommand)]
enum LeadCommands {
    /// List leads, newest first
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Record a new lead
    Create {
        #[arg(long)]
        school_name: String,
        #[arg(long)]
        contact_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Move a lead to NEW or CONTACTED
    Status { id: Uuid, status: String },
    /// Convert a lead into a DRAFT tenant
    Convert {
        id: Uuid,
        /// Override the subdomain derived from the school name
        #[arg(long)]
        subdomain: Option<String>,
    },
}

#[derive(Subcommand)]
enum TenantCommands {
    /// List tenants, optionally filtered by status
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Show one tenant
    Show { id: Uuid },
    /// Validate and attach an organization config (JSON file)
    AttachConfig { id: Uuid, file: PathBuf },
    /// Run the provisioning pipeline and print the admin credentials
    Deploy { id: Uuid },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            let pool = connect(&BaseConfig::from_env()?).await?;
            run_migrations(&pool).await?;
            tracing::info!("Migrations applied");
            println!("Migrations applied");
        }
        Commands::Leads { command } => {
            let pool = connect(&BaseConfig::from_env()?).await?;
            run_lead_command(LeadRepository::new(pool), command).await?;
        }
        Commands::Tenants { command } => run_tenant_command(command).await?,
    }

    Ok(())
}

async fn run_lead_command(leads: LeadRepository, command: LeadCommands) -> anyhow::Result<()> {
    match command {
        LeadCommands::List { format } => {
            let all = leads.list_leads().await.map_err(operator_error)?;
            match format {
                OutputFormat::Json => print_json(&all)?,
                OutputFormat::Table => print_lead_table(&all),
            }
        }
        LeadCommands::Create {
            school_name,
            contact_name,
            email,
            phone,
            note,
        } => {
            let request = CreateLeadRequest {
                school_name,
                contact_name,
                email,
                phone,
                note,
            };
            let lead = leads.create_lead(&request).await.map_err(operator_error)?;
            print_json(&lead)?;
        }
        LeadCommands::Status { id, status } => {
            let status: LeadStatus = status.parse()?;
            let lead = leads
                .update_status(id, status)
                .await
                .map_err(operator_error)?;
            print_json(&lead)?;
        }
        LeadCommands::Convert { id, subdomain } => {
            let tenant = leads
                .convert_to_tenant(id, subdomain.as_deref())
                .await
                .map_err(operator_error)?;
            tracing::info!(lead_id = %id, tenant_id = %tenant.id, subdomain = %tenant.subdomain, "Lead converted");
            print_json(&tenant)?;
        }
    }
    Ok(())
}

async fn run_tenant_command(command: TenantCommands) -> anyhow::Result<()> {
    match command {
        TenantCommands::List { status, format } => {
            let status = status
                .as_deref()
                .map(str::parse::<TenantStatus>)
                .transpose()?;
            let pool = connect(&BaseConfig::from_env()?).await?;
            let tenants = TenantRepository::new(pool)
                .list_tenants(status)
                .await
                .map_err(operator_error)?;
            match format {
                OutputFormat::Json => print_json(&tenants)?,
                OutputFormat::Table => print_tenant_table(&tenants),
            }
        }
        TenantCommands::Show { id } => {
            let pool = connect(&BaseConfig::from_env()?).await?;
            let tenant = TenantRepository::new(pool)
                .get_tenant_by_id(id)
                .await
                .map_err(operator_error)?
                .with_context(|| format!("Tenant {} not found", id))?;
            print_json(&tenant)?;
        }
        TenantCommands::AttachConfig { id, file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let org_config = parse_org_config(&raw)?;
            tracing::debug!(
                file = %file.display(),
                groups = org_config.groups.len(),
                members = org_config.members.len(),
                "Organization config parsed"
            );
            let lifecycle = build_lifecycle().await?;
            let tenant = lifecycle
                .attach_config(id, &org_config)
                .await
                .map_err(operator_error)?;
            print_json(&tenant)?;
        }
        TenantCommands::Deploy { id } => {
            let lifecycle = build_lifecycle().await?;
            tracing::info!(tenant_id = %id, "Deploying tenant");
            let outcome = lifecycle.deploy(id).await.map_err(operator_error)?;
            tracing::info!(
                tenant_id = %id,
                site_url = %outcome.site_url,
                seed_failures = outcome.report.total_failures(),
                "Tenant deployed"
            );
            print_json(&outcome)?;
        }
    }
    Ok(())
}

async fn build_lifecycle() -> anyhow::Result<TenantLifecycle> {
    let config = ProvisionerConfig::from_env()?;
    let pool = connect(&config.base).await?;

    let store: Arc<dyn TenantStore> = Arc::new(TenantRepository::new(pool.clone()));
    let namespaces: Arc<dyn NamespaceProvisioner> = Arc::new(PgSchemaProvisioner::new(pool));
    let containers: Arc<dyn ContainerRuntime> = Arc::new(
        DockerEngine::new(&config.container).context("Failed to build Docker client")?,
    );

    let pipeline =
        ProvisioningPipeline::new(&config, namespaces, containers).map_err(operator_error)?;
    Ok(TenantLifecycle::new(store, pipeline))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn print_lead_table(leads: &[Lead]) {
    println!(
        "{:<36}  {:<10}  {:<30}  {:<30}",
        "ID", "STATUS", "SCHOOL", "EMAIL"
    );
    for lead in leads {
        println!(
            "{:<36}  {:<10}  {:<30}  {:<30}",
            lead.id,
            lead.status.to_string(),
            truncate_string(&lead.school_name, 30),
            truncate_string(&lead.email, 30)
        );
    }
    println!("{} lead(s)", leads.len());
}

fn print_tenant_table(tenants: &[Tenant]) {
    println!(
        "{:<36}  {:<10}  {:<24}  {:<12}",
        "ID", "STATUS", "SUBDOMAIN", "CONTAINER"
    );
    for tenant in tenants {
        println!(
            "{:<36}  {:<10}  {:<24}  {:<12}",
            tenant.id,
            tenant.status.to_string(),
            truncate_string(&tenant.subdomain, 24),
            truncate_string(tenant.container_id.as_deref().unwrap_or("-"), 12)
        );
    }
    println!("{} tenant(s)", tenants.len());
}
