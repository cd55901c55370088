//! `coletor` command line: inspect the bulletin catalog and exercise the
//! form, series and validator rules without a collection engine.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use coletor_app::{init_tracing, AppConfig, LogFormat};
use coletor_core::form::BulletinForm;
use coletor_core::schema::{END_DATE_FIELD, START_DATE_FIELD};
use coletor_core::series::preview_table_name;
use coletor_core::{ComposeError, EndpointCatalog, FieldDescriptor};
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "coletor")]
#[command(about = "Operator tools for SGS series and Focus bulletin collection", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, env = "COLETOR_LOG_FORMAT", default_value = "pretty", global = true)]
    log_format: LogFormat,

    #[arg(long, value_parser = ["error", "warn", "info", "debug", "trace"], default_value = "warn", global = true)]
    log_level: String,

    /// Debounce applied to edited fields, in milliseconds.
    #[arg(long, env = "COLETOR_DEBOUNCE_MS", default_value_t = 300, global = true)]
    debounce_ms: u64,

    /// Calendar year used for the reference-year window.
    #[arg(long, global = true)]
    current_year: Option<i32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in bulletin endpoints.
    Endpoints {
        #[arg(long)]
        json: bool,
    },

    /// Validate bulletin filters and print the composed request.
    Compose {
        #[arg(long)]
        endpoint: String,

        /// Start date, YYYY-MM-DD.
        #[arg(long)]
        data: String,

        /// End date, YYYY-MM-DD.
        #[arg(long)]
        data_fim: Option<String>,

        /// Endpoint filter as NAME=VALUE; repeatable.
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },

    /// Print the table name derived from a base name and periodicity.
    TableName { base_name: String, periodicity: String },

    /// Run one named validator against a value.
    Check { validator: String, value: String },
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.log_format, &cli.log_level) {
        eprintln!("failed to initialise logging: {err:#}");
    }
    std::panic::set_hook(Box::new(|info| {
        error!(panic = %info, "unexpected failure");
    }));

    let config = AppConfig {
        debounce: Duration::from_millis(cli.debounce_ms),
        current_year: cli.current_year,
        log_format: cli.log_format,
        ..AppConfig::default()
    };
    debug!(?config, "configuration loaded");

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("Erro: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &AppConfig) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Endpoints { json } => {
            let catalog = EndpointCatalog::builtin();
            if json {
                let wire = catalog.to_wire();
                println!("{}", serde_json::to_string_pretty(&wire)?);
            } else {
                for schema in catalog.iter() {
                    println!(
                        "{:<40} {:<32} [{}]",
                        schema.key,
                        schema.display_name,
                        schema.filter_names().join(", ")
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Compose {
            endpoint,
            data,
            data_fim,
            filters,
        } => compose(config, &endpoint, &data, data_fim.as_deref(), &filters),
        Commands::TableName {
            base_name,
            periodicity,
        } => match preview_table_name(&base_name, &periodicity) {
            Some(name) => {
                println!("{name}");
                Ok(ExitCode::SUCCESS)
            }
            None => bail!("nome base ou periodicidade inválidos"),
        },
        Commands::Check { validator, value } => {
            let registry = config.validator_registry();
            if !registry.contains(&validator) {
                bail!("validador desconhecido: {validator}");
            }
            if registry.validate(&validator, &value) {
                println!("ok");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("{}", registry.message_for(&validator));
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn compose(
    config: &AppConfig,
    endpoint: &str,
    data: &str,
    data_fim: Option<&str>,
    filters: &[(String, String)],
) -> anyhow::Result<ExitCode> {
    let catalog = Arc::new(EndpointCatalog::builtin());
    if catalog.get(endpoint).is_none() {
        bail!("endpoint desconhecido: {endpoint}");
    }
    let mut form = BulletinForm::new(
        Arc::new(config.validator_registry()),
        catalog,
        config.debounce,
    );
    form.select_endpoint(Some(endpoint));

    let now = Instant::now();
    form.input(START_DATE_FIELD, data, now);
    if let Some(end) = data_fim {
        form.input(END_DATE_FIELD, end, now);
    }
    let known: Vec<FieldDescriptor> = form
        .active()
        .map(|state| state.fields().to_vec())
        .unwrap_or_default();
    for (name, value) in filters {
        if !known.iter().any(|f| &f.id == name) {
            bail!("filtro '{name}' não existe para {endpoint}");
        }
        form.input(name, value, now);
    }

    match form.submit() {
        Ok(request) => {
            let json = serde_json::to_string_pretty(&request).context("rendering request")?;
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Err(ComposeError::Precondition(err)) => {
            println!("{err}");
            Ok(ExitCode::FAILURE)
        }
        Err(err @ ComposeError::Invalid { .. }) => {
            println!("{err}");
            let fields = form.date_fields().iter().chain(known.iter());
            for field in fields {
                if let Some(field_error) = form.error(&field.id) {
                    println!("  {}: {}", field.render_hint.label, field_error.message);
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
