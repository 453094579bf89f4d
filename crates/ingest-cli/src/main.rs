use clap::Parser;
use tokio_util::sync::CancellationToken;

use ingest_cli::config_loader::ConfigOverrides;
use ingest_cli::parser::Commands;
use ingest_cli::{bootstrap, load_config, Cli, CliError};
use ingest_core::LogFormat;

fn init_tracing(format: LogFormat, level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt().json().with_env_filter(filter).init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

#[cfg(unix)]
fn install_sigint_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut stream = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGINT handler");
                return;
            }
        };
        stream.recv().await;
        tracing::info!("received SIGINT, cancelling run");
        cancel.cancel();
    });
}

#[cfg(not(unix))]
fn install_sigint_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, cancelling run");
            cancel.cancel();
        }
    });
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig => {
            let config = load_config(cli.config.as_deref(), &ConfigOverrides::default())?;
            init_tracing(config.log_format, &config.log_level);
            tracing::info!("configuration is valid");
            println!("configuration OK: channel={}", config.channel_reference);
            Ok(())
        }
        Commands::Run {
            channel,
            database_url,
            force_reprocess,
            local_gpu,
            max_cost_per_run,
        } => {
            let overrides = ConfigOverrides {
                channel_reference: channel,
                database_url,
                storage_dir: None,
                force_reprocess: if force_reprocess { Some(true) } else { None },
                max_cost_per_run,
            };
            let config = load_config(cli.config.as_deref(), &overrides)?;
            init_tracing(config.log_format, &config.log_level);

            let cancel_on_sigint = config.cancel_on_sigint;
            let ctx = bootstrap(config, local_gpu).await?;

            if cancel_on_sigint {
                install_sigint_handler(ctx.orchestrator.cancellation_handle());
            }

            match ctx.orchestrator.run(&ctx.run_summary).await {
                Ok(summary) => {
                    println!("{}", summary.render());
                    Ok(())
                }
                Err(e) => Err(CliError::from(e)),
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    };
    std::process::exit(exit_code);
}
