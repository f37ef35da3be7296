use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use visual_suite::cli::{CliArgs, parse_cli};
use visual_suite::progress::ProgressListener;
use visual_suite::settings::resolve_settings;
use visual_suite::{
    ListenerCatalog, ListenerDescriptor, SuiteError, default_catalog, run_settings,
};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = parse_cli();
    init_logging(&cli.log_level);

    let catalog = default_catalog();
    if cli.list_listeners {
        println!("Available listeners:");
        for name in catalog.names() {
            println!("  - {name}");
        }
        return ExitCode::SUCCESS;
    }

    match run(&cli, catalog).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("visual-suite: {err}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: &CliArgs, catalog: ListenerCatalog) -> Result<bool, SuiteError> {
    let mut settings = resolve_settings(cli)?;
    if cli.no_progress {
        settings
            .listeners
            .retain(|descriptor| descriptor.listener_type != ProgressListener::TYPE);
    } else if !settings
        .listeners
        .iter()
        .any(|descriptor| descriptor.listener_type == ProgressListener::TYPE)
    {
        settings
            .listeners
            .push(ListenerDescriptor::new(ProgressListener::TYPE));
    }

    info!(
        config = %settings.config_path.display(),
        tests = settings.tests.len(),
        comparator = %settings.comparator,
        "running suite"
    );
    let summary = run_settings(&settings, catalog).await?;
    info!(
        same = summary.same,
        different = summary.different,
        failed = summary.failed,
        "suite complete"
    );
    Ok(summary.all_same())
}

fn init_logging(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
