use otpgate::console;
use otpgate::logger::*;
use otpgate::server::*;
use otpgate::settings::*;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;
    debug!(filter = ?logger.current_filter(), "log filter applied");

    let server = Server::try_new(&project_settings).await?;

    let succeeded = console::run(
        cli.command,
        server.auth_service.as_ref(),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => info!("server shutdown successfully"),
        Err(_) => error!("server shutdown timed out"),
    }

    if !succeeded? {
        std::process::exit(1);
    }
    Ok(())
}
