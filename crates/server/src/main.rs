use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ferry_http::handler::Handler;
use ferry_http::protocol::body::ReqBody;
use ferry_server::cli::Cli;
use ferry_server::config::{Mode, ServerConfig};
use ferry_server::{BoxError, FileHandler, ProxyHandler, ResponseBody, Server, logging};
use tracing::{error, info};

type DynHandler = Arc<dyn Handler<ReqBody, RespBody = ResponseBody, Error = BoxError>>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging() {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(cause = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let mut config = match &cli.config {
        // validated once the flags are applied
        Some(path) => ServerConfig::read(path)?,
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    info!(mode = ?config.mode, bind = %config.bind, gzip = config.gzip, keep_alive = config.keep_alive, "starting ferry");

    let handler: DynHandler = match config.mode {
        Mode::File => Arc::new(FileHandler::new(&config.root)),
        Mode::Proxy => Arc::new(ProxyHandler::new(config.connect_timeout())?),
    };

    let server = Server::builder().config(&config).handler(handler).build()?;
    server.start().await?;
    Ok(())
}
