use clap::Parser;
use log::{error, info};
use server::config::Config;
use server::network::{BoxError, Server};

/// Main-method of the application.
/// Parses configuration, seeds the board, then runs the event loop until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    info!(
        "Starting with up to {} targets, ping timeout {:?}, {:?} spawn policy",
        config.max_targets,
        config.ping_timeout(),
        config.spawn_policy
    );

    let mut server = Server::bind(config).await?;
    server.arcade_mut().seed();

    let handle = server.handle();
    let server_task = tokio::spawn(server.run());

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Server stopped with error: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            handle.shutdown();
        }
    }

    Ok(())
}
