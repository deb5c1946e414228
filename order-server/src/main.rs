use order_server::{Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. dotenv, config, work dir, logging
    let config = setup_environment()?;

    print_banner();
    tracing::info!(
        http_port = config.http_port,
        tcp_port = config.message_tcp_port,
        timezone = %config.timezone,
        "Order server starting..."
    );

    // 2. Open storage and wire services
    let state = ServerState::initialize(&config)?;

    // 3. Serve until ctrl-c
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
