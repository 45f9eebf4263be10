use tokio_util::sync::CancellationToken;

/// Cancel the returned token on Ctrl-C so long-running commands can stop
/// between ticks.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for Ctrl-C");
                return;
            }
        }
        token_clone.cancel();
    });

    token
}
