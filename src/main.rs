use tracing::error;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    if let Err(e) = smokewatch::cli::run().await {
        // Fatal setup errors name the failed resource and exit non-zero;
        // per-message errors never reach this point.
        error!("Fatal: {e}");
        std::process::exit(1);
    }
}
