use clap::Parser;
use errand_example::{build_errand, run, Cli};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; --verbose only changes the fallback.
    let fallback = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let errand = build_errand()?;
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let output = run(&errand, cli.command, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
