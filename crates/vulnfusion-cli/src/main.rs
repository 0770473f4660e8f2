#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vulnfusion_cli::run().await
}
