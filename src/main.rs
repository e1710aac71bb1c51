use anyhow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    wattgrid_cli::cli::app::run().await
}
