#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catanddog::app::run().await
}
