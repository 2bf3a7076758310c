#[tokio::main]
async fn main() -> anyhow::Result<()> {
    codepulse_lib::run().await
}
