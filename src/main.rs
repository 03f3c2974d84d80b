#[tokio::main]
async fn main() -> anyhow::Result<()> {
    voice_notes::run().await
}
