use smslist::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let config = AppConfig::load()?;
    init_tracing(&config.logging);
    serve(config).await
}
