//! Send one SMS batch through MessageBird.
//!
//! `--to` takes a comma separated list of up to 50 numbers.
use sms_core::{BatchSendRequest, BatchSmsClient};
use sms_messagebird::MessageBirdClient;

use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let access_key = arg_or_env("--access-key", "MESSAGEBIRD_API_KEY");
    let from = arg_or_env("--from", "MESSAGEBIRD_ORIGINATOR");
    let to = arg_or_env("--to", "SMS_TO");
    let text = arg_or_env("--text", "SMS_TEXT");

    let recipients: Vec<String> = to
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let client = MessageBirdClient::new(access_key);
    let res = client
        .send_batch(BatchSendRequest {
            to: &recipients,
            from: &from,
            text: &text,
        })
        .await?;
    println!(
        "Sent via {} with id {}\nRaw: {}",
        res.provider,
        res.id,
        serde_json::to_string_pretty(&res.raw)?
    );
    Ok(())
}

fn arg_or_env(flag: &str, env_key: &str) -> String {
    let args: Vec<String> = std::env::args().collect();
    if let Some(idx) = args.iter().position(|a| a == flag) {
        if idx + 1 < args.len() {
            return args[idx + 1].clone();
        }
    }
    env::var(env_key)
        .unwrap_or_else(|_| panic!("missing {} (arg {} or env {})", flag, flag, env_key))
}
