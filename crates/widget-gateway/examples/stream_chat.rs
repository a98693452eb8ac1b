use widget_gateway::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    widget_gateway::init_observability();

    let client = GatewayClient::from_env()?;
    if !client.check_health().await {
        eprintln!("gateway at {} is not reachable", client.config().base_url);
        return Ok(());
    }

    let provider = std::env::var("WIDGET_PROVIDER").unwrap_or_else(|_| "openai".to_string());
    let model = std::env::var("WIDGET_MODEL").unwrap_or_default();
    let mut session = client.session();
    let mut stream = session.start(
        StreamRequest::chat(provider, model)
            .message(ChatMessage::system("Reply in one short paragraph."))
            .message(ChatMessage::user("Stream a greeting.")),
    )?;

    while let Some(event) = stream.next_event().await {
        match event {
            Ok(chunk) => {
                if let Some(text) = chunk.content() {
                    print!("{text}");
                }
                if let Some(reason) = chunk.finish_reason() {
                    println!("\n[finish: {reason}]");
                }
                if let Some(usage) = chunk.usage {
                    println!("[tokens: {} total]", usage.total_tokens);
                }
            }
            Err(err) => eprintln!("stream error: {err}"),
        }
    }
    Ok(())
}
