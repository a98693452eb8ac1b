use widget_gateway::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    widget_gateway::init_observability();

    let client = GatewayClient::from_env()?;
    let completion = client
        .session()
        .start(
            StreamRequest::chat("ollama", "llama3")
                .message(ChatMessage::user("Say hello"))
                .temperature(0.2),
        )?
        .collect()
        .await?;

    println!("{}", completion.content);
    Ok(())
}
