//! Command channel example - connect to a local collector and watch events

use relay::{EventBus, SessionManager, SessionTimings, Settings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let settings = Settings::default();
    println!(
        "Connecting to collector at {}:{}",
        settings.server_host, settings.server_port
    );

    let events = EventBus::new();
    let mut rx = events.subscribe();
    let session = SessionManager::new(&settings, SessionTimings::default(), events);

    // A failed attempt is retried in the background
    if let Err(e) = session.connect().await {
        println!("First attempt failed: {}", e);
    }

    // Print lifecycle events for a while
    let watch = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            println!("{}", serde_json::to_string(&event).unwrap_or_default());
        }
    });

    tokio::time::sleep(tokio::time::Duration::from_secs(30)).await;

    session.shutdown().await;
    watch.abort();
    println!("Disconnected");

    Ok(())
}
