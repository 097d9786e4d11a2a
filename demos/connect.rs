use jaaz_realtime::types::DEFAULT_NOTIFICATION_CAPACITY;
use jaaz_realtime::{NotificationStore, SocketManager, SocketManagerOptions, SocketProvider};

/// Connect to a running Jaaz server and print state transitions and notifications
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let url =
        std::env::var("JAAZ_SERVER_URL").unwrap_or_else(|_| "http://localhost:57988".to_string());
    let options = SocketManagerOptions::from_env()?;

    println!("📡 Connecting to: {}\n", url);

    let manager = SocketManager::new(&url, options)?;
    manager.on("init_done", |payload| println!("🎉 Server ready: {}", payload));

    let mut transitions = manager.subscribe_state();
    tokio::spawn(async move {
        while let Ok(state) = transitions.recv().await {
            println!(
                "🔌 {:?} (id: {:?}, attempts: {}/{})",
                state.status,
                state.connection_id,
                state.reconnect_attempts,
                state.max_reconnect_attempts
            );
        }
    });

    let store = NotificationStore::with_capacity(DEFAULT_NOTIFICATION_CAPACITY);
    let provider = SocketProvider::new(manager, store);
    let subscription = provider.notifications().subscribe(|list| {
        if let Some(latest) = list.last() {
            println!("🔔 [{:?}] {}: {}", latest.kind, latest.title, latest.message);
        }
    });

    let context = provider.start().await;
    match context.status_message() {
        Some(banner) => println!("⚠️  {}", banner),
        None => println!("✅ Connected as {:?}\n", context.socket_id),
    }

    println!("Press Ctrl+C to exit");
    tokio::signal::ctrl_c().await?;

    subscription.unsubscribe();
    println!("Unread notifications: {}", provider.notifications().get_unread_count());
    provider.shutdown().await;
    println!("Disconnected!");

    Ok(())
}
