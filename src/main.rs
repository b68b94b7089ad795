use log::{error, info};
use service::{config::Config, logging::Logger};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!("Starting Agora platform server");

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let event_bus = Arc::new(events::EventBus::new());
    let realtime_manager = Arc::new(realtime::Manager::new());

    // Delivery listeners live for the process lifetime and are registered
    // once, before the server accepts its first request.
    event_bus.subscribe(
        events::Topic::CommentCreated,
        Arc::new(realtime::comment_listener::CommentEventHandler::new(
            db.clone(),
            realtime_manager.clone(),
        )),
    );
    event_bus.subscribe(
        events::Topic::MessageSent,
        Arc::new(realtime::chat_listener::ChatEventHandler::new(
            realtime_manager.clone(),
        )),
    );

    let app_state = web::AppState::new(config, &db, event_bus, realtime_manager);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server terminated with error: {e}");
        std::process::exit(1);
    }
}
