use std::sync::Arc;

use prep_assist::catalog::MessageCatalog;
use prep_assist::channels::{webhook_routes, TwilioNotifier};
use prep_assist::config::AssistConfig;
use prep_assist::engine::{ConversationEngine, EngineDeps, QuestionBank};
use prep_assist::llm::OpenAiGenerator;
use prep_assist::store::{LibSqlStore, UserStore};
use prep_assist::sweeper::spawn_sweep_task;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AssistConfig::from_env()?;

    // Required credentials
    let openai_key = require_env("OPENAI_API_KEY");
    let account_sid = require_env("TWILIO_ACCOUNT_SID");
    let auth_token = require_env("TWILIO_AUTH_TOKEN");
    let from_number = require_env("TWILIO_FROM_NUMBER");

    eprintln!("📱 Prep Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   Webhook: http://0.0.0.0:{}/whatsapp", config.port);
    eprintln!("   Database: {}", config.db_path);
    eprintln!(
        "   Idle reset after: {} min\n",
        config.idle_threshold.as_secs() / 60
    );

    // Catalog and question banks fail fast if incomplete.
    let catalog = MessageCatalog::builtin()?;
    let questions = QuestionBank::builtin();

    let store: Arc<dyn UserStore> = Arc::new(
        LibSqlStore::new_local(std::path::Path::new(&config.db_path)).await?,
    );

    let generator = Arc::new(OpenAiGenerator::new(
        secrecy::SecretString::from(openai_key),
        config.model.clone(),
    ));
    let notifier = Arc::new(TwilioNotifier::new(
        account_sid,
        secrecy::SecretString::from(auth_token),
        from_number,
    ));

    let engine = Arc::new(ConversationEngine::new(
        config.clone(),
        catalog,
        questions,
        EngineDeps {
            store,
            notifier,
            generator,
        },
    ));

    let _sweep_handle = spawn_sweep_task(
        Arc::clone(&engine),
        config.sweep_interval,
        config.idle_threshold,
    );

    let app = webhook_routes(engine);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Webhook server started");
    axum::serve(listener, app).await?;

    Ok(())
}

fn require_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        eprintln!("Error: {key} not set");
        std::process::exit(1);
    })
}
