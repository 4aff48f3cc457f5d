//! Noticekit queue worker entry point.

use std::sync::Arc;

use noticekit_common::Config;
use noticekit_core::{
    BackendFactories, BackendRegistry, Dispatcher, EmailBackend, Mailer, NoOpMailer,
    OpenRouteResolver, PreferenceService, ProfileLanguageStore, RouteResolver, SmtpMailer,
    TemplateStore, WebsiteBackend,
};
use noticekit_db::repositories::{
    NoticeQueueBatchRepository, NoticeRepository, NoticeSettingRepository, NoticeTypeRepository,
    UserRepository,
};
use noticekit_queue::{EmitNoticesWorker, WorkerConfig};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, shutting down...");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "noticekit=debug".into()),
        )
        .init();

    info!("Starting noticekit queue worker...");

    let config = Config::load()?;

    let db = Arc::new(noticekit_db::init(&config).await?);
    noticekit_db::migrate(db.as_ref()).await?;
    info!("Connected to database");

    let signer = noticekit_common::Signer::new(config.signing_secret.clone());
    let media: Vec<String> = config
        .backends
        .iter()
        .map(|entry| entry.label.clone())
        .collect();
    let preferences = PreferenceService::new(
        NoticeSettingRepository::new(db.clone()),
        NoticeTypeRepository::new(db.clone()),
        UserRepository::new(db.clone()),
        signer.clone(),
        media,
    );
    let templates = Arc::new(TemplateStore::with_defaults());

    let mailer: Arc<dyn Mailer> = match &config.email {
        Some(email) => Arc::new(SmtpMailer::from_config(email)?),
        None => Arc::new(NoOpMailer::new()),
    };
    let from_address = config
        .email
        .as_ref()
        .map_or_else(|| "noreply@localhost".to_string(), |email| email.from_address.clone());

    let mut factories = BackendFactories::new();
    {
        let preferences = preferences.clone();
        let notices = NoticeRepository::new(db.clone());
        factories.register(
            "website",
            Box::new(move |medium_id, label, sensitivity| {
                Arc::new(WebsiteBackend::new(
                    medium_id,
                    label,
                    sensitivity,
                    preferences.clone(),
                    notices.clone(),
                ))
            }),
        );
    }
    {
        let preferences = preferences.clone();
        let templates = templates.clone();
        let mailer = mailer.clone();
        factories.register(
            "email",
            Box::new(move |medium_id, label, sensitivity| {
                Arc::new(EmailBackend::new(
                    medium_id,
                    label,
                    sensitivity,
                    preferences.clone(),
                    templates.clone(),
                    mailer.clone(),
                    from_address.clone(),
                ))
            }),
        );
    }

    let registry = Arc::new(BackendRegistry::load(&config.backends, &factories)?);
    // Sender paths in queued batches were resolved against the site's
    // routes when the batch was created; replay accepts them as-is.
    let routes: Arc<dyn RouteResolver> = Arc::new(OpenRouteResolver);

    let dispatcher = Dispatcher::new(
        NoticeTypeRepository::new(db.clone()),
        UserRepository::new(db.clone()),
        NoticeQueueBatchRepository::new(db.clone()),
        registry,
        routes,
        Some(Arc::new(ProfileLanguageStore)),
        signer,
        config.site.clone(),
        config.dispatch.clone(),
    );

    let worker = EmitNoticesWorker::new(
        NoticeQueueBatchRepository::new(db),
        dispatcher,
        WorkerConfig::default(),
    );

    tokio::select! {
        () = worker.run() => {},
        () = shutdown_signal() => {},
    }

    Ok(())
}
