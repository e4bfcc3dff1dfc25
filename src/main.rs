use std::{net::TcpListener, sync::Arc, time::Duration};

use actix_web::web;
use env_logger::Env;
use jobscout::{
    configuration::get_configuration,
    dal::job_db::PgJobStore,
    services::{
        cache_sweeper_handler, DiscordNotifier, FetchPolicy, JobCache, JobPipeline,
        LinkedinClient, RetryPolicy,
    },
    startup::run,
};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().expect("Failed to read configuration.");

    let pool_options = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(15 * 60)) // 15 minutes
        .max_lifetime(None);

    let connection_pool = pool_options.connect_lazy_with(configuration.database.with_db());

    if configuration.database.auto_migrate {
        sqlx::migrate!("./migrations")
            .run(&connection_pool)
            .await
            .expect("Failed to migrate the database.");
        log::info!("Database migrations applied successfully");
    }

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(address)?;

    let linkedin_client =
        LinkedinClient::new(&configuration.scraper).expect("Failed to build http client.");
    let store = PgJobStore::new(connection_pool.clone());
    let notifier = DiscordNotifier::new(&configuration.notification);
    let cache = Arc::new(JobCache::new(Duration::from_secs(
        configuration.cache.ttl_secs,
    )));

    let pipeline = JobPipeline::new(
        Arc::new(linkedin_client),
        Arc::new(store),
        Arc::new(notifier),
        cache.clone(),
        FetchPolicy::from(&configuration.scraper),
        RetryPolicy::from(&configuration.persistence),
    )
    .with_search_host(configuration.scraper.search_host.clone());
    let pipeline = web::Data::new(pipeline);

    // Spawn background tasks
    let sweep_every = Duration::from_secs(configuration.cache.sweep_interval_secs.max(1));
    tokio::spawn(async move { cache_sweeper_handler(cache, sweep_every).await });

    run(listener, connection_pool, pipeline)?.await
}
