use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use sysdash::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let sampler_config = app_config.sampler_config();
    let sampler = Arc::new(
        tokio::task::spawn_blocking(move || sampler::SysinfoSampler::new(sampler_config)).await?,
    );
    let system_info = Arc::new(sampler.system_info());
    tracing::info!(
        os = %system_info.os_pretty,
        kernel = %system_info.kernel,
        cpu = %system_info.cpu_model,
        "{} {}",
        version::NAME,
        version::VERSION
    );

    let monitor = Arc::new(monitor::Monitor::new(sampler, app_config.monitor_config()));
    if app_config.monitoring.autostart {
        // Fatal: sampling is the whole point of the process.
        monitor
            .start(Duration::from_millis(app_config.monitoring.sample_interval_ms))
            .await?;
    }

    let app = routes::app(monitor.clone(), system_info, app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
        }
    }
    monitor.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
