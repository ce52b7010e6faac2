use anyhow::Result;
use moexscraper::{config::Config, fetch, notify, reconcile, report};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) load config ──────────────────────────────────────────────
    let config_path =
        std::env::var("MOEXSCRAPER_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let cfg = Config::load(&config_path)?;
    info!(config = %config_path, "config loaded");

    // ─── 3) scrape both rate tables ──────────────────────────────────
    let client = fetch::http_client(&cfg)?;
    let (usd_raw, eur_raw) = fetch::rates::fetch_rates(&client, &cfg).await?;
    info!(usd = usd_raw.len(), eur = eur_raw.len(), "raw tables scraped");

    // ─── 4) reconcile the two series ─────────────────────────────────
    let data = reconcile::reconcile(&usd_raw, &eur_raw)?;
    info!(rows = data.rows, "series reconciled");

    // ─── 5) write the workbook on the blocking pool ──────────────────
    let last_row = tokio::task::spawn_blocking({
        let data = data.clone();
        let out = cfg.output_path.clone();
        move || report::write_workbook(&data, &out)
    })
    .await??;
    info!(path = %cfg.output_path.display(), last_row, "workbook written");

    // ─── 6) mail the report ──────────────────────────────────────────
    tokio::task::spawn_blocking({
        let mail = cfg.mail.clone();
        let out = cfg.output_path.clone();
        move || notify::send_report(&mail, &out, last_row)
    })
    .await??;

    info!("all done");
    Ok(())
}
