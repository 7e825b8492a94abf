use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app_context::AppContext;
use swing_link::settings::Settings;

mod app_context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swing_link=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SwingLink v{}", env!("CARGO_PKG_VERSION"));

    let settings = match Settings::load_or_default() {
        Ok(settings) => settings,
        Err(error) => {
            tracing::warn!("Could not load settings, using defaults: {}", error);
            Settings::default()
        }
    };

    let window_size = [320.0, 420.0];
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(window_size)
            .with_min_inner_size(window_size),
        ..Default::default()
    };

    let context = AppContext::new(settings)?;

    eframe::run_native(
        "SwingLink",
        options,
        Box::new(|_ctx| {
            Ok(Box::new(context))
        })
    ).map_err(|e| anyhow::anyhow!("{:?}", e))?;

    Ok(())
}
