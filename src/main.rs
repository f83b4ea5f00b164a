use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod driver;
mod report;
mod station;
mod util;

use config::Config;
use station::Event;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let ct = CancellationToken::new();
    let handler_ct = ct.clone();

    ctrlc::set_handler(move || {
        info!("received ctrl+c, exiting");
        handler_ct.cancel();
    })?;

    let (evt_tx, evt_rx) = flume::bounded(16);
    let station_join = station::spawn_thread(ct, config, evt_tx);

    for evt in evt_rx.iter() {
        match evt {
            Event::Reading(reading) => {
                println!("{:.2} °C", reading.temperature);
                println!("{:.2} °F", reading.fahrenheit());
                println!("{:.2} %rH", reading.humidity);
                println!("{}", reading.title());
                println!("{}", reading.content());
            }
            Event::Error(err) => warn!("no reading: {err}"),
        }
    }

    station_join
        .join()
        .map_err(|_| anyhow!("station thread panicked"))??;

    info!("exit");

    Ok(())
}
