use crate::prelude::*;

use {
    chrono::{DateTime, Utc},
    futures::future::join_all,
    serde::Serialize,
    std::{io::Write, sync::Arc, time::Duration},
    tokio::{sync::broadcast, time::MissedTickBehavior},
};

use crate::error::Error;

/// One successful fetch, as written to the output stream.
#[derive(Clone, Debug, Serialize)]
pub struct Reading {
    pub device: String,
    pub endpoint: String,
    pub time: DateTime<Utc>,
    pub data: TelemetryRecord,
}

#[derive(Debug)]
pub struct PollOutcome {
    pub device: String,
    pub endpoint: Endpoint,
    pub time: DateTime<Utc>,
    pub result: Result<TelemetryRecord, Error>,
}

impl PollOutcome {
    pub fn reading(&self) -> Option<Reading> {
        let record = self.result.as_ref().ok()?;

        Some(Reading {
            device: self.device.clone(),
            endpoint: self.endpoint.to_string(),
            time: self.time,
            data: record.clone(),
        })
    }
}

/// Polls every configured device on a fixed interval.
///
/// Devices are fetched concurrently and independently; a failing device
/// is logged and simply tried again on the next tick.
pub struct Poller {
    interval: Duration,
    sources: Vec<(String, Arc<dyn TelemetrySource>)>,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            sources: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut poller = Self::new(config.poll_interval());

        for device in config.enabled_devices() {
            let client = Client::new(device.endpoint()).with_settings(device.transport_settings());
            poller.add_source(device.name(), Arc::new(client));
        }

        poller
    }

    pub fn add_source(&mut self, name: String, source: Arc<dyn TelemetrySource>) {
        self.sources.push((name, source));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub async fn poll_once(&self) -> Vec<PollOutcome> {
        let fetches = self.sources.iter().map(|(name, source)| async move {
            let result = source.fetch().await;

            PollOutcome {
                device: name.clone(),
                endpoint: source.endpoint().clone(),
                time: Utc::now(),
                result,
            }
        });

        join_all(fetches).await
    }

    pub async fn run<W: Write>(
        &self,
        out: &mut W,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("poller: received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    // a round in flight is abandoned on shutdown; dropping it
                    // closes its connections
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            info!("poller: received shutdown signal mid-round");
                            break;
                        }
                        outcomes = self.poll_once() => {
                            Self::report(&outcomes, out)?;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Write each successful reading as one JSON line and log the failures.
    /// Returns how many readings were written.
    pub fn report<W: Write>(outcomes: &[PollOutcome], out: &mut W) -> Result<usize> {
        let mut written = 0;

        for outcome in outcomes {
            match (&outcome.result, outcome.reading()) {
                (Ok(record), Some(reading)) => {
                    if record.has_fault() {
                        warn!("{}: fault code {:?}", outcome.device, record.fault);
                    }
                    serde_json::to_writer(&mut *out, &reading)?;
                    writeln!(out)?;
                    written += 1;
                }
                (Err(e), _) => warn!("{}: {}", outcome.device, e),
                (Ok(_), None) => {}
            }
        }
        out.flush()?;

        Ok(written)
    }
}
