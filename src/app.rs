use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::client::Client;
use crate::config::Config;
use crate::generator::TargetGenerator;
use crate::generator::blackbox::Blackbox;
use crate::generator::node_exporter::NodeExporter;
use crate::http::HttpClient;
use crate::shutdown::ShutdownSignal;

#[derive(Debug, Error)]
#[error("no target generator is enabled")]
pub struct NoGeneratorEnabled;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Starting => f.write_str("starting"),
            State::Running => f.write_str("running"),
            State::Stopping => f.write_str("stopping"),
            State::Stopped => f.write_str("stopped"),
        }
    }
}

/// Owns the update loop: fetch nodes, fan them out to the enabled
/// generators, sleep, repeat. At most one cycle is ever in flight.
pub struct Application {
    client: Client,
    /// Enabled generators in configuration order.
    generators: Vec<Box<dyn TargetGenerator + Send + Sync>>,
    interval: Duration,
    include_disabled: bool,
    state: State,
}

impl Application {
    pub fn new(config: &Config) -> crate::Result<Self> {
        let http = HttpClient::new()?;
        let client = Client::new(http, config.endpoint.clone(), &config.token)?;

        let mut generators: Vec<Box<dyn TargetGenerator + Send + Sync>> = Vec::new();
        if config.blackbox.enabled {
            generators.push(Box::new(Blackbox::new(&config.blackbox.output)));
        }
        if config.node_exporter.enabled {
            generators.push(Box::new(NodeExporter::new(
                &config.node_exporter.output,
                config.node_exporter.ports.clone(),
            )));
        }

        if generators.is_empty() {
            return Err(NoGeneratorEnabled.into());
        }

        let names = generators
            .iter()
            .map(|generator| generator.name())
            .collect::<Vec<_>>()
            .join(",");
        info!(
            message = "configuration loaded",
            endpoint = %config.endpoint,
            interval = ?config.interval,
            include_disabled = config.include_disabled,
            generators = %names,
        );

        Ok(Application {
            client,
            generators,
            interval: config.interval,
            include_disabled: config.include_disabled,
            state: State::Starting,
        })
    }

    fn transition(&mut self, next: State) {
        info!(message = "state changed", from = %self.state, to = %next);
        self.state = next;
    }

    /// One update cycle. Every failure is logged and turned into a
    /// `false` so the loop above survives it.
    async fn update(&self) -> bool {
        let nodes = match self.client.nodes().await {
            Ok(nodes) => nodes,
            Err(err) => {
                error!(message = "fetch nodes failed", %err);
                return false;
            }
        };

        let nodes = if self.include_disabled {
            nodes
        } else {
            nodes.into_iter().filter(|node| !node.is_disabled).collect()
        };

        for generator in &self.generators {
            match generator.process(&nodes) {
                Ok(0) => warn!(message = "no targets emitted", generator = generator.name()),
                Ok(count) => info!(
                    message = "targets file updated",
                    generator = generator.name(),
                    groups = count
                ),
                Err(err) => {
                    // shared fate: the generators after this one wait
                    // for the next cycle, files already written stay
                    error!(
                        message = "write targets file failed",
                        generator = generator.name(),
                        %err
                    );
                    return false;
                }
            }
        }

        true
    }

    pub async fn run(mut self, mut shutdown: ShutdownSignal) {
        self.transition(State::Running);

        let mut ticker = tokio::time::interval(self.interval);
        // suspend for the full interval after a slow cycle instead of
        // firing catch-up ticks back to back
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            // Cancellation can interrupt the fetch, but a cycle that is
            // past it runs to completion: generation and save have no
            // await points, so the select cannot observe the shutdown
            // before the cycle resolves.
            tokio::select! {
                _ = &mut shutdown => break,
                success = self.update() => {
                    if !success {
                        warn!(message = "update cycle failed");
                    }

                    info!(message = "next update", after = ?self.interval);
                }
            }
        }

        self.transition(State::Stopping);
        self.transition(State::Stopped);
    }
}
