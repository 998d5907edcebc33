//! MQTT subscriber for pond sensor readings.
//!
//! Subscribes to the configured topic with QoS 1. A dropped connection is
//! logged and rebuilt after a short delay; the caller only ever sees payloads.

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{defaults, MqttConfig};

/// One received publish.
#[derive(Debug, Clone)]
pub struct MqttPayload {
    pub topic: String,
    pub payload: Vec<u8>,
}

pub struct MqttSubscriber {
    config: MqttConfig,
    session: Option<(AsyncClient, EventLoop)>,
    reconnect_delay: Duration,
}

impl MqttSubscriber {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            session: None,
            reconnect_delay: Duration::from_secs(defaults::MQTT_RECONNECT_DELAY_SECS),
        }
    }

    pub fn broker(&self) -> String {
        format!("{}:{}", self.config.broker, self.config.port)
    }

    fn options(&self) -> MqttOptions {
        let mut opts = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.broker.clone(),
            self.config.port,
        );
        opts.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs.max(5)));
        if let Some(username) = &self.config.username {
            opts.set_credentials(
                username.clone(),
                self.config.password.clone().unwrap_or_default(),
            );
        }
        opts
    }

    /// Build a fresh client and queue the subscription.
    async fn connect(&mut self) -> bool {
        let (client, eventloop) = AsyncClient::new(self.options(), defaults::MQTT_CHANNEL_CAPACITY);
        match client
            .subscribe(self.config.topic.clone(), QoS::AtLeastOnce)
            .await
        {
            Ok(()) => {
                info!(broker = %self.broker(), topic = %self.config.topic, "Subscribed to sensor feed");
                self.session = Some((client, eventloop));
                true
            }
            Err(err) => {
                warn!(error = %err, "Failed to subscribe to MQTT; retrying");
                false
            }
        }
    }

    /// Wait for the next publish on the subscribed topic.
    ///
    /// Never returns an error: connection failures are retried until a
    /// message arrives or the calling task is cancelled.
    pub async fn next_payload(&mut self) -> MqttPayload {
        loop {
            let event = match self.session.as_mut() {
                Some((_, eventloop)) => eventloop.poll().await,
                None => {
                    if !self.connect().await {
                        sleep(self.reconnect_delay).await;
                    }
                    continue;
                }
            };

            match event {
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    return MqttPayload {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    };
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!(broker = %self.broker(), "MQTT connected");
                }
                Ok(other) => debug!(event = ?other, "MQTT event"),
                Err(err) => {
                    warn!(error = %err, broker = %self.broker(), "MQTT connection lost; reconnecting");
                    self.session = None;
                    sleep(self.reconnect_delay).await;
                }
            }
        }
    }
}
