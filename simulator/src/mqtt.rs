use crate::errors::{Error, Result};
use crate::metrics::BROKER_DISCONNECTS_TOTAL;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, Publish, QoS,
};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long `connect` waits for a successful CONNACK.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
const KEEP_ALIVE: Duration = Duration::from_secs(60);
const REQUEST_CAPACITY: usize = 1000;
const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub credentials: Option<(String, String)>,
}

impl BrokerSettings {
    /// Settings with a random client id of the form `{prefix}-{8 hex chars}`.
    pub fn new(client_prefix: &str, host: impl Into<String>, port: u16) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            host: host.into(),
            port,
            client_id: format!("{}-{}", client_prefix, &suffix[..8]),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.credentials = Some((username, password));
        self
    }

    fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        options
    }
}

/// Broker session state as seen by the event loop task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Disconnected,
    Refused(String),
}

/// Where the run loop sends its payloads.
pub trait Transport {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> impl Future<Output = Result<()>> + Send;
}

pub struct Connection {
    client: AsyncClient,
    link: watch::Receiver<LinkState>,
    supervisor: JoinHandle<()>,
}

/// Opens a broker session and waits up to [`CONNECT_TIMEOUT`] for the CONNACK.
pub async fn connect(settings: &BrokerSettings) -> Result<Connection> {
    open(settings, None).await
}

/// Like [`connect`], but incoming PUBLISH packets are forwarded to the returned receiver.
pub async fn connect_with_inbox(
    settings: &BrokerSettings,
    capacity: usize,
) -> Result<(Connection, mpsc::Receiver<Publish>)> {
    let (tx, rx) = mpsc::channel(capacity);
    let connection = open(settings, Some(tx)).await?;
    Ok((connection, rx))
}

async fn open(settings: &BrokerSettings, inbox: Option<mpsc::Sender<Publish>>) -> Result<Connection> {
    info!(
        "Connecting to MQTT broker at {}:{} as {}",
        settings.host, settings.port, settings.client_id
    );

    let (client, eventloop) = AsyncClient::new(settings.mqtt_options(), REQUEST_CAPACITY);
    let (link_tx, mut link) = watch::channel(LinkState::Connecting);
    let supervisor = tokio::spawn(supervise(eventloop, link_tx, inbox));

    let state = match tokio::time::timeout(
        CONNECT_TIMEOUT,
        link.wait_for(|s| matches!(s, LinkState::Connected | LinkState::Refused(_))),
    )
    .await
    {
        Ok(Ok(state)) => state.clone(),
        Ok(Err(_)) => LinkState::Disconnected,
        Err(_) => {
            supervisor.abort();
            return Err(Error::ConnectTimeout(CONNECT_TIMEOUT));
        }
    };

    match state {
        LinkState::Connected => Ok(Connection {
            client,
            link,
            supervisor,
        }),
        LinkState::Refused(reason) => {
            supervisor.abort();
            Err(Error::ConnectionRefused(reason))
        }
        _ => {
            supervisor.abort();
            Err(Error::NotConnected)
        }
    }
}

/// Drives the transport. Owns the event loop and reports link changes; nothing else.
async fn supervise(
    mut eventloop: EventLoop,
    link: watch::Sender<LinkState>,
    inbox: Option<mpsc::Sender<Publish>>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    info!("Connected to MQTT broker");
                    link.send_replace(LinkState::Connected);
                } else {
                    error!("Broker rejected connection: {:?}", ack.code);
                    link.send_replace(LinkState::Refused(format!("{:?}", ack.code)));
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(
                    "Received message on topic {}, size: {} bytes",
                    publish.topic,
                    publish.payload.len()
                );
                if let Some(tx) = &inbox {
                    if tx.send(publish).await.is_err() {
                        debug!("Inbox closed, dropping incoming message");
                    }
                }
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                debug!("PUBACK for packet {}", ack.pkid);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                info!("Disconnect sent, stopping MQTT event loop");
                link.send_replace(LinkState::Disconnected);
                break;
            }
            Ok(_) => {}
            Err(ConnectionError::ConnectionRefused(code)) => {
                error!("Broker refused connection: {:?}", code);
                link.send_replace(LinkState::Refused(format!("{:?}", code)));
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(e) => {
                let was_connected = *link.borrow() == LinkState::Connected;
                if was_connected {
                    warn!("Disconnected from MQTT broker: {}", e);
                    BROKER_DISCONNECTS_TOTAL.inc();
                    link.send_replace(LinkState::Disconnected);
                } else {
                    error!("MQTT eventloop error: {}", e);
                }
                // the next poll reconnects
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

impl Connection {
    pub fn link_state(&self) -> LinkState {
        self.link.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.link.borrow() == LinkState::Connected
    }

    /// Receiver that observes every link change, e.g. to resubscribe after a reconnect.
    pub fn watch_link(&self) -> watch::Receiver<LinkState> {
        self.link.clone()
    }

    pub async fn subscribe(&self, topic: &str) -> Result<()> {
        self.client.subscribe(topic, QoS::AtLeastOnce).await?;
        info!("Subscribed to {} with QoS 1", topic);
        Ok(())
    }

    /// Sends DISCONNECT after everything queued so far and waits for the event loop to stop.
    pub async fn close(self) -> Result<()> {
        self.client.disconnect().await?;
        stop_supervisor(self.supervisor, CLOSE_TIMEOUT).await;
        Ok(())
    }
}

/// Waits for the event loop task to finish, aborting it after `limit`.
/// Returns false if it had to be aborted.
async fn stop_supervisor(mut supervisor: JoinHandle<()>, limit: Duration) -> bool {
    if tokio::time::timeout(limit, &mut supervisor).await.is_ok() {
        return true;
    }

    // DISCONNECT never goes out while the link is down
    warn!("MQTT event loop did not stop within {:?}, aborting it", limit);
    supervisor.abort();
    false
}

impl Transport for Connection {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await?;
        Ok(())
    }
}
