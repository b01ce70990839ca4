//! Pure routing of MQTT event loop output
//!
//! The garden node only publishes, so the interesting events are the
//! handshake, broker-initiated disconnects and acknowledgements; everything
//! else is logged at debug level and ignored.

use rumqttc::v5::mqttbytes::v5::Packet;
use rumqttc::v5::Event;

/// Pure message routing decisions based on MQTT events
pub struct MessageHandler;

impl MessageHandler {
    /// Route MQTT event to appropriate handler (pure routing decision)
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => match incoming {
                Packet::ConnAck(_) => EventRoute::ConnectionAcknowledged,
                Packet::Disconnect(_) => EventRoute::Disconnected,
                Packet::PingResp(_) => EventRoute::KeepAlive,
                other => EventRoute::InfrastructureEvent(format!("{other:?}")),
            },
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone, PartialEq)]
pub enum EventRoute {
    /// Broker accepted the session
    ConnectionAcknowledged,
    /// Broker closed the session
    Disconnected,
    /// Keep-alive round trip completed
    KeepAlive,
    /// Acks and other packets with no effect on connection state
    InfrastructureEvent(String),
    /// Outgoing event (handled automatically)
    OutgoingEvent,
}
