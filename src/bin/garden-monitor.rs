//! Garden Monitor
//!
//! Subscribes to the telemetry channel and prints every reading a garden node
//! publishes. Handy on the bench to confirm a node is alive and its sensors
//! make sense.

use clap::Parser;
use garden_telemetry::config::DEFAULT_CHANNEL;
use garden_telemetry::protocol::Payload;
use garden_telemetry::sensor::Reading;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

const MAX_RECONNECT_DELAY: u64 = 30;

/// Print readings published by garden nodes
#[derive(Parser)]
#[command(name = "garden-monitor")]
#[command(about = "Watch the garden telemetry channel")]
#[command(version)]
struct Args {
    /// Output format (pretty, compact, or json)
    #[arg(short, long, default_value = "pretty")]
    format: OutputFormat,

    /// Channel the nodes publish to
    #[arg(long, default_value = DEFAULT_CHANNEL)]
    channel: String,

    /// MQTT broker host
    #[arg(long, default_value = "broker.hivemq.com")]
    broker_host: String,

    /// MQTT broker port
    #[arg(long, default_value_t = 1883)]
    broker_port: u16,
}

/// Output formatting options
#[derive(Clone, Debug, clap::ValueEnum)]
enum OutputFormat {
    /// Color-coded, one labelled line per value
    Pretty,
    /// Single line per message
    Compact,
    /// One JSON object per message for piping into other tools
    Json,
}

const RESET: &str = "\x1b[0m";
const OK_COLOR: &str = "\x1b[1;32m";
const WARN_COLOR: &str = "\x1b[1;33m";
const ERROR_COLOR: &str = "\x1b[1;31m";

fn format_value(value: Option<f32>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.2}{unit}"),
        None => "n/a".to_string(),
    }
}

fn format_reading(reading: &Reading, topic: &str, format: &OutputFormat) -> String {
    let timestamp = chrono::Utc::now().format("%H:%M:%S");

    match format {
        OutputFormat::Json => serde_json::json!({
            "timestamp": timestamp.to_string(),
            "topic": topic,
            "temperature": reading.temperature,
            "humidity": reading.humidity,
            "soilMoisture": reading.soil_moisture.value(),
            "complete": reading.is_complete(),
        })
        .to_string(),
        OutputFormat::Compact => format!(
            "{} {} temperature={} humidity={} soilMoisture={}",
            timestamp,
            topic,
            format_value(reading.temperature, "C"),
            format_value(reading.humidity, "%"),
            reading.soil_moisture.value()
        ),
        OutputFormat::Pretty => {
            let color = if reading.is_complete() {
                OK_COLOR
            } else {
                WARN_COLOR
            };
            format!(
                "{color}[READING]{RESET} {timestamp} {topic}\n  temperature  {}\n  humidity     {}\n  soilMoisture {}",
                format_value(reading.temperature, " C"),
                format_value(reading.humidity, " %"),
                reading.soil_moisture.value()
            )
        }
    }
}

fn format_rejected(topic: &str, payload: &[u8], reason: &str, format: &OutputFormat) -> String {
    let timestamp = chrono::Utc::now().format("%H:%M:%S");
    let text = String::from_utf8_lossy(payload);

    match format {
        OutputFormat::Json => serde_json::json!({
            "timestamp": timestamp.to_string(),
            "topic": topic,
            "error": reason,
            "payload": text,
        })
        .to_string(),
        OutputFormat::Compact => format!("{timestamp} {topic} REJECTED {reason}: {text}"),
        OutputFormat::Pretty => {
            format!("{ERROR_COLOR}[REJECTED]{RESET} {timestamp} {topic}\n  {reason}\n  {text}")
        }
    }
}

fn setup_mqtt_client(args: &Args) -> (AsyncClient, EventLoop) {
    let client_id = format!("garden-monitor-{}", std::process::id());
    let mut mqtt_options = MqttOptions::new(client_id, &args.broker_host, args.broker_port);
    mqtt_options.set_keep_alive(Duration::from_secs(60));
    mqtt_options.set_clean_session(true);

    AsyncClient::new(mqtt_options, 10)
}

/// Poll until the connection drops; returns whether it ever came up
async fn watch_channel(args: &Args, eventloop: &mut EventLoop) -> bool {
    let mut connection_stable = false;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let topic = &publish.topic;
                let line = match Payload::decode(&publish.payload) {
                    Ok(reading) => format_reading(&reading, topic, &args.format),
                    Err(e) => format_rejected(topic, &publish.payload, &e.to_string(), &args.format),
                };
                println!("{line}");
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Connected to MQTT broker");
                connection_stable = true;
            }
            Ok(Event::Incoming(Packet::SubAck(_))) => {
                info!(channel = %args.channel, "Subscribed");
            }
            Ok(_) => {}
            Err(e) => {
                if connection_stable {
                    warn!("MQTT connection lost: {}", e);
                } else {
                    error!("MQTT connection error during setup: {}", e);
                }
                return connection_stable;
            }
        }
    }
}

async fn monitor(args: &Args) {
    let mut reconnect_delay = 1;

    loop {
        info!(
            broker = %format!("{}:{}", args.broker_host, args.broker_port),
            "Connecting to MQTT broker"
        );
        let (client, mut eventloop) = setup_mqtt_client(args);

        if let Err(e) = client.subscribe(&args.channel, QoS::AtMostOnce).await {
            error!("Failed to subscribe to {}: {}", args.channel, e);
        } else if watch_channel(args, &mut eventloop).await {
            reconnect_delay = 1;
        }

        warn!("Reconnecting in {} seconds...", reconnect_delay);
        tokio::time::sleep(Duration::from_secs(reconnect_delay)).await;
        reconnect_delay = std::cmp::min(reconnect_delay * 2, MAX_RECONNECT_DELAY);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("garden_monitor=info,rumqttc=warn")
        .init();

    let args = Args::parse();

    println!("Garden Monitor");
    println!("==============");
    println!("Channel: {}", args.channel);
    println!("MQTT Broker: {}:{}", args.broker_host, args.broker_port);
    println!("Press Ctrl+C to stop monitoring");
    println!();

    tokio::select! {
        _ = monitor(&args) => {}
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down monitor");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_line() {
        let line = format_reading(
            &Reading::new(23.5, 60.2, 512),
            "smartGarden/data",
            &OutputFormat::Compact,
        );

        assert!(line.ends_with(
            "smartGarden/data temperature=23.50C humidity=60.20% soilMoisture=512"
        ));
    }

    #[test]
    fn test_json_line_marks_incomplete_reading() {
        let reading = Payload::decode(br#"{"temperature":-999.00,"humidity":50.00,"soilMoisture":3}"#)
            .unwrap();

        let line = format_reading(&reading, "smartGarden/data", &OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert!(value["temperature"].is_null());
        assert_eq!(value["soilMoisture"], 3);
        assert_eq!(value["complete"], false);
    }

    #[test]
    fn test_rejected_payload_is_shown() {
        let line = format_rejected(
            "smartGarden/data",
            b"garbage",
            "Malformed payload",
            &OutputFormat::Compact,
        );

        assert!(line.contains("REJECTED Malformed payload: garbage"));
    }
}
