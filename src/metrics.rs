//! Prometheus metrics for the chat core, rendered at `GET /metrics`.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub registered_connections: IntGauge,
    pub ws_connections_open: IntGauge,
    pub messages_broadcast: IntCounter,
    pub frames_rejected: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let registered_connections = IntGauge::new(
            "chat_registered_connections",
            "Connections currently registered for chat broadcasts",
        )?;
        let ws_connections_open =
            IntGauge::new("ws_connections_open", "Open WebSocket connections")?;
        let messages_broadcast = IntCounter::new(
            "chat_messages_broadcast_total",
            "Chat messages persisted and fanned out",
        )?;
        let frames_rejected = IntCounterVec::new(
            Opts::new("chat_frames_rejected_total", "Frames answered with an error frame"),
            &["kind"],
        )?;

        registry.register(Box::new(registered_connections.clone()))?;
        registry.register(Box::new(ws_connections_open.clone()))?;
        registry.register(Box::new(messages_broadcast.clone()))?;
        registry.register(Box::new(frames_rejected.clone()))?;

        Ok(Metrics {
            registry,
            registered_connections,
            ws_connections_open,
            messages_broadcast,
            frames_rejected,
        })
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
