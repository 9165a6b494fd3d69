//! AMQP feed.
//!
//! Binds a queue to a topic exchange with one routing key per payload kind
//! and applies every delivery to the engine. The default exchange,
//! `amq.topic`, is where RabbitMQ's MQTT plugin publishes, so devices
//! publishing to `roboflow/env` arrive under the routing key `roboflow.env`.

use std::sync::Arc;

use anyhow::{Context, Result};
use flowwatch_types::FeedStatus;
use futures_util::StreamExt;
use lapin::options::{
    BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, info, warn};

use crate::app::{App, AMQP_FEED};
use crate::ingest::{ingest, Inbound};
use crate::settings::AmqpSettings;

/// Payload kind for a routing key, if it is one we bound.
pub fn route(settings: &AmqpSettings, routing_key: &str) -> Option<Inbound> {
    if routing_key == settings.kpi_key {
        Some(Inbound::Kpi)
    } else if routing_key == settings.environment_key {
        Some(Inbound::Environment)
    } else if routing_key == settings.eventlog_key {
        Some(Inbound::EventLog)
    } else {
        None
    }
}

/// Run the feed until the task is cancelled, reconnecting after every
/// failure. Returns immediately if no broker is configured.
pub async fn run(settings: AmqpSettings, app: Arc<App>) -> Result<()> {
    let Some(uri) = settings.uri.clone() else {
        app.feeds.set_status(AMQP_FEED, FeedStatus::Disabled);
        info!("AMQP feed not configured");
        return Ok(());
    };
    let delay = settings.reconnect_delay()?;

    loop {
        app.feeds.set_status(AMQP_FEED, FeedStatus::Connecting);
        match consume(&uri, &settings, &app).await {
            Ok(()) => warn!("AMQP consumer ended"),
            Err(e) => warn!(error = %format!("{e:#}"), "AMQP feed failed"),
        }
        app.feeds.set_status(AMQP_FEED, FeedStatus::Connecting);
        tokio::time::sleep(delay).await;
    }
}

async fn consume(uri: &str, settings: &AmqpSettings, app: &App) -> Result<()> {
    let connection = Connection::connect(uri, ConnectionProperties::default())
        .await
        .context("connect")?;
    let channel = connection.create_channel().await.context("open channel")?;

    // Broker-defined exchanges cannot be redeclared.
    if !settings.exchange.starts_with("amq.") {
        channel
            .exchange_declare(
                &settings.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("declare exchange")?;
    }

    let queue_options = match settings.queue {
        Some(_) => QueueDeclareOptions {
            durable: true,
            ..Default::default()
        },
        None => QueueDeclareOptions {
            exclusive: true,
            auto_delete: true,
            ..Default::default()
        },
    };
    let queue = channel
        .queue_declare(
            settings.queue.as_deref().unwrap_or(""),
            queue_options,
            FieldTable::default(),
        )
        .await
        .context("declare queue")?;

    for key in [
        &settings.kpi_key,
        &settings.environment_key,
        &settings.eventlog_key,
    ] {
        channel
            .queue_bind(
                queue.name().as_str(),
                &settings.exchange,
                key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("bind {key}"))?;
    }

    let mut consumer = channel
        .basic_consume(
            queue.name().as_str(),
            "flowwatch",
            BasicConsumeOptions {
                no_ack: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("start consumer")?;

    app.feeds.set_status(AMQP_FEED, FeedStatus::Active);
    info!(exchange = %settings.exchange, queue = queue.name().as_str(), "AMQP feed active");

    while let Some(delivery) = consumer.next().await {
        let delivery = delivery.context("delivery")?;
        let routing_key = delivery.routing_key.as_str();

        let Some(kind) = route(settings, routing_key) else {
            debug!(routing_key, "ignoring unrouted delivery");
            continue;
        };
        if let Err(e) = ingest(app, kind, &delivery.data) {
            warn!(routing_key, error = %format!("{e:#}"), "dropping AMQP payload");
        }
    }
    Ok(())
}
