// AMQP channel adapter

use crate::error::map_lapin_error;
use async_trait::async_trait;
use courier_core::application::queue_manager::constants::MESSAGE_CONTENT_TYPE;
use courier_core::error::Result;
use courier_core::port::{Acknowledger, BrokerChannel, Delivery, DeliveryStream};
use futures::StreamExt;
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions,
};
use lapin::types::{FieldTable, ShortString};
use lapin::{BasicProperties, Channel};

const DEFAULT_EXCHANGE: &str = "";
// Empty tag lets the server generate one per subscription
const SERVER_GENERATED_TAG: &str = "";
const REPLY_SUCCESS: u16 = 200;

/// Durable, deleted when unused, shared, wait for the broker's reply
pub(crate) fn queue_declare_options() -> QueueDeclareOptions {
    QueueDeclareOptions {
        passive: false,
        durable: true,
        exclusive: false,
        auto_delete: true,
        nowait: false,
    }
}

pub(crate) fn publish_options() -> BasicPublishOptions {
    BasicPublishOptions {
        mandatory: false,
        immediate: false,
    }
}

/// Manual ack, shared, local deliveries allowed, wait for the broker's reply
pub(crate) fn consume_options() -> BasicConsumeOptions {
    BasicConsumeOptions {
        no_local: false,
        no_ack: false,
        exclusive: false,
        nowait: false,
    }
}

/// lapin channel implementing [`BrokerChannel`]
pub struct AmqpChannel {
    channel: Channel,
}

impl AmqpChannel {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    async fn declare_queue(&self, queue: &str) -> Result<()> {
        self.channel
            .queue_declare(queue, queue_declare_options(), FieldTable::default())
            .await
            .map_err(|e| map_lapin_error("queue declare", e))?;
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        let properties =
            BasicProperties::default().with_content_type(ShortString::from(MESSAGE_CONTENT_TYPE));

        self.channel
            .basic_publish(DEFAULT_EXCHANGE, queue, publish_options(), payload, properties)
            .await
            .map_err(|e| map_lapin_error("publish", e))?
            .await
            .map_err(|e| map_lapin_error("publish confirm", e))?;
        Ok(())
    }

    async fn subscribe(&self, queue: &str) -> Result<DeliveryStream> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                SERVER_GENERATED_TAG,
                consume_options(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| map_lapin_error("consume", e))?;

        let deliveries = consumer.map(|delivery| {
            delivery
                .map(|d| Delivery::new(d.data, Box::new(AmqpAcker { acker: d.acker })))
                .map_err(|e| map_lapin_error("delivery", e))
        });
        Ok(deliveries.boxed())
    }

    async fn close(&self) -> Result<()> {
        if !self.channel.status().connected() {
            return Ok(());
        }
        self.channel
            .close(REPLY_SUCCESS, "unit stopped")
            .await
            .map_err(|e| map_lapin_error("channel close", e))
    }
}

struct AmqpAcker {
    acker: Acker,
}

#[async_trait]
impl Acknowledger for AmqpAcker {
    async fn ack(&self) -> Result<()> {
        self.acker
            .ack(BasicAckOptions { multiple: false })
            .await
            .map_err(|e| map_lapin_error("ack", e))
    }
}
