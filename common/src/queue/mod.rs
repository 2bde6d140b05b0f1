// Queue access: fanning one message per client out to the broker

mod nats;
pub mod publisher;

pub use nats::{NatsClient, NatsConfig};
pub use publisher::{ClientNotifier, NatsClientNotifier, NotifyMessage};
