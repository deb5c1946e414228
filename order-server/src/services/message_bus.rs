use std::sync::Arc;

use tokio::net::TcpListener;

use crate::core::Config;
use crate::core::event_router::EventRouter;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::message::{EventBus, TransportConfig};
use crate::orders::OrdersManager;
use crate::utils::AppError;

/// Event bus service
///
/// Wraps [`EventBus`] with:
/// - TCP subscriber server startup
/// - the router that feeds it from `OrdersManager`
#[derive(Clone, Debug)]
pub struct EventBusService {
    bus: Arc<EventBus>,
    tcp_port: u16,
}

impl EventBusService {
    pub fn new(config: &Config) -> Self {
        let transport_config = TransportConfig {
            tcp_listen_addr: format!("0.0.0.0:{}", config.message_tcp_port),
            channel_capacity: config.event_channel_capacity,
        };

        Self {
            bus: Arc::new(EventBus::from_config(transport_config)),
            tcp_port: config.message_tcp_port,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Bind the configured port and serve subscribers until shutdown
    pub async fn start_tcp_server(&self) -> Result<(), AppError> {
        tracing::debug!(port = self.tcp_port, "Starting event bus TCP server");
        self.bus.start_tcp_server().await
    }

    /// Serve subscribers on a listener bound by the caller
    pub async fn serve(&self, listener: TcpListener) -> Result<(), AppError> {
        self.bus.serve(listener).await
    }

    /// Start the router from `orders` onto the bus
    pub fn start_background_tasks(&self, orders: &OrdersManager, tasks: &mut BackgroundTasks) {
        let router = EventRouter::new(self.bus.clone());
        let events = orders.subscribe();
        let alerts = orders.subscribe_alerts();
        let shutdown = tasks.shutdown_token();

        tasks.spawn("event_router", TaskKind::Listener, async move {
            router.run(events, alerts, shutdown).await;
        });
    }
}
