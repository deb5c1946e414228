use std::path::PathBuf;
use std::sync::Arc;

use shared::message::NotificationPayload;
use shared::order::Topic;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result};
use crate::message::EventBus;
use crate::orders::{CheckoutMerger, ManagerConfig, OrderStorage, OrdersManager};
use crate::services::{
    Catalog, CatalogService, EventBusService, ManualTerminalGateway, PaymentGateway,
};

/// Server state - shared handles to every service
///
/// Cloning is cheap: every field is an `Arc` or wraps one.
///
/// | Field | Type | Purpose |
/// |-------|------|---------|
/// | config | Config | Settings (immutable) |
/// | orders | Arc<OrdersManager> | Sole writer of order state |
/// | checkout | CheckoutMerger | Per-table bills and settlement |
/// | catalog | Arc<CatalogService> | Price snapshot source |
/// | event_bus | EventBusService | Topic fan-out and TCP subscribers |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub orders: Arc<OrdersManager>,
    pub checkout: CheckoutMerger,
    pub catalog: Arc<CatalogService>,
    pub event_bus: EventBusService,
}

impl ServerState {
    /// Wire the services together
    ///
    /// `storage` is opened by the caller; the gateway is injected so tests
    /// can script charge outcomes.
    pub fn new(
        config: Config,
        storage: OrderStorage,
        catalog: Arc<CatalogService>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let mut manager = OrdersManager::with_storage(storage, ManagerConfig::from_config(&config));
        manager.set_catalog(catalog.clone() as Arc<dyn Catalog>);
        let orders = Arc::new(manager);
        let checkout = CheckoutMerger::new(orders.clone(), gateway);
        let event_bus = EventBusService::new(&config);

        Self {
            config,
            orders,
            checkout,
            catalog,
            event_bus,
        }
    }

    /// Initialize server state
    ///
    /// In order:
    /// 1. Work directory structure
    /// 2. Order database (`work_dir/database/orders.redb`)
    /// 3. Services
    pub fn initialize(config: &Config) -> Result<Self> {
        config
            .ensure_work_dir_structure()
            .map_err(crate::core::ServerError::WorkDir)?;

        let db_path = config.database_path();
        let storage = OrderStorage::open(&db_path)?;
        tracing::info!(
            path = %db_path.display(),
            open_orders = storage.open_order_count()?,
            sequence = storage.current_sequence()?,
            "Order database opened"
        );

        Ok(Self::new(
            config.clone(),
            storage,
            Arc::new(CatalogService::new()),
            Arc::new(ManualTerminalGateway),
        ))
    }

    /// Start background tasks
    ///
    /// Must be called before serving, or committed events never reach the
    /// bus. The returned handle shares the bus shutdown token.
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::with_token(self.bus().shutdown_token().clone());
        self.event_bus.start_background_tasks(&self.orders, &mut tasks);
        tasks
    }

    /// Start the TCP subscriber server as a background worker
    pub fn start_tcp_server(&self, tasks: &mut BackgroundTasks) {
        let event_bus = self.event_bus.clone();
        tasks.spawn("event_bus_tcp", TaskKind::Worker, async move {
            if let Err(e) = event_bus.start_tcp_server().await {
                tracing::error!("Event bus TCP server failed: {}", e);
            }
        });
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        self.event_bus.bus()
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }

    /// Publish a notification on one topic
    pub fn notify(&self, topic: &Topic, payload: &NotificationPayload) -> usize {
        self.bus().notify(topic, payload)
    }
}
