//! Services - collaborators the order core talks to
//!
//! - [`EventBusService`] - event bus, TCP subscribers, manager → bus router
//! - [`CatalogService`] - unit price lookup for new orders
//! - [`PaymentGateway`] - card and QR charges at settlement

pub mod catalog_service;
pub mod message_bus;
pub mod payment_gateway;

pub use catalog_service::{Catalog, CatalogService};
pub use message_bus::EventBusService;
pub use payment_gateway::{
    ChargeReceipt, ChargeRequest, GatewayError, ManualTerminalGateway, PaymentGateway,
};
