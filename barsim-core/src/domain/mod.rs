//! Domain types for the simulation kernel

pub mod bar;
pub mod fill;
pub mod ids;
pub mod order;
pub mod snapshot;
pub mod trade;

pub use bar::Bar;
pub use fill::Fill;
pub use ids::{IdGen, OrderId};
pub use order::{Order, OrderError, OrderKind, OrderRequest, OrderSide, OrderType};
pub use snapshot::{EquityPoint, HoldingsSnapshot, PositionSnapshot};
pub use trade::{ClosedTrade, OpenLot, TradeDirection};

/// Symbol type alias
pub type Symbol = String;
