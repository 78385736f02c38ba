pub mod bus;

pub use bus::{BusObserver, EventBus};
