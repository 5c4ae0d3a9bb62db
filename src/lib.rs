pub mod clock;
pub mod config;
pub mod domain {
    pub mod payment;
}
pub mod health {
    pub mod monitor;
}
pub mod http {
    pub mod handlers {
        pub mod payments;
    }
}
pub mod processors;
pub mod service {
    pub mod dispatcher;
    pub mod enqueuer;
}
pub mod store {
    pub mod audit;
    pub mod memory;
    pub mod queue;
    pub mod records;
    pub mod store_redis;
}

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub enqueuer: service::enqueuer::Enqueuer,
    pub records: Arc<dyn store::records::RecordStore>,
}
