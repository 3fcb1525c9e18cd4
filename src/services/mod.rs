//! Service layer modules

pub mod queue;
pub mod intake;
pub mod register;
pub mod pool;

pub use queue::QueueService;
pub use intake::IntakeService;
pub use register::RegisterService;
pub use pool::PoolService;

use sqlx::PgPool;
use crate::config::Settings;

/// Factory for creating all services with their dependencies wired up
#[derive(Clone)]
pub struct ServiceFactory {
    pub queue: QueueService,
    pub intake: IntakeService,
    pub register: RegisterService,
    pub pool: PoolService,
}

impl ServiceFactory {
    pub fn new(db: PgPool, settings: &Settings) -> Self {
        Self {
            queue: QueueService::new(db.clone(), settings.queue.clone()),
            intake: IntakeService::new(db.clone()),
            register: RegisterService::new(db.clone()),
            pool: PoolService::new(db),
        }
    }
}
