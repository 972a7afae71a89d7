//! Background reconciliation: supervisors discover entities with work
//! pending and drive their state machines forward one tick at a time.

mod account;
mod scheduler;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

pub use account::{AccountStore, AccountSupervisor};
pub use scheduler::Scheduler;

/// A unit of schedulable background work.
///
/// Both supervisors and the scheduler wrapping them expose this surface, so
/// API handlers can poke whichever they are handed.
#[async_trait]
pub trait Doer: Send + Sync {
    async fn do_work(&self) -> Result<()>;
}

/// Runs a set of doers in registration order.
#[derive(Default)]
pub struct MultiDoer {
    doers: Vec<Arc<dyn Doer>>,
}

impl MultiDoer {
    pub fn new(doers: Vec<Arc<dyn Doer>>) -> Self {
        Self { doers }
    }

    pub fn push(&mut self, doer: Arc<dyn Doer>) {
        self.doers.push(doer);
    }

    pub fn is_empty(&self) -> bool {
        self.doers.is_empty()
    }
}

#[async_trait]
impl Doer for MultiDoer {
    async fn do_work(&self) -> Result<()> {
        for doer in &self.doers {
            doer.do_work().await?;
        }
        Ok(())
    }
}
