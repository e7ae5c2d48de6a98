#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod abi;
pub mod checkpoint;
pub mod collections;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod registry;
pub mod scheduler;
pub mod status_scan;
pub mod traits;
pub mod types;
pub mod util;
pub mod walker;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Re-export of commonly used types.
pub mod prelude {
    pub use crate::{
        config::Config,
        dispatcher::EventDispatcher,
        errors::{IndexerError, ProviderError, StoreError, TaskError},
        registry::ContractRegistry,
        scheduler::{Scheduler, Task},
        status_scan::StatusAdvancer,
        traits::{DocStore, IndexOrder, NodeProvider},
        walker::BlockWalker,
    };
}
