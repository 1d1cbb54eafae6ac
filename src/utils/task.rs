//! This module provides utilities relating to async tasks, typically for usage
//! only in test

use std::{future::Future, time::Duration};

use tokio::{runtime::Builder, select, task::LocalSet};

/// Run the supplied future on a single-threaded runtime with paused time
pub fn block_on_locally<T>(f: impl Future<Output = T>) -> T {
    LocalSet::new().block_on(
        &Builder::new_current_thread().enable_time().start_paused(true).build().unwrap(),
        async move {
            select! {
                t = f => t,
                // NOTE: this time should be LARGER than any meaningful delay in the bridge
                _ = tokio::time::sleep(Duration::from_secs(100000)) => {
                    panic!("test appears to be stuck");
                },
            }
        },
    )
}
