use std::future::Future;

use tokio::task::LocalSet;

pub fn start_test(f: impl Future<Output = ()>) {
    tokio_test::block_on(async move {
        matter_ble_bridge::utils::logging::init_logging(log::LevelFilter::Debug);
        LocalSet::new().run_until(f).await;
    });
}
