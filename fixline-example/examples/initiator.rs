/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX initiator example.
//!
//! Logs on, sends a few NewOrderSingle messages, waits for their fills and
//! logs out.

use async_trait::async_trait;
use fixline::prelude::*;
use fixline_example::{ExampleConfig, init_logging};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

const ORDERS: usize = 3;

/// Logs session activity and wakes the main task on logon and fills.
#[derive(Default)]
struct Trader {
    logged_on: Notify,
    filled: Notify,
}

#[async_trait]
impl Application for Trader {
    async fn on_create(&self, session_id: &SessionId) {
        info!(session = %session_id, "session created");
    }

    async fn on_logon(&self, session_id: &SessionId) {
        info!(session = %session_id, "logon accepted");
        self.logged_on.notify_one();
    }

    async fn on_message(&self, message: &Message, _session_id: &SessionId) {
        if message.msg_type() == Some(MsgType::Other("8".into())) {
            info!(
                cl_ord_id = message.get(11).unwrap_or_default(),
                exec_id = message.get(17).unwrap_or_default(),
                "fill"
            );
            self.filled.notify_one();
        }
    }

    async fn on_error(&self, severity: Severity, description: &str, session_id: &SessionId) {
        warn!(session = %session_id, %severity, description, "session error");
    }

    async fn on_logout(&self, session_id: &SessionId) {
        info!(session = %session_id, "session ended");
    }
}

fn new_order(n: usize) -> Message {
    Message::of_type(MsgType::Other("D".into()))
        .with(11, format!("CL{n}"))
        .with(21, "1")
        .with(55, "MSFT")
        .with(54, if n % 2 == 0 { "1" } else { "2" })
        .with(60, Timestamp::now().to_string())
        .with(38, "100")
        .with(40, "1")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cfg = ExampleConfig::client();

    let store: Arc<dyn MessageStore> = match &cfg.store_dir {
        Some(dir) => Arc::new(FileStore::open(dir).await?),
        None => Arc::new(MemoryStore::new()),
    };
    let trader = Arc::new(Trader::default());
    let id = SessionId::new(&cfg.begin_string, &cfg.sender_comp_id, &cfg.target_comp_id);
    let initiator = EngineBuilder::new()
        .with_shared_application(Arc::clone(&trader))
        .with_store(store)
        .with_heartbeat_interval(cfg.heartbeat_interval)
        .initiator(&id);

    info!(addr = %cfg.addr(), "connecting");
    let running = initiator.connect(cfg.addr()).await?;
    running.handle().logon().await?;
    tokio::time::timeout(Duration::from_secs(10), trader.logged_on.notified()).await?;

    for n in 0..ORDERS {
        running.handle().send(new_order(n)).await?;
        if tokio::time::timeout(Duration::from_secs(5), trader.filled.notified())
            .await
            .is_err()
        {
            warn!(order = n, "no fill received");
        }
    }

    running.handle().logoff().await?;
    let session = running.join().await?;
    info!(
        outgoing = session.outgoing_seq_num(),
        incoming = session.incoming_seq_num(),
        "done"
    );
    Ok(())
}
