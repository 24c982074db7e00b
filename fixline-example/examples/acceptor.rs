/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX acceptor example.
//!
//! Accepts any counterparty, fills every NewOrderSingle (`35=D`) with an
//! ExecutionReport (`35=8`) and logs session activity.

use async_trait::async_trait;
use fixline::prelude::*;
use fixline_example::{ExampleConfig, init_logging};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tracing::{info, warn};

/// Logs session activity and forwards orders to the matching loop.
struct OrderDesk {
    orders: UnboundedSender<(SessionId, Message)>,
}

#[async_trait]
impl Application for OrderDesk {
    async fn on_create(&self, session_id: &SessionId) {
        info!(session = %session_id, "session created");
    }

    async fn on_logon(&self, session_id: &SessionId) {
        info!(session = %session_id, "logon");
    }

    async fn on_message(&self, message: &Message, session_id: &SessionId) {
        if message.msg_type() == Some(MsgType::Other("D".into()))
            && self.orders.send((session_id.clone(), message.clone())).is_err()
        {
            warn!(session = %session_id, "order desk closed");
        }
    }

    async fn on_error(&self, severity: Severity, description: &str, session_id: &SessionId) {
        warn!(session = %session_id, %severity, description, "session error");
    }

    async fn on_logout(&self, session_id: &SessionId) {
        info!(session = %session_id, "session ended");
    }
}

fn execution_report(order: &Message, exec_id: u64) -> Message {
    let field = |tag| order.get(tag).unwrap_or_default().to_string();
    Message::of_type(MsgType::Other("8".into()))
        .with(37, format!("ORD{exec_id}"))
        .with(17, format!("EXEC{exec_id}"))
        .with(11, field(11))
        .with(55, field(55))
        .with(54, field(54))
        .with(38, field(38))
        .with(150, "2")
        .with(39, "2")
        .with(14, field(38))
        .with(151, "0")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cfg = ExampleConfig::server();

    let store: Arc<dyn MessageStore> = match &cfg.store_dir {
        Some(dir) => Arc::new(FileStore::open(dir).await?),
        None => Arc::new(MemoryStore::new()),
    };
    let (orders, mut incoming) = unbounded_channel();
    let acceptor = Arc::new(
        EngineBuilder::new()
            .with_application(OrderDesk { orders })
            .with_store(store)
            .with_heartbeat_interval(cfg.heartbeat_interval)
            .acceptor(cfg.addr())
            .await?,
    );
    info!(addr = %acceptor.local_addr()?, "accepting connections");

    let desk = Arc::clone(&acceptor);
    tokio::spawn(async move {
        let mut exec_id = 0;
        while let Some((session_id, order)) = incoming.recv().await {
            exec_id += 1;
            let Some(handle) = desk.session(&session_id) else {
                warn!(session = %session_id, "session gone before fill");
                continue;
            };
            if let Err(err) = handle.send(execution_report(&order, exec_id)).await {
                warn!(error = %err, "could not send fill");
            }
        }
    });

    acceptor.run().await?;
    Ok(())
}
