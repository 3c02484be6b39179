//! Refund queue and worker
//!
//! Cancelling a paid booking must not wait on the gateway, so the ledger
//! only enqueues. The worker drains the queue in the background and hands
//! each request to the reconciler.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use super::reconciler::PaymentReconciler;
use crate::shared::shutdown::ShutdownSignal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub booking_id: Uuid,
    pub gateway_payment_id: String,
    pub amount: i64,
}

#[derive(Clone)]
pub struct RefundQueue {
    sender: mpsc::UnboundedSender<RefundRequest>,
}

impl RefundQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RefundRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn enqueue(&self, request: RefundRequest) {
        let booking_id = request.booking_id;
        if self.sender.send(request).is_err() {
            error!(%booking_id, "Refund worker is gone, refund stays pending");
        } else {
            info!(%booking_id, "Refund queued");
        }
    }
}

pub struct RefundWorker {
    reconciler: Arc<PaymentReconciler>,
    receiver: mpsc::UnboundedReceiver<RefundRequest>,
}

impl RefundWorker {
    pub fn new(
        reconciler: Arc<PaymentReconciler>,
        receiver: mpsc::UnboundedReceiver<RefundRequest>,
    ) -> Self {
        Self {
            reconciler,
            receiver,
        }
    }

    pub fn start(mut self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Refund worker started");
            loop {
                tokio::select! {
                    next = self.receiver.recv() => match next {
                        Some(request) => self.process(request).await,
                        None => break,
                    },
                    _ = shutdown.wait() => {
                        info!("Refund worker shutting down");
                        break;
                    }
                }
            }
            info!("Refund worker stopped");
        })
    }

    /// Process everything queued right now, without waiting for more.
    pub async fn drain(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(request) = self.receiver.try_recv() {
            self.process(request).await;
            processed += 1;
        }
        processed
    }

    async fn process(&self, request: RefundRequest) {
        if let Err(e) = self.reconciler.initiate_refund(&request).await {
            metrics::counter!("refunds_total", "outcome" => "failed").increment(1);
            error!(
                booking_id = %request.booking_id,
                payment_id = %request.gateway_payment_id,
                error = %e,
                "Refund failed, booking stays refund_pending"
            );
        }
    }
}
