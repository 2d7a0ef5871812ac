//! In-process JobQueuePort backed by a tokio channel.

use crate::domain::jobs::DownloadTask;
use crate::ports::queue::{JobQueuePort, QueueError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Multi-consumer queue: workers share the receiver behind a mutex.
#[derive(Clone)]
pub struct ChannelQueue {
    sender: mpsc::UnboundedSender<DownloadTask>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<DownloadTask>>>,
    closed: CancellationToken,
}

impl ChannelQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            closed: CancellationToken::new(),
        }
    }

    /// Stop accepting tasks; workers drain what is left and exit.
    pub fn close(&self) {
        self.closed.cancel();
    }
}

impl Default for ChannelQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueuePort for ChannelQueue {
    async fn enqueue_job(&self, task: DownloadTask) -> Result<(), QueueError> {
        if self.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }
        self.sender.send(task).map_err(|_| QueueError::Closed)
    }

    async fn dequeue_job(&self) -> Result<Option<DownloadTask>, QueueError> {
        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            biased;
            task = receiver.recv() => return Ok(task),
            _ = self.closed.cancelled() => {}
        }
        // Closed: hand out what is left, then report the end.
        Ok(receiver.try_recv().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(n: u32) -> DownloadTask {
        DownloadTask {
            job_id: format!("job-{}", n),
            video_id: "abc123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = ChannelQueue::new();
        queue.enqueue_job(task(1)).await.unwrap();
        queue.enqueue_job(task(2)).await.unwrap();
        assert_eq!(queue.dequeue_job().await.unwrap(), Some(task(1)));
        assert_eq!(queue.dequeue_job().await.unwrap(), Some(task(2)));
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let queue = ChannelQueue::new();
        queue.enqueue_job(task(1)).await.unwrap();
        queue.close();

        assert!(matches!(queue.enqueue_job(task(2)).await, Err(QueueError::Closed)));
        assert_eq!(queue.dequeue_job().await.unwrap(), Some(task(1)));
        assert_eq!(queue.dequeue_job().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_close_wakes_idle_consumer() {
        let queue = ChannelQueue::new();
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue_job().await })
        };
        tokio::task::yield_now().await;
        queue.close();

        assert_eq!(consumer.await.unwrap().unwrap(), None);
    }
}
