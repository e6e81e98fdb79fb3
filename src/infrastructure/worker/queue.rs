//! Task Queue - 有界并发任务队列
//!
//! 固定数量的常驻 worker 从同一个 channel 消费任务：
//! - worker 在第一次 push 时启动，之后伴随队列整个生命周期
//! - 队列被丢弃（所有 sender 释放）后 channel 关闭，worker 自然退出
//! - 单个 worker 按提交顺序执行，跨 worker 的完成顺序不保证

use futures_util::future::BoxFuture;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// 队列任务
pub type Task = BoxFuture<'static, ()>;

pub struct TaskQueue {
    sender: mpsc::Sender<Task>,
    /// 首次 push 时取出并交给 worker
    receiver: Mutex<Option<mpsc::Receiver<Task>>>,
    concurrency: usize,
}

impl TaskQueue {
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        let (sender, receiver) = mpsc::channel(concurrency);
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            concurrency,
        }
    }

    /// 提交任务
    ///
    /// channel 满时等待，调用方应在独立任务中调用
    pub async fn push(&self, task: Task) {
        self.start_workers();
        if self.sender.send(task).await.is_err() {
            tracing::warn!("Task queue closed, task dropped");
        }
    }

    fn start_workers(&self) {
        let receiver = match self.receiver.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        let Some(receiver) = receiver else {
            return;
        };

        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        for id in 0..self.concurrency {
            tokio::spawn(run_worker(id, receiver.clone()));
        }
        tracing::debug!(concurrency = self.concurrency, "Task queue workers started");
    }
}

async fn run_worker(id: usize, receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Task>>>) {
    loop {
        let task = receiver.lock().await.recv().await;
        match task {
            Some(task) => task.await,
            None => break,
        }
    }
    tracing::trace!(worker = id, "Task queue worker stopped");
}
