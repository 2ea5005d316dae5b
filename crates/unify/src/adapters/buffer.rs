use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// What the producer does when the queue is full.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum FullMode {
    /// Suspend the producer until the consumer makes room. Order preserving.
    #[default]
    Wait,
    /// Evict the oldest queued item to admit the new one.
    DropOldest,
    /// Discard the incoming item.
    DropNewest,
}

#[derive(Debug, Clone)]
pub struct BufferConfig {
    pub capacity: usize,
    pub full_mode: FullMode,
    pub cancellation: CancellationToken,
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig {
            capacity: 64,
            full_mode: FullMode::Wait,
            cancellation: CancellationToken::new(),
        }
    }
}

impl BufferConfig {
    pub fn new(capacity: usize, full_mode: FullMode) -> Self {
        BufferConfig {
            capacity: capacity.max(1),
            full_mode,
            ..Default::default()
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    consumer_gone: bool,
}

struct Shared<T> {
    queue: Mutex<QueueState<T>>,
    /// Signals the consumer that an item (or closure) is available.
    items: Notify,
    /// Signals a Wait-mode producer that room was made.
    space: Notify,
    dropped: AtomicU64,
}

/// Interposes a bounded queue between a spawned producer task and the
/// consumer. The producer runs ahead up to `capacity` items; beyond that the
/// configured [`FullMode`] applies. Dropping the consumer, or cancelling the
/// configured token, stops the producer.
pub fn bounded<S>(stream: S, config: BufferConfig) -> BoundedBuffer<S::Item>
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    let capacity = config.capacity.max(1);
    let shared = Arc::new(Shared {
        queue: Mutex::new(QueueState {
            items: VecDeque::with_capacity(capacity),
            closed: false,
            consumer_gone: false,
        }),
        items: Notify::new(),
        space: Notify::new(),
        dropped: AtomicU64::new(0),
    });

    let producer = shared.clone();
    let full_mode = config.full_mode;
    let cancellation = config.cancellation;
    tokio::spawn(async move {
        futures::pin_mut!(stream);
        loop {
            let next = tokio::select! {
                _ = cancellation.cancelled() => None,
                next = stream.next() => next,
            };
            let Some(item) = next else { break };

            match full_mode {
                FullMode::Wait => {
                    let mut pending = Some(item);
                    loop {
                        {
                            let mut queue = producer.queue.lock().unwrap();
                            if queue.consumer_gone {
                                return;
                            }
                            if queue.items.len() < capacity {
                                queue.items.push_back(pending.take().unwrap());
                            }
                        }
                        if pending.is_none() {
                            break;
                        }
                        producer.space.notified().await;
                    }
                }
                FullMode::DropOldest => {
                    let mut queue = producer.queue.lock().unwrap();
                    if queue.items.len() >= capacity {
                        queue.items.pop_front();
                        producer.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    queue.items.push_back(item);
                }
                FullMode::DropNewest => {
                    let mut queue = producer.queue.lock().unwrap();
                    if queue.items.len() >= capacity {
                        producer.dropped.fetch_add(1, Ordering::Relaxed);
                    } else {
                        queue.items.push_back(item);
                    }
                }
            }
            producer.items.notify_one();
        }

        producer.queue.lock().unwrap().closed = true;
        producer.items.notify_one();
        let dropped = producer.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            tracing::warn!(dropped, "bounded buffer discarded items");
        }
    });

    let consumer = shared.clone();
    let inner = futures::stream::unfold(consumer, |shared| async move {
        loop {
            let notified = shared.items.notified();
            let popped = {
                let mut queue = shared.queue.lock().unwrap();
                if let Some(item) = queue.items.pop_front() {
                    drop(queue);
                    shared.space.notify_one();
                    Some(item)
                } else if queue.closed {
                    return None;
                } else {
                    None
                }
            };
            if let Some(item) = popped {
                drop(notified);
                return Some((item, shared));
            }
            notified.await;
        }
    })
    .boxed();

    BoundedBuffer { inner, shared }
}

pub struct BoundedBuffer<T> {
    inner: BoxStream<'static, T>,
    shared: Arc<Shared<T>>,
}

impl<T> BoundedBuffer<T> {
    /// How many items the drop modes have discarded so far.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl<T> Stream for BoundedBuffer<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}

impl<T> Drop for BoundedBuffer<T> {
    fn drop(&mut self) {
        self.shared.queue.lock().unwrap().consumer_gone = true;
        self.shared.space.notify_one();
    }
}
