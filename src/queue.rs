use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::language::Language;
use crate::translation::Translator;

struct Job {
    text: String,
    language: Language,
    reply: oneshot::Sender<Result<String>>,
}

/// Single-consumer FIFO in front of a [`Translator`].
///
/// One worker task owns the receiving end of the channel, runs jobs one at a
/// time in submission order and pauses for `delay` after each job whatever
/// its outcome.
#[derive(Clone)]
pub struct TranslationQueue {
    sender: mpsc::UnboundedSender<Job>,
    pending: Arc<AtomicUsize>,
}

/// Resolves to the outcome of one submitted translation.
pub struct TranslationTicket {
    receiver: Option<oneshot::Receiver<Result<String>>>,
}

impl Future for TranslationTicket {
    type Output = Result<String>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.receiver.as_mut() {
            Some(receiver) => Pin::new(receiver)
                .poll(cx)
                .map(|outcome| outcome.unwrap_or_else(|_| Err(Error::QueueClosed))),
            None => Poll::Ready(Err(Error::QueueClosed)),
        }
    }
}

impl TranslationQueue {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(translator: Arc<Translator>, delay: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        tokio::spawn(run_worker(receiver, translator, delay, pending.clone()));

        Self { sender, pending }
    }

    pub fn submit(&self, text: impl Into<String>, language: Language) -> TranslationTicket {
        let (reply, receiver) = oneshot::channel();
        let job = Job {
            text: text.into(),
            language,
            reply,
        };

        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            warn!("Translation worker has stopped; rejecting job");
            return TranslationTicket { receiver: None };
        }

        TranslationTicket {
            receiver: Some(receiver),
        }
    }

    pub async fn translate(&self, text: impl Into<String>, language: Language) -> Result<String> {
        self.submit(text, language).await
    }

    /// Jobs submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

async fn run_worker(
    mut jobs: mpsc::UnboundedReceiver<Job>,
    translator: Arc<Translator>,
    delay: Duration,
    pending: Arc<AtomicUsize>,
) {
    while let Some(job) = jobs.recv().await {
        let Job {
            text,
            language,
            reply,
        } = job;

        // Each job runs in its own task so a panic fails only that job
        let translator = translator.clone();
        let result = tokio::spawn(async move { translator.translate(&text, language).await })
            .await
            .unwrap_or_else(|e| {
                error!(language = language.code(), error = %e, "Queued translation aborted");
                Err(Error::JobAborted(e.to_string()))
            });
        if let Err(e) = &result {
            warn!(language = language.code(), error = %e, "Queued translation failed");
        }

        if reply.send(result).is_err() {
            debug!("Translation caller went away before the result was ready");
        }
        pending.fetch_sub(1, Ordering::SeqCst);

        tokio::time::sleep(delay).await;
    }

    debug!("Translation queue closed, worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThrottleSettings;
    use crate::error::ServiceError;
    use crate::generator::fake::ScriptedGenerator;
    use tokio_test::{assert_ok, assert_pending, assert_ready, task};

    fn queue(generator: Arc<ScriptedGenerator>) -> TranslationQueue {
        let translator = Translator::from_settings(generator, &ThrottleSettings::default()).unwrap();
        TranslationQueue::spawn(Arc::new(translator), Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_run_in_fifo_order_with_spacing() {
        let generator = Arc::new(ScriptedGenerator::echo(""));
        let queue = queue(generator.clone());

        let first = queue.submit("one", Language::Hindi);
        let second = queue.submit("two", Language::Hindi);
        let third = queue.submit("three", Language::Hindi);
        assert_eq!(queue.pending(), 3);

        let (a, b, c) = tokio::join!(third, first, second);
        assert_eq!(a.unwrap(), "three");
        assert_eq!(b.unwrap(), "one");
        assert_eq!(c.unwrap(), "two");

        let prompts = generator.prompts();
        assert!(prompts[0].ends_with("one"));
        assert!(prompts[1].ends_with("two"));
        assert!(prompts[2].ends_with("three"));

        let times = generator.call_times();
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_only_rejects_its_own_job() {
        let generator = Arc::new(ScriptedGenerator::new(|prompt, _| {
            if prompt.ends_with("bad") {
                Err(ServiceError::unavailable("refused"))
            } else {
                Ok("fine".to_string())
            }
        }));
        let queue = queue(generator.clone());

        let good = queue.submit("good", Language::Arabic);
        let bad = queue.submit("bad", Language::Arabic);
        let after = queue.submit("after", Language::Arabic);

        assert_eq!(good.await.unwrap(), "fine");
        assert!(matches!(bad.await, Err(Error::TranslationFailed { attempts: 3, .. })));
        assert_eq!(after.await.unwrap(), "fine");
        // 1 + 3 + 1 remote calls
        assert_eq!(generator.call_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_text_hits_cache_through_queue() {
        let generator = Arc::new(ScriptedGenerator::echo("id:"));
        let queue = queue(generator.clone());

        let a = queue.translate("Gravity", Language::Indonesian).await.unwrap();
        let b = queue.translate("Gravity", Language::Indonesian).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_job_does_not_stop_the_worker() {
        let generator = Arc::new(ScriptedGenerator::new(|prompt, _| {
            if prompt.ends_with("explode") {
                panic!("generator bug");
            }
            Ok("fine".to_string())
        }));
        let queue = queue(generator.clone());

        let doomed = queue.submit("explode", Language::Hindi);
        let next = queue.submit("next", Language::Hindi);

        assert!(matches!(doomed.await, Err(Error::JobAborted(_))));
        assert_eq!(next.await.unwrap(), "fine");
        assert_eq!(queue.translate("later", Language::Hindi).await.unwrap(), "fine");
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticket_is_pending_until_worker_runs() {
        let queue = queue(Arc::new(ScriptedGenerator::echo("hi:")));

        let mut ticket = task::spawn(queue.submit("water", Language::Hindi));
        assert_pending!(ticket.poll());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(ticket.is_woken());
        let translated = assert_ok!(assert_ready!(ticket.poll()));
        assert_eq!(translated, "hi:water");
    }

    #[tokio::test]
    async fn test_closed_ticket_reports_queue_closed() {
        let ticket = TranslationTicket { receiver: None };
        assert!(matches!(ticket.await, Err(Error::QueueClosed)));
    }
}
