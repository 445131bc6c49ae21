use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::ai_reviews::{self, CompletionClient, SynthesisOverrides};
use crate::catalog;
use crate::models::{Product, Settings};
use crate::notices::NoticeBoard;
use crate::publish;
use crate::settings;

pub const PUBLISH_MODE_PUBLISH: &str = "publish";
pub const DAILY_TRIGGER_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// One deferred generate-and-publish job.
#[derive(Debug, Clone)]
pub struct ScheduledReview {
    pub id: Uuid,
    pub product_id: i64,
    pub review_length: u32,
    pub publish_mode: String,
    pub fire_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleOutcome {
    pub requested: u32,
    pub scheduled: u32,
}

impl ScheduleOutcome {
    pub fn shortfall(&self) -> bool {
        self.scheduled < self.requested
    }
}

/// Picks a uniformly shuffled subset of the candidates, capped at
/// `daily_rate`, and spaces the jobs `interval_minutes` apart starting at
/// `now`. Randomized selection plus linear spacing keeps API usage flat and
/// review arrival times organic without a real queue or rate limiter.
pub fn plan_review_schedule<R: Rng>(
    products: &[Product],
    daily_rate: u32,
    review_length: u32,
    publish_mode: &str,
    interval_minutes: u32,
    now: DateTime<Utc>,
    rng: &mut R,
) -> (Vec<ScheduledReview>, ScheduleOutcome) {
    let mut order: Vec<&Product> = products.iter().collect();
    order.shuffle(rng);

    let jobs: Vec<ScheduledReview> = order
        .iter()
        .take(daily_rate as usize)
        .enumerate()
        .map(|(k, product)| ScheduledReview {
            id: Uuid::new_v4(),
            product_id: product.id,
            review_length,
            publish_mode: publish_mode.to_string(),
            fire_at: now + chrono::Duration::seconds(k as i64 * interval_minutes as i64 * 60),
        })
        .collect();

    let outcome = ScheduleOutcome {
        requested: daily_rate,
        scheduled: jobs.len() as u32,
    };

    (jobs, outcome)
}

pub fn report_outcome(notices: &NoticeBoard, outcome: ScheduleOutcome) {
    if outcome.shortfall() {
        notices.push(format!(
            "Only {} of {} reviews scheduled today.",
            outcome.scheduled, outcome.requested
        ));
    } else {
        notices.push(format!(
            "Daily rate of {} reviews scheduled.",
            outcome.scheduled
        ));
    }
}

/// Deferred-execution capability. The production adapter sits on tokio
/// timers; tests record the calls instead.
pub trait DeferredQueue: Send + Sync {
    fn schedule_at(&self, job: ScheduledReview);
    fn schedule_recurring(&self, every: Duration);
    fn clear_scheduled(&self);
    fn pending_count(&self) -> usize;
}

/// Everything a fired job needs to run to completion.
#[derive(Clone)]
pub struct JobContext {
    pub pool: SqlitePool,
    pub completions: CompletionClient,
    pub notices: NoticeBoard,
}

/// In-process adapter over tokio tasks. Each scheduled job sleeps until its
/// fire time on its own task; clearing aborts every pending task. Firing is
/// at-least-once, best-effort: nothing survives a process restart and missed
/// executions are not compensated.
pub struct TokioReviewQueue {
    ctx: JobContext,
    me: Weak<TokioReviewQueue>,
    pending: Mutex<Vec<JoinHandle<()>>>,
    recurring: Mutex<Option<JoinHandle<()>>>,
}

impl TokioReviewQueue {
    pub fn new(ctx: JobContext) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            ctx,
            me: me.clone(),
            pending: Mutex::new(Vec::new()),
            recurring: Mutex::new(None),
        })
    }
}

impl DeferredQueue for TokioReviewQueue {
    fn schedule_at(&self, job: ScheduledReview) {
        let ctx = self.ctx.clone();
        let delay = (job.fire_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        tracing::debug!(
            job_id = %job.id,
            product_id = job.product_id,
            delay_secs = delay.as_secs(),
            "scheduling review job"
        );

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            run_scheduled_review(&ctx, &job).await;
        });

        let mut pending = self.pending.lock().expect("pending jobs lock poisoned");
        pending.retain(|handle| !handle.is_finished());
        pending.push(handle);
    }

    fn schedule_recurring(&self, every: Duration) {
        let ctx = self.ctx.clone();
        let me = self.me.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick fires immediately; skip it so a process restart
            // does not kick off a fresh batch on its own.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(queue) = me.upgrade() else { break };
                run_daily_generation(&ctx, queue.as_ref()).await;
            }
        });

        let mut recurring = self.recurring.lock().expect("recurring task lock poisoned");
        if let Some(previous) = recurring.replace(handle) {
            previous.abort();
        }
    }

    fn clear_scheduled(&self) {
        let mut pending = self.pending.lock().expect("pending jobs lock poisoned");
        let cleared = pending.len();
        for handle in pending.drain(..) {
            handle.abort();
        }
        if cleared > 0 {
            tracing::info!("cleared {} pending review jobs", cleared);
        }
    }

    fn pending_count(&self) -> usize {
        let mut pending = self.pending.lock().expect("pending jobs lock poisoned");
        pending.retain(|handle| !handle.is_finished());
        pending.len()
    }
}

/// Daily entry point. Reads the current configuration and, when auto
/// generation is allowed, plans and enqueues the day's batch.
pub async fn run_daily_generation(ctx: &JobContext, queue: &dyn DeferredQueue) {
    tracing::info!("running daily review generation");

    let config = match settings::load(&ctx.pool).await {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("failed to load settings for daily generation: {}", error);
            return;
        }
    };

    if !config.auto_generate {
        tracing::info!("auto review generation is disabled");
        return;
    }
    if config.interval_minutes == 0 {
        tracing::info!("review interval is zero, skipping scheduling");
        return;
    }

    let products = match catalog::published_products(&ctx.pool).await {
        Ok(products) => products,
        Err(error) => {
            tracing::error!("failed to load products for daily generation: {}", error);
            return;
        }
    };

    let outcome = schedule_batch(&config, &products, queue);
    report_outcome(&ctx.notices, outcome);
}

/// Plans one batch from the given configuration and hands every job to the
/// queue. Shared by the daily trigger and the settings-save path.
pub fn schedule_batch(
    config: &Settings,
    products: &[Product],
    queue: &dyn DeferredQueue,
) -> ScheduleOutcome {
    let (jobs, outcome) = {
        let mut rng = StdRng::from_os_rng();
        plan_review_schedule(
            products,
            config.daily_rate,
            ai_reviews::DEFAULT_REVIEW_LENGTH,
            PUBLISH_MODE_PUBLISH,
            config.interval_minutes,
            Utc::now(),
            &mut rng,
        )
    };

    for job in jobs {
        queue.schedule_at(job);
    }

    outcome
}

/// Runs one fired job: synthesize, then publish. Every failure is terminal
/// for this attempt and surfaces only as a notice and a log line.
pub async fn run_scheduled_review(ctx: &JobContext, job: &ScheduledReview) {
    tracing::debug!(
        job_id = %job.id,
        product_id = job.product_id,
        publish_mode = %job.publish_mode,
        "running scheduled review job"
    );

    let config = match settings::load(&ctx.pool).await {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("failed to load settings for review job: {}", error);
            return;
        }
    };

    let mut rng = StdRng::from_os_rng();
    let review = match ai_reviews::synthesize_for_product(
        &ctx.completions,
        &ctx.pool,
        &config,
        job.product_id,
        job.review_length,
        &SynthesisOverrides::default(),
        &mut rng,
    )
    .await
    {
        Ok(review) => review,
        Err(error) => {
            ctx.notices.push(format!(
                "Review generation failed for product {}: {}",
                job.product_id, error
            ));
            tracing::warn!(
                product_id = job.product_id,
                "review generation failed: {}",
                error
            );
            return;
        }
    };

    match publish::publish_review(&ctx.pool, job.product_id, &review, None).await {
        Ok(comment_id) => {
            tracing::info!(
                comment_id,
                product_id = job.product_id,
                rating = review.rating,
                "published generated review"
            );
        }
        Err(error) => {
            ctx.notices.push(format!(
                "Failed to publish review for product {}: {}",
                job.product_id, error
            ));
            tracing::warn!(
                product_id = job.product_id,
                "failed to publish review: {}",
                error
            );
        }
    }
}

/// Queue stub that records scheduling calls for assertions.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingQueue {
    pub jobs: Mutex<Vec<ScheduledReview>>,
}

#[cfg(test)]
impl DeferredQueue for RecordingQueue {
    fn schedule_at(&self, job: ScheduledReview) {
        self.jobs.lock().unwrap().push(job);
    }

    fn schedule_recurring(&self, _every: Duration) {}

    fn clear_scheduled(&self) {
        self.jobs.lock().unwrap().clear();
    }

    fn pending_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}
