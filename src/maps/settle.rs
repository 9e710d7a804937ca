//! 遅延描画の待機

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::SettleStrategy;
use crate::traits::PageQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// 固定時間スリープした
    Slept,
    /// DOM変更が止まった
    Quiet,
    /// 上限時間に達した
    TimedOut,
}

pub async fn settle<P>(page: &P, strategy: &SettleStrategy) -> Settled
where
    P: PageQuery + ?Sized,
{
    match *strategy {
        SettleStrategy::Fixed(delay) => {
            sleep(delay).await;
            Settled::Slept
        }
        SettleStrategy::Quiet { quiet, poll, max } => {
            let start = Instant::now();
            let mut last_count: Option<u64> = None;
            let mut quiet_since = start;

            loop {
                match page.mutation_count().await {
                    Ok(count) if last_count == Some(count) => {
                        if quiet_since.elapsed() >= quiet {
                            debug!("DOM quiet after {:?}", start.elapsed());
                            return Settled::Quiet;
                        }
                    }
                    Ok(count) => {
                        last_count = Some(count);
                        quiet_since = Instant::now();
                    }
                    Err(e) => {
                        debug!("Mutation probe error: {}", e);
                        last_count = None;
                        quiet_since = Instant::now();
                    }
                }

                if start.elapsed() >= max {
                    warn!(
                        "DOM still changing after {:?}, proceeding anyway",
                        start.elapsed()
                    );
                    return Settled::TimedOut;
                }

                sleep(poll).await;
            }
        }
    }
}
