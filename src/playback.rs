//! 回放驱动 (Playback)
//!
//! 把 `Sequencer` 和它唯一的周期定时器绑在一起：
//!
//! ```text
//!   控制面 (start/stop/toggle/restart/show_all) ─┐
//!                                               ├─▶ Mutex<Session> ─▶ watch::Sender<Sequencer>
//!   定时任务 (每 period 一次 tick) ───────────────┘      │
//!                                                      └─ timer: Option<Timer>  (活着 = 有定时器)
//! ```
//!
//! - 任何状态变更都在同一把锁里完成，然后 `reconcile` 一次：
//!   在播放且没有定时器 → 起一个；不在播放 → 丢掉句柄（Drop 即 abort）。
//!   因此同一时刻最多只有一个定时器。
//! - `restart` 总是换一个新定时器，节拍从 restart 的那一刻重新起算。
//! - 定时任务只持有 `Weak<Mutex<Session>>`，`Playback` 被丢弃后会话随之释放，
//!   句柄的 Drop 会取消任务，不会留下还在改状态的回调。

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::sequencer::{Sequencer, SequencerState, Tick};

/// 定时任务句柄。Drop 时取消任务。
struct Timer(JoinHandle<()>);

impl Drop for Timer {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct Session {
    seq: Sequencer,
    timer: Option<Timer>,
    updates: watch::Sender<Sequencer>,
}

impl Session {
    fn publish(&self) {
        self.updates.send_replace(self.seq.clone());
    }
}

pub struct Playback {
    session: Arc<Mutex<Session>>,
    period: Duration,
    receiver: watch::Receiver<Sequencer>,
}

impl Playback {
    pub fn new(total: usize, seed: usize, period: Duration) -> Self {
        let seq = Sequencer::new(total, seed);
        let (updates, receiver) = watch::channel(seq.clone());
        Self {
            session: Arc::new(Mutex::new(Session {
                seq,
                timer: None,
                updates,
            })),
            period,
            receiver,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 订阅序列器：每次状态变化（包括每个 tick）都会推送一份拷贝
    pub fn subscribe(&self) -> watch::Receiver<Sequencer> {
        self.receiver.clone()
    }

    pub async fn state(&self) -> SequencerState {
        self.session.lock().await.seq.snapshot()
    }

    /// 当前序列器的拷贝（供 API 计算可见前缀）
    pub async fn sequencer(&self) -> Sequencer {
        self.session.lock().await.seq.clone()
    }

    /// 定时器是否存活
    pub async fn timer_live(&self) -> bool {
        self.session
            .lock()
            .await
            .timer
            .as_ref()
            .is_some_and(|t| !t.0.is_finished())
    }

    pub async fn start(&self) -> Sequencer {
        self.apply(false, |seq| {
            seq.start();
        })
        .await
    }

    /// 回到第一条并重新起算节拍
    pub async fn restart(&self) -> Sequencer {
        self.apply(true, Sequencer::restart).await
    }

    pub async fn stop(&self) -> Sequencer {
        self.apply(false, |seq| {
            seq.stop();
        })
        .await
    }

    pub async fn toggle(&self) -> Sequencer {
        self.apply(false, |seq| {
            seq.toggle();
        })
        .await
    }

    pub async fn show_all(&self) -> Sequencer {
        self.apply(false, Sequencer::show_all).await
    }

    /// 停止播放并取消定时器（服务关闭时调用）
    pub async fn shutdown(&self) {
        let mut session = self.session.lock().await;
        session.seq.stop();
        session.timer = None;
        session.publish();
    }

    async fn apply(&self, rearm: bool, op: impl FnOnce(&mut Sequencer)) -> Sequencer {
        let mut session = self.session.lock().await;
        op(&mut session.seq);
        if rearm {
            // 旧定时器的相位作废
            session.timer = None;
        }
        self.reconcile(&mut session);
        session.publish();
        session.seq.clone()
    }

    fn reconcile(&self, session: &mut Session) {
        if !session.seq.is_playing() {
            if session.timer.take().is_some() {
                tracing::debug!("⏹️ 字幕定时器已取消");
            }
            return;
        }

        let live = session.timer.as_ref().is_some_and(|t| !t.0.is_finished());
        if !live {
            let weak = Arc::downgrade(&self.session);
            session.timer = Some(Timer(tokio::spawn(run_timer(weak, self.period))));
            tracing::debug!(period_ms = self.period.as_millis() as u64, "▶️ 字幕定时器已启动");
        }
    }
}

/// 定时任务主体
///
/// 第一次 tick 在一个周期之后，不会在启动瞬间多揭示一条。
async fn run_timer(session: Weak<Mutex<Session>>, period: Duration) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        // 会话已经被丢弃
        let Some(session) = session.upgrade() else {
            break;
        };
        let mut guard = session.lock().await;

        match guard.seq.tick() {
            Tick::Idle => {
                // 锁外被停掉了，句柄马上会被丢弃
                break;
            }
            Tick::Advanced => {
                tracing::trace!(revealed = guard.seq.revealed(), "字幕 +1");
                guard.publish();
            }
            Tick::Finished => {
                tracing::info!(total = guard.seq.total(), "✅ 字幕已全部揭示，播放停止");
                guard.publish();
                // 自己的句柄：丢掉即 abort，本任务随即在下一个 await 点前结束
                guard.timer = None;
                break;
            }
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        // 拿不到锁说明定时任务正持有会话，它释放最后一个强引用时会话随之析构
        if let Ok(mut session) = self.session.try_lock() {
            session.timer = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(2000);

    /// 推进虚拟时钟并让出执行权，使定时任务有机会运行
    async fn advance(d: Duration) {
        time::advance(d).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    /// 按整周期逐步推进（一次跳过多个周期会被 Delay 策略合并成一次 tick）
    async fn advance_periods(n: u32) {
        for _ in 0..n {
            advance(PERIOD).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_period_reveals_one_caption() {
        let playback = Playback::new(29, 5, PERIOD);
        playback.start().await;
        assert!(playback.timer_live().await);

        advance(Duration::from_millis(1999)).await;
        assert_eq!(playback.state().await.revealed, 5);

        advance(Duration::from_millis(1)).await;
        assert_eq!(playback.state().await.revealed, 6);

        advance_periods(3).await;
        assert_eq!(playback.state().await.revealed, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn reentrant_start_keeps_a_single_timer() {
        let playback = Playback::new(29, 5, PERIOD);
        playback.start().await;
        advance(PERIOD / 2).await;
        playback.start().await;

        advance(PERIOD / 2).await;
        assert_eq!(playback.state().await.revealed, 6);

        // 重复 start 若多起了一个定时器，它会在这里多走一步
        advance(PERIOD / 2).await;
        assert_eq!(playback.state().await.revealed, 6);
        advance(PERIOD / 2).await;
        assert_eq!(playback.state().await.revealed, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_reanchors_the_cadence() {
        let playback = Playback::new(29, 5, PERIOD);
        playback.start().await;
        tokio::task::yield_now().await;

        advance(Duration::from_millis(1900)).await;
        let seq = playback.restart().await;
        assert_eq!(seq.revealed(), 1);

        // 旧定时器本该在 2000ms 触发，restart 之后不能再用它的相位
        advance(Duration::from_millis(100)).await;
        assert_eq!(playback.state().await.revealed, 1);

        advance(Duration::from_millis(1899)).await;
        assert_eq!(playback.state().await.revealed, 1);
        advance(Duration::from_millis(1)).await;
        assert_eq!(playback.state().await.revealed, 2);
        assert!(playback.timer_live().await);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_the_timer() {
        let playback = Playback::new(29, 5, PERIOD);
        playback.start().await;
        advance_periods(5).await;
        assert_eq!(playback.state().await.revealed, 10);

        playback.stop().await;
        assert!(!playback.timer_live().await);
        advance_periods(5).await;
        assert_eq!(playback.state().await.revealed, 10);

        // 恢复后从 10 继续
        playback.start().await;
        advance(PERIOD).await;
        assert_eq!(playback.state().await.revealed, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn playing_to_the_end_retires_the_timer() {
        let playback = Playback::new(29, 5, PERIOD);
        let mut updates = playback.subscribe();
        playback.start().await;

        advance_periods(24).await;
        let state = playback.state().await;
        assert_eq!(state.revealed, 29);
        assert!(!state.playing);
        assert!(!playback.timer_live().await);

        // 订阅端看到的是最终状态
        assert!(updates.has_changed().unwrap());
        let seen = updates.borrow_and_update().clone();
        assert_eq!(seen.revealed(), 29);
        assert_eq!(seen.progress_percent(), 100.0);

        advance_periods(3).await;
        assert_eq!(playback.state().await.revealed, 29);
    }

    #[tokio::test(start_paused = true)]
    async fn show_all_is_immediate_and_cancels_the_timer() {
        let playback = Playback::new(30, 5, PERIOD);
        playback.restart().await;
        advance(PERIOD).await;
        assert_eq!(playback.state().await.revealed, 2);

        let seq = playback.show_all().await;
        assert_eq!(seq.revealed(), 30);
        assert!(!seq.is_playing());
        assert!(!playback.timer_live().await);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_playback_cancels_the_timer() {
        let playback = Playback::new(29, 5, PERIOD);
        let updates = playback.subscribe();
        playback.start().await;
        advance(PERIOD).await;
        assert_eq!(updates.borrow().revealed(), 6);

        drop(playback);
        advance_periods(5).await;

        // 发送端随会话一起析构，之后不会再有推送
        assert!(updates.has_changed().is_err());
        assert_eq!(updates.borrow().revealed(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_playback() {
        let playback = Playback::new(29, 5, PERIOD);
        playback.start().await;
        playback.shutdown().await;
        assert!(!playback.timer_live().await);
        assert!(!playback.state().await.playing);
    }
}
