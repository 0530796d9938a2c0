//! 字幕序列器 (Caption Sequencer)
//!
//! 模拟"实时进来的字幕流"：按固定节拍揭示字幕列表越来越长的前缀。
//! 这里只有纯状态机，不碰时钟；定时器在 `playback` 模块里驱动 `tick()`。
//!
//! 策略（两份原始变体不一致，这里统一成一种）：
//! - **到尾即停**：把 `revealed` 推到 `N` 的那次 tick 同时把 `playing` 置为 false，
//!   所以 `playing` 成立时必有 `revealed < N`。
//! - **只有 restart 回到第一条**：`start()` 永远从当前位置继续；
//!   已经揭示完的流 `start()` 是空操作，要重播走 `restart()`。

use serde::Serialize;

/// 默认预揭示条数
pub const DEFAULT_SEED: usize = 5;

/// 一次 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// 没在播放，什么都没发生
    Idle,
    /// 多揭示了一条
    Advanced,
    /// 多揭示了一条并且到尾了，播放随之停止
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequencer {
    total: usize,
    revealed: usize,
    playing: bool,
}

impl Sequencer {
    /// `total` 是字幕总数 N，`seed` 是初始揭示条数，二者都会被夹到合法区间。
    pub fn new(total: usize, seed: usize) -> Self {
        let total = total.max(1);
        Self {
            total,
            revealed: seed.clamp(1, total),
            playing: false,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn revealed(&self) -> usize {
        self.revealed
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_saturated(&self) -> bool {
        self.revealed == self.total
    }

    /// 开始播放。已在播放或已揭示完时返回 false。
    pub fn start(&mut self) -> bool {
        if self.playing || self.is_saturated() {
            return false;
        }
        self.playing = true;
        true
    }

    /// 回到第一条字幕并播放
    pub fn restart(&mut self) {
        self.revealed = 1;
        // N == 1 时没有可揭示的内容，保持停止
        self.playing = !self.is_saturated();
    }

    /// 暂停。返回之前是否在播放。
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.playing, false)
    }

    /// 播放/暂停按钮
    pub fn toggle(&mut self) -> bool {
        if self.playing {
            self.stop();
        } else {
            self.start();
        }
        self.playing
    }

    pub fn tick(&mut self) -> Tick {
        if !self.playing {
            return Tick::Idle;
        }

        self.revealed = (self.revealed + 1).min(self.total);
        if self.is_saturated() {
            self.playing = false;
            Tick::Finished
        } else {
            Tick::Advanced
        }
    }

    /// 手动快进：全部揭示并停止，不依赖时钟
    pub fn show_all(&mut self) {
        self.revealed = self.total;
        self.playing = false;
    }

    /// 进度百分比：最新一条可见字幕的下标 / 最后一个下标
    ///
    /// `N == 1` 时分母为 0，直接返回 100。
    pub fn progress_percent(&self) -> f64 {
        if self.total <= 1 {
            return 100.0;
        }
        (self.revealed - 1) as f64 / (self.total - 1) as f64 * 100.0
    }

    /// 当前可见的前缀 `items[0 .. revealed)`
    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.revealed.min(items.len())]
    }

    /// 最新一条可见字幕的下标
    pub fn cursor(&self) -> usize {
        self.revealed - 1
    }

    pub fn snapshot(&self) -> SequencerState {
        SequencerState {
            playing: self.playing,
            revealed: self.revealed,
            total: self.total,
            progress_percent: self.progress_percent(),
        }
    }
}

/// 序列器状态的可序列化快照
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencerState {
    pub playing: bool,
    pub revealed: usize,
    pub total: usize,
    pub progress_percent: f64,
}
