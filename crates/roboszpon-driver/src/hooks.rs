//! 钩子系统
//!
//! 在帧接收/发送时触发自定义回调，是总线 "订阅" 能力的对外形式。
//! 回调在 RX 线程（接收）或调用方线程（发送）上同步执行，必须非阻塞；
//! 需要耗时处理时使用 [`ChannelHook`] 把帧转交给其他线程。

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use roboszpon_protocol::RoboszponFrame;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// 帧回调
///
/// # 示例
///
/// ```rust
/// use roboszpon_driver::hooks::FrameCallback;
/// use roboszpon_protocol::RoboszponFrame;
/// use crossbeam_channel::Sender;
///
/// struct Forward {
///     sender: Sender<RoboszponFrame>,
/// }
///
/// impl FrameCallback for Forward {
///     fn on_frame_received(&self, frame: &RoboszponFrame) {
///         let _ = self.sender.try_send(*frame);
///     }
/// }
/// ```
pub trait FrameCallback: Send + Sync {
    /// 收到一帧（已打接收时间戳，尚未校验/解码）
    fn on_frame_received(&self, frame: &RoboszponFrame);

    /// 一帧发送成功后调用（发送失败的帧不会触发）
    fn on_frame_sent(&self, frame: &RoboszponFrame) {
        let _ = frame;
    }

    /// 回调已失效（例如接收端已丢弃），可以从管理器中移除
    fn is_closed(&self) -> bool {
        false
    }
}

/// 钩子管理器
///
/// 回调列表本身不是线程安全的，由 `StationContext` 中的 `RwLock` 保护。
#[derive(Default)]
pub struct HookManager {
    callbacks: Vec<Arc<dyn FrameCallback>>,
}

impl HookManager {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    pub fn add_callback(&mut self, callback: Arc<dyn FrameCallback>) {
        self.callbacks.push(callback);
    }

    /// 按指针移除回调，返回是否找到
    pub fn remove_callback(&mut self, callback: &Arc<dyn FrameCallback>) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|c| !Arc::ptr_eq(c, callback));
        before != self.callbacks.len()
    }

    /// 是否存在已失效的回调
    pub fn has_closed(&self) -> bool {
        self.callbacks.iter().any(|c| c.is_closed())
    }

    /// 移除已失效的回调，返回移除数量
    pub fn prune_closed(&mut self) -> usize {
        let before = self.callbacks.len();
        self.callbacks.retain(|c| !c.is_closed());
        before - self.callbacks.len()
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    /// 触发所有接收回调（在 rx_loop 中调用）
    pub fn trigger_all(&self, frame: &RoboszponFrame) {
        for callback in self.callbacks.iter() {
            callback.on_frame_received(frame);
        }
    }

    /// 触发所有发送回调（仅在发送成功后调用）
    pub fn trigger_all_sent(&self, frame: &RoboszponFrame) {
        for callback in self.callbacks.iter() {
            callback.on_frame_sent(frame);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// 通道转发钩子
///
/// 把接收到的帧 `try_send` 到有界通道；通道满时丢帧并计数，
/// 不会阻塞 RX 线程。接收端丢弃后钩子标记为失效。
pub struct ChannelHook {
    sender: Sender<RoboszponFrame>,
    include_sent: bool,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl ChannelHook {
    /// 创建钩子与对应的接收端
    pub fn new(capacity: usize) -> (Self, Receiver<RoboszponFrame>) {
        let (sender, receiver) = bounded(capacity);
        let hook = Self {
            sender,
            include_sent: false,
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        };
        (hook, receiver)
    }

    /// 同时转发发送成功的帧
    pub fn with_sent_frames(mut self) -> Self {
        self.include_sent = true;
        self
    }

    /// 因通道满而丢弃的帧数
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn forward(&self, frame: &RoboszponFrame) {
        match self.sender.try_send(*frame) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            },
            Err(TrySendError::Disconnected(_)) => {
                self.closed.store(true, Ordering::Relaxed);
            },
        }
    }
}

impl FrameCallback for ChannelHook {
    fn on_frame_received(&self, frame: &RoboszponFrame) {
        self.forward(frame);
    }

    fn on_frame_sent(&self, frame: &RoboszponFrame) {
        if self.include_sent {
            self.forward(frame);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}
