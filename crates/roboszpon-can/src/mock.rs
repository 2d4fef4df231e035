//! 内存总线（Mock 模式）
//!
//! 无硬件依赖的总线实现：测试通过 [`MockBus`] 句柄注入入站帧、检查已发送帧、
//! 注入收发失败，或挂载一个应答器模拟节点对请求的回复。

use crate::{CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, RoboszponFrame};
use crate::{RxAdapter, SplittableAdapter, TxAdapter};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// 默认接收超时
const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(2);

/// 应答器：根据已发送帧生成要回灌到总线的帧
type Responder = Box<dyn FnMut(&RoboszponFrame) -> Vec<RoboszponFrame> + Send>;

#[derive(Default)]
struct Shared {
    sent: Mutex<Vec<RoboszponFrame>>,
    send_failure: Mutex<Option<CanDeviceErrorKind>>,
    /// (剩余可成功发送次数, 之后的错误类型)
    send_budget: Mutex<Option<(usize, CanDeviceErrorKind)>>,
    receive_failure: Mutex<Option<CanDeviceErrorKind>>,
    responder: Mutex<Option<Responder>>,
}

/// 测试侧句柄
#[derive(Clone)]
pub struct MockBus {
    inbound: Sender<RoboszponFrame>,
    shared: Arc<Shared>,
}

impl MockBus {
    /// 创建一条内存总线，返回 `(测试句柄, 适配器)`
    pub fn new() -> (Self, MockCanAdapter) {
        let (inbound_tx, inbound_rx) = unbounded();
        let shared = Arc::new(Shared::default());

        let bus = Self {
            inbound: inbound_tx.clone(),
            shared: shared.clone(),
        };
        let adapter = MockCanAdapter {
            rx: MockRxAdapter {
                inbound: inbound_rx,
                timeout: DEFAULT_RECEIVE_TIMEOUT,
                shared: shared.clone(),
            },
            tx: MockTxAdapter {
                loopback: inbound_tx,
                shared,
            },
        };
        (bus, adapter)
    }

    /// 注入一帧入站数据
    pub fn inject(&self, frame: RoboszponFrame) {
        let _ = self.inbound.send(frame);
    }

    /// 已发送帧的副本
    pub fn sent_frames(&self) -> Vec<RoboszponFrame> {
        self.shared.sent.lock().clone()
    }

    /// 取出并清空已发送帧
    pub fn take_sent_frames(&self) -> Vec<RoboszponFrame> {
        std::mem::take(&mut *self.shared.sent.lock())
    }

    /// 设置发送失败（`None` 恢复正常）
    pub fn set_send_failure(&self, kind: Option<CanDeviceErrorKind>) {
        *self.shared.send_failure.lock() = kind;
        *self.shared.send_budget.lock() = None;
    }

    /// 再成功发送 `sends` 帧之后，后续发送以 `kind` 失败
    ///
    /// 调用 [`set_send_failure`](Self::set_send_failure) 或再次调用本方法可重置。
    pub fn fail_after(&self, sends: usize, kind: CanDeviceErrorKind) {
        *self.shared.send_budget.lock() = Some((sends, kind));
    }

    /// 设置接收失败（`None` 恢复正常）
    pub fn set_receive_failure(&self, kind: Option<CanDeviceErrorKind>) {
        *self.shared.receive_failure.lock() = kind;
    }

    /// 挂载应答器：每次成功发送后调用，返回的帧回灌到入站队列
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(&RoboszponFrame) -> Vec<RoboszponFrame> + Send + 'static,
    {
        *self.shared.responder.lock() = Some(Box::new(responder));
    }

    /// 移除应答器
    pub fn clear_responder(&self) {
        *self.shared.responder.lock() = None;
    }
}

/// 接收半边
pub struct MockRxAdapter {
    inbound: Receiver<RoboszponFrame>,
    timeout: Duration,
    shared: Arc<Shared>,
}

impl RxAdapter for MockRxAdapter {
    fn receive(&mut self) -> Result<RoboszponFrame, CanError> {
        if let Some(kind) = *self.shared.receive_failure.lock() {
            return Err(CanError::Device(CanDeviceError::new(
                kind,
                "mock receive failure",
            )));
        }
        match self.inbound.recv_timeout(self.timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => Err(CanError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(CanError::NotStarted),
        }
    }
}

/// 发送半边
pub struct MockTxAdapter {
    loopback: Sender<RoboszponFrame>,
    shared: Arc<Shared>,
}

impl TxAdapter for MockTxAdapter {
    fn send(&mut self, frame: RoboszponFrame) -> Result<(), CanError> {
        let failure = *self.shared.send_failure.lock();
        let failure = failure.or_else(|| match self.shared.send_budget.lock().as_mut() {
            Some((0, kind)) => Some(*kind),
            Some((remaining, _)) => {
                *remaining -= 1;
                None
            },
            None => None,
        });
        if let Some(kind) = failure {
            trace!("Mock bus: rejecting frame 0x{:03X}", frame.id);
            return Err(CanError::Device(CanDeviceError::new(
                kind,
                "mock send failure",
            )));
        }

        self.shared.sent.lock().push(frame);

        let replies = match self.shared.responder.lock().as_mut() {
            Some(responder) => responder(&frame),
            None => Vec::new(),
        };
        for reply in replies {
            let _ = self.loopback.send(reply);
        }
        Ok(())
    }
}

/// 完整适配器（可拆分）
pub struct MockCanAdapter {
    rx: MockRxAdapter,
    tx: MockTxAdapter,
}

impl CanAdapter for MockCanAdapter {
    fn send(&mut self, frame: RoboszponFrame) -> Result<(), CanError> {
        self.tx.send(frame)
    }

    fn receive(&mut self) -> Result<RoboszponFrame, CanError> {
        self.rx.receive()
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.rx.timeout = timeout;
    }
}

impl SplittableAdapter for MockCanAdapter {
    type RxAdapter = MockRxAdapter;
    type TxAdapter = MockTxAdapter;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        Ok((self.rx, self.tx))
    }
}
