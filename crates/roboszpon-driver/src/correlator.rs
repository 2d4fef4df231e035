//! 参数读取请求关联器
//!
//! 把发出的 ParameterRead 与收到的 ParameterResponse 按 `(node, parameter_id)`
//! 配对。每个待处理请求只有三个终态：
//!
//! - **Matched**: 收到匹配应答，回调以 `Ok(value)` 调用一次
//! - **TimedOut**: 截止时间已过，回调以 `Err(DriverError::NoResponse)` 调用一次
//! - **Cancelled**: 调用方主动取消，回调被丢弃而不调用
//!
//! 关联器本身不调用回调：`dispatch` / `expire` 返回 [`Completion`]，
//! 由调用方在释放锁之后执行。

use crate::error::DriverError;
use roboszpon_protocol::Message;
use smallvec::SmallVec;
use std::fmt;
use tracing::{debug, trace, warn};

/// 读取完成回调
pub type ReadCallback = Box<dyn FnOnce(Result<f32, DriverError>) + Send + 'static>;

/// 待处理读取请求的句柄（用于取消）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReadHandle(u64);

impl ReadHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

struct PendingRead {
    handle: ReadHandle,
    node: u8,
    parameter_id: u8,
    deadline_us: u64,
    callback: ReadCallback,
}

/// 已到达终态、等待执行的回调
pub struct Completion {
    pub handle: ReadHandle,
    pub node: u8,
    pub parameter_id: u8,
    pub result: Result<f32, DriverError>,
    callback: ReadCallback,
}

impl Completion {
    /// 执行回调（必须在关联器锁之外调用）
    pub fn complete(self) {
        (self.callback)(self.result);
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("handle", &self.handle)
            .field("node", &self.node)
            .field("parameter_id", &self.parameter_id)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

/// 过期回调集合（通常为 0-2 个）
pub type Completions = SmallVec<[Completion; 2]>;

/// 待处理读取请求表
///
/// 节点数为几十个、同时在途的读取为个位数到几十个，线性扫描足够。
#[derive(Default)]
pub struct Correlator {
    pending: Vec<PendingRead>,
    next_handle: u64,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个待处理读取（必须在发送 ParameterRead 之前调用）
    pub fn register(
        &mut self,
        node: u8,
        parameter_id: u8,
        deadline_us: u64,
        callback: ReadCallback,
    ) -> ReadHandle {
        let handle = ReadHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);

        trace!(
            "Pending read {:?}: node {} parameter 0x{:02X}, deadline {}us",
            handle, node, parameter_id, deadline_us
        );
        self.pending.push(PendingRead {
            handle,
            node,
            parameter_id,
            deadline_us,
            callback,
        });
        handle
    }

    /// 处理一条入站消息
    ///
    /// 仅 ParameterResponse 参与匹配；按登记顺序取第一个键相同的请求。
    /// 没有匹配项的应答（包括已取消/已超时请求的迟到应答）直接丢弃。
    pub fn dispatch(&mut self, message: &Message) -> Option<Completion> {
        let Message::ParameterResponse(response) = message else {
            return None;
        };

        let Some(index) = self
            .pending
            .iter()
            .position(|p| p.node == response.node_id && p.parameter_id == response.parameter_id)
        else {
            debug!(
                "Unmatched parameter response: node {} parameter 0x{:02X}",
                response.node_id, response.parameter_id
            );
            return None;
        };

        // remove 保持其余请求的登记顺序
        let entry = self.pending.remove(index);
        Some(Completion {
            handle: entry.handle,
            node: entry.node,
            parameter_id: entry.parameter_id,
            result: Ok(response.value),
            callback: entry.callback,
        })
    }

    /// 取出所有截止时间已过（`deadline_us <= now_us`）的请求
    pub fn expire(&mut self, now_us: u64) -> Completions {
        let mut expired = Completions::new();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].deadline_us <= now_us {
                let entry = self.pending.remove(index);
                warn!(
                    "Parameter read timed out: node {} parameter 0x{:02X}",
                    entry.node, entry.parameter_id
                );
                expired.push(Completion {
                    handle: entry.handle,
                    node: entry.node,
                    parameter_id: entry.parameter_id,
                    result: Err(DriverError::NoResponse {
                        node: entry.node,
                        parameter_id: entry.parameter_id,
                    }),
                    callback: entry.callback,
                });
            } else {
                index += 1;
            }
        }
        expired
    }

    /// 取消请求；回调被丢弃。已完成或不存在的句柄返回 `false`
    pub fn cancel(&mut self, handle: ReadHandle) -> bool {
        match self.pending.iter().position(|p| p.handle == handle) {
            Some(index) => {
                let entry = self.pending.remove(index);
                debug!(
                    "Pending read cancelled: node {} parameter 0x{:02X}",
                    entry.node, entry.parameter_id
                );
                true
            },
            None => false,
        }
    }

    /// 移除某节点的全部待处理请求（回调被丢弃）
    pub fn cancel_node(&mut self, node: u8) -> usize {
        let before = self.pending.len();
        self.pending.retain(|p| p.node != node);
        before - self.pending.len()
    }

    pub fn is_pending(&self, handle: ReadHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl fmt::Debug for Correlator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.pending.len())
            .field("next_handle", &self.next_handle)
            .finish()
    }
}
