//! Station API 模块
//!
//! 对外的 [`Station`]：持有 RX 线程与发送半边，提供设备查询、指令发送
//! 与异步参数读取。

use crate::correlator::ReadHandle;
use crate::error::DriverError;
use crate::heartbeat::{LivenessChange, duration_micros, monotonic_micros};
use crate::hooks::{ChannelHook, FrameCallback, HookManager};
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{PipelineConfig, rx_loop};
use crate::registry::{DeviceSnapshot, SignalKind};
use crate::signal::Signal;
use crate::state::StationContext;
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use parking_lot::{Mutex, RwLock};
use roboszpon_can::{RoboszponFrame, SplittableAdapter, TxAdapter};
use roboszpon_protocol::{
    ActionId, ActionRequest, EmergencyStopCommand, MotorCommand, Parameter, ParameterRead,
    ParameterWrite, validate_node_id,
};
use std::ops::Deref;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 带超时的线程 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = bounded(1);

        // 看守线程负责真正的 join；超时后由进程退出时回收
        spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

type BoxedTx = Box<dyn TxAdapter + Send>;

/// 帧订阅
///
/// 解引用为接收端。丢弃时从钩子管理器中移除对应的 [`ChannelHook`]；
/// 不要在帧回调内部丢弃订阅（钩子读锁尚未释放）。
pub struct FrameSubscription {
    receiver: Receiver<RoboszponFrame>,
    hook: Arc<ChannelHook>,
    ctx: Weak<StationContext>,
}

impl FrameSubscription {
    pub fn receiver(&self) -> &Receiver<RoboszponFrame> {
        &self.receiver
    }

    /// 因通道满而丢弃的帧数
    pub fn dropped(&self) -> u64 {
        self.hook.dropped()
    }
}

impl Deref for FrameSubscription {
    type Target = Receiver<RoboszponFrame>;

    fn deref(&self) -> &Self::Target {
        &self.receiver
    }
}

impl Drop for FrameSubscription {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.upgrade() {
            let hook: Arc<dyn FrameCallback> = self.hook.clone();
            ctx.hooks.write().remove_callback(&hook);
        }
    }
}

/// 操作站
///
/// - 接收：后台 RX 线程独占接收半边，处理帧并执行周期任务
/// - 发送：在调用方线程上加锁同步发送，错误原样返回，不自动重试
pub struct Station {
    tx: Mutex<BoxedTx>,
    ctx: Arc<StationContext>,
    rx_thread: Option<JoinHandle<()>>,
    is_running: Arc<AtomicBool>,
    config: PipelineConfig,
}

impl Station {
    /// 拆分适配器并启动 RX 线程
    ///
    /// 接收超时需在调用前设置到适配器上（[`StationBuilder`](crate::StationBuilder) 会处理）。
    pub fn new<C>(can: C, config: PipelineConfig) -> Result<Self, DriverError>
    where
        C: SplittableAdapter,
        C::RxAdapter: Send + 'static,
        C::TxAdapter: Send + 'static,
    {
        let (rx, tx) = can.split()?;
        let ctx = Arc::new(StationContext::new(
            config.signal_capacity,
            config.liveness_timeout(),
        ));
        let is_running = Arc::new(AtomicBool::new(true));

        let rx_thread = {
            let ctx = ctx.clone();
            let config = config.clone();
            let is_running = is_running.clone();
            std::thread::Builder::new()
                .name("roboszpon-rx".to_string())
                .spawn(move || rx_loop(rx, ctx, config, is_running))
                .map_err(|e| DriverError::IoThread(e.to_string()))?
        };

        info!("Station started: {:?}", config);
        Ok(Self {
            tx: Mutex::new(Box::new(tx)),
            ctx,
            rx_thread: Some(rx_thread),
            is_running,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// RX 线程是否仍在运行（致命总线错误后为 `false`）
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // 发送
    // ------------------------------------------------------------------

    /// 发送一帧；成功后触发发送钩子
    pub fn send_frame(&self, frame: RoboszponFrame) -> Result<(), DriverError> {
        let result = self.tx.lock().send(frame);
        match result {
            Ok(()) => {
                self.ctx.metrics.tx_frames_total.fetch_add(1, Ordering::Relaxed);
                self.ctx.hooks.read().trigger_all_sent(&frame);
                Ok(())
            },
            Err(e) => {
                self.ctx.metrics.tx_failures.fetch_add(1, Ordering::Relaxed);
                error!("Failed to send frame 0x{:03X}: {}", frame.id, e);
                Err(e.into())
            },
        }
    }

    /// 广播急停（所有节点）
    pub fn emergency_stop(&self) -> Result<(), DriverError> {
        warn!("Emergency stop broadcast");
        self.send_frame(EmergencyStopCommand::new().to_frame())
    }

    pub fn send_motor_command(&self, command: MotorCommand) -> Result<(), DriverError> {
        validate_node_id(command.node_id)?;
        self.send_frame(command.to_frame())
    }

    pub fn set_duty(&self, node: u8, duty: f32) -> Result<(), DriverError> {
        self.send_motor_command(MotorCommand::duty(node, duty))
    }

    pub fn set_velocity(&self, node: u8, velocity: f32) -> Result<(), DriverError> {
        self.send_motor_command(MotorCommand::velocity(node, velocity))
    }

    pub fn set_position(&self, node: u8, position: f32) -> Result<(), DriverError> {
        self.send_motor_command(MotorCommand::position(node, position))
    }

    pub fn send_action(&self, node: u8, action: ActionId) -> Result<(), DriverError> {
        validate_node_id(node)?;
        debug!("Action {:?} -> node {}", action, node);
        self.send_frame(ActionRequest::new(node, action).to_frame())
    }

    pub fn arm(&self, node: u8) -> Result<(), DriverError> {
        self.send_action(node, ActionId::Arm)
    }

    pub fn disarm(&self, node: u8) -> Result<(), DriverError> {
        self.send_action(node, ActionId::Disarm)
    }

    // ------------------------------------------------------------------
    // 参数读写
    // ------------------------------------------------------------------

    /// 异步读取参数
    ///
    /// 先检查前置条件（节点已注册且处于 Stopped），再登记、后发送，
    /// 避免应答先于登记到达。`on_complete` 恰好调用一次：收到应答时为
    /// `Ok(value)`，超时为 `Err(DriverError::NoResponse)`；被取消则不调用。
    /// 发送失败时登记被撤销、回调不会被调用，错误直接返回。
    pub fn request_parameter_read<F>(
        &self,
        node: u8,
        parameter: Parameter,
        timeout: Duration,
        on_complete: F,
    ) -> Result<ReadHandle, DriverError>
    where
        F: FnOnce(Result<f32, DriverError>) + Send + 'static,
    {
        self.ensure_configurable(node)?;
        self.request_parameter_read_unchecked(node, parameter.id(), timeout, on_complete)
    }

    /// 跳过模式检查的异步读取（参数 ID 也不查表）
    pub fn request_parameter_read_unchecked<F>(
        &self,
        node: u8,
        parameter_id: u8,
        timeout: Duration,
        on_complete: F,
    ) -> Result<ReadHandle, DriverError>
    where
        F: FnOnce(Result<f32, DriverError>) + Send + 'static,
    {
        validate_node_id(node)?;
        let deadline_us = monotonic_micros().saturating_add(duration_micros(timeout));

        let handle = self.ctx.correlator.lock().register(
            node,
            parameter_id,
            deadline_us,
            Box::new(on_complete),
        );

        if let Err(e) = self.send_frame(ParameterRead::new(node, parameter_id).to_frame()) {
            self.ctx.correlator.lock().cancel(handle);
            return Err(e);
        }
        Ok(handle)
    }

    /// 取消待处理读取；之后到达的应答被丢弃
    pub fn cancel_read(&self, handle: ReadHandle) -> bool {
        self.ctx.correlator.lock().cancel(handle)
    }

    /// 阻塞读取参数（异步读取的便捷封装）
    pub fn read_parameter(
        &self,
        node: u8,
        parameter: Parameter,
        timeout: Duration,
    ) -> Result<f32, DriverError> {
        let (tx, rx) = bounded(1);
        let handle = self.request_parameter_read(node, parameter, timeout, move |result| {
            let _ = tx.send(result);
        })?;
        self.wait_for_read(handle, &rx, timeout)
    }

    /// 使用默认超时的阻塞读取
    pub fn read_parameter_default(&self, node: u8, parameter: Parameter) -> Result<f32, DriverError> {
        self.read_parameter(node, parameter, self.config.default_read_timeout())
    }

    fn wait_for_read(
        &self,
        handle: ReadHandle,
        rx: &Receiver<Result<f32, DriverError>>,
        timeout: Duration,
    ) -> Result<f32, DriverError> {
        // 等待时长溢出时 recv_timeout 退化为无限等待
        let wait = timeout.saturating_add(self.config.completion_grace());
        match rx.recv_timeout(wait) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                // RX 线程已停止时不会再有周期任务，由调用方收尾
                self.cancel_read(handle);
                Err(DriverError::Timeout)
            },
            Err(RecvTimeoutError::Disconnected) => Err(DriverError::ChannelClosed),
        }
    }

    /// 写入参数（前置条件同读取；写入无应答）
    pub fn write_parameter(&self, node: u8, parameter: Parameter, value: f32) -> Result<(), DriverError> {
        self.ensure_configurable(node)?;
        self.write_parameter_unchecked(node, parameter.id(), value)
    }

    /// 跳过模式检查的写入
    pub fn write_parameter_unchecked(
        &self,
        node: u8,
        parameter_id: u8,
        value: f32,
    ) -> Result<(), DriverError> {
        validate_node_id(node)?;
        debug!("Write parameter 0x{:02X} = {} -> node {}", parameter_id, value, node);
        self.send_frame(ParameterWrite::new(node, parameter_id, value).to_frame())
    }

    /// 参数读写前置条件检查
    pub fn ensure_configurable(&self, node: u8) -> Result<(), DriverError> {
        self.ctx.registry.lock().ensure_configurable(node)
    }

    /// 待处理读取数量
    pub fn pending_reads(&self) -> usize {
        self.ctx.correlator.lock().len()
    }

    // ------------------------------------------------------------------
    // 设备查询
    // ------------------------------------------------------------------

    pub fn snapshot(&self, node: u8) -> Result<DeviceSnapshot, DriverError> {
        self.ctx
            .registry
            .lock()
            .snapshot(node)
            .ok_or(DriverError::UnknownDevice(node))
    }

    /// 全部设备快照（按注册顺序）
    pub fn devices(&self) -> Vec<DeviceSnapshot> {
        self.ctx.registry.lock().snapshots()
    }

    pub fn nodes(&self) -> Vec<u8> {
        self.ctx.registry.lock().nodes()
    }

    /// 遥测历史副本
    pub fn signal(&self, node: u8, kind: SignalKind) -> Result<Signal, DriverError> {
        self.ctx
            .registry
            .lock()
            .device(node)
            .map(|device| device.signal(kind).clone())
            .ok_or(DriverError::UnknownDevice(node))
    }

    /// 以当前时间和配置的超时判断存活
    pub fn is_live(&self, node: u8) -> bool {
        self.ctx
            .registry
            .lock()
            .is_live(node, monotonic_micros(), self.config.liveness_timeout())
    }

    /// 移除设备及其全部待处理读取
    pub fn remove_device(&self, node: u8) -> bool {
        let removed = self.ctx.registry.lock().remove(node).is_some();
        if removed {
            let cancelled = self.ctx.correlator.lock().cancel_node(node);
            if cancelled > 0 {
                debug!("Cancelled {} pending reads for removed node {}", cancelled, node);
            }
        }
        removed
    }

    // ------------------------------------------------------------------
    // 订阅与指标
    // ------------------------------------------------------------------

    /// 钩子管理器（帧级订阅）
    pub fn hooks(&self) -> &RwLock<HookManager> {
        &self.ctx.hooks
    }

    pub fn add_frame_callback(&self, callback: Arc<dyn FrameCallback>) {
        self.ctx.hooks.write().add_callback(callback);
    }

    /// 订阅接收帧（有界通道，满时丢帧）
    ///
    /// 返回的订阅被丢弃时自动退订。
    pub fn subscribe(&self, capacity: usize) -> FrameSubscription {
        let (hook, receiver) = ChannelHook::new(capacity);
        let hook = Arc::new(hook);
        self.add_frame_callback(hook.clone());
        FrameSubscription {
            receiver,
            hook,
            ctx: Arc::downgrade(&self.ctx),
        }
    }

    /// 订阅存活状态变化
    pub fn subscribe_liveness(&self) -> Receiver<LivenessChange> {
        self.ctx.subscribe_liveness()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.ctx.metrics.reset();
    }
}

impl Drop for Station {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Release);

        let join_timeout = Duration::from_secs(2);
        if let Some(handle) = self.rx_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "RX thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }
        info!("Station stopped");
    }
}
