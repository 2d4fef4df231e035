//! 批量参数导出/导入
//!
//! 在异步参数读取与参数写入之上的编排：
//!
//! - 导出：对参数表中的每个参数并发发出读取，在共同的截止时间内收集结果
//! - 导入：先校验全部名称与节点模式，全部通过后才开始逐个写入

use crossbeam_channel::{RecvTimeoutError, unbounded};
use roboszpon_driver::{DriverError, ReadHandle, Station};
use roboszpon_protocol::{PARAMETER_TABLE, Parameter};
use roboszpon_tools::{ParameterFileError, ParameterSet};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// 批量传输错误
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Parameter file error: {0}")]
    File(#[from] ParameterFileError),

    /// 部分参数未应答；已收到的值保存在 `partial` 中
    #[error("Export incomplete: {} of {} parameters did not respond", .missing.len(), PARAMETER_TABLE.len())]
    Incomplete {
        missing: Vec<Parameter>,
        partial: ParameterSet,
    },
}

/// 读取节点的全部参数
///
/// 节点必须已注册且处于 Stopped 模式。某个读取发送失败时撤销已发出的全部读取
/// 并返回该错误；有参数超时未应答时返回 [`TransferError::Incomplete`]。
pub fn export_parameters(
    station: &Station,
    node: u8,
    timeout: Duration,
) -> Result<ParameterSet, TransferError> {
    station.ensure_configurable(node)?;

    // 截止时间在发出读取之前确定；超出时钟范围时不设截止，等待全部读取完成
    let wait = timeout.saturating_add(station.config().completion_grace());
    let deadline = Instant::now().checked_add(wait);

    let (tx, rx) = unbounded();
    let mut handles: Vec<(Parameter, ReadHandle)> = Vec::with_capacity(PARAMETER_TABLE.len());

    for &parameter in PARAMETER_TABLE {
        let tx = tx.clone();
        let requested = station.request_parameter_read(node, parameter, timeout, move |result| {
            let _ = tx.send((parameter, result));
        });
        match requested {
            Ok(handle) => handles.push((parameter, handle)),
            Err(e) => {
                for (_, handle) in &handles {
                    station.cancel_read(*handle);
                }
                return Err(e.into());
            },
        }
    }
    drop(tx);

    let mut set = ParameterSet::new();
    let mut missing = Vec::new();
    let mut outstanding = handles.len();

    while outstanding > 0 {
        let received = match deadline {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(RecvTimeoutError::from),
        };
        match received {
            Ok((parameter, Ok(value))) => {
                set.insert(parameter, value);
                outstanding -= 1;
            },
            Ok((parameter, Err(_))) => {
                missing.push(parameter);
                outstanding -= 1;
            },
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // 截止时仍未完成的读取一律视为未应答
    for (parameter, handle) in handles {
        if station.cancel_read(handle) {
            missing.push(parameter);
        }
    }
    // 取消前刚好完成的读取
    for (parameter, result) in rx.try_iter() {
        match result {
            Ok(value) => {
                set.insert(parameter, value);
            },
            Err(_) => missing.push(parameter),
        }
    }

    if missing.is_empty() {
        info!("Exported {} parameters from node {}", set.len(), node);
        Ok(set)
    } else {
        missing.sort();
        warn!(
            "Export from node {} incomplete: {} parameters missing",
            node,
            missing.len()
        );
        Err(TransferError::Incomplete {
            missing,
            partial: set,
        })
    }
}

/// 把参数集写入节点，返回写入的参数数量
///
/// 写入前校验：任何未知名称或节点不处于 Stopped 都会在第一次写入之前失败，
/// 不产生部分写入。写入过程中发送失败则立即返回，之前的写入已生效。
pub fn import_parameters(
    station: &Station,
    node: u8,
    parameters: &ParameterSet,
) -> Result<usize, TransferError> {
    let entries = parameters.validate()?;
    station.ensure_configurable(node)?;

    for (written, (parameter, value)) in entries.iter().enumerate() {
        if let Err(e) = station.write_parameter_unchecked(node, parameter.id(), *value) {
            warn!(
                "Import to node {} aborted at {} after {} writes: {}",
                node, parameter, written, e
            );
            return Err(e.into());
        }
    }

    info!("Imported {} parameters to node {}", entries.len(), node);
    Ok(entries.len())
}

/// 从文件导入
pub fn import_parameters_from_file<P: AsRef<std::path::Path>>(
    station: &Station,
    node: u8,
    path: P,
) -> Result<usize, TransferError> {
    let parameters = ParameterSet::load_toml(path)?;
    import_parameters(station, node, &parameters)
}

/// 导出到文件（不完整的导出不写文件）
pub fn export_parameters_to_file<P: AsRef<std::path::Path>>(
    station: &Station,
    node: u8,
    timeout: Duration,
    path: P,
) -> Result<ParameterSet, TransferError> {
    let parameters = export_parameters(station, node, timeout)?;
    parameters.save_toml(path)?;
    Ok(parameters)
}
