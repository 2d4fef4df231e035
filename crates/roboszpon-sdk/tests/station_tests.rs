//! Station 集成测试
//!
//! 通过内存总线驱动完整的 RX 线程：发现、遥测、参数读取关联、存活检测。

mod common;

use common::*;
use roboszpon_sdk::can::CanDeviceErrorKind;
use roboszpon_sdk::driver::SignalKind;
use roboszpon_sdk::protocol::{
    ActionId, AxisReport, Message, Mode, MotorReport, Parameter, ParameterResponse, RoboszponFrame,
    decode_frame, encode_frame_id,
};
use roboszpon_sdk::{DriverError, PipelineConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[test]
fn test_discovery_and_telemetry() {
    let (bus, station) = setup();
    assert!(station.devices().is_empty());

    announce(&bus, &station, 3, Mode::Stopped);
    bus.inject(
        AxisReport {
            node_id: 3,
            position: 1.5,
            velocity: -0.25,
        }
        .to_frame(),
    );
    bus.inject(
        MotorReport {
            node_id: 3,
            current: 0.8,
            duty: 0.4,
        }
        .to_frame(),
    );

    assert!(wait_until(|| station
        .snapshot(3)
        .is_ok_and(|s| s.duty.is_some())));
    let snapshot = station.snapshot(3).unwrap();
    assert_eq!(snapshot.position, Some(1.5));
    assert_eq!(snapshot.velocity, Some(-0.25));
    assert_eq!(snapshot.current, Some(0.8));
    assert_eq!(snapshot.temperature, Some(24.5));
    assert_eq!(station.signal(3, SignalKind::Position).unwrap().len(), 1);
}

#[test]
fn test_devices_listed_in_discovery_order() {
    let (bus, station) = setup();
    for node in [9, 2, 17] {
        announce(&bus, &station, node, Mode::Stopped);
    }
    let nodes: Vec<u8> = station.devices().iter().map(|d| d.node).collect();
    assert_eq!(nodes, vec![9, 2, 17]);
}

#[test]
fn test_unregistered_axis_report_is_noop() {
    let (bus, station) = setup();
    bus.inject(
        AxisReport {
            node_id: 12,
            position: 1.0,
            velocity: 1.0,
        }
        .to_frame(),
    );
    assert!(wait_until(|| station.metrics().rx_frames_valid == 1));
    assert!(matches!(
        station.snapshot(12),
        Err(DriverError::UnknownDevice(12))
    ));
    assert!(station.devices().is_empty());
}

#[test]
fn test_response_matches_exact_key_once() {
    let (bus, station) = setup_with(PipelineConfig {
        default_read_timeout_ms: 5_000,
        ..fast_config()
    });
    announce(&bus, &station, 3, Mode::Stopped);

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = crossbeam_channel::unbounded();
    let counter = calls.clone();
    station
        .request_parameter_read(3, Parameter::EncoderResolution, Duration::from_secs(5), move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        })
        .unwrap();

    let sent = bus.take_sent_frames();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, 0x0C7);
    assert_eq!(sent[0].payload() & 0xFF, 0x05);

    bus.inject(ParameterResponse::new(3, 0x06, 9.0).to_frame());
    bus.inject(ParameterResponse::new(3, 0x05, 1.5).to_frame());
    bus.inject(ParameterResponse::new(3, 0x05, 2.5).to_frame());

    let result = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(result.unwrap(), 1.5);

    assert!(wait_until(|| station.metrics().rx_frames_valid >= 4));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(station.pending_reads(), 0);
}

#[test]
fn test_read_times_out_with_no_response() {
    let (bus, station) = setup();
    announce(&bus, &station, 4, Mode::Stopped);

    let result = station.read_parameter(4, Parameter::BrakeDuty, Duration::from_millis(40));
    assert!(matches!(
        result,
        Err(DriverError::NoResponse {
            node: 4,
            parameter_id: 0x27
        })
    ));
    assert_eq!(station.pending_reads(), 0);
    assert_eq!(station.metrics().reads_timed_out, 1);
}

#[test]
fn test_blocking_read_with_simulator() {
    let (bus, station) = setup();
    let sim = NodeSimulator::new().with_defaults(5);
    sim.attach(&bus);
    announce(&bus, &station, 5, Mode::Stopped);

    let value = station.read_parameter_default(5, Parameter::GearRatio).unwrap();
    assert_eq!(value, 0x08 as f32 * 0.5);
}

#[test]
fn test_reads_and_writes_refused_unless_stopped() {
    let (bus, station) = setup();
    announce(&bus, &station, 6, Mode::Running);
    bus.take_sent_frames();

    let result = station.request_parameter_read(6, Parameter::GearRatio, Duration::from_secs(1), |_| {});
    assert!(matches!(
        result,
        Err(DriverError::DeviceNotStopped {
            node: 6,
            mode: Mode::Running
        })
    ));
    assert!(matches!(
        station.write_parameter(6, Parameter::GearRatio, 3.0),
        Err(DriverError::DeviceNotStopped { .. })
    ));
    assert!(matches!(
        station.read_parameter(20, Parameter::GearRatio, Duration::from_millis(10)),
        Err(DriverError::UnknownDevice(20))
    ));
    assert!(bus.sent_frames().is_empty());
    assert_eq!(station.pending_reads(), 0);

    // 不检查模式的版本照常发送
    station
        .write_parameter_unchecked(6, Parameter::GearRatio.id(), 3.0)
        .unwrap();
    assert_eq!(bus.sent_frames().len(), 1);
}

#[test]
fn test_cancel_then_late_response_is_dropped() {
    let (bus, station) = setup();
    announce(&bus, &station, 3, Mode::Stopped);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handle = station
        .request_parameter_read(3, Parameter::EncoderResolution, Duration::from_secs(5), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    assert!(station.cancel_read(handle));
    bus.inject(ParameterResponse::new(3, 0x05, 1.5).to_frame());

    assert!(wait_until(|| station.metrics().rx_frames_valid >= 2));
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!station.cancel_read(handle));
}

#[test]
fn test_malformed_frames_counted_and_dropped() {
    let (bus, station) = setup();
    bus.inject(RoboszponFrame::new_standard(encode_frame_id(3, 0x03), &[0; 6]));
    bus.inject(RoboszponFrame::new_extended(0x0C3, &[0; 8]));
    bus.inject(RoboszponFrame::from_payload(encode_frame_id(3, 0x03), 0xC000_0000_0000_0000));

    assert!(wait_until(|| station.metrics().rx_frames_malformed == 3));
    assert!(station.devices().is_empty());
    assert!(station.is_running());
}

#[test]
fn test_unknown_kind_reaches_subscribers() {
    let (bus, station) = setup();
    let frames = station.subscribe(8);
    let raw = RoboszponFrame::from_payload(encode_frame_id(7, 0x3E), 0xABCD);
    bus.inject(raw);

    let received = frames.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(
        decode_frame(&received).unwrap(),
        Message::Raw {
            node_id: 7,
            kind: 0x3E,
            payload: 0xABCD
        }
    );
    assert!(wait_until(|| station.metrics().rx_frames_unknown == 1));
}

#[test]
fn test_liveness_transitions() {
    let (bus, station) = setup_with(PipelineConfig {
        liveness_timeout_ms: 50,
        ..fast_config()
    });
    let events = station.subscribe_liveness();
    announce(&bus, &station, 8, Mode::Stopped);

    let online = events.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(online.node, 8);
    assert!(online.live);

    let stale = events.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(stale.node, 8);
    assert!(!stale.live);
    assert!(!station.is_live(8));

    // 离线不删除设备
    assert!(station.snapshot(8).is_ok());
}

#[test]
fn test_commands_and_send_failures() {
    let (bus, station) = setup();
    station.send_action(2, ActionId::CommitConfig).unwrap();
    station.set_position(2, 90.0).unwrap();

    let sent = bus.take_sent_frames();
    assert_eq!(sent[0].id, 0x082);
    assert_eq!(sent[0].payload(), 2);
    assert_eq!(sent[1].id, 0x081);
    assert_eq!(sent[1].payload() >> 56, 2);

    bus.set_send_failure(Some(CanDeviceErrorKind::Busy));
    assert!(matches!(station.emergency_stop(), Err(DriverError::Can(_))));
    assert!(bus.sent_frames().is_empty());

    bus.set_send_failure(None);
    station.emergency_stop().unwrap();
    let sent = bus.take_sent_frames();
    assert_eq!(sent[0].id, 0x001);
    assert_eq!(sent[0].payload(), 0);
}

#[test]
fn test_remove_device_is_explicit() {
    let (bus, station) = setup();
    announce(&bus, &station, 1, Mode::Stopped);
    assert!(station.remove_device(1));
    assert!(station.devices().is_empty());

    // 再次上报后重新注册
    announce(&bus, &station, 1, Mode::Stopped);
    assert_eq!(station.nodes(), vec![1]);
}
