//! Tests for `Session`: framing on receive, and `read_register` retries.
mod helpers {
    include!("../../helpers/mod.rs");
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use helpers::{simulated_bms, MockSerialPort, MockTimer};
use surron_bridge::{
    config::SessionConfig,
    core::{BMS_ADDRESS, ESC_ADDRESS},
    error::{ExchangeError, FrameError},
    infra::codec::frame::{Command, Frame},
    protocol::catalog::BmsParameter,
    protocol::transport::session::Session,
};

const VOLTAGE_MV: u32 = 54_600;

fn voltage_table() -> HashMap<u8, Vec<u8>> {
    HashMap::from([(9u8, VOLTAGE_MV.to_le_bytes().to_vec())])
}

fn response_bytes(parameter: u8, data: &[u8]) -> Vec<u8> {
    Frame::read_response(BMS_ADDRESS, parameter, data)
        .unwrap()
        .to_bytes()
        .to_vec()
}

//==================================================================================READ_REGISTER
#[tokio::test]
async fn test_read_register_first_trial() {
    let port = MockSerialPort::with_device(simulated_bms(voltage_table()));
    let timer = MockTimer::default();
    let mut session = Session::new(port.clone(), timer.clone());

    let data = session.read_register(BMS_ADDRESS, 9, 4).await.unwrap();

    assert_eq!(data.as_deref(), Some(&VOLTAGE_MV.to_le_bytes()[..]));
    assert_eq!(port.writes(), vec![vec![0x46, 0x16, 0x01, 0x09, 0x04, 0x6A]]);
    assert_eq!(port.input_flushes(), 1);
    assert_eq!(port.resets(), 0);
    assert!(timer.delays().is_empty());
}

#[tokio::test]
/// A silent device costs exactly three trials with two pauses in between.
async fn test_read_register_gives_up_after_trials() {
    let port = MockSerialPort::new();
    let timer = MockTimer::default();
    let mut session = Session::new(port.clone(), timer.clone());

    let data = session.read_register(BMS_ADDRESS, 9, 4).await.unwrap();

    assert_eq!(data, None);
    assert_eq!(port.writes().len(), 3);
    assert_eq!(timer.delays(), vec![100, 100]);
    // Every timed-out header read resets the port.
    assert_eq!(port.resets(), 3);
}

#[tokio::test]
async fn test_read_register_honours_trial_count() {
    let port = MockSerialPort::new();
    let timer = MockTimer::default();
    let config = SessionConfig {
        trials: 1,
        ..SessionConfig::default()
    };
    let mut session = Session::with_config(port.clone(), timer.clone(), config);

    assert_eq!(session.read_register(BMS_ADDRESS, 9, 4).await, Ok(None));
    assert_eq!(port.writes().len(), 1);
    assert!(timer.delays().is_empty());
}

#[tokio::test]
/// An answer for another parameter is a failed trial, not a result.
async fn test_read_register_retries_on_mismatched_response() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let port = MockSerialPort::with_device(move |_request: &[u8]| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            response_bytes(10, &(-1_500i32).to_le_bytes())
        } else {
            response_bytes(9, &VOLTAGE_MV.to_le_bytes())
        }
    });
    let timer = MockTimer::default();
    let mut session = Session::new(port.clone(), timer.clone());

    let data = session.read_register(BMS_ADDRESS, 9, 4).await.unwrap();

    assert_eq!(data.as_deref(), Some(&VOLTAGE_MV.to_le_bytes()[..]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(timer.delays(), vec![100]);
}

#[tokio::test]
async fn test_read_register_retries_on_corrupted_frame() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let port = MockSerialPort::with_device(move |_request: &[u8]| {
        let mut bytes = response_bytes(9, &VOLTAGE_MV.to_le_bytes());
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            let last = bytes.len() - 1;
            bytes[last] ^= 0xFF;
        }
        bytes
    });
    let timer = MockTimer::default();
    let mut session = Session::new(port.clone(), timer);

    let data = session.read_register(BMS_ADDRESS, 9, 4).await.unwrap();

    assert!(data.is_some());
    assert_eq!(port.writes().len(), 2);
    assert_eq!(port.resets(), 1);
}

#[tokio::test]
async fn test_read_register_rejects_unbuildable_request() {
    let port = MockSerialPort::new();
    let mut session = Session::new(port.clone(), MockTimer::default());

    assert_eq!(
        session.read_register(BMS_ADDRESS, 9, 65).await,
        Err(FrameError::PayloadTooLong { len: 65 })
    );
    assert!(port.writes().is_empty());
}

#[tokio::test]
async fn test_read_bms_parameter_uses_catalog_length() {
    let port = MockSerialPort::with_device(simulated_bms(voltage_table()));
    let mut session = Session::new(port.clone(), MockTimer::default());

    let data = session
        .read_bms_parameter(BMS_ADDRESS, BmsParameter::BatteryVoltage)
        .await
        .unwrap();

    assert_eq!(&data[..], &VOLTAGE_MV.to_le_bytes());
    assert_eq!(port.writes()[0][4], 4);
}

//==================================================================================RECEIVE
#[tokio::test]
/// The Status length byte is one more than the payload it announces.
async fn test_receive_status_frame() {
    let port = MockSerialPort::new();
    let mut session = Session::new(port.clone(), MockTimer::default());
    port.push_inbound(&Frame::status(ESC_ADDRESS, 75, &[0x12, 0x34]).unwrap().to_bytes());

    let frame = session.receive_frame(1000).await.unwrap();

    assert_eq!(frame.command(), Command::Status);
    assert_eq!(frame.address(), ESC_ADDRESS);
    assert_eq!(frame.payload(), Some(&[0x12, 0x34][..]));
    assert_eq!(port.pending_inbound(), 0);
}

#[tokio::test]
/// Back-to-back frames are split on the boundary the header announces.
async fn test_receive_consecutive_frames() {
    let port = MockSerialPort::new();
    let mut session = Session::new(port.clone(), MockTimer::default());
    port.push_frame(&Frame::read_request(BMS_ADDRESS, 13, 4).unwrap());
    port.push_frame(&Frame::read_request(BMS_ADDRESS, 9, 4).unwrap());

    assert_eq!(session.receive_frame(1000).await.unwrap().parameter(), 13);
    assert_eq!(session.receive_frame(1000).await.unwrap().parameter(), 9);
}

#[tokio::test]
async fn test_receive_invalid_header_resets_port() {
    let port = MockSerialPort::new();
    let mut session = Session::new(port.clone(), MockTimer::default());
    port.push_inbound(&[0x99, 0x16, 0x01, 0x09, 0x04, 0x00, 0x00]);

    let result = session.receive_frame(1000).await;

    assert!(matches!(
        result,
        Err(ExchangeError::InvalidData(FrameError::InvalidCommand(0x99)))
    ));
    assert_eq!(port.resets(), 1);
    assert_eq!(port.pending_inbound(), 0);
}

#[tokio::test]
async fn test_receive_partial_body_times_out() {
    let port = MockSerialPort::new();
    let mut session = Session::new(port.clone(), MockTimer::default());
    let bytes = response_bytes(9, &VOLTAGE_MV.to_le_bytes());
    port.push_inbound(&bytes[..7]);

    assert!(matches!(
        session.receive_frame(200).await,
        Err(ExchangeError::Timeout)
    ));
    assert_eq!(port.resets(), 1);
}

#[tokio::test]
async fn test_exchange_reports_mismatch() {
    let port = MockSerialPort::with_device(|_request: &[u8]| response_bytes(10, &[0, 0, 0, 0]));
    let mut session = Session::new(port, MockTimer::default());
    let request = Frame::read_request(BMS_ADDRESS, 9, 4).unwrap();

    assert!(matches!(
        session.exchange(&request).await,
        Err(ExchangeError::MismatchedResponse)
    ));
}
