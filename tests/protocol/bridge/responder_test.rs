//! Tests for `EscResponder`: cached replies, staleness policies, ESC status
//! recording, and ignored traffic.
mod helpers {
    include!("../../helpers/mod.rs");
}

use helpers::{MockSerialPort, MockTimer, VirtualClock};
use surron_bridge::{
    config::{ResponderConfig, StalenessPolicy},
    core::{BMS_ADDRESS, ESC_ADDRESS},
    error::ExchangeError,
    infra::codec::frame::Frame,
    protocol::{
        bridge::responder::{DropReason, EscResponder, FrameOutcome},
        cache::{EscStatusTable, ParameterCache, Partition},
        transport::session::Session,
    },
};

const VOLTAGE: [u8; 4] = [0x48, 0xD5, 0x00, 0x00];

struct Fixture {
    port: MockSerialPort,
    clock: VirtualClock,
    cache: ParameterCache,
    esc_status: EscStatusTable,
}

impl Fixture {
    fn new() -> Self {
        Self {
            port: MockSerialPort::new(),
            clock: VirtualClock::default(),
            cache: ParameterCache::new(),
            esc_status: EscStatusTable::new(),
        }
    }

    fn responder(&self, staleness: StalenessPolicy) -> EscResponder<'_, MockSerialPort, MockTimer> {
        let session = Session::new(self.port.clone(), MockTimer::new(self.clock.clone()));
        let config = ResponderConfig {
            staleness,
            ..ResponderConfig::default()
        };
        EscResponder::with_config(session, &self.cache, &self.esc_status, config)
    }
}

fn voltage_request() -> Frame {
    Frame::read_request(BMS_ADDRESS, 9, 4).unwrap()
}

//==================================================================================READ_REQUESTS
#[tokio::test]
async fn test_reply_echoes_request() {
    let fixture = Fixture::new();
    fixture.cache.store(Partition::Fast, 9, &VOLTAGE, 0).unwrap();
    fixture.clock.set(1_000);
    let mut responder = fixture.responder(StalenessPolicy::PerEntry);

    let outcome = responder.handle_frame(&voltage_request()).await.unwrap();

    assert_eq!(outcome, FrameOutcome::Replied);
    let expected = Frame::read_response(BMS_ADDRESS, 9, &VOLTAGE).unwrap();
    assert_eq!(fixture.port.writes(), vec![expected.to_bytes().to_vec()]);
}

#[tokio::test]
async fn test_reply_falls_back_to_slow_partition() {
    let fixture = Fixture::new();
    fixture.cache.store(Partition::Slow, 13, &[87], 0).unwrap();
    let mut responder = fixture.responder(StalenessPolicy::PerEntry);

    let request = Frame::read_request(BMS_ADDRESS, 13, 1).unwrap();
    assert_eq!(
        responder.handle_frame(&request).await.unwrap(),
        FrameOutcome::Replied
    );
}

#[tokio::test]
async fn test_missing_parameter_is_dropped() {
    let fixture = Fixture::new();
    let mut responder = fixture.responder(StalenessPolicy::PerEntry);

    assert_eq!(
        responder.handle_frame(&voltage_request()).await.unwrap(),
        FrameOutcome::Dropped(DropReason::Missing)
    );
    assert!(fixture.port.writes().is_empty());
}

#[tokio::test]
/// Exactly 30 s old is still served; one millisecond more is not.
async fn test_staleness_threshold() {
    let fixture = Fixture::new();
    fixture.cache.store(Partition::Fast, 9, &VOLTAGE, 10_000).unwrap();
    let mut responder = fixture.responder(StalenessPolicy::PerEntry);

    fixture.clock.set(40_000);
    assert_eq!(
        responder.handle_frame(&voltage_request()).await.unwrap(),
        FrameOutcome::Replied
    );

    fixture.clock.set(40_001);
    assert_eq!(
        responder.handle_frame(&voltage_request()).await.unwrap(),
        FrameOutcome::Dropped(DropReason::Stale { age_ms: 30_001 })
    );
    assert_eq!(fixture.port.writes().len(), 1);
}

#[tokio::test]
/// A fresh fast entry masks an old slow one only under the shared timestamp.
async fn test_staleness_policies_differ() {
    let fixture = Fixture::new();
    fixture.cache.store(Partition::Slow, 23, &[0x2C, 0x01, 0, 0], 0).unwrap();
    fixture.cache.store(Partition::Fast, 9, &VOLTAGE, 25_000).unwrap();
    fixture.clock.set(40_000);
    let request = Frame::read_request(BMS_ADDRESS, 23, 4).unwrap();

    let mut per_entry = fixture.responder(StalenessPolicy::PerEntry);
    assert_eq!(
        per_entry.handle_frame(&request).await.unwrap(),
        FrameOutcome::Dropped(DropReason::Stale { age_ms: 40_000 })
    );

    let mut shared = fixture.responder(StalenessPolicy::SharedLastUpdate);
    assert_eq!(
        shared.handle_frame(&request).await.unwrap(),
        FrameOutcome::Replied
    );
}

#[tokio::test]
async fn test_length_mismatch_is_dropped() {
    let fixture = Fixture::new();
    fixture.cache.store(Partition::Fast, 9, &VOLTAGE, 0).unwrap();
    let mut responder = fixture.responder(StalenessPolicy::PerEntry);

    let request = Frame::read_request(BMS_ADDRESS, 9, 2).unwrap();
    assert_eq!(
        responder.handle_frame(&request).await.unwrap(),
        FrameOutcome::Dropped(DropReason::LengthMismatch { cached: 4 })
    );
    assert!(fixture.port.writes().is_empty());
}

//==================================================================================STATUS
#[tokio::test]
async fn test_esc_status_recorded() {
    let fixture = Fixture::new();
    let mut responder = fixture.responder(StalenessPolicy::PerEntry);

    let status = Frame::status(ESC_ADDRESS, 75, &[0x01, 0x02]).unwrap();
    assert_eq!(
        responder.handle_frame(&status).await.unwrap(),
        FrameOutcome::StatusRecorded
    );

    assert_eq!(&fixture.esc_status.get(75).unwrap()[..], &[0x01, 0x02]);
    assert!(fixture.esc_status.take_updated());
    assert!(fixture.port.writes().is_empty());
}

#[tokio::test]
async fn test_other_traffic_ignored() {
    let fixture = Fixture::new();
    fixture.cache.store(Partition::Fast, 9, &VOLTAGE, 0).unwrap();
    let mut responder = fixture.responder(StalenessPolicy::PerEntry);

    let frames = [
        Frame::read_request(ESC_ADDRESS, 9, 4).unwrap(),
        Frame::status(BMS_ADDRESS, 75, &[0x01, 0x02]).unwrap(),
        Frame::read_response(BMS_ADDRESS, 9, &VOLTAGE).unwrap(),
    ];
    for frame in &frames {
        assert_eq!(
            responder.handle_frame(frame).await.unwrap(),
            FrameOutcome::Ignored
        );
    }
    assert!(fixture.port.writes().is_empty());
    assert!(fixture.esc_status.is_empty());
}

//==================================================================================SERVE_ONCE
#[tokio::test]
async fn test_serve_once_reads_from_bus() {
    let fixture = Fixture::new();
    fixture.cache.store(Partition::Fast, 9, &VOLTAGE, 0).unwrap();
    let mut responder = fixture.responder(StalenessPolicy::PerEntry);

    fixture.port.push_frame(&voltage_request());
    assert_eq!(responder.serve_once().await.unwrap(), FrameOutcome::Replied);

    assert!(matches!(
        responder.serve_once().await,
        Err(ExchangeError::Timeout)
    ));
}

#[tokio::test]
/// A malformed frame is dropped without any reply.
async fn test_serve_once_drops_garbage() {
    let fixture = Fixture::new();
    let mut responder = fixture.responder(StalenessPolicy::PerEntry);

    let mut bytes = voltage_request().to_bytes().to_vec();
    bytes[5] = bytes[5].wrapping_add(1);
    fixture.port.push_inbound(&bytes);

    assert!(matches!(
        responder.serve_once().await,
        Err(ExchangeError::InvalidData(_))
    ));
    assert!(fixture.port.writes().is_empty());
    assert_eq!(fixture.port.resets(), 1);
}

#[tokio::test]
/// A request with an unusual length byte still reaches the cache lookup and
/// leaves the following frame intact.
async fn test_serve_once_accepts_long_request_length() {
    let fixture = Fixture::new();
    let mut responder = fixture.responder(StalenessPolicy::PerEntry);

    let mut request = [0x46, 0x16, 0x01, 0x27, 80, 0x00];
    request[5] = request[..5].iter().fold(0u8, |acc, byte| acc.wrapping_add(*byte));
    fixture.port.push_inbound(&request);
    fixture
        .port
        .push_frame(&Frame::status(ESC_ADDRESS, 75, &[0x01, 0x02]).unwrap());

    assert_eq!(
        responder.serve_once().await.unwrap(),
        FrameOutcome::Dropped(DropReason::Missing)
    );
    assert_eq!(fixture.port.resets(), 0);
    assert_eq!(
        responder.serve_once().await.unwrap(),
        FrameOutcome::StatusRecorded
    );
}
