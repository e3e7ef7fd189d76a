use bytes::{Bytes, BytesMut};

use mqttwire_core::{
    codec::{StringPair, VariableByteInteger},
    error::Error,
    properties::{Properties, Property},
    protocol::ProtocolVersion,
    qos::QoS,
    reason::{
        AuthReasonCode, ConnAckCode, ConnectReasonCode, ConnectReturnCode, DisconnectReasonCode,
        PubAckReasonCode, PubCompReasonCode, PubRecReasonCode, PubRelReasonCode, ReasonCode,
        SubAckCode, SubAckReasonCode, SubAckReturnCode, UnsubAckReasonCode,
    },
};
use mqttwire_packets::{
    decode, encode, AuthPacket, ConnAckPacket, ConnectPacket, ControlPacket, DisconnectPacket,
    LastWill, PingReqPacket, PingRespPacket, PubAckPacket, PubCompPacket, PubRecPacket,
    PubRelPacket, PublishPacket, RetainHandling, SubAckPacket, SubscribePacket, Subscription,
    SubscriptionOptions, UnsubAckPacket, UnsubscribePacket,
};

const LEGACY: [ProtocolVersion; 2] = [ProtocolVersion::V3_1, ProtocolVersion::V3_1_1];

fn round_trip(packet: ControlPacket, version: ProtocolVersion) {
    let mut encoded = encode(&packet, version)
        .unwrap_or_else(|e| panic!("encoding {packet:?} for {version}: {e}"));
    let len = encoded.len();

    let decoded = decode(&mut encoded, version, version.max_packet_size())
        .unwrap_or_else(|e| panic!("decoding {packet:?} for {version}: {e}"));

    assert_eq!(decoded, packet, "{version}, {len} bytes");
    assert!(encoded.is_empty());
}

fn common_packets() -> Vec<ControlPacket> {
    vec![
        PublishPacket::new("sensors/1/temp", QoS::AtMostOnce, "21.5").into(),
        PublishPacket {
            retain: true,
            ..PublishPacket::new("a/b", QoS::ExactlyOnce, Bytes::new()).with_packet_id(65535)
        }
        .into(),
        PubAckPacket::new(1).into(),
        PubRecPacket::new(2).into(),
        PubRelPacket::new(3).into(),
        PubCompPacket::new(4).into(),
        SubscribePacket::new(
            5,
            vec![
                Subscription::new("a/+/c", QoS::AtLeastOnce),
                Subscription::new("#", QoS::AtMostOnce),
            ],
        )
        .into(),
        UnsubscribePacket::new(6, ["a/+/c", "#"]).into(),
        PingReqPacket.into(),
        PingRespPacket.into(),
        DisconnectPacket::default().into(),
    ]
}

#[test]
fn test_round_trip_legacy_versions() {
    for version in LEGACY {
        let mut packets = common_packets();

        packets.push(
            ConnectPacket {
                protocol_version: version,
                clean_start: true,
                keepalive: 10,
                client_id: "client".to_string(),
                will: Some(LastWill {
                    qos: QoS::AtLeastOnce,
                    ..LastWill::new("status/client", "offline")
                }),
                user_name: Some("user".to_string()),
                password: Some(Bytes::from_static(b"pass")),
                ..Default::default()
            }
            .into(),
        );
        packets.push(ConnAckPacket::legacy(false, ConnectReturnCode::IdentifierRejected).into());
        packets.push(
            SubAckPacket {
                packet_id: 5,
                return_codes: vec![
                    SubAckCode::Legacy(SubAckReturnCode::SuccessMaximumQoS1),
                    SubAckCode::Legacy(SubAckReturnCode::Failure),
                ],
                ..Default::default()
            }
            .into(),
        );
        packets.push(UnsubAckPacket::new(6, Vec::new()).into());

        for packet in packets {
            round_trip(packet, version);
        }
    }
}

#[test]
fn test_round_trip_v5() {
    let version = ProtocolVersion::V5;
    let mut packets = common_packets();

    packets.extend([
        ConnectPacket {
            clean_start: false,
            keepalive: 120,
            properties: Properties::new()
                .with(Property::SessionExpiryInterval(3600))
                .with(Property::UserProperty(StringPair::new("region", "eu")))
                .with(Property::UserProperty(StringPair::new("region", "us"))),
            client_id: String::new(),
            will: Some(LastWill {
                retain: true,
                properties: Properties::new()
                    .with(Property::WillDelayInterval(5))
                    .with(Property::PayloadFormatIndicator(1)),
                ..LastWill::new("status", "gone")
            }),
            password: Some(Bytes::from_static(b"token")),
            ..Default::default()
        }
        .into(),
        ConnAckPacket {
            properties: Properties::new()
                .with(Property::ServerKeepAlive(30))
                .with(Property::MaximumQoS(1)),
            ..ConnAckPacket::new(true, ConnectReasonCode::Success)
        }
        .into(),
        ConnAckPacket::new(false, ConnectReasonCode::Banned).into(),
        PublishPacket {
            properties: Properties::new()
                .with(Property::TopicAlias(7))
                .with(Property::SubscriptionIdentifier(VariableByteInteger(1)))
                .with(Property::SubscriptionIdentifier(VariableByteInteger(268_435_455)))
                .with(Property::CorrelationData(Bytes::from_static(&[0, 1, 2]))),
            ..PublishPacket::new("", QoS::AtLeastOnce, vec![0u8; 300]).with_packet_id(9)
        }
        .into(),
        PubAckPacket::with_reason(1, PubAckReasonCode::QuotaExceeded).into(),
        PubRecPacket {
            properties: Properties::new().with(Property::ReasonString("later".to_string())),
            ..PubRecPacket::with_reason(2, PubRecReasonCode::Success)
        }
        .into(),
        PubRelPacket::with_reason(3, PubRelReasonCode::PacketIdentifierNotFound).into(),
        PubCompPacket::with_reason(4, PubCompReasonCode::PacketIdentifierNotFound).into(),
        SubscribePacket::new(
            8,
            vec![Subscription {
                topic_filter: "$share/workers/jobs/#".to_string(),
                options: SubscriptionOptions {
                    qos: QoS::ExactlyOnce,
                    no_local: true,
                    retain_as_published: false,
                    retain_handling: RetainHandling::SendAtNewSubscribe,
                },
            }],
        )
        .into(),
        SubAckPacket {
            packet_id: 8,
            return_codes: vec![
                SubAckCode::Reason(SubAckReasonCode::GrantedQoS2),
                SubAckCode::Reason(SubAckReasonCode::SharedSubscriptionsNotSupported),
            ],
            ..Default::default()
        }
        .into(),
        UnsubAckPacket::new(6, vec![UnsubAckReasonCode::NoSubscriptionExisted]).into(),
        DisconnectPacket::new(DisconnectReasonCode::DisconnectWithWillMessage).into(),
        DisconnectPacket {
            properties: Properties::new().with(Property::ServerReference("other".to_string())),
            ..DisconnectPacket::new(DisconnectReasonCode::UseAnotherServer)
        }
        .into(),
        AuthPacket::default().into(),
        AuthPacket::new(
            AuthReasonCode::ReAuthenticate,
            Properties::new().with(Property::AuthenticationMethod("SCRAM-SHA-1".to_string())),
        )
        .into(),
    ]);

    for packet in packets {
        round_trip(packet, version);
    }
}

#[test]
fn test_publish_wire_format_v3_1_1() {
    let packet: ControlPacket = PublishPacket::new("a/b", QoS::AtLeastOnce, vec![1u8, 2])
        .with_packet_id(42)
        .into();

    let encoded = encode(&packet, ProtocolVersion::V3_1_1).unwrap();

    // remaining length matches the bytes after the fixed header
    assert_eq!(encoded[0], 0x32);
    assert_eq!(encoded[1] as usize, encoded.len() - 2);
    assert_eq!(
        &encoded[..],
        &[0x32, 0x09, 0x00, 0x03, b'a', b'/', b'b', 0x00, 0x2a, 0x01, 0x02]
    );

    round_trip(packet, ProtocolVersion::V3_1_1);
}

#[test]
fn test_puback_not_authorized_is_error() {
    let mut src = BytesMut::from(&[0x40, 0x03, 0x00, 0x01, 0x87][..]);

    match decode(&mut src, ProtocolVersion::V5, 1024).unwrap() {
        ControlPacket::PubAck(ack) => {
            assert_eq!(ack.reason_code, PubAckReasonCode::NotAuthorized);
            assert!(ack.reason_code.is_error());
        }
        other => panic!("unexpected packet {other:?}"),
    }
}

#[test]
fn test_truncated_body_is_length_mismatch() {
    let packets = [
        encode(&PubAckPacket::new(1).into(), ProtocolVersion::V3_1_1).unwrap(),
        encode(&UnsubscribePacket::new(1, ["a"]).into(), ProtocolVersion::V5).unwrap(),
        encode(
            &ConnectPacket {
                client_id: "c".to_string(),
                ..Default::default()
            }
            .into(),
            ProtocolVersion::V5,
        )
        .unwrap(),
    ];

    for encoded in packets {
        let mut src = BytesMut::from(&encoded[..encoded.len() - 1]);

        assert!(matches!(
            decode(&mut src, ProtocolVersion::V5, 1024),
            Err(Error::VariableHeaderLengthMismatch { .. })
        ));
    }
}

#[test]
fn test_legacy_refusals_are_not_errors() {
    let mut src = BytesMut::from(&[0x20, 0x02, 0x00, 0x04][..]);

    match decode(&mut src, ProtocolVersion::V3_1_1, 1024).unwrap() {
        ControlPacket::ConnAck(ack) => {
            assert_eq!(
                ack.code,
                ConnAckCode::Legacy(ConnectReturnCode::BadUserNameOrPassword)
            );
            assert!(!ack.code.is_success());
            assert!(!ack.code.is_error());
        }
        other => panic!("unexpected packet {other:?}"),
    }
}

#[test]
fn test_duplicate_property_rejected() {
    // PUBLISH QoS 0 "t" with Topic Alias twice
    let mut src = BytesMut::from(
        &[
            0x30, 0x0a, 0x00, 0x01, 0x74, 0x06, 0x23, 0x00, 0x01, 0x23, 0x00, 0x02,
        ][..],
    );

    assert!(matches!(
        decode(&mut src, ProtocolVersion::V5, 1024),
        Err(Error::DuplicatePropertyNotAllowed(_))
    ));
}

#[test]
fn test_property_order_preserved() {
    let properties = Properties::new()
        .with(Property::UserProperty(StringPair::new("b", "2")))
        .with(Property::ContentType("text/plain".to_string()))
        .with(Property::UserProperty(StringPair::new("a", "1")));

    let packet: ControlPacket = PublishPacket {
        properties: properties.clone(),
        ..PublishPacket::new("t", QoS::AtMostOnce, "x")
    }
    .into();

    let mut encoded = encode(&packet, ProtocolVersion::V5).unwrap();
    match decode(&mut encoded, ProtocolVersion::V5, 1024).unwrap() {
        ControlPacket::Publish(publish) => {
            let pairs: Vec<_> = publish
                .properties
                .user_properties()
                .map(|p| (p.key.as_str(), p.value.as_str()))
                .collect();
            assert_eq!(pairs, vec![("b", "2"), ("a", "1")]);
            assert_eq!(publish.properties, properties);
        }
        other => panic!("unexpected packet {other:?}"),
    }
}

#[test]
fn test_encode_rejects_strings_decode_would_refuse() {
    let packets: [(ControlPacket, ProtocolVersion, &str); 3] = [
        (
            ConnectPacket {
                protocol_version: ProtocolVersion::V3_1_1,
                client_id: "a\0b".to_string(),
                ..Default::default()
            }
            .into(),
            ProtocolVersion::V3_1_1,
            "client identifier",
        ),
        (
            ConnectPacket {
                client_id: "c".to_string(),
                user_name: Some("us\0er".to_string()),
                ..Default::default()
            }
            .into(),
            ProtocolVersion::V5,
            "user name",
        ),
        (
            PublishPacket {
                properties: Properties::new()
                    .with(Property::UserProperty(StringPair::new("k\0", "v"))),
                ..PublishPacket::new("t", QoS::AtMostOnce, "x")
            }
            .into(),
            ProtocolVersion::V5,
            "user property key",
        ),
    ];

    for (packet, version, expected) in packets {
        match encode(&packet, version) {
            Err(Error::InvalidUtf8String { field }) => assert_eq!(field, expected),
            r => panic!("unexpected result {r:?}"),
        }
    }
}
