use mbtcp_core::DecodeError;
use mbtcp_core::encoding::Writer;
use mbtcp_core::frame::tcp::{
    self, FrameProgress, MAX_FRAME_LEN, MbapHeader, PAYLOAD_OFFSET, ResponseKind,
};
use mbtcp_core::pdu::{ExceptionCode, FunctionCode, RegisterView};

const TCP_READ_HOLDING: &[u8] = &[
    0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x03, 0x00, 0x6B, 0x00, 0x03,
];
const TCP_READ_HOLDING_RESP: &[u8] = &[
    0x00, 0x01, 0x00, 0x00, 0x00, 0x09, 0xFF, 0x03, 0x06, 0x02, 0x2B, 0x00, 0x00, 0x00, 0x64,
];
const TCP_WRITE_MULTIPLE: &[u8] = &[
    0x01, 0x00, 0x00, 0x00, 0x00, 0x0D, 0x01, 0x10, 0x03, 0xE9, 0x00, 0x03, 0x06, 0x00, 0x01,
    0x00, 0x02, 0x00, 0x03,
];

fn stage(buf: &mut [u8; MAX_FRAME_LEN], payload: impl FnOnce(&mut Writer<'_>)) -> usize {
    let mut w = Writer::new(&mut buf[PAYLOAD_OFFSET..]);
    payload(&mut w);
    PAYLOAD_OFFSET + w.position()
}

#[test]
fn fc03_request_golden_encode() {
    let mut buf = [0u8; MAX_FRAME_LEN];
    let len = stage(&mut buf, |w| {
        w.write_be_u16(0x006B).unwrap();
        w.write_be_u16(0x0003).unwrap();
    });
    tcp::encode_request_header(&mut buf, 1, 0xFF, FunctionCode::ReadHoldingRegisters, len)
        .unwrap();
    assert_eq!(&buf[..len], TCP_READ_HOLDING);
}

#[test]
fn fc16_request_golden_encode() {
    let mut buf = [0u8; MAX_FRAME_LEN];
    let len = stage(&mut buf, |w| {
        w.write_be_u16(1001).unwrap();
        w.write_be_u16(3).unwrap();
        w.write_u8(6).unwrap();
        w.write_be_u16s(&[1, 2, 3]).unwrap();
    });
    tcp::encode_request_header(&mut buf, 0x0100, 0x01, FunctionCode::WriteMultipleRegisters, len)
        .unwrap();
    assert_eq!(&buf[..len], TCP_WRITE_MULTIPLE);
}

#[test]
fn fc03_response_match_and_payload() {
    let request = MbapHeader {
        transaction_id: 1,
        protocol_id: 0,
        length: 6,
        unit_id: 0xFF,
    };
    let (header, kind) = tcp::match_response(
        &request,
        FunctionCode::ReadHoldingRegisters,
        TCP_READ_HOLDING_RESP,
    )
    .unwrap();
    assert_eq!(kind, ResponseKind::Regular);
    assert_eq!(
        tcp::reconcile_length(&header, TCP_READ_HOLDING_RESP.len(), MAX_FRAME_LEN).unwrap(),
        FrameProgress::Complete
    );

    let view = RegisterView::new(&TCP_READ_HOLDING_RESP[9..]);
    assert_eq!(view.len(), 3);
    assert_eq!(view.register(0), Some(0x022B));
    assert_eq!(view.register(1), Some(0x0000));
    assert_eq!(view.register(2), Some(0x0064));
}

#[test]
fn fragmented_head_reports_partial_frame() {
    let request = MbapHeader {
        transaction_id: 1,
        protocol_id: 0,
        length: 6,
        unit_id: 0xFF,
    };
    let head = &TCP_READ_HOLDING_RESP[..9];
    let (header, kind) =
        tcp::match_response(&request, FunctionCode::ReadHoldingRegisters, head).unwrap();
    assert_eq!(kind, ResponseKind::Regular);
    assert_eq!(
        tcp::reconcile_length(&header, head.len(), MAX_FRAME_LEN).unwrap(),
        FrameProgress::Partial {
            end: TCP_READ_HOLDING_RESP.len()
        }
    );
}

#[test]
fn gateway_exception_golden_decode() {
    let request = MbapHeader {
        transaction_id: 0x1234,
        protocol_id: 0,
        length: 6,
        unit_id: 0x01,
    };
    let frame = [0x12, 0x34, 0x00, 0x00, 0x00, 0x03, 0x01, 0x84, 0x0B];
    let (_, kind) =
        tcp::match_response(&request, FunctionCode::ReadInputRegisters, &frame).unwrap();
    let ResponseKind::Exception(ex) = kind else {
        panic!("expected exception response");
    };
    assert_eq!(ex.function_code, 0x04);
    assert_eq!(
        ex.exception_code,
        ExceptionCode::GatewayTargetFailedToRespond
    );
}

#[test]
fn oversized_declaration_is_strictly_rejected() {
    let mut frame = [0u8; 9];
    frame[..8].copy_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x01, 0x00, 0xFF, 0x03]);
    let request = MbapHeader {
        transaction_id: 1,
        protocol_id: 0,
        length: 6,
        unit_id: 0xFF,
    };
    let (header, _) =
        tcp::match_response(&request, FunctionCode::ReadHoldingRegisters, &frame).unwrap();
    assert_eq!(
        tcp::reconcile_length(&header, frame.len(), MAX_FRAME_LEN).unwrap_err(),
        DecodeError::ExceedsFrameCapacity {
            end: 0x0100 + 6,
            capacity: MAX_FRAME_LEN
        }
    );
}
