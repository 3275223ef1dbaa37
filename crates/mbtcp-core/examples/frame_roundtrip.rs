use mbtcp_core::encoding::Writer;
use mbtcp_core::frame::tcp::{self, MAX_FRAME_LEN, PAYLOAD_OFFSET, ResponseKind};
use mbtcp_core::pdu::{FunctionCode, RegisterView};

fn main() {
    let mut buf = [0u8; MAX_FRAME_LEN];
    let mut w = Writer::new(&mut buf[PAYLOAD_OFFSET..]);
    w.write_be_u16(0x006B)
        .and_then(|()| w.write_be_u16(2))
        .expect("payload fits the frame buffer");
    let frame_len = PAYLOAD_OFFSET + w.position();

    let request =
        tcp::encode_request_header(&mut buf, 1, 0xFF, FunctionCode::ReadHoldingRegisters, frame_len)
            .expect("request frame within capacity");
    println!("encoded request frame: {:02X?}", &buf[..frame_len]);

    let response = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0xFF, 0x03, 0x04, 0x00, 0x2A, 0x00, 0x64,
    ];
    match tcp::match_response(&request, FunctionCode::ReadHoldingRegisters, &response) {
        Ok((_, ResponseKind::Regular)) => {
            let view = RegisterView::new(&response[PAYLOAD_OFFSET + 1..]);
            for (idx, value) in view.iter().enumerate() {
                println!("register[{idx}] = {value}");
            }
        }
        Ok((_, ResponseKind::Exception(ex))) => println!("device exception: {ex}"),
        Err(err) => println!("frame rejected: {err}"),
    }
}
