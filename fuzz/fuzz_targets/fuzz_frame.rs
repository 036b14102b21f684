#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_chat_client::framing::Packet;
use relay_chat_client::protocol::RelayEvent;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = std::str::from_utf8(data) else {
        return;
    };

    // Decoding arbitrary relay frames must never panic, and an event packet
    // must survive the trip into a relay event.
    if let Ok(packet) = Packet::decode(frame) {
        if let Packet::Event(array) = &packet {
            let _ = RelayEvent::from_event_array(array.clone());
        }
        let _ = packet.encode();
    }
});
