#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_chat_client::protocol::{ClientEvent, RelayEvent};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    if let Ok(Some(event)) = RelayEvent::from_event_array(value.clone()) {
        // Whatever parsed must encode back to an array of the same name.
        if let Ok(array) = event.to_event_array() {
            assert_eq!(
                array.get(0).and_then(serde_json::Value::as_str),
                Some(event.name())
            );
        }
    }
    let _ = ClientEvent::from_event_array(value);
});
