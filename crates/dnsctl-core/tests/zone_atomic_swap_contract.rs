//! Concurrent readers must never observe a half-built zone: every refresh
//! swaps the whole `Arc<Zone>` in one step, so a reader sees either the
//! entirely old zone or the entirely new one.

use dnsctl_core::endpoint::RecordType;
use dnsctl_core::{Endpoint, Zone};
use std::sync::Arc;

#[test]
fn concurrent_readers_never_observe_a_partial_zone() {
    let zone_handle = Arc::new(dnsctl_core::zone::ZoneHandle::new(Zone::new(
        "example.com.",
        "hostmaster@example.com",
    )));

    let reader_handle = zone_handle.clone();
    let reader = std::thread::spawn(move || {
        for _ in 0..2000 {
            let zone = reader_handle.current();
            let outcome = zone.lookup("foo.example.com.", RecordType::A);
            match outcome.answers.len() {
                0 | 3 => {}
                other => panic!("observed a partially built rrset of size {other}"),
            }
        }
    });

    for round in 0..50 {
        let mut next = Zone::new("example.com.", "hostmaster@example.com");
        if round % 2 == 0 {
            next.insert_endpoint(&Endpoint::new(
                "foo.example.com.",
                RecordType::A,
                vec!["1.1.1.1".into(), "2.2.2.2".into(), "3.3.3.3".into()],
            ));
        }
        zone_handle.refresh_from(next);
    }

    reader.join().expect("reader thread panicked");
}
