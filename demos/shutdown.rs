//! Drain-then-shutdown: workers borrow a shared service while the main
//! thread retires it and blocks until quiescence.
//!
//! Run with `cargo run --example shutdown`.

use std::thread;
use std::time::Duration;

use quiesce::WaitableOwner;

struct Service {
    name: &'static str,
}

impl Service {
    fn handle_request(&self, request: usize) -> usize {
        request * 2
    }
}

fn main() {
    let owner = WaitableOwner::new(Service { name: "search" });

    thread::scope(|s| {
        for worker in 0..4 {
            let owner = &owner;
            s.spawn(move || {
                let mut served = 0usize;
                // Work until the owner refuses new borrows.
                while let Some(service) = owner.try_handle() {
                    let _ = service.handle_request(served);
                    served += 1;
                    thread::sleep(Duration::from_millis(1));
                }
                println!("worker {worker}: drained after {served} requests");
            });
        }

        thread::sleep(Duration::from_millis(25));

        let name = owner
            .try_handle()
            .map(|service| service.name)
            .unwrap_or("<gone>");
        println!("retiring `{name}` and waiting for quiescence");

        owner.retire_and_wait();
        println!("service reclaimed; no borrower can still see it");
    });
}
