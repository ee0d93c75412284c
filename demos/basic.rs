//! Basic usage of the throttler crate.
//!
//! Run with: `cargo run --example basic`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use throttler::{
    CancellationToken, LimitingBehavior, Outcome, Throttler, ThrottlerBuilder, ThrottlerConfig,
    ThrottlerRegistry,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Throttler Examples ===\n");

    drop_example()?;
    separator();
    block_example()?;
    separator();
    cancel_example()?;
    separator();
    registry_example()?;

    Ok(())
}

fn separator() {
    println!("\n{}\n", "=".repeat(50));
}

fn drop_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("1. Drop behavior (5 per minute, 8 threads x 5 calls):");

    let throttler = Arc::new(Throttler::new(5)?);
    let sent = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let throttler = throttler.clone();
            let sent = sent.clone();
            thread::spawn(move || {
                for _ in 0..5 {
                    throttler.execute(|| {
                        sent.fetch_add(1, Ordering::Relaxed);
                    });
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().map_err(|_| "worker panicked")?;
    }

    println!("   Executed: {}", sent.load(Ordering::Relaxed));
    println!("{}", throttler.metrics());
    Ok(())
}

fn block_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("2. Block behavior (3 per 200ms, 9 calls):");

    let throttler = ThrottlerBuilder::new()
        .limit(3)
        .interval_ms(200)
        .behavior(LimitingBehavior::Block)
        .build()?;

    let start = Instant::now();
    for i in 1..=9 {
        throttler.execute(|| println!("   Call {} ran at {:?}", i, start.elapsed()));
    }
    println!("   All calls done after {:?}", start.elapsed());
    Ok(())
}

fn cancel_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("3. Cancelling a blocked caller:");

    let throttler = Arc::new(Throttler::with_config(
        ThrottlerConfig::new(1)
            .with_interval(Duration::from_secs(60))
            .with_behavior(LimitingBehavior::Block),
    )?);
    throttler.execute(|| println!("   First call ran"));

    let cancel = CancellationToken::new();
    let waiter = {
        let throttler = throttler.clone();
        let cancel = cancel.clone();
        thread::spawn(move || throttler.execute_cancellable(|| println!("   never printed"), &cancel))
    };

    thread::sleep(Duration::from_millis(100));
    cancel.cancel();

    match waiter.join().map_err(|_| "waiter panicked")? {
        Outcome::Cancelled => println!("   Second call gave up waiting"),
        other => println!("   Unexpected outcome: {:?}", other),
    }
    Ok(())
}

fn registry_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("4. One limit per channel (2 per minute):");

    let registry = ThrottlerRegistry::new(ThrottlerConfig::per_minute(2))?;

    for (i, channel) in ["email", "sms", "email", "email", "sms", "webhook"]
        .into_iter()
        .enumerate()
    {
        let outcome = registry.execute(channel, || {});
        println!("   Notification {} via {:<8} {:?}", i + 1, channel, outcome);
    }

    println!("{}", registry.stats());
    Ok(())
}
