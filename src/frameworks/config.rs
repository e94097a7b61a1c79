use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("HORDE_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const SNAPSHOT_BROADCAST_CAPACITY: usize = 128;
pub const EVENT_BROADCAST_CAPACITY: usize = 64;

/// 60 simulation ticks per second.
pub const TICK_INTERVAL: Duration = Duration::from_micros(16_667);
