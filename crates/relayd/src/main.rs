//! Relay daemon - WebRTC signaling relay
//!
//! See [`relayd::cli`] for flags and environment variables.

fn main() -> anyhow::Result<()> {
    relayd::cli::run()
}
