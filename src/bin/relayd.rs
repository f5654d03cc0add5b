//! Relay daemon - WebRTC signaling relay
//!
//! ```bash
//! relayd --bind 0.0.0.0:8080
//! ```

fn main() -> anyhow::Result<()> {
    relayd::cli::run()
}
