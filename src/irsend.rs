use anyhow::Context;
use irgate_shared::{Channel, Encoder};

pub fn transmit<C: Channel>(channel: C, durations: &[u32]) -> anyhow::Result<()> {
    if durations.is_empty() {
        anyhow::bail!("Nothing to send");
    }

    if durations.len() % 2 == 0 {
        log::warn!("Code ends with a space, {} durations", durations.len());
    }

    log::info!("Sending code: {:?}", durations);

    let mut encoder = Encoder::new(channel);
    encoder.send(durations).context("Send failed")?;
    log::info!("Sent");

    Ok(())
}
