/*!
 * Hardening Kernel - Main Entry Point
 *
 * Boots the hardening subsystem and activates each image named on the
 * command line in a fresh process:
 *
 *   hardening /bin/sh /usr/bin/vim:acl=0x80000008 /opt/app:extattr=0x80
 */

use anyhow::{Context, Result};
use hardening_kernel::{init_tracing, HardeningConfig, HardeningKernel, ImageParams};
use tracing::info;

fn main() -> Result<()> {
    init_tracing();

    let config = HardeningConfig::load().context("Failed to load hardening configuration")?;
    let kernel = HardeningKernel::init(config).context("Hardening subsystem failed to start")?;

    let images = std::env::args()
        .skip(1)
        .map(|arg| {
            arg.parse::<ImageParams>()
                .with_context(|| format!("Invalid image argument {:?}", arg))
        })
        .collect::<Result<Vec<_>>>()?;

    if images.is_empty() {
        info!("No images given, nothing to activate");
        return Ok(());
    }

    let mut rejected = 0usize;
    for image in &images {
        let name = image
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| image.path().display().to_string());

        let (thread, result) = kernel.spawn(&name, image);
        match result {
            Ok(report) => {
                println!(
                    "{}: pid {} committed {:#010x} (requested {:#010x}){}",
                    image.path().display(),
                    thread.pid(),
                    report.committed.bits(),
                    report.requested.bits(),
                    if report.skipped { " [sticky]" } else { "" }
                );
            }
            Err(e) => {
                rejected += 1;
                println!(
                    "{}: pid {} rejected: {} (errno {})",
                    image.path().display(),
                    thread.pid(),
                    e,
                    e.errno()
                );
            }
        }
        kernel.exit(thread)?;
    }

    info!(
        activated = images.len() - rejected,
        rejected,
        "Activation run complete"
    );

    if rejected > 0 {
        anyhow::bail!("{} of {} activations rejected", rejected, images.len());
    }
    Ok(())
}
