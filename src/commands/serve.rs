//! Serve command implementation

use serbridge_core::{ByteTransport, DeviceIdentity, Dispatcher, Error, LinkError, LinkConfig};
use serbridge_emu::{EmulatedFlash, FlashConfig};
use serbridge_host::{link, SerprogConnection};
use std::net::TcpListener;
use std::path::PathBuf;

/// Options for `serbridge serve`
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Where to accept the host
    pub connection: SerprogConnection,
    /// Initial flash contents
    pub image: Option<PathBuf>,
    /// Flash size in bytes
    pub size: u32,
    /// 24-bit JEDEC ID
    pub jedec_id: u32,
    /// Programmer name
    pub name: String,
}

/// Run the bridge until the serial link closes, or forever on TCP
pub fn run(opts: &ServeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut flash = build_flash(opts)?;
    let identity = DeviceIdentity::new(&opts.name);

    log::info!(
        "Emulating {} flash, JEDEC ID {:06X}, as \"{}\"",
        super::format_size(flash.data().len()),
        opts.jedec_id,
        identity.name_str()
    );

    match &opts.connection {
        SerprogConnection::Tcp { host, port } => {
            let listener = link::listen(&format!("{}:{}", host, port))?;
            loop {
                serve_next(&listener, &mut flash, identity);
            }
        }
        SerprogConnection::Serial { device, baud } => {
            let config = match baud {
                Some(b) => LinkConfig::DEFAULT.with_baud(*b),
                None => LinkConfig::DEFAULT,
            };
            let link = link::open_serial(device, &config)?;
            serve_session(link, &mut flash, identity);
            Ok(())
        }
    }
}

/// Accept one TCP client and serve it
///
/// Accept errors are logged and reported as `false`; the listener stays up.
fn serve_next(
    listener: &TcpListener,
    flash: &mut EmulatedFlash,
    identity: DeviceIdentity,
) -> bool {
    match link::accept(listener) {
        Ok(link) => {
            serve_session(link, flash, identity);
            true
        }
        Err(e) => {
            log::warn!("Accept failed: {}", e);
            false
        }
    }
}

/// Run one client session; the flash outlives it
fn serve_session<T>(link: T, flash: &mut EmulatedFlash, identity: DeviceIdentity)
where
    T: ByteTransport<Error = LinkError<std::io::Error>>,
{
    let mut dispatcher = Dispatcher::new(link, flash, identity);
    match dispatcher.run() {
        Err(Error::Transport(LinkError::Closed)) => log::info!("Client disconnected"),
        Err(e) => log::warn!("Session ended: {}", e),
        Ok(()) => {}
    }
}

/// Create the emulated chip, loading the image if one was given
fn build_flash(opts: &ServeOptions) -> Result<EmulatedFlash, Box<dyn std::error::Error>> {
    let config = FlashConfig {
        size: opts.size as usize,
        ..FlashConfig::default()
    }
    .with_jedec_id(opts.jedec_id);

    let Some(path) = &opts.image else {
        return Ok(EmulatedFlash::new(config));
    };

    let data = std::fs::read(path)?;
    if data.len() > config.size {
        log::warn!(
            "Image {} is {} bytes, only the first {} are loaded",
            path.display(),
            data.len(),
            config.size
        );
    } else if data.len() < config.size {
        log::info!(
            "Image {} is {} bytes, the rest of the chip is erased",
            path.display(),
            data.len()
        );
    }
    Ok(EmulatedFlash::with_data(config, &data))
}
