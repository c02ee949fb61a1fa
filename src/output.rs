//! # Output Module
//!
//! The output buffer the drivers write into, and the presentation hooks
//! that show it.
//!
//! Drivers only ever call [`OutputBuffer::set_pixel`] and
//! [`OutputBuffer::commit`]. [`FrameBuffer`] stores pixels in a linear f32
//! RGB [`ImageBuffer`] and forwards every commit to an optional
//! [`Presenter`]; [`TevPresenter`] streams commits to a running TEV viewer.

use std::net::TcpStream;

use image::{ImageBuffer, Rgb};
use log::{debug, info, warn};
use tev_client::{PacketCreateImage, PacketUpdateImage, TevClient};

use crate::error::{Error, Result};
use crate::material::Color;

/// Output dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    /// Create a resolution.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Destination for traced pixel colors.
pub trait OutputBuffer {
    /// Current buffer size.
    fn resolution(&self) -> Resolution;

    /// Write one pixel. Out-of-range coordinates are ignored.
    fn set_pixel(&mut self, x: u32, y: u32, color: Color);

    /// Present everything written so far.
    fn commit(&mut self);

    /// Recreate the buffer at `resolution`, cleared to black.
    fn rebuild(&mut self, resolution: Resolution);
}

/// Something that can show a committed image.
pub trait Presenter {
    /// Show `image`. Errors are reported, never fatal to rendering.
    fn present(&mut self, image: &ImageBuffer<Rgb<f32>, Vec<f32>>) -> Result<()>;
}

/// In-memory linear RGB output buffer.
pub struct FrameBuffer {
    image: ImageBuffer<Rgb<f32>, Vec<f32>>,
    commits: usize,
    presenter: Option<Box<dyn Presenter>>,
}

impl FrameBuffer {
    /// Black buffer of the given size.
    pub fn new(resolution: Resolution) -> Self {
        Self {
            image: ImageBuffer::new(resolution.width, resolution.height),
            commits: 0,
            presenter: None,
        }
    }

    /// Forward commits to `presenter`.
    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Color stored at (`x`, `y`), if inside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.image
            .get_pixel_checked(x, y)
            .map(|p| Color::new(p[0], p[1], p[2]))
    }

    /// Number of commits since the buffer was created.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Underlying image.
    pub fn image(&self) -> &ImageBuffer<Rgb<f32>, Vec<f32>> {
        &self.image
    }
}

impl OutputBuffer for FrameBuffer {
    fn resolution(&self) -> Resolution {
        Resolution::new(self.image.width(), self.image.height())
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if let Some(pixel) = self.image.get_pixel_mut_checked(x, y) {
            *pixel = Rgb([color.x, color.y, color.z]);
        }
    }

    fn commit(&mut self) {
        self.commits += 1;
        if let Some(presenter) = self.presenter.as_mut() {
            if let Err(e) = presenter.present(&self.image) {
                warn!("Failed to present frame: {}", e);
            }
        }
    }

    fn rebuild(&mut self, resolution: Resolution) {
        debug!("Rebuilding output buffer at {}x{}", resolution.width, resolution.height);
        self.image = ImageBuffer::new(resolution.width, resolution.height);
    }
}

/// Streams committed frames to a TEV viewer over TCP.
///
/// The image is created in TEV on the first frame and updated in place
/// afterwards; a resolution change creates it again.
pub struct TevPresenter {
    client: TevClient,
    address: String,
    image_name: String,
    created_for: Option<(u32, u32)>,
}

impl TevPresenter {
    /// Connect to TEV at `address` (IP:port, or just IP for port 14158).
    pub fn connect(address: &str, image_name: &str) -> Result<Self> {
        let address = if address.contains(':') {
            address.to_string()
        } else {
            format!("{}:14158", address)
        };

        debug!("Attempting to connect to TEV at {}", address);
        let stream = TcpStream::connect(&address)
            .map_err(|e| Error::Present(format!("cannot connect to TEV at {}: {}", address, e)))?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }
        info!("Connected to TEV at {}", address);

        Ok(Self {
            client: TevClient::wrap(stream),
            address,
            image_name: image_name.to_string(),
            created_for: None,
        })
    }

    fn create_image(&mut self, width: u32, height: u32) -> Result<()> {
        self.client
            .send(PacketCreateImage {
                image_name: &self.image_name,
                width,
                height,
                channel_names: &["R", "G", "B"],
                grab_focus: true,
            })
            .map_err(|e| Error::Present(format!("TEV create image failed: {}", e)))?;
        self.created_for = Some((width, height));
        Ok(())
    }
}

impl Presenter for TevPresenter {
    fn present(&mut self, image: &ImageBuffer<Rgb<f32>, Vec<f32>>) -> Result<()> {
        let (width, height) = image.dimensions();
        if self.created_for != Some((width, height)) {
            self.create_image(width, height)?;
        }

        // TEV wants planar channels (RRR...GGG...BBB...)
        let pixel_count = (width * height) as usize;
        let mut planar = Vec::with_capacity(pixel_count * 3);
        for channel in 0..3 {
            planar.extend(image.pixels().map(|p| p[channel]));
        }

        self.client
            .send(PacketUpdateImage {
                image_name: &self.image_name,
                grab_focus: false,
                channel_names: &["R", "G", "B"],
                x: 0,
                y: 0,
                width,
                height,
                channel_offsets: &[0, pixel_count as u64, 2 * pixel_count as u64],
                channel_strides: &[1, 1, 1],
                data: &planar,
            })
            .map_err(|e| Error::Present(format!("TEV update to {} failed: {}", self.address, e)))
    }
}
