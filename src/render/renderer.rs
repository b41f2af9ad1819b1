//! Layer Compositor
//!
//! The renderer owns a fixed stack of layers. A pixel is the first non-empty
//! value across the layers in priority order, otherwise OFF. Composed frames
//! go to a [`PixelSink`] in the order the LED matrix is wired.

use std::sync::{Arc, Mutex};
use serde::{Serialize, Deserialize};

use crate::core::coord::Coord;
use crate::render::layer::{Layer, Rgb};

/// Order pixels are emitted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelOrder {
    /// Even rows left to right, odd rows right to left
    #[default]
    Serpentine,
    /// Every row left to right
    RowMajor,
}

/// Layers, highest priority first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerId {
    /// Error indicator
    Error = 0,
    /// Destruction blink
    Blink = 1,
    /// Entity colours
    Grid = 2,
}

impl LayerId {
    /// Priority order.
    pub const ALL: [LayerId; 3] = [LayerId::Error, LayerId::Blink, LayerId::Grid];
}

/// Receives composed frames.
pub trait PixelSink: Send {
    /// Write one frame in emission order.
    fn write(&mut self, frame: &[Rgb]);
}

/// Discards frames.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl PixelSink for NullSink {
    fn write(&mut self, _frame: &[Rgb]) {}
}

/// Keeps the last frame where other tasks can read it.
#[derive(Clone, Debug, Default)]
pub struct FrameCapture {
    inner: Arc<Mutex<CapturedFrame>>,
}

#[derive(Debug, Default)]
struct CapturedFrame {
    pixels: Vec<Rgb>,
    count: u64,
}

impl FrameCapture {
    /// Create an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the last frame written.
    pub fn last_frame(&self) -> Vec<Rgb> {
        match self.inner.lock() {
            Ok(frame) => frame.pixels.clone(),
            Err(poisoned) => poisoned.into_inner().pixels.clone(),
        }
    }

    /// Frames written so far.
    pub fn frame_count(&self) -> u64 {
        match self.inner.lock() {
            Ok(frame) => frame.count,
            Err(poisoned) => poisoned.into_inner().count,
        }
    }
}

impl PixelSink for FrameCapture {
    fn write(&mut self, frame: &[Rgb]) {
        let mut captured = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        captured.pixels.clear();
        captured.pixels.extend_from_slice(frame);
        captured.count += 1;
    }
}

/// Layered compositor.
pub struct Renderer {
    width: usize,
    height: usize,
    order: PixelOrder,
    layers: [Layer; 3],
    frame: Vec<Rgb>,
    sink: Box<dyn PixelSink>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Create a renderer with transparent layers.
    pub fn new(width: usize, height: usize, order: PixelOrder, sink: Box<dyn PixelSink>) -> Self {
        Self {
            width,
            height,
            order,
            layers: [
                Layer::new(width, height),
                Layer::new(width, height),
                Layer::new(width, height),
            ],
            frame: vec![Rgb::OFF; width * height],
            sink,
        }
    }

    /// Borrow a layer.
    pub fn layer(&self, id: LayerId) -> &Layer {
        &self.layers[id as usize]
    }

    /// Mutably borrow a layer.
    pub fn layer_mut(&mut self, id: LayerId) -> &mut Layer {
        &mut self.layers[id as usize]
    }

    /// Composed pixel at a field coordinate.
    pub fn pixel_at(&self, c: Coord) -> Rgb {
        self.layers
            .iter()
            .find_map(|layer| layer.get(c))
            .unwrap_or(Rgb::OFF)
    }

    /// Compose every layer into the frame buffer, in emission order.
    pub fn compose(&mut self) -> &[Rgb] {
        let mut i = 0;
        for y in 0..self.height {
            let reversed = self.order == PixelOrder::Serpentine && y % 2 == 1;
            for col in 0..self.width {
                let x = if reversed { self.width - 1 - col } else { col };
                let pixel = self.pixel_at(Coord::new(x as i32, y as i32));
                self.frame[i] = pixel;
                i += 1;
            }
        }
        &self.frame
    }

    /// Compose and send the frame to the sink.
    pub fn render(&mut self) {
        self.compose();
        self.sink.write(&self.frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let mut renderer = Renderer::new(2, 2, PixelOrder::RowMajor, Box::new(NullSink));
        let c = Coord::new(1, 0);

        assert_eq!(renderer.pixel_at(c), Rgb::OFF);

        renderer.layer_mut(LayerId::Grid).set(c, Some(Rgb::GREEN));
        assert_eq!(renderer.pixel_at(c), Rgb::GREEN);

        renderer.layer_mut(LayerId::Blink).set(c, Some(Rgb::OFF));
        assert_eq!(renderer.pixel_at(c), Rgb::OFF);

        renderer.layer_mut(LayerId::Error).set(c, Some(Rgb::RED));
        assert_eq!(renderer.pixel_at(c), Rgb::RED);
    }

    #[test]
    fn test_serpentine_order() {
        let mut renderer = Renderer::new(3, 2, PixelOrder::Serpentine, Box::new(NullSink));
        let grid = renderer.layer_mut(LayerId::Grid);
        grid.set(Coord::new(0, 0), Some(Rgb::RED));
        grid.set(Coord::new(0, 1), Some(Rgb::BLUE));

        let frame = renderer.compose().to_vec();
        assert_eq!(frame, vec![Rgb::RED, Rgb::OFF, Rgb::OFF, Rgb::OFF, Rgb::OFF, Rgb::BLUE]);
    }

    #[test]
    fn test_row_major_order() {
        let mut renderer = Renderer::new(3, 2, PixelOrder::RowMajor, Box::new(NullSink));
        renderer.layer_mut(LayerId::Grid).set(Coord::new(0, 1), Some(Rgb::BLUE));

        assert_eq!(renderer.compose()[3], Rgb::BLUE);
    }

    #[test]
    fn test_capture_receives_frames() {
        let capture = FrameCapture::new();
        let mut renderer = Renderer::new(2, 1, PixelOrder::RowMajor, Box::new(capture.clone()));
        renderer.layer_mut(LayerId::Grid).fill(Rgb::YELLOW);

        renderer.render();
        renderer.render();

        assert_eq!(capture.last_frame(), vec![Rgb::YELLOW, Rgb::YELLOW]);
        assert_eq!(capture.frame_count(), 2);
    }
}
